use chrono::{DateTime, TimeZone, Utc};
use hourglass_rs::{SafeTimeProvider, TimeControl, TimeSource};
use std::sync::Arc;

use crate::config::BillingConfig;
use crate::decimal::{Money, Rate};
use crate::engine::{BillingEngine, LoanRequest, PaymentRequest};
use crate::ledger::testing::RecordingStore;
use crate::ledger::MemoryLedger;

pub(crate) fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub(crate) struct Harness {
    pub engine: BillingEngine<RecordingStore>,
    pub store: Arc<RecordingStore>,
    pub time: SafeTimeProvider,
    pub control: TimeControl,
}

/// engine over a recording store, clock starting at 2000-12-01
pub(crate) fn harness() -> Harness {
    harness_with_config(BillingConfig::standard())
}

pub(crate) fn harness_with_config(config: BillingConfig) -> Harness {
    let time = SafeTimeProvider::new(TimeSource::Test(day(2000, 12, 1)));
    let control = time.test_control().unwrap();
    let store = Arc::new(RecordingStore::new(MemoryLedger::new(time.clone())));
    let engine = BillingEngine::with_config(Arc::clone(&store), time.clone(), config);

    Harness {
        engine,
        store,
        time,
        control,
    }
}

pub(crate) fn loan_request(reference_id: &str, user_id: i64, cadence: &str, tenor: u32) -> LoanRequest {
    LoanRequest {
        reference_id: reference_id.to_string(),
        user_id,
        principal: Money::from_minor(1000 * i64::from(tenor)),
        rate_percentage: Rate::ZERO,
        repayment_schedule: cadence.to_string(),
        tenor,
    }
}

pub(crate) fn payment(loan_reference_id: &str, repayment_reference_id: &str, amount: i64) -> PaymentRequest {
    PaymentRequest {
        loan_reference_id: loan_reference_id.to_string(),
        repayment_reference_id: repayment_reference_id.to_string(),
        amount: Money::from_minor(amount),
    }
}
