//! Loan billing orchestration.
//!
//! The engine holds no mutable state between calls: every operation reads and
//! writes through the injected [`LedgerStore`] and evaluates schedules against
//! the injected [`Clock`]. Only payment application writes more than one
//! record, and it always does so inside its own ledger transaction.

mod delinquency;
mod inquiry;
mod loans;
mod payment;

#[cfg(test)]
mod fixtures;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::BillingConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{BillingError, Result};
use crate::ledger::LedgerStore;
use crate::loan::Loan;
use crate::schedule;
use crate::types::UserId;

/// request to open a new loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub reference_id: String,
    pub user_id: UserId,
    pub principal: Money,
    pub rate_percentage: Rate,
    /// cadence name, matched case-insensitively
    pub repayment_schedule: String,
    pub tenor: u32,
}

/// request to pay one installment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub loan_reference_id: String,
    /// idempotency key
    pub repayment_reference_id: String,
    pub amount: Money,
}

/// billing engine over a ledger store and a clock
pub struct BillingEngine<S: ?Sized, C = SafeTimeProvider> {
    clock: C,
    config: BillingConfig,
    store: Arc<S>,
}

impl<S, C> BillingEngine<S, C>
where
    S: LedgerStore + ?Sized,
    C: Clock,
{
    /// create engine with the standard configuration
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self::with_config(store, clock, BillingConfig::standard())
    }

    pub fn with_config(store: Arc<S>, clock: C, config: BillingConfig) -> Self {
        Self { clock, config, store }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn reject(&self, violations: Violations) -> Result<()> {
        if violations.0.is_empty() {
            return Ok(());
        }
        let message = self.config.join_violations(&violations.0);
        tracing::warn!(%message, "request rejected");
        Err(BillingError::validation(message))
    }

    fn due_date(&self, loan: &Loan, installment: u32) -> Result<DateTime<Utc>> {
        schedule::add_periods(loan.created_at, installment, loan.cadence).ok_or_else(|| {
            BillingError::validation(format!(
                "due date of installment {} for loan {} is out of range",
                installment, loan.reference_id
            ))
        })
    }
}

/// collects every violated rule before failing
#[derive(Debug, Default)]
struct Violations(Vec<String>);

impl Violations {
    fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            self.0.push(message.to_string());
        }
    }
}

/// whether the account service would accept `user_id`
///
/// Stand-in rule until accounts are looked up: any id of 1 or above is valid.
pub fn is_user_valid(user_id: UserId) -> bool {
    user_id >= 1
}

fn require_user(user_id: UserId) -> Result<()> {
    if is_user_valid(user_id) {
        Ok(())
    } else {
        Err(BillingError::validation("user id is invalid"))
    }
}

fn require_reference(reference_id: &str) -> Result<()> {
    if reference_id.is_empty() {
        Err(BillingError::validation("reference id can not be empty"))
    } else {
        Ok(())
    }
}
