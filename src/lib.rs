pub mod clock;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod loan;
pub mod schedule;
pub mod types;
pub mod views;

// re-export key types
pub use clock::{Clock, FixedClock};
pub use config::BillingConfig;
pub use decimal::{installment_amount, Money, Rate};
pub use engine::{is_user_valid, BillingEngine, LoanRequest, PaymentRequest};
pub use errors::{BillingError, ErrorKind, Result};
pub use ledger::{LedgerStore, LedgerTransaction, MemoryLedger};
pub use loan::{Loan, NewLoan, NewRepayment, Repayment};
pub use types::{Cadence, LoanId, LoanStatus, RepaymentId, UnknownCadence, UserId};
pub use views::{
    JsonView, LoanHistory, LoanList, LoanView, OutstandingSummary, RepaymentInquiry,
    RepaymentNeeded,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
