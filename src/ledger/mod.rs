//! Storage boundary for loans and repayments.
//!
//! Implementations report a missing record as [`BillingError::NotFound`] and
//! every other persistence failure as [`BillingError::Storage`]. A unique
//! reference id violation is reported as [`BillingError::Conflict`].
//!
//! [`BillingError::NotFound`]: crate::errors::BillingError::NotFound
//! [`BillingError::Storage`]: crate::errors::BillingError::Storage
//! [`BillingError::Conflict`]: crate::errors::BillingError::Conflict

pub mod memory;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::decimal::Money;
use crate::errors::Result;
use crate::loan::{Loan, NewLoan, NewRepayment, Repayment};
use crate::types::{LoanId, LoanStatus, RepaymentId, UserId};

pub use memory::MemoryLedger;

/// persistent loan and repayment records
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_loan(&self, loan: NewLoan) -> Result<LoanId>;

    async fn loan_by_reference(&self, reference_id: &str) -> Result<Loan>;

    async fn loan_by_id(&self, loan_id: LoanId) -> Result<Loan>;

    /// loans owned by a user, newest first
    async fn loans_by_user(&self, user_id: UserId) -> Result<Vec<Loan>>;

    async fn create_repayment(&self, repayment: NewRepayment) -> Result<RepaymentId>;

    async fn repayment_by_reference(&self, reference_id: &str) -> Result<Repayment>;

    /// repayments of a loan, newest first
    async fn repayments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Repayment>>;

    async fn total_repaid(&self, loan_id: LoanId) -> Result<Money>;

    async fn repayment_count(&self, loan_id: LoanId) -> Result<u32>;

    async fn update_loan_status(&self, reference_id: &str, status: LoanStatus) -> Result<()>;

    /// open an atomic unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>>;
}

/// writes staged here are invisible to readers until `commit`, which applies
/// all of them or none
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn create_repayment(&mut self, repayment: NewRepayment) -> Result<RepaymentId>;

    async fn update_loan_status(&mut self, reference_id: &str, status: LoanStatus) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    /// discard staged writes; a no-op once committed
    async fn rollback(&mut self) -> Result<()>;
}
