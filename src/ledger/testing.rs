//! Store double that counts calls and injects failures per operation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::ledger::{LedgerStore, LedgerTransaction, MemoryLedger};
use crate::loan::{Loan, NewLoan, NewRepayment, Repayment};
use crate::types::{LoanId, LoanStatus, RepaymentId, UserId};

#[derive(Default)]
struct Probe {
    calls: AtomicUsize,
    rollbacks: AtomicUsize,
    commits: AtomicUsize,
    failures: Mutex<HashMap<&'static str, BillingError>>,
}

impl Probe {
    fn record(&self, op: &'static str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

pub(crate) struct RecordingStore {
    inner: MemoryLedger,
    probe: Arc<Probe>,
}

impl RecordingStore {
    pub(crate) fn new(inner: MemoryLedger) -> Self {
        Self {
            inner,
            probe: Arc::new(Probe::default()),
        }
    }

    pub(crate) fn ledger(&self) -> &MemoryLedger {
        &self.inner
    }

    /// every store and transaction call made so far
    pub(crate) fn calls(&self) -> usize {
        self.probe.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn rollbacks(&self) -> usize {
        self.probe.rollbacks.load(Ordering::SeqCst)
    }

    pub(crate) fn commits(&self) -> usize {
        self.probe.commits.load(Ordering::SeqCst)
    }

    /// make `op` fail with `err` from now on
    pub(crate) fn fail(&self, op: &'static str, err: BillingError) {
        self.probe.failures.lock().insert(op, err);
    }
}

#[async_trait]
impl LedgerStore for RecordingStore {
    async fn create_loan(&self, loan: NewLoan) -> Result<LoanId> {
        self.probe.record("create_loan")?;
        self.inner.create_loan(loan).await
    }

    async fn loan_by_reference(&self, reference_id: &str) -> Result<Loan> {
        self.probe.record("loan_by_reference")?;
        self.inner.loan_by_reference(reference_id).await
    }

    async fn loan_by_id(&self, loan_id: LoanId) -> Result<Loan> {
        self.probe.record("loan_by_id")?;
        self.inner.loan_by_id(loan_id).await
    }

    async fn loans_by_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        self.probe.record("loans_by_user")?;
        self.inner.loans_by_user(user_id).await
    }

    async fn create_repayment(&self, repayment: NewRepayment) -> Result<RepaymentId> {
        self.probe.record("create_repayment")?;
        self.inner.create_repayment(repayment).await
    }

    async fn repayment_by_reference(&self, reference_id: &str) -> Result<Repayment> {
        self.probe.record("repayment_by_reference")?;
        self.inner.repayment_by_reference(reference_id).await
    }

    async fn repayments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Repayment>> {
        self.probe.record("repayments_by_loan")?;
        self.inner.repayments_by_loan(loan_id).await
    }

    async fn total_repaid(&self, loan_id: LoanId) -> Result<Money> {
        self.probe.record("total_repaid")?;
        self.inner.total_repaid(loan_id).await
    }

    async fn repayment_count(&self, loan_id: LoanId) -> Result<u32> {
        self.probe.record("repayment_count")?;
        self.inner.repayment_count(loan_id).await
    }

    async fn update_loan_status(&self, reference_id: &str, status: LoanStatus) -> Result<()> {
        self.probe.record("update_loan_status")?;
        self.inner.update_loan_status(reference_id, status).await
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        self.probe.record("begin")?;
        let inner = self.inner.begin().await?;
        Ok(Box::new(RecordingTransaction {
            inner,
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct RecordingTransaction {
    inner: Box<dyn LedgerTransaction>,
    probe: Arc<Probe>,
}

#[async_trait]
impl LedgerTransaction for RecordingTransaction {
    async fn create_repayment(&mut self, repayment: NewRepayment) -> Result<RepaymentId> {
        self.probe.record("tx.create_repayment")?;
        self.inner.create_repayment(repayment).await
    }

    async fn update_loan_status(&mut self, reference_id: &str, status: LoanStatus) -> Result<()> {
        self.probe.record("tx.update_loan_status")?;
        self.inner.update_loan_status(reference_id, status).await
    }

    async fn commit(&mut self) -> Result<()> {
        self.probe.record("tx.commit")?;
        self.inner.commit().await?;
        self.probe.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.probe.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.probe.record("tx.rollback")?;
        self.inner.rollback().await
    }
}
