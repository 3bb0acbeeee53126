use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::ledger::{LedgerStore, LedgerTransaction};
use crate::loan::{Loan, NewLoan, NewRepayment, Repayment};
use crate::types::{LoanId, LoanStatus, RepaymentId, UserId};

#[derive(Debug, Default)]
struct LedgerTables {
    loans: Vec<Loan>,
    repayments: Vec<Repayment>,
}

impl LedgerTables {
    fn loan_by_reference_mut(&mut self, reference_id: &str) -> Option<&mut Loan> {
        self.loans.iter_mut().find(|l| l.reference_id == reference_id)
    }

    fn has_loan(&self, loan_id: LoanId) -> bool {
        self.loans.iter().any(|l| l.id == loan_id)
    }

    fn has_repayment_reference(&self, reference_id: &str) -> bool {
        self.repayments.iter().any(|r| r.reference_id == reference_id)
    }

    fn set_status(&mut self, reference_id: &str, status: LoanStatus, clock: &dyn Clock) -> Result<()> {
        let loan = self
            .loan_by_reference_mut(reference_id)
            .ok_or_else(|| BillingError::not_found("loan", reference_id))?;
        loan.status = status;
        loan.updated_at = clock.now();
        Ok(())
    }
}

fn duplicate_repayment(reference_id: &str) -> BillingError {
    BillingError::conflict(format!("repayment reference id already exists: {}", reference_id))
}

/// in-process ledger; reference ids are unique per table
#[derive(Clone)]
pub struct MemoryLedger {
    tables: Arc<RwLock<LedgerTables>>,
    clock: Arc<dyn Clock>,
}

impl MemoryLedger {
    /// create empty ledger stamping records with `clock`
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            tables: Arc::new(RwLock::new(LedgerTables::default())),
            clock: Arc::new(clock),
        }
    }

    pub fn loan_count(&self) -> usize {
        self.tables.read().loans.len()
    }

    pub fn repayment_total_count(&self) -> usize {
        self.tables.read().repayments.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_loan(&self, loan: NewLoan) -> Result<LoanId> {
        let mut tables = self.tables.write();
        if tables.loans.iter().any(|l| l.reference_id == loan.reference_id) {
            return Err(BillingError::conflict(format!(
                "loan reference id already exists: {}",
                loan.reference_id
            )));
        }

        let now = self.clock.now();
        let id = Uuid::new_v4();
        tables.loans.push(Loan {
            id,
            reference_id: loan.reference_id,
            user_id: loan.user_id,
            principal: loan.principal,
            rate_percentage: loan.rate_percentage,
            cadence: loan.cadence,
            tenor: loan.tenor,
            repayment_amount: loan.repayment_amount,
            status: loan.status,
            created_at: now,
            updated_at: now,
        });
        debug!(loan_id = %id, "loan inserted");
        Ok(id)
    }

    async fn loan_by_reference(&self, reference_id: &str) -> Result<Loan> {
        self.tables
            .read()
            .loans
            .iter()
            .find(|l| l.reference_id == reference_id)
            .cloned()
            .ok_or_else(|| BillingError::not_found("loan", reference_id))
    }

    async fn loan_by_id(&self, loan_id: LoanId) -> Result<Loan> {
        self.tables
            .read()
            .loans
            .iter()
            .find(|l| l.id == loan_id)
            .cloned()
            .ok_or_else(|| BillingError::not_found("loan", loan_id))
    }

    async fn loans_by_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        Ok(self
            .tables
            .read()
            .loans
            .iter()
            .rev()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_repayment(&self, repayment: NewRepayment) -> Result<RepaymentId> {
        let mut tables = self.tables.write();
        if !tables.has_loan(repayment.loan_id) {
            return Err(BillingError::not_found("loan", repayment.loan_id));
        }
        if tables.has_repayment_reference(&repayment.reference_id) {
            return Err(duplicate_repayment(&repayment.reference_id));
        }

        let record = stamp_repayment(repayment, self.clock.as_ref());
        let id = record.id;
        tables.repayments.push(record);
        Ok(id)
    }

    async fn repayment_by_reference(&self, reference_id: &str) -> Result<Repayment> {
        self.tables
            .read()
            .repayments
            .iter()
            .find(|r| r.reference_id == reference_id)
            .cloned()
            .ok_or_else(|| BillingError::not_found("repayment", reference_id))
    }

    async fn repayments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Repayment>> {
        Ok(self
            .tables
            .read()
            .repayments
            .iter()
            .rev()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect())
    }

    async fn total_repaid(&self, loan_id: LoanId) -> Result<Money> {
        self.tables
            .read()
            .repayments
            .iter()
            .filter(|r| r.loan_id == loan_id)
            .try_fold(Money::ZERO, |total, r| total.checked_add(r.amount))
            .ok_or_else(|| BillingError::storage(format!("repaid total overflow for loan {}", loan_id)))
    }

    async fn repayment_count(&self, loan_id: LoanId) -> Result<u32> {
        let count = self
            .tables
            .read()
            .repayments
            .iter()
            .filter(|r| r.loan_id == loan_id)
            .count();
        u32::try_from(count).map_err(|_| BillingError::storage("repayment count overflow"))
    }

    async fn update_loan_status(&self, reference_id: &str, status: LoanStatus) -> Result<()> {
        self.tables
            .write()
            .set_status(reference_id, status, self.clock.as_ref())
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        Ok(Box::new(MemoryTransaction {
            tables: Arc::clone(&self.tables),
            clock: Arc::clone(&self.clock),
            staged: Vec::new(),
            state: TxState::Open,
        }))
    }
}

fn stamp_repayment(repayment: NewRepayment, clock: &dyn Clock) -> Repayment {
    let now = clock.now();
    Repayment {
        id: Uuid::new_v4(),
        loan_id: repayment.loan_id,
        reference_id: repayment.reference_id,
        amount: repayment.amount,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Debug)]
enum StagedWrite {
    Repayment(Repayment),
    Status { reference_id: String, status: LoanStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// staged writes applied under a single write lock on commit
///
/// Dropping an open transaction discards its writes.
pub struct MemoryTransaction {
    tables: Arc<RwLock<LedgerTables>>,
    clock: Arc<dyn Clock>,
    staged: Vec<StagedWrite>,
    state: TxState,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<()> {
        match self.state {
            TxState::Open => Ok(()),
            TxState::Committed => Err(BillingError::storage("transaction already committed")),
            TxState::RolledBack => Err(BillingError::storage("transaction already rolled back")),
        }
    }

    fn staged_repayment_reference(&self, reference_id: &str) -> bool {
        self.staged.iter().any(|w| {
            matches!(w, StagedWrite::Repayment(r) if r.reference_id == reference_id)
        })
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn create_repayment(&mut self, repayment: NewRepayment) -> Result<RepaymentId> {
        self.ensure_open()?;
        {
            let tables = self.tables.read();
            if !tables.has_loan(repayment.loan_id) {
                return Err(BillingError::not_found("loan", repayment.loan_id));
            }
            if tables.has_repayment_reference(&repayment.reference_id) {
                return Err(duplicate_repayment(&repayment.reference_id));
            }
        }
        if self.staged_repayment_reference(&repayment.reference_id) {
            return Err(duplicate_repayment(&repayment.reference_id));
        }

        let record = stamp_repayment(repayment, self.clock.as_ref());
        let id = record.id;
        self.staged.push(StagedWrite::Repayment(record));
        Ok(id)
    }

    async fn update_loan_status(&mut self, reference_id: &str, status: LoanStatus) -> Result<()> {
        self.ensure_open()?;
        if !self.tables.read().loans.iter().any(|l| l.reference_id == reference_id) {
            return Err(BillingError::not_found("loan", reference_id));
        }
        self.staged.push(StagedWrite::Status {
            reference_id: reference_id.to_string(),
            status,
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let mut tables = self.tables.write();

        // re-check constraints against writes committed since staging
        for write in &self.staged {
            match write {
                StagedWrite::Repayment(r) => {
                    if tables.has_repayment_reference(&r.reference_id) {
                        return Err(duplicate_repayment(&r.reference_id));
                    }
                }
                StagedWrite::Status { reference_id, .. } => {
                    if !tables.loans.iter().any(|l| &l.reference_id == reference_id) {
                        return Err(BillingError::not_found("loan", reference_id.as_str()));
                    }
                }
            }
        }

        for write in self.staged.drain(..) {
            match write {
                StagedWrite::Repayment(r) => tables.repayments.push(r),
                StagedWrite::Status { reference_id, status } => {
                    tables.set_status(&reference_id, status, self.clock.as_ref())?;
                }
            }
        }
        self.state = TxState::Committed;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.state == TxState::Committed {
            return Ok(());
        }
        self.staged.clear();
        self.state = TxState::RolledBack;
        Ok(())
    }
}
