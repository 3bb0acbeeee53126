use tracing::debug;

use crate::clock::Clock;
use crate::decimal::Money;
use crate::engine::{require_reference, BillingEngine};
use crate::errors::{or_absent, BillingError, Result};
use crate::ledger::LedgerStore;
use crate::schedule;
use crate::types::LoanStatus;
use crate::views::{OutstandingSummary, RepaymentInquiry, RepaymentNeeded};

impl<S, C> BillingEngine<S, C>
where
    S: LedgerStore + ?Sized,
    C: Clock,
{
    /// total still owed on a loan, never clamped at zero
    pub async fn outstanding_amount(&self, reference_id: &str) -> Result<OutstandingSummary> {
        require_reference(reference_id)?;

        let loan = self.store.loan_by_reference(reference_id).await?;
        let repaid = or_absent(self.store.total_repaid(loan.id).await, Money::ZERO)?;
        let outstanding_amount = loan.outstanding_after(repaid);

        debug!(reference_id, %repaid, %outstanding_amount, "outstanding computed");
        Ok(OutstandingSummary {
            loan_id: loan.id,
            loan_reference_id: loan.reference_id,
            outstanding_amount,
        })
    }

    /// installments the borrower owes as of now
    ///
    /// Lists one entry per missed period oldest first, flagging those already
    /// past their due date. An active loan that is fully up to date still
    /// reports its next installment.
    pub async fn repayment_inquiry(&self, reference_id: &str) -> Result<RepaymentInquiry> {
        require_reference(reference_id)?;

        let loan = self.store.loan_by_reference(reference_id).await?;
        let paid = or_absent(self.store.repayment_count(loan.id).await, 0)?;
        let now = self.now();

        let missed = schedule::missed_periods(loan.created_at, now, paid, loan.cadence);
        let due_count = u32::try_from(missed.max(0)).map_err(|_| {
            BillingError::validation(format!(
                "missed periods for loan {} are out of range",
                loan.reference_id
            ))
        })?;

        let mut repayment_needed = Vec::with_capacity(due_count.max(1) as usize);
        for offset in 1..=due_count {
            let due_date = self.due_date(&loan, installment_number(paid, offset, &loan.reference_id)?)?;
            repayment_needed.push(RepaymentNeeded {
                amount: loan.repayment_amount,
                due_date,
                is_late: now > due_date,
            });
        }

        if missed <= 0 && loan.status == LoanStatus::Active {
            let due_date = self.due_date(&loan, installment_number(paid, 1, &loan.reference_id)?)?;
            repayment_needed.push(RepaymentNeeded {
                amount: loan.repayment_amount,
                due_date,
                is_late: now > due_date,
            });
        }

        debug!(reference_id, paid, missed, entries = repayment_needed.len(), "repayment inquiry");
        Ok(RepaymentInquiry {
            loan_id: loan.id,
            loan_reference_id: loan.reference_id,
            loan_status: loan.status.label().to_string(),
            repayment_needed,
        })
    }
}

fn installment_number(paid: u32, offset: u32, reference_id: &str) -> Result<u32> {
    paid.checked_add(offset).ok_or_else(|| {
        BillingError::validation(format!("installment number for loan {} is out of range", reference_id))
    })
}
