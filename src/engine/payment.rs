use tracing::{info, warn};

use crate::clock::Clock;
use crate::decimal::Money;
use crate::engine::{BillingEngine, PaymentRequest, Violations};
use crate::errors::{or_absent, BillingError, Result};
use crate::ledger::{LedgerStore, LedgerTransaction};
use crate::loan::{Loan, NewRepayment};
use crate::types::{LoanStatus, RepaymentId};

impl<S, C> BillingEngine<S, C>
where
    S: LedgerStore + ?Sized,
    C: Clock,
{
    /// record one installment against an active loan
    ///
    /// The amount must equal the loan's repayment amount. The payment that
    /// settles the loan also marks it completed, in the same transaction.
    pub async fn make_payment(&self, request: PaymentRequest) -> Result<RepaymentId> {
        let mut violations = Violations::default();
        violations.check(
            !request.loan_reference_id.is_empty(),
            "loan reference id can not be empty",
        );
        violations.check(request.amount.is_positive(), "amount is invalid");
        violations.check(
            !request.repayment_reference_id.is_empty(),
            "reference id can not be empty",
        );
        self.reject(violations)?;

        match self.store.repayment_by_reference(&request.repayment_reference_id).await {
            Ok(_) => {
                warn!(reference_id = %request.repayment_reference_id, "duplicate repayment");
                return Err(BillingError::conflict("reference id already exists"));
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let loan = self.store.loan_by_reference(&request.loan_reference_id).await?;
        if !loan.can_accept_payment() {
            return Err(BillingError::validation(format!(
                "loan is {}, payments are no longer accepted",
                loan.status
            )));
        }

        let repaid = or_absent(self.store.total_repaid(loan.id).await, Money::ZERO)?;
        if loan.is_settled_by(repaid) {
            return Err(BillingError::validation("loan has been fully paid"));
        }
        if request.amount != loan.repayment_amount {
            return Err(BillingError::validation(format!(
                "payment amount is invalid, expected: {}",
                loan.repayment_amount
            )));
        }

        let mut tx = self.store.begin().await?;
        let outcome = apply_payment(tx.as_mut(), &loan, &request, repaid).await;
        if let Err(err) = tx.rollback().await {
            warn!(loan_id = %loan.id, error = %err, "rollback after payment failed");
        }

        match &outcome {
            Ok(repayment_id) => info!(
                loan_id = %loan.id,
                repayment_id = %repayment_id,
                amount = %request.amount,
                "payment recorded"
            ),
            Err(err) => warn!(loan_id = %loan.id, error = %err, "payment aborted"),
        }
        outcome
    }
}

/// insert the repayment and close the loan if it is now settled, then commit
async fn apply_payment(
    tx: &mut dyn LedgerTransaction,
    loan: &Loan,
    request: &PaymentRequest,
    repaid: Money,
) -> Result<RepaymentId> {
    let repayment_id = tx
        .create_repayment(NewRepayment {
            loan_id: loan.id,
            reference_id: request.repayment_reference_id.clone(),
            amount: request.amount,
        })
        .await?;

    if loan.is_settled_by(repaid.saturating_add(request.amount)) {
        info!(loan_id = %loan.id, "final installment, completing loan");
        tx.update_loan_status(&loan.reference_id, LoanStatus::Completed).await?;
    }

    tx.commit().await?;
    Ok(repayment_id)
}
