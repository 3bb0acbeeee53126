use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::decimal::{installment_amount, Money};
use crate::engine::{require_reference, require_user, BillingEngine, LoanRequest, Violations};
use crate::errors::{or_absent, BillingError, Result};
use crate::ledger::LedgerStore;
use crate::loan::{Loan, NewLoan};
use crate::types::{Cadence, LoanId, LoanStatus, UserId};
use crate::views::{LoanHistory, LoanList};

/// terms derived from a request that passed validation
struct ApprovedTerms {
    cadence: Cadence,
    repayment_amount: Money,
}

impl<S, C> BillingEngine<S, C>
where
    S: LedgerStore + ?Sized,
    C: Clock,
{
    /// open a new active loan
    ///
    /// Fails with `Validation` listing every violated rule, `Conflict` when the
    /// reference id is taken, and `Forbidden` when the borrower is delinquent.
    pub async fn create_loan(&self, request: LoanRequest) -> Result<LoanId> {
        let terms = self.approve_terms(&request)?;

        match self.store.loan_by_reference(&request.reference_id).await {
            Ok(_) => {
                warn!(reference_id = %request.reference_id, "duplicate loan reference");
                return Err(BillingError::conflict("loan already exists"));
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        if self.is_user_delinquent(request.user_id).await? {
            warn!(user_id = request.user_id, "loan refused for delinquent user");
            return Err(BillingError::forbidden("user is delinquent"));
        }

        let loan_id = self
            .store
            .create_loan(NewLoan {
                reference_id: request.reference_id.clone(),
                user_id: request.user_id,
                principal: request.principal,
                rate_percentage: request.rate_percentage,
                cadence: terms.cadence,
                tenor: request.tenor,
                repayment_amount: terms.repayment_amount,
                status: LoanStatus::Active,
            })
            .await?;

        info!(
            loan_id = %loan_id,
            reference_id = %request.reference_id,
            repayment_amount = %terms.repayment_amount,
            "loan created"
        );
        Ok(loan_id)
    }

    fn approve_terms(&self, request: &LoanRequest) -> Result<ApprovedTerms> {
        let mut violations = Violations::default();
        violations.check(!request.reference_id.is_empty(), "reference id is required");
        violations.check(super::is_user_valid(request.user_id), "user id is invalid");
        violations.check(request.principal.minor() >= 1, "amount is required");
        violations.check(!request.rate_percentage.is_negative(), "rate percentage is invalid");
        let cadence = request.repayment_schedule.parse::<Cadence>().ok();
        violations.check(cadence.is_some(), "repayment schedule is invalid");
        violations.check(request.tenor >= 1, "tenor is required");

        // only meaningful once the inputs it depends on are sound
        let repayment_amount = if violations.0.is_empty() {
            installment_amount(request.principal, request.rate_percentage, request.tenor)
        } else {
            None
        };
        if violations.0.is_empty() {
            violations.check(repayment_amount.is_some(), "repayment amount is out of range");
        }
        if let Some(amount) = repayment_amount {
            violations.check(
                amount.checked_times(request.tenor).is_some(),
                "total repayment is out of range",
            );
        }
        self.reject(violations)?;

        match (cadence, repayment_amount) {
            (Some(cadence), Some(repayment_amount)) => Ok(ApprovedTerms {
                cadence,
                repayment_amount,
            }),
            _ => Err(BillingError::validation("loan terms are invalid")),
        }
    }

    /// loan and every repayment recorded against it
    pub async fn loan_history_by_reference(&self, reference_id: &str) -> Result<LoanHistory> {
        require_reference(reference_id)?;
        debug!(reference_id, "loading loan history");

        let loan = self.store.loan_by_reference(reference_id).await?;
        let repayments = or_absent(self.store.repayments_by_loan(loan.id).await, Vec::new())?;

        Ok(LoanHistory { loan, repayments })
    }

    /// loans owned by a user, newest first
    pub async fn loans_by_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        require_user(user_id)?;
        debug!(user_id, "listing loans");

        or_absent(self.store.loans_by_user(user_id).await, Vec::new())
    }

    /// a user's loans rendered for callers, status as its label
    pub async fn loan_list(&self, user_id: UserId) -> Result<LoanList> {
        let loans = self.loans_by_user(user_id).await?;
        Ok(LoanList::from_loans(user_id, &loans))
    }
}
