use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::engine::{require_user, BillingEngine};
use crate::errors::{or_absent, Result};
use crate::ledger::LedgerStore;
use crate::loan::Loan;
use crate::schedule;
use crate::types::UserId;

impl<S, C> BillingEngine<S, C>
where
    S: LedgerStore + ?Sized,
    C: Clock,
{
    /// whether any of the user's open loans is behind beyond the grace window
    ///
    /// Repayment counts for every loan are fetched concurrently and all of them
    /// must arrive before a decision is made. The first failure in loan order
    /// aborts the check.
    pub async fn is_user_delinquent(&self, user_id: UserId) -> Result<bool> {
        require_user(user_id)?;

        let loans = or_absent(self.store.loans_by_user(user_id).await, Vec::new())?;
        if loans.is_empty() {
            return Ok(false);
        }

        let counts = join_all(loans.iter().map(|loan| async move {
            or_absent(self.store.repayment_count(loan.id).await, 0)
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<u32>>>()?;

        let now = self.now();
        let grace = i64::from(self.config.delinquency_grace_periods);
        let overdue = loans
            .iter()
            .zip(counts)
            .find(|(loan, paid)| is_overdue(loan, *paid, grace, now));

        match overdue {
            Some((loan, paid)) => {
                info!(user_id, loan_id = %loan.id, paid, "user is delinquent");
                Ok(true)
            }
            None => {
                debug!(user_id, loans = loans.len(), "user is current");
                Ok(false)
            }
        }
    }
}

/// unsettled and more than `grace` periods behind
fn is_overdue(loan: &Loan, paid: u32, grace: i64, now: DateTime<Utc>) -> bool {
    loan.tenor > paid && schedule::missed_periods(loan.created_at, now, paid, loan.cadence) > grace
}

#[cfg(test)]
mod tests {
    use crate::config::BillingConfig;
    use crate::engine::fixtures::{day, harness, harness_with_config, loan_request, payment};
    use crate::errors::BillingError;
    use chrono::Duration;

    #[tokio::test]
    async fn test_monthly_loan_becomes_delinquent_after_two_periods() {
        let h = harness();
        h.engine.create_loan(loan_request("LN-1", 1, "monthly", 2)).await.unwrap();

        assert!(!h.engine.is_user_delinquent(1).await.unwrap());

        h.control.advance(Duration::days(31));
        assert_eq!(h.time.now(), day(2001, 1, 1));
        assert!(!h.engine.is_user_delinquent(1).await.unwrap());

        h.control.advance(Duration::days(31));
        assert_eq!(h.time.now(), day(2001, 2, 1));
        assert!(h.engine.is_user_delinquent(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_without_loans_is_current() {
        let h = harness();
        assert!(!h.engine.is_user_delinquent(9).await.unwrap());

        h.store.fail("loans_by_user", BillingError::not_found("loan", 9));
        assert!(!h.engine.is_user_delinquent(9).await.unwrap());
    }

    #[tokio::test]
    async fn test_paying_down_clears_delinquency() {
        let h = harness();
        h.engine.create_loan(loan_request("LN-1", 1, "weekly", 4)).await.unwrap();
        h.control.advance(Duration::weeks(2));
        assert!(h.engine.is_user_delinquent(1).await.unwrap());

        h.engine.make_payment(payment("LN-1", "RP-1", 1000)).await.unwrap();
        h.engine.make_payment(payment("LN-1", "RP-2", 1000)).await.unwrap();
        assert!(!h.engine.is_user_delinquent(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_settled_loans_are_ignored() {
        let h = harness();
        h.engine.create_loan(loan_request("LN-1", 1, "monthly", 1)).await.unwrap();
        h.engine.make_payment(payment("LN-1", "RP-1", 1000)).await.unwrap();

        h.control.advance(Duration::days(400));
        assert!(!h.engine.is_user_delinquent(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_any_overdue_loan_marks_user() {
        let h = harness();
        h.engine.create_loan(loan_request("LN-1", 1, "yearly", 3)).await.unwrap();
        h.engine.create_loan(loan_request("LN-2", 1, "weekly", 3)).await.unwrap();
        h.engine.create_loan(loan_request("LN-3", 2, "yearly", 3)).await.unwrap();

        h.control.advance(Duration::weeks(3));
        assert!(h.engine.is_user_delinquent(1).await.unwrap());
        assert!(!h.engine.is_user_delinquent(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_strict_config_has_no_grace() {
        let h = harness_with_config(BillingConfig::strict());
        h.engine.create_loan(loan_request("LN-1", 1, "monthly", 2)).await.unwrap();

        assert!(h.engine.is_user_delinquent(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_count_failure_aborts_check() {
        let h = harness();
        h.engine.create_loan(loan_request("LN-1", 1, "monthly", 2)).await.unwrap();
        h.engine.create_loan(loan_request("LN-2", 1, "monthly", 2)).await.unwrap();
        h.store.fail("repayment_count", BillingError::storage("replica lag"));

        let before = h.store.calls();
        let err = h.engine.is_user_delinquent(1).await.unwrap_err();
        assert_eq!(err, BillingError::storage("replica lag"));
        // one listing plus a count per loan
        assert_eq!(h.store.calls() - before, 3);
    }

    #[tokio::test]
    async fn test_missing_counts_read_as_zero() {
        let h = harness();
        h.engine.create_loan(loan_request("LN-1", 1, "monthly", 2)).await.unwrap();
        h.store.fail("repayment_count", BillingError::not_found("repayment", "LN-1"));

        assert!(!h.engine.is_user_delinquent(1).await.unwrap());
        h.control.advance(Duration::days(62));
        assert!(h.engine.is_user_delinquent(1).await.unwrap());
    }
}
