use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{Cadence, LoanId, LoanStatus, RepaymentId, UserId};

/// persisted installment loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    // identification
    pub id: LoanId,
    pub reference_id: String,
    pub user_id: UserId,

    // contracted terms
    pub principal: Money,
    pub rate_percentage: Rate,
    pub cadence: Cadence,
    pub tenor: u32,
    pub repayment_amount: Money,

    // lifecycle
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// total owed across every installment
    pub fn total_due(&self) -> Money {
        self.repayment_amount.times(self.tenor)
    }

    /// amount still owed after `repaid`; negative means overpaid
    pub fn outstanding_after(&self, repaid: Money) -> Money {
        self.total_due() - repaid
    }

    /// whether a cumulative repaid amount settles the loan
    pub fn is_settled_by(&self, repaid: Money) -> bool {
        repaid >= self.total_due()
    }

    pub fn can_accept_payment(&self) -> bool {
        self.status == LoanStatus::Active
    }

}

/// loan to be inserted, before the store assigns identity and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    pub reference_id: String,
    pub user_id: UserId,
    pub principal: Money,
    pub rate_percentage: Rate,
    pub cadence: Cadence,
    pub tenor: u32,
    pub repayment_amount: Money,
    pub status: LoanStatus,
}

/// persisted repayment, immutable once written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repayment {
    pub id: RepaymentId,
    pub loan_id: LoanId,
    pub reference_id: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRepayment {
    pub loan_id: LoanId,
    pub reference_id: String,
    pub amount: Money,
}
