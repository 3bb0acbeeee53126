//! read models returned by the billing engine
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::loan::{Loan, Repayment};
use crate::types::{Cadence, LoanId, UserId};

/// json rendering for read models
pub trait JsonView: Serialize {
    fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// loan with every repayment recorded against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanHistory {
    pub loan: Loan,
    pub repayments: Vec<Repayment>,
}

impl LoanHistory {
    pub fn total_repaid(&self) -> Money {
        self.repayments.iter().map(|r| r.amount).sum()
    }
}

impl JsonView for LoanHistory {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingSummary {
    pub loan_id: LoanId,
    pub loan_reference_id: String,
    /// negative when the loan has been overpaid
    pub outstanding_amount: Money,
}

impl JsonView for OutstandingSummary {}

/// one installment the borrower still owes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentNeeded {
    pub amount: Money,
    pub due_date: DateTime<Utc>,
    pub is_late: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentInquiry {
    pub loan_id: LoanId,
    pub loan_reference_id: String,
    pub loan_status: String,
    pub repayment_needed: Vec<RepaymentNeeded>,
}

impl RepaymentInquiry {
    pub fn amount_due(&self) -> Money {
        self.repayment_needed.iter().map(|r| r.amount).sum()
    }

    pub fn late_count(&self) -> usize {
        self.repayment_needed.iter().filter(|r| r.is_late).count()
    }
}

impl JsonView for RepaymentInquiry {}

/// loan as presented to callers, status rendered as its label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub reference_id: String,
    pub user_id: UserId,
    pub amount: Money,
    pub rate_percentage: Rate,
    pub status: String,
    pub repayment_schedule: Cadence,
    pub tenor: u32,
    pub repayment_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanView {
    pub fn from_loan(loan: &Loan) -> Self {
        Self {
            id: loan.id,
            reference_id: loan.reference_id.clone(),
            user_id: loan.user_id,
            amount: loan.principal,
            rate_percentage: loan.rate_percentage,
            status: loan.status.label().to_string(),
            repayment_schedule: loan.cadence,
            tenor: loan.tenor,
            repayment_amount: loan.repayment_amount,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanList {
    pub user_id: UserId,
    pub loans: Vec<LoanView>,
}

impl LoanList {
    pub fn from_loans(user_id: UserId, loans: &[Loan]) -> Self {
        Self {
            user_id,
            loans: loans.iter().map(LoanView::from_loan).collect(),
        }
    }
}

impl JsonView for LoanList {}
