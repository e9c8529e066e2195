//! Loan terms and the mutable loan record shared by every dashboard view.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::types::{Money, RatePercent};
use crate::LendingResult;

/// Identifier of a loan document in the hosted store.
pub type LoanId = String;

/// Terms agreed between lender and borrower. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    /// Annual nominal rate in percent (8.5 = 8.5%).
    pub annual_interest_rate_percent: RatePercent,
    /// Number of equal monthly installments.
    pub duration_months: u32,
}

impl LoanTerms {
    /// Build validated terms.
    pub fn new(
        principal: Money,
        annual_interest_rate_percent: RatePercent,
        duration_months: u32,
    ) -> LendingResult<Self> {
        let terms = Self {
            principal,
            annual_interest_rate_percent,
            duration_months,
        };
        terms.validate()?;
        Ok(terms)
    }

    pub fn validate(&self) -> LendingResult<()> {
        validate_terms(
            self.principal,
            self.annual_interest_rate_percent,
            self.duration_months,
        )
    }
}

pub(crate) fn validate_terms(
    principal: Money,
    annual_interest_rate_percent: RatePercent,
    duration_months: u32,
) -> LendingResult<()> {
    if principal <= Decimal::ZERO {
        return Err(LendingError::InvalidLoanTerms {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }
    if annual_interest_rate_percent < Decimal::ZERO {
        return Err(LendingError::InvalidLoanTerms {
            field: "annual_interest_rate_percent".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }
    if duration_months == 0 {
        return Err(LendingError::InvalidLoanTerms {
            field: "duration_months".into(),
            reason: "Duration must be at least 1 month".into(),
        });
    }
    Ok(())
}

/// Where a loan sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// A lender's offer, not yet accepted by the borrower.
    Proposed,
    /// Accepted but not yet collapsed to `Active`. Only seen on older records.
    Accepted,
    Active,
    Completed,
}

impl LoanStatus {
    /// `Accepted` and `Active` form one payable superstate.
    pub fn is_payable(self) -> bool {
        matches!(self, LoanStatus::Accepted | LoanStatus::Active)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Proposed => "proposed",
            LoanStatus::Accepted => "accepted",
            LoanStatus::Active => "active",
            LoanStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// One proposal or loan as persisted by the hosted document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    pub borrower_id: String,
    pub lender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrower_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// The borrower request this proposal answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub terms: LoanTerms,
    pub status: LoanStatus,
    pub remaining_payments: u32,
    /// Sum of full-precision EMIs received so far.
    #[serde(default)]
    pub total_paid: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl LoanRecord {
    /// Installments already received.
    pub fn payments_made(&self) -> u32 {
        self.terms
            .duration_months
            .saturating_sub(self.remaining_payments)
    }
}
