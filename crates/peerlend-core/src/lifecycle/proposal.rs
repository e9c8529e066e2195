//! Borrower requests, lender proposals, and acceptance.
//!
//! Acceptance is a single whole-record transition keyed by loan id. Applying
//! it again to an already payable record changes nothing, so a failed write
//! can simply be retried.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::loan::{LoanId, LoanRecord, LoanStatus, LoanTerms};
use crate::time_value::add_months;
use crate::types::{Money, RatePercent};
use crate::LendingResult;

/// What a borrower posts: an amount and a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub id: String,
    pub borrower_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrower_name: Option<String>,
    pub amount: Money,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
}

impl LoanRequest {
    pub fn validate(&self) -> LendingResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(LendingError::InvalidLoanTerms {
                field: "amount".into(),
                reason: "Requested amount must be positive".into(),
            });
        }
        if self.purpose.trim().is_empty() {
            return Err(LendingError::InvalidLoanTerms {
                field: "purpose".into(),
                reason: "Purpose is required".into(),
            });
        }
        Ok(())
    }
}

/// A lender's offer against a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalInput {
    pub lender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender_name: Option<String>,
    pub annual_interest_rate_percent: RatePercent,
    pub duration_months: u32,
}

/// Create a `proposed` record answering `request`.
pub fn submit_proposal(
    request: &LoanRequest,
    proposal: &ProposalInput,
    id: LoanId,
    now: DateTime<Utc>,
) -> LendingResult<LoanRecord> {
    request.validate()?;
    let terms = LoanTerms::new(
        request.amount,
        proposal.annual_interest_rate_percent,
        proposal.duration_months,
    )?;

    Ok(LoanRecord {
        id,
        borrower_id: request.borrower_id.clone(),
        lender_id: proposal.lender_id.clone(),
        borrower_name: request.borrower_name.clone(),
        lender_name: proposal.lender_name.clone(),
        purpose: Some(request.purpose.clone()),
        request_id: Some(request.id.clone()),
        remaining_payments: terms.duration_months,
        terms,
        status: LoanStatus::Proposed,
        total_paid: Decimal::ZERO,
        next_payment_date: None,
        last_payment_date: None,
        created_at: now,
        accepted_at: None,
    })
}

/// Accept a proposal, moving it straight into `active`.
///
/// Already payable records come back unchanged apart from collapsing a
/// legacy `accepted` status to `active`.
pub fn accept_proposal(loan: &LoanRecord, now: DateTime<Utc>) -> LendingResult<LoanRecord> {
    match loan.status {
        LoanStatus::Proposed => {
            loan.terms.validate()?;
            let mut accepted = loan.clone();
            accepted.status = LoanStatus::Active;
            accepted.remaining_payments = loan.terms.duration_months;
            accepted.total_paid = Decimal::ZERO;
            accepted.accepted_at = Some(now);
            accepted.next_payment_date = Some(add_months(now.date_naive(), 1)?);
            Ok(accepted)
        }
        LoanStatus::Accepted => {
            let mut collapsed = loan.clone();
            collapsed.status = LoanStatus::Active;
            if collapsed.accepted_at.is_none() {
                collapsed.accepted_at = Some(now);
            }
            if collapsed.next_payment_date.is_none() {
                collapsed.next_payment_date = Some(add_months(now.date_naive(), 1)?);
            }
            Ok(collapsed)
        }
        LoanStatus::Active => Ok(loan.clone()),
        LoanStatus::Completed => Err(LendingError::InvalidTransition {
            loan_id: loan.id.clone(),
            from: loan.status,
            action: "accept".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn request() -> LoanRequest {
        LoanRequest {
            id: "req-1".into(),
            borrower_id: "b-1".into(),
            borrower_name: Some("Sarah M.".into()),
            amount: dec!(10000),
            purpose: "Business Expansion".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    fn offer() -> ProposalInput {
        ProposalInput {
            lender_id: "l-1".into(),
            lender_name: Some("XYZ Finance".into()),
            annual_interest_rate_percent: dec!(9),
            duration_months: 24,
        }
    }

    #[test]
    fn test_submit_proposal_copies_request() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        let loan = submit_proposal(&request(), &offer(), "p-1".into(), now).unwrap();
        assert_eq!(loan.status, LoanStatus::Proposed);
        assert_eq!(loan.terms.principal, dec!(10000));
        assert_eq!(loan.remaining_payments, 24);
        assert_eq!(loan.request_id.as_deref(), Some("req-1"));
        assert_eq!(loan.purpose.as_deref(), Some("Business Expansion"));
    }

    #[test]
    fn test_submit_proposal_rejects_bad_terms() {
        let mut bad = offer();
        bad.duration_months = 0;
        assert!(submit_proposal(&request(), &bad, "p-1".into(), Utc::now()).is_err());

        let mut req = request();
        req.purpose = "  ".into();
        assert!(submit_proposal(&req, &offer(), "p-1".into(), Utc::now()).is_err());
    }

    #[test]
    fn test_accept_moves_to_active() {
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 9, 0, 0).unwrap();
        let proposed = submit_proposal(&request(), &offer(), "p-1".into(), now).unwrap();
        let accepted = accept_proposal(&proposed, now).unwrap();
        assert_eq!(accepted.status, LoanStatus::Active);
        assert_eq!(accepted.accepted_at, Some(now));
        assert_eq!(accepted.next_payment_date, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[test]
    fn test_accept_is_idempotent() {
        let now = Utc::now();
        let proposed = submit_proposal(&request(), &offer(), "p-1".into(), now).unwrap();
        let once = accept_proposal(&proposed, now).unwrap();
        let twice = accept_proposal(&once, now + chrono::Duration::days(3)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_accept_completed_fails() {
        let now = Utc::now();
        let mut loan = submit_proposal(&request(), &offer(), "p-1".into(), now).unwrap();
        loan.status = LoanStatus::Completed;
        loan.remaining_payments = 0;
        assert!(matches!(
            accept_proposal(&loan, now),
            Err(LendingError::InvalidTransition { .. })
        ));
    }
}
