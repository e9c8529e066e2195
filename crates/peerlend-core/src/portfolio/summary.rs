//! Dashboard figures over a set of loan records.
//!
//! Only payable loans (`accepted` or `active`) contribute. The summary is a
//! pure function of its input, so repeated calls on unchanged records yield
//! identical output.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::emi::{compute_outstanding_with, compute_simple_interest_total};
use crate::config::{EmptyPortfolioPolicy, LendingConfig};
use crate::error::LendingError;
use crate::loan::{LoanRecord, LoanStatus};
use crate::types::{with_metadata, ComputationOutput, Money, RatePercent, TotalPayableBasis};
use crate::LendingResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Basis for the outstanding figure.
    #[serde(default)]
    pub basis: TotalPayableBasis,
    #[serde(default)]
    pub empty_policy: EmptyPortfolioPolicy,
}

impl From<&LendingConfig> for SummaryOptions {
    fn from(config: &LendingConfig) -> Self {
        Self {
            basis: config.total_payable_basis,
            empty_policy: config.empty_portfolio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Loans in the payable superstate.
    pub active_count: usize,
    pub completed_count: usize,
    pub total_principal: Money,
    pub total_outstanding: Money,
    /// Mean annual rate in percent over payable loans.
    pub average_interest_rate: RatePercent,
    /// Simple-interest totals of payable loans, as shown to lenders.
    pub expected_returns: Money,
    /// Earliest upcoming installment among payable loans.
    pub next_payment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInput {
    pub loans: Vec<LoanRecord>,
    #[serde(default)]
    pub options: SummaryOptions,
}

/// Summarize with the default policy: EMI-basis outstanding, and an average
/// rate of zero when nothing is payable.
pub fn summarize(loans: &[LoanRecord]) -> LendingResult<PortfolioSummary> {
    summarize_with(loans, &SummaryOptions::default())
}

pub fn summarize_with(loans: &[LoanRecord], options: &SummaryOptions) -> LendingResult<PortfolioSummary> {
    let payable: Vec<&LoanRecord> = loans.iter().filter(|l| l.status.is_payable()).collect();
    let completed_count = loans
        .iter()
        .filter(|l| l.status == LoanStatus::Completed)
        .count();

    let mut total_principal = Decimal::ZERO;
    let mut total_outstanding = Decimal::ZERO;
    let mut expected_returns = Decimal::ZERO;
    let mut rate_sum = Decimal::ZERO;
    let mut next_payment_date: Option<NaiveDate> = None;

    for loan in &payable {
        total_principal += loan.terms.principal;
        total_outstanding += compute_outstanding_with(loan, options.basis)?;
        expected_returns += compute_simple_interest_total(&loan.terms)?;
        rate_sum += loan.terms.annual_interest_rate_percent;
        if let Some(date) = loan.next_payment_date {
            next_payment_date = Some(next_payment_date.map_or(date, |d| d.min(date)));
        }
    }

    let average_interest_rate = if payable.is_empty() {
        match options.empty_policy {
            EmptyPortfolioPolicy::Zero => Decimal::ZERO,
            EmptyPortfolioPolicy::Error => return Err(LendingError::EmptyPortfolio),
        }
    } else {
        rate_sum / Decimal::from(payable.len())
    };

    Ok(PortfolioSummary {
        active_count: payable.len(),
        completed_count,
        total_principal,
        total_outstanding,
        average_interest_rate,
        expected_returns,
        next_payment_date,
    })
}

/// Portfolio summary wrapped in the standard envelope.
pub fn calculate_portfolio_summary(
    input: &PortfolioInput,
) -> LendingResult<ComputationOutput<PortfolioSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let summary = summarize_with(&input.loans, &input.options)?;

    if summary.active_count == 0 {
        warnings.push("No payable loans; average interest rate reported as 0".into());
    }
    let proposed = input
        .loans
        .iter()
        .filter(|l| l.status == LoanStatus::Proposed)
        .count();
    if proposed > 0 {
        warnings.push(format!("{proposed} proposed loan(s) excluded from totals"));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio summary over payable loans (accepted or active)",
        &serde_json::json!({
            "num_loans": input.loans.len(),
            "basis": input.options.basis,
            "empty_policy": input.options.empty_policy,
        }),
        warnings,
        elapsed,
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::LoanTerms;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(id: &str, principal: Money, rate: RatePercent, status: LoanStatus) -> LoanRecord {
        LoanRecord {
            id: id.into(),
            borrower_id: "b".into(),
            lender_id: "l".into(),
            borrower_name: None,
            lender_name: None,
            purpose: None,
            request_id: None,
            terms: LoanTerms::new(principal, rate, 12).unwrap(),
            status,
            remaining_payments: 12,
            total_paid: Decimal::ZERO,
            next_payment_date: None,
            last_payment_date: None,
            created_at: Utc::now(),
            accepted_at: None,
        }
    }

    #[test]
    fn test_empty_portfolio_zero_policy() {
        let s = summarize(&[]).unwrap();
        assert_eq!(s.active_count, 0);
        assert_eq!(s.total_outstanding, Decimal::ZERO);
        assert_eq!(s.average_interest_rate, Decimal::ZERO);
        assert_eq!(s.next_payment_date, None);
    }

    #[test]
    fn test_empty_portfolio_error_policy() {
        let opts = SummaryOptions {
            empty_policy: EmptyPortfolioPolicy::Error,
            ..Default::default()
        };
        assert!(matches!(
            summarize_with(&[], &opts),
            Err(LendingError::EmptyPortfolio)
        ));
    }

    #[test]
    fn test_only_payable_loans_count() {
        let loans = vec![
            record("a", dec!(1000), dec!(10), LoanStatus::Active),
            record("b", dec!(2000), dec!(20), LoanStatus::Accepted),
            record("c", dec!(4000), dec!(30), LoanStatus::Proposed),
            record("d", dec!(8000), dec!(40), LoanStatus::Completed),
        ];
        let s = summarize(&loans).unwrap();
        assert_eq!(s.active_count, 2);
        assert_eq!(s.completed_count, 1);
        assert_eq!(s.total_principal, dec!(3000));
        assert_eq!(s.average_interest_rate, dec!(15));
    }

    #[test]
    fn test_expected_returns_use_simple_interest() {
        let loans = vec![record("a", dec!(10000), dec!(12), LoanStatus::Active)];
        let s = summarize(&loans).unwrap();
        assert_eq!(s.expected_returns, dec!(11200));
        assert!(s.total_outstanding < s.expected_returns);
    }

    #[test]
    fn test_envelope_warns_about_proposals() {
        let input = PortfolioInput {
            loans: vec![record("c", dec!(4000), dec!(30), LoanStatus::Proposed)],
            options: SummaryOptions::default(),
        };
        let out = calculate_portfolio_summary(&input).unwrap();
        assert_eq!(out.warnings.len(), 2);
        assert_eq!(out.result.active_count, 0);
    }
}
