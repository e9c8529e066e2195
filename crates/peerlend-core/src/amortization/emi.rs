//! Equated monthly installment (EMI) engine.
//!
//! Pure functions over [`LoanTerms`]: the installment itself, the two
//! total-payable formulas used by the borrower and lender views, and the
//! outstanding balance of a loan record. Amounts keep full `Decimal`
//! precision; [`round_display`] is applied only when presenting them.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LendingError;
use crate::loan::{validate_terms, LoanRecord, LoanStatus, LoanTerms};
use crate::time_value::{monthly_rate, pmt};
use crate::types::{with_metadata, ComputationOutput, Money, RatePercent, TotalPayableBasis};
use crate::LendingResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);
const PERCENT: Decimal = dec!(100);
/// Display precision for currency amounts.
pub const DISPLAY_SCALE: u32 = 2;

// ---------------------------------------------------------------------------
// Input / Output Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmiInput {
    pub principal: Money,
    pub annual_interest_rate_percent: RatePercent,
    pub duration_months: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmiOutput {
    /// Full-precision installment.
    pub emi: Money,
    /// Installment rounded to cents.
    pub emi_rounded: Money,
    pub monthly_rate: Decimal,
    /// `EMI × duration`.
    pub total_payable_via_emi: Money,
    /// `principal + monthly simple interest × duration`.
    pub simple_interest_total: Money,
    pub total_interest: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Equated monthly installment for a fully amortizing loan.
///
/// With `r = rate / 12 / 100`, `EMI = P·r·(1+r)^n / ((1+r)^n − 1)`; a zero rate
/// degenerates to `P / n`.
pub fn compute_emi(
    principal: Money,
    annual_interest_rate_percent: RatePercent,
    duration_months: u32,
) -> LendingResult<Money> {
    validate_terms(principal, annual_interest_rate_percent, duration_months)?;
    let r = monthly_rate(annual_interest_rate_percent);
    if r.is_zero() {
        return Ok(principal / Decimal::from(duration_months));
    }
    Ok(-pmt(r, duration_months, principal, Decimal::ZERO)?)
}

/// [`compute_emi`] over a terms struct.
pub fn compute_emi_for(terms: &LoanTerms) -> LendingResult<Money> {
    compute_emi(
        terms.principal,
        terms.annual_interest_rate_percent,
        terms.duration_months,
    )
}

/// Round an amount for display, half away from zero.
pub fn round_display(amount: Money, scale: u32) -> Money {
    amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

fn overflow(context: &str) -> LendingError {
    LendingError::ArithmeticOverflow {
        context: context.into(),
    }
}

/// Borrower-view total: `EMI × duration`.
pub fn compute_total_payable_via_emi(terms: &LoanTerms) -> LendingResult<Money> {
    let emi = compute_emi_for(terms)?;
    emi.checked_mul(Decimal::from(terms.duration_months))
        .ok_or_else(|| overflow("EMI total payable"))
}

/// Lender-view total ("expected return"):
/// `principal + (principal × rate / (12 × 100)) × duration`.
pub fn compute_simple_interest_total(terms: &LoanTerms) -> LendingResult<Money> {
    terms.validate()?;
    terms
        .principal
        .checked_mul(terms.annual_interest_rate_percent)
        .map(|scaled| scaled / (MONTHS_PER_YEAR * PERCENT))
        .and_then(|monthly| monthly.checked_mul(Decimal::from(terms.duration_months)))
        .and_then(|interest| interest.checked_add(terms.principal))
        .ok_or_else(|| overflow("simple-interest total"))
}

pub fn compute_total_payable(terms: &LoanTerms, basis: TotalPayableBasis) -> LendingResult<Money> {
    match basis {
        TotalPayableBasis::Emi => compute_total_payable_via_emi(terms),
        TotalPayableBasis::SimpleInterest => compute_simple_interest_total(terms),
    }
}

/// Amount still owed on the EMI basis, floored at zero.
pub fn compute_outstanding(loan: &LoanRecord) -> LendingResult<Money> {
    compute_outstanding_with(loan, TotalPayableBasis::Emi)
}

/// Amount still owed on the chosen basis, floored at zero. A completed loan
/// owes nothing regardless of accumulated rounding.
pub fn compute_outstanding_with(loan: &LoanRecord, basis: TotalPayableBasis) -> LendingResult<Money> {
    let total = compute_total_payable(&loan.terms, basis)?;
    if loan.status == LoanStatus::Completed {
        return Ok(Decimal::ZERO);
    }
    Ok((total - loan.total_paid).max(Decimal::ZERO))
}

/// EMI with both totals, wrapped in the standard envelope.
pub fn calculate_emi(input: &EmiInput) -> LendingResult<ComputationOutput<EmiOutput>> {
    calculate_emi_with_scale(input, DISPLAY_SCALE)
}

/// [`calculate_emi`] with `emi_rounded` and the warning text rounded to
/// `display_scale` places.
pub fn calculate_emi_with_scale(
    input: &EmiInput,
    display_scale: u32,
) -> LendingResult<ComputationOutput<EmiOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let terms = LoanTerms::new(
        input.principal,
        input.annual_interest_rate_percent,
        input.duration_months,
    )?;

    let emi = compute_emi_for(&terms)?;
    let total_payable_via_emi = compute_total_payable_via_emi(&terms)?;
    let simple_interest_total = compute_simple_interest_total(&terms)?;

    if total_payable_via_emi != simple_interest_total {
        warnings.push(format!(
            "EMI total {} differs from simple-interest total {}",
            round_display(total_payable_via_emi, display_scale),
            round_display(simple_interest_total, display_scale),
        ));
    }

    let output = EmiOutput {
        emi,
        emi_rounded: round_display(emi, display_scale),
        monthly_rate: monthly_rate(terms.annual_interest_rate_percent),
        total_payable_via_emi,
        simple_interest_total,
        total_interest: total_payable_via_emi - terms.principal,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Equated monthly installment: reducing balance, monthly compounding",
        &serde_json::json!({
            "principal": terms.principal.to_string(),
            "annual_interest_rate_percent": terms.annual_interest_rate_percent.to_string(),
            "duration_months": terms.duration_months,
            "display_scale": display_scale,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn loan(terms: LoanTerms, paid: u32, total_paid: Money) -> LoanRecord {
        LoanRecord {
            id: "loan-1".into(),
            borrower_id: "b-1".into(),
            lender_id: "l-1".into(),
            borrower_name: None,
            lender_name: None,
            purpose: None,
            request_id: None,
            remaining_payments: terms.duration_months - paid,
            terms,
            status: LoanStatus::Active,
            total_paid,
            next_payment_date: None,
            last_payment_date: None,
            created_at: Utc::now(),
            accepted_at: None,
        }
    }

    #[test]
    fn test_emi_reference_value() {
        let emi = compute_emi(dec!(10000), dec!(12), 12).unwrap();
        assert_eq!(round_display(emi, 2), dec!(888.49));
    }

    #[test]
    fn test_emi_zero_rate_is_exact_division() {
        let emi = compute_emi(dec!(5000), dec!(0), 10).unwrap();
        assert_eq!(emi, dec!(500));
        let emi = compute_emi(dec!(1000), dec!(0), 3).unwrap();
        assert_eq!(emi, dec!(1000) / dec!(3));
    }

    #[test]
    fn test_emi_single_month_repays_principal_plus_one_month_interest() {
        let emi = compute_emi(dec!(1200), dec!(12), 1).unwrap();
        assert!((emi - dec!(1212)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_emi_large_principal_long_horizon() {
        // 10bn at 120% over 40 years: vⁿ is negligible, EMI ≈ P·r
        let emi = compute_emi(dec!(10000000000), dec!(120), 480).unwrap();
        assert!((emi - dec!(1000000000)).abs() < dec!(0.01));
    }

    #[test]
    fn test_emi_high_rate_many_periods() {
        let emi = compute_emi(dec!(1000), dec!(100), 1200).unwrap();
        assert_eq!(round_display(emi, 2), dec!(83.33));

        let emi = compute_emi(dec!(1000), dec!(12), 1_000_000).unwrap();
        assert_eq!(round_display(emi, 2), dec!(10.00));
    }

    #[test]
    fn test_emi_tiny_rate_degrades_to_level_payment() {
        let emi = compute_emi(dec!(1200), dec!(0.0000000000000000000000001), 12).unwrap();
        assert_eq!(round_display(emi, 2), dec!(100.00));
    }

    #[test]
    fn test_emi_invalid_terms() {
        assert!(compute_emi(dec!(-1), dec!(5), 12).is_err());
        assert!(compute_emi(dec!(1000), dec!(-5), 12).is_err());
        assert!(compute_emi(dec!(1000), dec!(5), 0).is_err());
    }

    #[test]
    fn test_round_display_half_away_from_zero() {
        assert_eq!(round_display(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_display(dec!(2.355), 2), dec!(2.36));
    }

    #[test]
    fn test_simple_interest_total() {
        // 10,000 at 12% for 12 months: 100/month interest => 11,200
        let terms = LoanTerms::new(dec!(10000), dec!(12), 12).unwrap();
        assert_eq!(compute_simple_interest_total(&terms).unwrap(), dec!(11200));
    }

    #[test]
    fn test_totals_differ_for_positive_rate() {
        let terms = LoanTerms::new(dec!(10000), dec!(12), 12).unwrap();
        let via_emi = compute_total_payable(&terms, TotalPayableBasis::Emi).unwrap();
        let simple = compute_total_payable(&terms, TotalPayableBasis::SimpleInterest).unwrap();
        assert!(via_emi < simple);
        assert!((via_emi - dec!(10661.85)).abs() < dec!(0.01));
    }

    #[test]
    fn test_totals_agree_at_zero_rate() {
        let terms = LoanTerms::new(dec!(6000), dec!(0), 12).unwrap();
        assert_eq!(compute_total_payable_via_emi(&terms).unwrap(), dec!(6000));
        assert_eq!(compute_simple_interest_total(&terms).unwrap(), dec!(6000));
    }

    #[test]
    fn test_outstanding_after_payments() {
        let terms = LoanTerms::new(dec!(6000), dec!(0), 12).unwrap();
        let record = loan(terms, 4, dec!(2000));
        assert_eq!(compute_outstanding(&record).unwrap(), dec!(4000));
    }

    #[test]
    fn test_outstanding_never_negative() {
        let terms = LoanTerms::new(dec!(6000), dec!(0), 12).unwrap();
        let record = loan(terms, 12, dec!(7000));
        assert_eq!(compute_outstanding(&record).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_outstanding_simple_interest_basis() {
        let terms = LoanTerms::new(dec!(10000), dec!(12), 12).unwrap();
        let record = loan(terms, 0, Decimal::ZERO);
        let outstanding =
            compute_outstanding_with(&record, TotalPayableBasis::SimpleInterest).unwrap();
        assert_eq!(outstanding, dec!(11200));
    }

    #[test]
    fn test_calculate_emi_envelope() {
        let input = EmiInput {
            principal: dec!(10000),
            annual_interest_rate_percent: dec!(12),
            duration_months: 12,
        };
        let out = calculate_emi(&input).unwrap();
        assert_eq!(out.result.emi_rounded, dec!(888.49));
        assert_eq!(out.result.monthly_rate, dec!(0.01));
        assert_eq!(out.warnings.len(), 1);
        assert!(!out.metadata.version.is_empty());
    }

    #[test]
    fn test_calculate_emi_honours_display_scale() {
        let input = EmiInput {
            principal: dec!(10000),
            annual_interest_rate_percent: dec!(12),
            duration_months: 12,
        };
        let four = calculate_emi_with_scale(&input, 4).unwrap();
        assert_eq!(four.result.emi_rounded, dec!(888.4879));
        let whole = calculate_emi_with_scale(&input, 0).unwrap();
        assert_eq!(whole.result.emi_rounded, dec!(888));
        assert_eq!(four.result.emi, whole.result.emi);
    }
}
