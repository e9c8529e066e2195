//! Month-by-month amortization schedule for an EMI loan.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::emi::{compute_emi_for, round_display, DISPLAY_SCALE};
use crate::error::LendingError;
use crate::loan::LoanTerms;
use crate::time_value::{add_months, monthly_rate, pv};
use crate::types::{with_metadata, ComputationOutput, Money, RatePercent};
use crate::LendingResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub principal: Money,
    pub annual_interest_rate_percent: RatePercent,
    pub duration_months: u32,
    /// Disbursement date. The first installment falls one month later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePeriod {
    pub period: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub opening_balance: Money,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub emi: Money,
    pub periods: Vec<SchedulePeriod>,
    pub total_interest: Money,
    pub total_paid: Money,
}

/// Build the full schedule. The last installment absorbs the rounding residue
/// so the closing balance lands exactly on zero.
pub fn build_schedule(input: &ScheduleInput) -> LendingResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let terms = LoanTerms::new(
        input.principal,
        input.annual_interest_rate_percent,
        input.duration_months,
    )?;
    let emi = compute_emi_for(&terms)?;
    let r = monthly_rate(terms.annual_interest_rate_percent);

    let mut periods: Vec<SchedulePeriod> = Vec::with_capacity(terms.duration_months as usize);
    let mut balance = terms.principal;

    for period in 1..=terms.duration_months {
        let opening_balance = balance;
        let interest = opening_balance
            .checked_mul(r)
            .ok_or_else(|| LendingError::ArithmeticOverflow {
                context: format!("interest for period {period}"),
            })?;
        let (payment, principal) = if period == terms.duration_months {
            (opening_balance + interest, opening_balance)
        } else {
            (emi, emi - interest)
        };
        let closing_balance = opening_balance - principal;

        let due_date = match input.start_date {
            Some(d) => Some(add_months(d, period)?),
            None => None,
        };

        periods.push(SchedulePeriod {
            period,
            due_date,
            opening_balance,
            payment,
            interest,
            principal,
            closing_balance,
        });

        balance = closing_balance;
    }

    let total_interest: Money = periods.iter().map(|p| p.interest).sum();
    let total_paid: Money = periods.iter().map(|p| p.payment).sum();

    if let Some(last) = periods.last() {
        let residue = (last.payment - emi).abs();
        if round_display(residue, DISPLAY_SCALE) > Decimal::ZERO {
            warnings.push(format!(
                "Final installment adjusted by {} to close the balance",
                round_display(residue, DISPLAY_SCALE)
            ));
        }
    }

    let output = ScheduleOutput {
        emi,
        periods,
        total_interest,
        total_paid,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Amortization schedule: equal monthly installments, reducing balance",
        &serde_json::json!({
            "principal": terms.principal.to_string(),
            "annual_interest_rate_percent": terms.annual_interest_rate_percent.to_string(),
            "duration_months": terms.duration_months,
            "start_date": input.start_date,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Principal still outstanding after `payments_made` installments: the present
/// value of the installments that remain.
pub fn remaining_principal(terms: &LoanTerms, payments_made: u32) -> LendingResult<Money> {
    let emi = compute_emi_for(terms)?;
    let remaining = terms.duration_months.saturating_sub(payments_made);
    if remaining == 0 {
        return Ok(Decimal::ZERO);
    }
    pv(
        monthly_rate(terms.annual_interest_rate_percent),
        remaining,
        -emi,
        Decimal::ZERO,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(principal: Money, rate: RatePercent, months: u32) -> ScheduleInput {
        ScheduleInput {
            principal,
            annual_interest_rate_percent: rate,
            duration_months: months,
            start_date: None,
        }
    }

    #[test]
    fn test_schedule_closes_at_zero() {
        let out = build_schedule(&input(dec!(10000), dec!(12), 12)).unwrap();
        let periods = &out.result.periods;
        assert_eq!(periods.len(), 12);
        assert_eq!(periods.last().unwrap().closing_balance, Decimal::ZERO);

        let principal_repaid: Money = periods.iter().map(|p| p.principal).sum();
        assert!((principal_repaid - dec!(10000)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_schedule_first_period_split() {
        let out = build_schedule(&input(dec!(10000), dec!(12), 12)).unwrap();
        let first = &out.result.periods[0];
        assert_eq!(first.interest, dec!(100));
        assert_eq!(round_display(first.principal, 2), dec!(788.49));
    }

    #[test]
    fn test_schedule_interest_declines() {
        let out = build_schedule(&input(dec!(50000), dec!(9.5), 24)).unwrap();
        for pair in out.result.periods.windows(2) {
            assert!(pair[1].interest < pair[0].interest);
        }
    }

    #[test]
    fn test_schedule_zero_rate() {
        let out = build_schedule(&input(dec!(1200), dec!(0), 12)).unwrap();
        assert_eq!(out.result.total_interest, Decimal::ZERO);
        assert_eq!(out.result.total_paid, dec!(1200));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_schedule_due_dates() {
        let mut inp = input(dec!(3000), dec!(10), 3);
        inp.start_date = NaiveDate::from_ymd_opt(2024, 1, 31);
        let out = build_schedule(&inp).unwrap();
        let dates: Vec<_> = out.result.periods.iter().map(|p| p.due_date.unwrap()).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            ]
        );
    }

    #[test]
    fn test_remaining_principal_matches_schedule() {
        let terms = LoanTerms::new(dec!(10000), dec!(12), 12).unwrap();
        let out = build_schedule(&input(dec!(10000), dec!(12), 12)).unwrap();
        let after_five = out.result.periods[4].closing_balance;
        let pv_balance = remaining_principal(&terms, 5).unwrap();
        assert!((after_five - pv_balance).abs() < dec!(0.000001));
        assert_eq!(remaining_principal(&terms, 12).unwrap(), Decimal::ZERO);
    }
}
