use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::LendingError;
use crate::types::{Money, Rate, RatePercent};
use crate::LendingResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);
const PERCENT: Decimal = dec!(100);

/// Monthly periodic rate from an annual percentage: `annual / 12 / 100`.
pub fn monthly_rate(annual_rate_percent: RatePercent) -> Rate {
    annual_rate_percent / MONTHS_PER_YEAR / PERCENT
}

fn overflow(context: impl Into<String>) -> LendingError {
    LendingError::ArithmeticOverflow {
        context: context.into(),
    }
}

/// `(1 + rate)^-nper`, raised from `1 / (1 + rate)` so that long horizons
/// shrink toward zero instead of overflowing.
pub fn discount_factor(rate: Rate, nper: u32) -> LendingResult<Decimal> {
    let base = Decimal::ONE
        .checked_add(rate)
        .and_then(|b| Decimal::ONE.checked_div(b))
        .ok_or_else(|| overflow(format!("discounting at {rate}")))?;
    base.checked_powu(u64::from(nper))
        .ok_or_else(|| overflow(format!("discounting {rate} over {nper} periods")))
}

/// `a × b / c`, trying the division first when the product does not fit.
fn mul_div(a: Decimal, b: Decimal, c: Decimal, context: &str) -> LendingResult<Decimal> {
    a.checked_mul(b)
        .and_then(|ab| ab.checked_div(c))
        .or_else(|| a.checked_div(c).and_then(|ac| ac.checked_mul(b)))
        .ok_or_else(|| overflow(context))
}

/// Present Value
pub fn pv(rate: Rate, nper: u32, pmt: Money, fv: Money) -> LendingResult<Money> {
    if rate.is_zero() {
        return pmt
            .checked_mul(Decimal::from(nper))
            .and_then(|total| total.checked_add(fv))
            .map(|total| -total)
            .ok_or_else(|| overflow("PV at zero rate"));
    }

    let v_n = discount_factor(rate, nper)?;
    let annuity = mul_div(pmt, Decimal::ONE - v_n, rate, "PV annuity")?;
    let terminal = fv.checked_mul(v_n).ok_or_else(|| overflow("PV terminal value"))?;
    annuity
        .checked_add(terminal)
        .map(|total| -total)
        .ok_or_else(|| overflow("PV"))
}

/// Payment (PMT), spreadsheet sign convention: a positive present value
/// yields a negative payment.
///
/// Computed as `(pv + fv·vⁿ)·r / (1 − vⁿ)` with `v = 1 / (1 + r)`.
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> LendingResult<Money> {
    if nper == 0 {
        return Err(LendingError::InvalidLoanTerms {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    let level = |amount: Money| -> LendingResult<Money> {
        amount
            .checked_div(Decimal::from(nper))
            .map(|p| -p)
            .ok_or_else(|| overflow("PMT at zero rate"))
    };
    let total = |v_n: Decimal| -> LendingResult<Money> {
        future_value
            .checked_mul(v_n)
            .and_then(|t| present_value.checked_add(t))
            .ok_or_else(|| overflow("PMT balance"))
    };

    if rate.is_zero() {
        return level(total(Decimal::ONE)?);
    }

    let v_n = discount_factor(rate, nper)?;
    let denom = Decimal::ONE - v_n;
    // rate too small to register over nper periods at 28 digits
    if denom.is_zero() {
        return level(total(v_n)?);
    }
    Ok(-mul_div(total(v_n)?, rate, denom, "PMT")?)
}

/// Shift a date by whole calendar months. Days past the end of the target
/// month clamp to its last day (Jan 31 + 1 month = Feb 28 or 29).
pub fn add_months(date: NaiveDate, months: u32) -> LendingResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LendingError::DateError(format!("{date} + {months} months is out of range")))
}
