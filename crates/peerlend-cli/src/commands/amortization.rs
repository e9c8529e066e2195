use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use peerlend_core::amortization::emi::{self, EmiInput};
use peerlend_core::amortization::schedule::{self, ScheduleInput};
use peerlend_core::{LendingConfig, LoanRecord, TotalPayableBasis};

use crate::commands::BasisArg;
use crate::input;

/// Arguments for EMI calculation
#[derive(Args)]
pub struct EmiArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent (8.5 = 8.5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Number of monthly installments
    #[arg(long, alias = "months")]
    pub duration: Option<u32>,
}

/// Arguments for an amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Number of monthly installments
    #[arg(long, alias = "months")]
    pub duration: Option<u32>,

    /// Disbursement date (YYYY-MM-DD); due dates follow monthly
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

/// Arguments for the outstanding balance of one loan record
#[derive(Args)]
pub struct OutstandingArgs {
    /// Path to a JSON loan record
    #[arg(long)]
    pub input: Option<String>,

    /// Total-payable formula (defaults to the configured basis)
    #[arg(long, value_enum)]
    pub basis: Option<BasisArg>,
}

pub fn run_emi(args: EmiArgs, config: &LendingConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let emi_input: EmiInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        EmiInput {
            principal: args.principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_interest_rate_percent: args.rate
                .ok_or("--rate is required (or provide --input)")?,
            duration_months: args.duration
                .ok_or("--duration is required (or provide --input)")?,
        }
    };

    emi_value(&emi_input, config)
}

fn emi_value(input: &EmiInput, config: &LendingConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let result = emi::calculate_emi_with_scale(input, config.display_scale)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        ScheduleInput {
            principal: args.principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_interest_rate_percent: args.rate
                .ok_or("--rate is required (or provide --input)")?,
            duration_months: args.duration
                .ok_or("--duration is required (or provide --input)")?,
            start_date: args.start_date,
        }
    };

    let result = schedule::build_schedule(&schedule_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_outstanding(args: OutstandingArgs, config: &LendingConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanRecord = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input loan record is required for outstanding balance".into());
    };

    let basis: TotalPayableBasis = args
        .basis
        .map(Into::into)
        .unwrap_or(config.total_payable_basis);
    let outstanding = emi::compute_outstanding_with(&loan, basis)?;
    let total_payable = emi::compute_total_payable(&loan.terms, basis)?;

    Ok(serde_json::json!({
        "loan_id": loan.id,
        "basis": basis,
        "status": loan.status,
        "remaining_payments": loan.remaining_payments,
        "total_payable": emi::round_display(total_payable, config.display_scale),
        "total_paid": emi::round_display(loan.total_paid, config.display_scale),
        "outstanding": emi::round_display(outstanding, config.display_scale),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_emi_output_uses_configured_scale() {
        let input = EmiInput {
            principal: dec!(10000),
            annual_interest_rate_percent: dec!(12),
            duration_months: 12,
        };
        let config = LendingConfig {
            display_scale: 4,
            ..Default::default()
        };
        let value = emi_value(&input, &config).unwrap();
        assert_eq!(value["result"]["emi_rounded"], "888.4879");

        let value = emi_value(&input, &LendingConfig::default()).unwrap();
        assert_eq!(value["result"]["emi_rounded"], "888.49");
    }
}
