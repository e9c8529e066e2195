use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use peerlend_core::config::EmptyPortfolioPolicy;
use peerlend_core::portfolio::summary::{self, PortfolioInput, SummaryOptions};
use peerlend_core::store::{JsonFileStore, LoanQuery, LoanRepository};
use peerlend_core::{LendingConfig, LoanRecord};

use crate::commands::BasisArg;
use crate::input;

/// Arguments for a portfolio summary
#[derive(Args)]
pub struct SummaryArgs {
    /// JSON file with an array of loan records (or {"loans": [...]})
    #[arg(long)]
    pub input: Option<String>,

    /// JSON store to read loans from instead of --input
    #[arg(long)]
    pub store: Option<String>,

    /// Only loans funded by this lender
    #[arg(long)]
    pub lender: Option<String>,

    /// Only loans taken by this borrower
    #[arg(long)]
    pub borrower: Option<String>,

    /// Total-payable formula behind outstanding balances
    #[arg(long, value_enum)]
    pub basis: Option<BasisArg>,

    /// Fail instead of reporting a 0% average when no loan is payable
    #[arg(long)]
    pub strict: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LoansFile {
    Wrapped { loans: Vec<LoanRecord> },
    List(Vec<LoanRecord>),
}

impl From<LoansFile> for Vec<LoanRecord> {
    fn from(file: LoansFile) -> Self {
        match file {
            LoansFile::Wrapped { loans } => loans,
            LoansFile::List(loans) => loans,
        }
    }
}

impl SummaryArgs {
    /// Party filter from `--lender` / `--borrower`, whatever the loan source.
    fn party_filter(&self) -> LoanQuery {
        LoanQuery {
            borrower_id: self.borrower.clone(),
            lender_id: self.lender.clone(),
            status: None,
        }
    }
}

fn loans_from_store(path: &str, filter: &LoanQuery) -> Result<Vec<LoanRecord>, Box<dyn std::error::Error>> {
    let store = JsonFileStore::open(path)?;
    Ok(store.query(filter)?)
}

pub fn run_summary(args: SummaryArgs, config: &LendingConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let filter = args.party_filter();
    let mut loans: Vec<LoanRecord> = if let Some(ref path) = args.input {
        input::file::read_json::<LoansFile>(path)?.into()
    } else if let Some(ref path) = args.store {
        loans_from_store(path, &filter)?
    } else if let Some(data) = input::stdin::read_stdin::<LoansFile>()? {
        data.into()
    } else if let Some(ref path) = config.store_path {
        loans_from_store(&path.to_string_lossy(), &filter)?
    } else {
        return Err("--input or --store is required for a portfolio summary".into());
    };
    loans.retain(|l| filter.matches(l));

    let mut options = SummaryOptions::from(config);
    if let Some(basis) = args.basis {
        options.basis = basis.into();
    }
    if args.strict {
        options.empty_policy = EmptyPortfolioPolicy::Error;
    }

    let result = summary::calculate_portfolio_summary(&PortfolioInput { loans, options })?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use peerlend_core::{LoanStatus, LoanTerms};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn args(lender: Option<&str>, borrower: Option<&str>) -> SummaryArgs {
        SummaryArgs {
            input: None,
            store: None,
            lender: lender.map(str::to_string),
            borrower: borrower.map(str::to_string),
            basis: None,
            strict: false,
        }
    }

    fn loan(id: &str, lender: &str, borrower: &str) -> LoanRecord {
        LoanRecord {
            id: id.into(),
            borrower_id: borrower.into(),
            lender_id: lender.into(),
            borrower_name: None,
            lender_name: None,
            purpose: None,
            request_id: None,
            terms: LoanTerms::new(dec!(1000), dec!(10), 12).unwrap(),
            status: LoanStatus::Active,
            remaining_payments: 12,
            total_paid: Decimal::ZERO,
            next_payment_date: None,
            last_payment_date: None,
            created_at: Utc::now(),
            accepted_at: None,
        }
    }

    #[test]
    fn test_party_flags_filter_inline_loans() {
        let loans = vec![
            loan("1", "alice", "carol"),
            loan("2", "bob", "carol"),
            loan("3", "alice", "dave"),
        ];
        let pick = |a: &SummaryArgs| -> Vec<String> {
            let filter = a.party_filter();
            loans
                .iter()
                .filter(|l| filter.matches(l))
                .map(|l| l.id.clone())
                .collect()
        };

        assert_eq!(pick(&args(Some("alice"), None)), vec!["1", "3"]);
        assert_eq!(pick(&args(None, Some("carol"))), vec!["1", "2"]);
        assert_eq!(pick(&args(Some("alice"), Some("dave"))), vec!["3"]);
        assert_eq!(pick(&args(None, None)).len(), 3);
    }
}
