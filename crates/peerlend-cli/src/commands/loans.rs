use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use peerlend_core::amortization::emi;
use peerlend_core::lifecycle::proposal::{LoanRequest, ProposalInput};
use peerlend_core::store::{JsonFileStore, LendingService};
use peerlend_core::LendingConfig;

use crate::input;

type FileService = LendingService<Arc<JsonFileStore>, Arc<JsonFileStore>>;

/// Arguments for submitting a proposal
#[derive(Args)]
pub struct ProposeArgs {
    /// JSON store holding loans and the payment ledger
    #[arg(long)]
    pub store: Option<String>,

    /// JSON file with {"request": {...}, "proposal": {...}} (overrides flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Borrower request id
    #[arg(long)]
    pub request_id: Option<String>,

    #[arg(long)]
    pub borrower_id: Option<String>,

    #[arg(long)]
    pub borrower_name: Option<String>,

    /// Requested amount
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Purpose stated on the request
    #[arg(long)]
    pub purpose: Option<String>,

    #[arg(long)]
    pub lender_id: Option<String>,

    #[arg(long)]
    pub lender_name: Option<String>,

    /// Offered annual interest rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Offered duration in months
    #[arg(long, alias = "months")]
    pub duration: Option<u32>,

    /// Timestamp to record (RFC 3339, defaults to now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

/// Arguments for accepting a proposal
#[derive(Args)]
pub struct AcceptArgs {
    /// JSON store holding loans and the payment ledger
    #[arg(long)]
    pub store: Option<String>,

    /// Loan (proposal) id
    #[arg(long)]
    pub loan_id: String,

    /// Timestamp to record (RFC 3339, defaults to now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

/// Arguments for recording a payment
#[derive(Args)]
pub struct PayArgs {
    /// JSON store holding loans and the payment ledger
    #[arg(long)]
    pub store: Option<String>,

    /// Loan id
    #[arg(long)]
    pub loan_id: String,

    /// Timestamp to record (RFC 3339, defaults to now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

/// Arguments for listing a loan's payment ledger
#[derive(Args)]
pub struct HistoryArgs {
    /// JSON store holding loans and the payment ledger
    #[arg(long)]
    pub store: Option<String>,

    /// Loan id
    #[arg(long)]
    pub loan_id: String,
}

#[derive(Deserialize)]
struct ProposalFile {
    request: LoanRequest,
    proposal: ProposalInput,
}

fn open_service(store: Option<&str>, config: &LendingConfig) -> Result<FileService, Box<dyn std::error::Error>> {
    let path: PathBuf = match (store, config.store_path.as_ref()) {
        (Some(p), _) => p.into(),
        (None, Some(p)) => p.clone(),
        (None, None) => return Err("--store is required (or set store_path in the config)".into()),
    };
    tracing::debug!(path = %path.display(), "Opening loan store");
    let file = Arc::new(JsonFileStore::open(path)?);
    Ok(LendingService::new(Arc::clone(&file), file))
}

pub fn run_propose(args: ProposeArgs, config: &LendingConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let now = args.at.unwrap_or_else(Utc::now);
    let ProposalFile { request, proposal } = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        ProposalFile {
            request: LoanRequest {
                id: args.request_id.clone()
                    .ok_or("--request-id is required (or provide --input)")?,
                borrower_id: args.borrower_id.clone()
                    .ok_or("--borrower-id is required (or provide --input)")?,
                borrower_name: args.borrower_name.clone(),
                amount: args.amount
                    .ok_or("--amount is required (or provide --input)")?,
                purpose: args.purpose.clone()
                    .ok_or("--purpose is required (or provide --input)")?,
                created_at: now,
            },
            proposal: ProposalInput {
                lender_id: args.lender_id.clone()
                    .ok_or("--lender-id is required (or provide --input)")?,
                lender_name: args.lender_name.clone(),
                annual_interest_rate_percent: args.rate
                    .ok_or("--rate is required (or provide --input)")?,
                duration_months: args.duration
                    .ok_or("--duration is required (or provide --input)")?,
            },
        }
    };

    let service = open_service(args.store.as_deref(), config)?;
    let loan = service.submit_proposal(&request, &proposal, now)?;
    Ok(serde_json::to_value(loan)?)
}

pub fn run_accept(args: AcceptArgs, config: &LendingConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let service = open_service(args.store.as_deref(), config)?;
    let loan = service.accept_proposal(&args.loan_id, args.at.unwrap_or_else(Utc::now))?;
    Ok(serde_json::to_value(loan)?)
}

pub fn run_pay(args: PayArgs, config: &LendingConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let service = open_service(args.store.as_deref(), config)?;
    let receipt = service.process_payment(&args.loan_id, args.at.unwrap_or_else(Utc::now))?;
    let outstanding = emi::compute_outstanding_with(&receipt.loan, config.total_payable_basis)?;

    Ok(serde_json::json!({
        "loan_id": receipt.loan.id,
        "payment_number": receipt.entry.payment_number,
        "amount_paid": emi::round_display(receipt.entry.amount, config.display_scale),
        "remaining_payments": receipt.loan.remaining_payments,
        "status": receipt.loan.status,
        "next_payment_date": receipt.loan.next_payment_date,
        "outstanding": emi::round_display(outstanding, config.display_scale),
    }))
}

pub fn run_history(args: HistoryArgs, config: &LendingConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let service = open_service(args.store.as_deref(), config)?;
    let entries = service.payment_history(&args.loan_id)?;
    Ok(serde_json::to_value(entries)?)
}
