use chrono::{DateTime, Utc};
use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use peerlend_core::amortization::{emi, schedule};
use peerlend_core::lifecycle::{payment, proposal};
use peerlend_core::portfolio::summary;
use peerlend_core::{LoanRecord, TotalPayableBasis};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// A loan record plus an optional clock reading. Hosts pass `at` so that
/// repeated calls are reproducible; without it the current time is used.
#[derive(Deserialize)]
struct AtLoan {
    loan: LoanRecord,
    #[serde(default)]
    at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct OutstandingRequest {
    loan: LoanRecord,
    #[serde(default)]
    basis: TotalPayableBasis,
}

fn parse<T: for<'de> Deserialize<'de>>(input_json: &str) -> NapiResult<T> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_emi(input_json: String) -> NapiResult<String> {
    let input: emi::EmiInput = parse(&input_json)?;
    let output = emi::calculate_emi(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_schedule(input_json: String) -> NapiResult<String> {
    let input: schedule::ScheduleInput = parse(&input_json)?;
    let output = schedule::build_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compute_outstanding(input_json: String) -> NapiResult<String> {
    let request: OutstandingRequest = parse(&input_json)?;
    let outstanding =
        emi::compute_outstanding_with(&request.loan, request.basis).map_err(to_napi_error)?;
    serde_json::to_string(&serde_json::json!({
        "loan_id": request.loan.id,
        "basis": request.basis,
        "outstanding": outstanding,
    }))
    .map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[napi]
pub fn summarize(input_json: String) -> NapiResult<String> {
    let input: summary::PortfolioInput = parse(&input_json)?;
    let output = summary::calculate_portfolio_summary(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[napi]
pub fn accept_proposal(input_json: String) -> NapiResult<String> {
    let request: AtLoan = parse(&input_json)?;
    let now = request.at.unwrap_or_else(Utc::now);
    let accepted = proposal::accept_proposal(&request.loan, now).map_err(to_napi_error)?;
    serde_json::to_string(&accepted).map_err(to_napi_error)
}

#[napi]
pub fn record_payment(input_json: String) -> NapiResult<String> {
    let request: AtLoan = parse(&input_json)?;
    let now = request.at.unwrap_or_else(Utc::now);
    let receipt = payment::record_payment(&request.loan, now).map_err(to_napi_error)?;
    serde_json::to_string(&receipt).map_err(to_napi_error)
}
