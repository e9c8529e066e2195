use thiserror::Error;

use crate::loan::LoanStatus;

#[derive(Debug, Error)]
pub enum LendingError {
    #[error("Invalid loan terms ({field}): {reason}")]
    InvalidLoanTerms { field: String, reason: String },

    #[error("Loan {loan_id} is already fully repaid")]
    LoanAlreadyCompleted { loan_id: String },

    #[error("Empty portfolio: no payable loans to average over")]
    EmptyPortfolio,

    #[error("Loan {loan_id} is not payable in status {status}")]
    LoanNotPayable { loan_id: String, status: LoanStatus },

    #[error("Cannot {action} loan {loan_id} from status {from}")]
    InvalidTransition {
        loan_id: String,
        from: LoanStatus,
        action: String,
    },

    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    #[error("Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Payment {payment_number} on loan {loan_id} was recorded but the ledger append failed: {reason}")]
    LedgerAppend {
        loan_id: String,
        payment_number: u32,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LendingError {
    fn from(e: serde_json::Error) -> Self {
        LendingError::SerializationError(e.to_string())
    }
}
