pub mod amortization;
pub mod config;
pub mod error;
pub mod loan;
pub mod time_value;
pub mod types;

#[cfg(feature = "portfolio")]
pub mod portfolio;

#[cfg(feature = "lifecycle")]
pub mod lifecycle;

#[cfg(feature = "store")]
pub mod store;

pub use config::LendingConfig;
pub use error::LendingError;
pub use loan::{LoanId, LoanRecord, LoanStatus, LoanTerms};
pub use types::*;

/// Standard result type for all lending operations
pub type LendingResult<T> = Result<T, LendingError>;
