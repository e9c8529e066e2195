//! Persistence seams and the service that serialises writes per loan.

pub mod json_file;
pub mod memory;
pub mod repository;
pub mod service;

pub use json_file::JsonFileStore;
pub use memory::{InMemoryLoanRepository, InMemoryPaymentLedger};
pub use repository::{LoanQuery, LoanRepository, PaymentLedger};
pub use service::LendingService;
