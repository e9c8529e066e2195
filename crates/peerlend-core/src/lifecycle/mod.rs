pub mod payment;
pub mod proposal;
