pub mod amortization;
pub mod loans;
pub mod portfolio;

use clap::ValueEnum;
use peerlend_core::TotalPayableBasis;

/// Total-payable formula selectable from the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BasisArg {
    /// EMI x duration (borrower view)
    Emi,
    /// Principal plus monthly simple interest x duration (lender view)
    Simple,
}

impl From<BasisArg> for TotalPayableBasis {
    fn from(arg: BasisArg) -> Self {
        match arg {
            BasisArg::Emi => TotalPayableBasis::Emi,
            BasisArg::Simple => TotalPayableBasis::SimpleInterest,
        }
    }
}
