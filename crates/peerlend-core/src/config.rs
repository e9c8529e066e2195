//! Policy knobs shared by the CLI and bindings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::TotalPayableBasis;

/// What an average over zero payable loans evaluates to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPortfolioPolicy {
    /// Report an average rate of 0.
    #[default]
    Zero,
    /// Fail with `EmptyPortfolio`.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LendingConfig {
    /// Formula behind outstanding balances.
    pub total_payable_basis: TotalPayableBasis,
    pub empty_portfolio: EmptyPortfolioPolicy,
    /// Decimal places for displayed amounts.
    pub display_scale: u32,
    /// JSON document holding loans and ledger entries.
    pub store_path: Option<PathBuf>,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            total_payable_basis: TotalPayableBasis::Emi,
            empty_portfolio: EmptyPortfolioPolicy::Zero,
            display_scale: 2,
            store_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: LendingConfig =
            serde_json::from_str(r#"{"empty_portfolio": "error"}"#).unwrap();
        assert_eq!(cfg.empty_portfolio, EmptyPortfolioPolicy::Error);
        assert_eq!(cfg.total_payable_basis, TotalPayableBasis::Emi);
        assert_eq!(cfg.display_scale, 2);
        assert!(cfg.store_path.is_none());
    }
}
