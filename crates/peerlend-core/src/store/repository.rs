use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::lifecycle::payment::PaymentLedgerEntry;
use crate::loan::{LoanRecord, LoanStatus};
use crate::LendingResult;

/// Filter for loan queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrower_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LoanStatus>,
}

impl LoanQuery {
    pub fn for_borrower(borrower_id: impl Into<String>) -> Self {
        Self {
            borrower_id: Some(borrower_id.into()),
            ..Default::default()
        }
    }

    pub fn for_lender(lender_id: impl Into<String>) -> Self {
        Self {
            lender_id: Some(lender_id.into()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: LoanStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, loan: &LoanRecord) -> bool {
        self.borrower_id
            .as_deref()
            .map_or(true, |id| loan.borrower_id == id)
            && self
                .lender_id
                .as_deref()
                .map_or(true, |id| loan.lender_id == id)
            && self.status.map_or(true, |s| loan.status == s)
    }
}

/// Loan documents in the hosted store. Records are read and written whole.
pub trait LoanRepository: Send + Sync {
    fn fetch(&self, id: &str) -> LendingResult<Option<LoanRecord>>;
    fn query(&self, filter: &LoanQuery) -> LendingResult<Vec<LoanRecord>>;
    /// Insert or replace the record with `loan.id`.
    fn upsert(&self, loan: &LoanRecord) -> LendingResult<()>;

    /// Replace record `id` with `apply(current)` as one step. Nothing is
    /// written when `apply` fails.
    ///
    /// The default is a plain fetch then upsert, atomic only under the
    /// caller's own locking. Stores shared between processes override it to
    /// hold their lock across the read and the write.
    fn modify(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&LoanRecord) -> LendingResult<LoanRecord>,
    ) -> LendingResult<LoanRecord> {
        let current = self
            .fetch(id)?
            .ok_or_else(|| LendingError::LoanNotFound(id.to_string()))?;
        let next = apply(&current)?;
        if next != current {
            self.upsert(&next)?;
        }
        Ok(next)
    }
}

/// Append-only audit trail of installments.
pub trait PaymentLedger: Send + Sync {
    fn append(&self, entry: &PaymentLedgerEntry) -> LendingResult<()>;
    /// Entries for one loan in payment order.
    fn history(&self, loan_id: &str) -> LendingResult<Vec<PaymentLedgerEntry>>;
}

impl<T: LoanRepository + ?Sized> LoanRepository for Arc<T> {
    fn fetch(&self, id: &str) -> LendingResult<Option<LoanRecord>> {
        (**self).fetch(id)
    }

    fn query(&self, filter: &LoanQuery) -> LendingResult<Vec<LoanRecord>> {
        (**self).query(filter)
    }

    fn upsert(&self, loan: &LoanRecord) -> LendingResult<()> {
        (**self).upsert(loan)
    }

    fn modify(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&LoanRecord) -> LendingResult<LoanRecord>,
    ) -> LendingResult<LoanRecord> {
        (**self).modify(id, apply)
    }
}

impl<T: PaymentLedger + ?Sized> PaymentLedger for Arc<T> {
    fn append(&self, entry: &PaymentLedgerEntry) -> LendingResult<()> {
        (**self).append(entry)
    }

    fn history(&self, loan_id: &str) -> LendingResult<Vec<PaymentLedgerEntry>> {
        (**self).history(loan_id)
    }
}
