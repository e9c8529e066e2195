//! In-process implementations of the persistence seams.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::LendingError;
use crate::lifecycle::payment::PaymentLedgerEntry;
use crate::loan::{LoanId, LoanRecord};
use crate::store::repository::{LoanQuery, LoanRepository, PaymentLedger};
use crate::LendingResult;

fn poisoned(what: &str) -> LendingError {
    LendingError::Storage(format!("{what} lock poisoned"))
}

#[derive(Debug, Default)]
pub struct InMemoryLoanRepository {
    loans: RwLock<BTreeMap<LoanId, LoanRecord>>,
}

impl InMemoryLoanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records.
    pub fn with_loans(loans: impl IntoIterator<Item = LoanRecord>) -> Self {
        Self {
            loans: RwLock::new(loans.into_iter().map(|l| (l.id.clone(), l)).collect()),
        }
    }
}

impl LoanRepository for InMemoryLoanRepository {
    fn fetch(&self, id: &str) -> LendingResult<Option<LoanRecord>> {
        let loans = self.loans.read().map_err(|_| poisoned("loan"))?;
        Ok(loans.get(id).cloned())
    }

    fn query(&self, filter: &LoanQuery) -> LendingResult<Vec<LoanRecord>> {
        let loans = self.loans.read().map_err(|_| poisoned("loan"))?;
        Ok(loans.values().filter(|l| filter.matches(l)).cloned().collect())
    }

    fn upsert(&self, loan: &LoanRecord) -> LendingResult<()> {
        let mut loans = self.loans.write().map_err(|_| poisoned("loan"))?;
        loans.insert(loan.id.clone(), loan.clone());
        Ok(())
    }

    fn modify(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&LoanRecord) -> LendingResult<LoanRecord>,
    ) -> LendingResult<LoanRecord> {
        let mut loans = self.loans.write().map_err(|_| poisoned("loan"))?;
        let current = loans
            .get(id)
            .ok_or_else(|| LendingError::LoanNotFound(id.to_string()))?;
        let next = apply(current)?;
        loans.insert(id.to_string(), next.clone());
        Ok(next)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPaymentLedger {
    entries: RwLock<Vec<PaymentLedgerEntry>>,
}

impl InMemoryPaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PaymentLedger for InMemoryPaymentLedger {
    fn append(&self, entry: &PaymentLedgerEntry) -> LendingResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned("ledger"))?;
        entries.push(entry.clone());
        Ok(())
    }

    fn history(&self, loan_id: &str) -> LendingResult<Vec<PaymentLedgerEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned("ledger"))?;
        let mut history: Vec<PaymentLedgerEntry> = entries
            .iter()
            .filter(|e| e.loan_id == loan_id)
            .cloned()
            .collect();
        history.sort_by_key(|e| e.payment_number);
        Ok(history)
    }
}
