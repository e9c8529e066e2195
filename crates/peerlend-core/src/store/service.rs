//! Loan operations over injected persistence.
//!
//! Every write to a loan happens while holding that loan's own mutex, so two
//! payments (or a payment and an acceptance) on one record never interleave.
//! Different loans do not contend. The read-modify-write itself goes through
//! [`LoanRepository::modify`], which a shared file store makes atomic across
//! processes as well.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LendingError;
use crate::lifecycle::payment::{record_payment, PaymentLedgerEntry, PaymentReceipt};
use crate::lifecycle::proposal::{self, LoanRequest, ProposalInput};
use crate::loan::{LoanId, LoanRecord};
use crate::portfolio::summary::{summarize_with, PortfolioSummary, SummaryOptions};
use crate::store::repository::{LoanQuery, LoanRepository, PaymentLedger};
use crate::LendingResult;

pub struct LendingService<R, L> {
    repository: R,
    ledger: L,
    locks: Mutex<HashMap<LoanId, Arc<Mutex<()>>>>,
}

impl<R: LoanRepository, L: PaymentLedger> LendingService<R, L> {
    pub fn new(repository: R, ledger: L) -> Self {
        Self {
            repository,
            ledger,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Run `f` holding the mutex for `loan_id`. The table entry is dropped
    /// again once no caller holds or waits on it, so the table only ever
    /// holds loans with an operation in flight.
    fn with_record_lock<T>(&self, loan_id: &str, f: impl FnOnce() -> LendingResult<T>) -> LendingResult<T> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| LendingError::Storage("loan lock table poisoned".into()))?;
            Arc::clone(locks.entry(loan_id.to_string()).or_default())
        };

        let out = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(LendingError::Storage(format!("lock for loan {loan_id} poisoned"))),
        };

        if let Ok(mut locks) = self.locks.lock() {
            drop(lock);
            if locks.get(loan_id).map_or(false, |l| Arc::strong_count(l) == 1) {
                locks.remove(loan_id);
            }
        }
        out
    }

    /// Store a new `proposed` record for `request` under a fresh id.
    pub fn submit_proposal(
        &self,
        request: &LoanRequest,
        offer: &ProposalInput,
        now: DateTime<Utc>,
    ) -> LendingResult<LoanRecord> {
        let id = Uuid::new_v4().to_string();
        let loan = proposal::submit_proposal(request, offer, id, now)?;
        self.repository.upsert(&loan)?;
        tracing::info!(
            loan_id = %loan.id,
            request_id = %request.id,
            lender_id = %offer.lender_id,
            "Proposal submitted"
        );
        Ok(loan)
    }

    /// Accept a proposal with one upsert. Safe to retry.
    pub fn accept_proposal(&self, loan_id: &str, now: DateTime<Utc>) -> LendingResult<LoanRecord> {
        self.with_record_lock(loan_id, || {
            let mut changed = false;
            let accepted = self.repository.modify(loan_id, &mut |current| {
                let next = proposal::accept_proposal(current, now)?;
                changed = next != *current;
                Ok(next)
            })?;
            if changed {
                tracing::info!(loan_id = %loan_id, status = %accepted.status, "Proposal accepted");
            } else {
                tracing::debug!(loan_id = %loan_id, "Proposal already accepted");
            }
            Ok(accepted)
        })
    }

    /// Take one installment on `loan_id`.
    ///
    /// The updated record is persisted before the ledger append. If the append
    /// fails the record stays advanced and `LedgerAppend` is returned.
    pub fn process_payment(&self, loan_id: &str, now: DateTime<Utc>) -> LendingResult<PaymentReceipt> {
        self.with_record_lock(loan_id, || {
            let mut receipt: Option<PaymentReceipt> = None;
            let updated = self.repository.modify(loan_id, &mut |current| {
                let r = record_payment(current, now)?;
                let next = r.loan.clone();
                receipt = Some(r);
                Ok(next)
            });
            if let Err(e) = updated {
                tracing::warn!(loan_id = %loan_id, error = %e, "Payment rejected");
                return Err(e);
            }
            let receipt = receipt.ok_or_else(|| {
                LendingError::Storage(format!("store returned no payment for loan {loan_id}"))
            })?;

            if let Err(e) = self.ledger.append(&receipt.entry) {
                tracing::error!(
                    loan_id = %loan_id,
                    payment_number = receipt.entry.payment_number,
                    error = %e,
                    "Ledger append failed after loan update"
                );
                return Err(LendingError::LedgerAppend {
                    loan_id: loan_id.to_string(),
                    payment_number: receipt.entry.payment_number,
                    reason: e.to_string(),
                });
            }

            tracing::info!(
                loan_id = %loan_id,
                payment_number = receipt.entry.payment_number,
                remaining = receipt.loan.remaining_payments,
                status = %receipt.loan.status,
                "Payment recorded"
            );
            Ok(receipt)
        })
    }

    pub fn loans(&self, filter: &LoanQuery) -> LendingResult<Vec<LoanRecord>> {
        self.repository.query(filter)
    }

    pub fn portfolio(&self, filter: &LoanQuery, options: &SummaryOptions) -> LendingResult<PortfolioSummary> {
        let loans = self.repository.query(filter)?;
        tracing::debug!(matched = loans.len(), "Summarising portfolio");
        summarize_with(&loans, options)
    }

    pub fn portfolio_for_lender(&self, lender_id: &str, options: &SummaryOptions) -> LendingResult<PortfolioSummary> {
        self.portfolio(&LoanQuery::for_lender(lender_id), options)
    }

    pub fn portfolio_for_borrower(
        &self,
        borrower_id: &str,
        options: &SummaryOptions,
    ) -> LendingResult<PortfolioSummary> {
        self.portfolio(&LoanQuery::for_borrower(borrower_id), options)
    }

    pub fn payment_history(&self, loan_id: &str) -> LendingResult<Vec<PaymentLedgerEntry>> {
        self.ledger.history(loan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{InMemoryLoanRepository, InMemoryPaymentLedger};
    use rust_decimal_macros::dec;

    fn service() -> LendingService<InMemoryLoanRepository, InMemoryPaymentLedger> {
        LendingService::new(InMemoryLoanRepository::new(), InMemoryPaymentLedger::new())
    }

    fn tracked(svc: &LendingService<InMemoryLoanRepository, InMemoryPaymentLedger>) -> usize {
        svc.locks.lock().unwrap().len()
    }

    #[test]
    fn test_lock_table_drained_after_operations() {
        let svc = service();
        let now = Utc::now();
        let request = LoanRequest {
            id: "req-9".into(),
            borrower_id: "b-9".into(),
            borrower_name: None,
            amount: dec!(900),
            purpose: "Medical".into(),
            created_at: now,
        };
        let offer = ProposalInput {
            lender_id: "l-9".into(),
            lender_name: None,
            annual_interest_rate_percent: dec!(6),
            duration_months: 3,
        };
        let loan = svc.submit_proposal(&request, &offer, now).unwrap();
        svc.accept_proposal(&loan.id, now).unwrap();
        svc.process_payment(&loan.id, now).unwrap();
        assert!(svc.process_payment("unknown-id", now).is_err());
        assert!(svc.accept_proposal("another-unknown", now).is_err());

        assert_eq!(tracked(&svc), 0);
    }

    #[test]
    fn test_lock_table_drained_under_contention() {
        let svc = service();
        let now = Utc::now();
        std::thread::scope(|scope| {
            for i in 0..16 {
                let svc = &svc;
                scope.spawn(move || {
                    let id = format!("missing-{}", i % 4);
                    let _ = svc.process_payment(&id, now);
                });
            }
        });
        assert_eq!(tracked(&svc), 0);
    }
}
