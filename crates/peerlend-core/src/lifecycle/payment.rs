//! One-installment state transition for a loan record.
//!
//! [`record_payment`] never mutates its input: on success it returns the
//! advanced record together with the ledger entry the caller must persist,
//! and on failure the caller still holds the untouched original.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amortization::emi::compute_emi_for;
use crate::error::LendingError;
use crate::loan::{LoanId, LoanRecord, LoanStatus};
use crate::time_value::add_months;
use crate::types::Money;
use crate::LendingResult;

/// Audit row appended to the payment ledger for every installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLedgerEntry {
    pub loan_id: LoanId,
    pub borrower_id: String,
    pub lender_id: String,
    /// 1-based installment number.
    pub payment_number: u32,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
    pub remaining_payments: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub loan: LoanRecord,
    pub entry: PaymentLedgerEntry,
}

/// Advance `loan` by exactly one installment paid at `now`.
pub fn record_payment(loan: &LoanRecord, now: DateTime<Utc>) -> LendingResult<PaymentReceipt> {
    if loan.remaining_payments == 0 || loan.status == LoanStatus::Completed {
        return Err(LendingError::LoanAlreadyCompleted {
            loan_id: loan.id.clone(),
        });
    }
    if !loan.status.is_payable() {
        return Err(LendingError::LoanNotPayable {
            loan_id: loan.id.clone(),
            status: loan.status,
        });
    }
    if loan.remaining_payments > loan.terms.duration_months {
        return Err(LendingError::InvalidLoanTerms {
            field: "remaining_payments".into(),
            reason: format!(
                "{} remaining exceeds duration of {} months",
                loan.remaining_payments, loan.terms.duration_months
            ),
        });
    }

    let emi = compute_emi_for(&loan.terms)?;
    let today = now.date_naive();

    let mut next = loan.clone();
    next.total_paid += emi;
    next.remaining_payments -= 1;
    next.last_payment_date = Some(today);
    next.next_payment_date = Some(add_months(today, 1)?);
    next.status = if next.remaining_payments == 0 {
        LoanStatus::Completed
    } else {
        LoanStatus::Active
    };

    let entry = PaymentLedgerEntry {
        loan_id: next.id.clone(),
        borrower_id: next.borrower_id.clone(),
        lender_id: next.lender_id.clone(),
        payment_number: next.terms.duration_months - next.remaining_payments,
        amount: emi,
        paid_at: now,
        remaining_payments: next.remaining_payments,
    };

    Ok(PaymentReceipt { loan: next, entry })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::LoanTerms;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn active_loan(months: u32) -> LoanRecord {
        LoanRecord {
            id: "loan-7".into(),
            borrower_id: "b-7".into(),
            lender_id: "l-7".into(),
            borrower_name: None,
            lender_name: None,
            purpose: Some("Home Renovation".into()),
            request_id: None,
            terms: LoanTerms::new(dec!(3000), dec!(0), months).unwrap(),
            status: LoanStatus::Active,
            remaining_payments: months,
            total_paid: Decimal::ZERO,
            next_payment_date: None,
            last_payment_date: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            accepted_at: None,
        }
    }

    #[test]
    fn test_single_payment_effects() {
        let loan = active_loan(3);
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let receipt = record_payment(&loan, now).unwrap();

        assert_eq!(receipt.loan.total_paid, dec!(1000));
        assert_eq!(receipt.loan.remaining_payments, 2);
        assert_eq!(receipt.loan.status, LoanStatus::Active);
        assert_eq!(receipt.loan.last_payment_date, NaiveDate::from_ymd_opt(2024, 3, 10));
        assert_eq!(receipt.loan.next_payment_date, NaiveDate::from_ymd_opt(2024, 4, 10));
        assert_eq!(receipt.entry.payment_number, 1);
        assert_eq!(receipt.entry.amount, dec!(1000));
        assert_eq!(receipt.entry.paid_at, now);
        // input untouched
        assert_eq!(loan.remaining_payments, 3);
    }

    #[test]
    fn test_final_payment_completes() {
        let mut loan = active_loan(1);
        loan.status = LoanStatus::Accepted;
        let receipt = record_payment(&loan, Utc::now()).unwrap();
        assert_eq!(receipt.loan.status, LoanStatus::Completed);
        assert_eq!(receipt.loan.remaining_payments, 0);
    }

    #[test]
    fn test_completed_loan_rejected() {
        let mut loan = active_loan(3);
        loan.remaining_payments = 0;
        loan.status = LoanStatus::Completed;
        let err = record_payment(&loan, Utc::now()).unwrap_err();
        assert!(matches!(err, LendingError::LoanAlreadyCompleted { .. }));
    }

    #[test]
    fn test_proposed_loan_not_payable() {
        let mut loan = active_loan(3);
        loan.status = LoanStatus::Proposed;
        let err = record_payment(&loan, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            LendingError::LoanNotPayable {
                status: LoanStatus::Proposed,
                ..
            }
        ));
    }

    #[test]
    fn test_remaining_above_duration_rejected() {
        let mut loan = active_loan(3);
        loan.remaining_payments = 4;
        assert!(record_payment(&loan, Utc::now()).is_err());
    }
}
