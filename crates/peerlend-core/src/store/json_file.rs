//! Single-file JSON store holding both loans and ledger entries.
//!
//! Nothing is cached between calls. Every operation takes an advisory lock on
//! a `<file>.lock` sibling, reads the document from disk, and (for writes)
//! replaces it through a temporary file and a rename before releasing the
//! lock. Separate handles, threads or `plend` processes sharing one file are
//! therefore serialised and always work on the latest document.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::lifecycle::payment::PaymentLedgerEntry;
use crate::loan::{LoanId, LoanRecord};
use crate::store::repository::{LoanQuery, LoanRepository, PaymentLedger};
use crate::LendingResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub loans: BTreeMap<LoanId, LoanRecord>,
    #[serde(default)]
    pub ledger: Vec<PaymentLedgerEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

fn storage_err(action: &str, path: &Path, e: std::io::Error) -> LendingError {
    LendingError::Storage(format!("Failed to {} '{}': {}", action, path.display(), e))
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("store"));
    name.push(suffix);
    path.with_file_name(name)
}

impl JsonFileStore {
    /// Open `path`, starting from an empty document if it does not exist yet.
    /// An unreadable or malformed file is reported here rather than on first use.
    pub fn open(path: impl Into<PathBuf>) -> LendingResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| storage_err("create", parent, e))?;
            }
        }
        let store = Self {
            lock_path: sibling(&path, ".lock"),
            path,
        };
        store.read(|_| Ok(()))?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the document as currently on disk.
    pub fn snapshot(&self) -> LendingResult<StoreDocument> {
        self.read(|doc| Ok(doc.clone()))
    }

    fn with_lock<T>(&self, mode: LockMode, f: impl FnOnce() -> LendingResult<T>) -> LendingResult<T> {
        let lock: File = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| storage_err("open lock", &self.lock_path, e))?;

        match mode {
            LockMode::Shared => FileExt::lock_shared(&lock),
            LockMode::Exclusive => FileExt::lock_exclusive(&lock),
        }
        .map_err(|e| storage_err("lock", &self.lock_path, e))?;

        let out = f();
        if let Err(e) = FileExt::unlock(&lock) {
            tracing::warn!(path = %self.lock_path.display(), error = %e, "Failed to release store lock");
        }
        out
    }

    fn load(&self) -> LendingResult<StoreDocument> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let contents =
            fs::read_to_string(&self.path).map_err(|e| storage_err("read", &self.path, e))?;
        if contents.trim().is_empty() {
            return Ok(StoreDocument::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn persist(&self, document: &StoreDocument) -> LendingResult<()> {
        let body = serde_json::to_string_pretty(document)?;
        let tmp = sibling(&self.path, ".tmp");
        fs::write(&tmp, body).map_err(|e| storage_err("write", &tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_err("replace", &self.path, e))
    }

    fn read<T>(&self, f: impl FnOnce(&StoreDocument) -> LendingResult<T>) -> LendingResult<T> {
        self.with_lock(LockMode::Shared, || f(&self.load()?))
    }

    /// Exclusive read-modify-write of the whole document. Nothing is written
    /// when `f` fails.
    fn write<T>(&self, f: impl FnOnce(&mut StoreDocument) -> LendingResult<T>) -> LendingResult<T> {
        self.with_lock(LockMode::Exclusive, || {
            let mut doc = self.load()?;
            let out = f(&mut doc)?;
            self.persist(&doc)?;
            Ok(out)
        })
    }
}

impl LoanRepository for JsonFileStore {
    fn fetch(&self, id: &str) -> LendingResult<Option<LoanRecord>> {
        self.read(|doc| Ok(doc.loans.get(id).cloned()))
    }

    fn query(&self, filter: &LoanQuery) -> LendingResult<Vec<LoanRecord>> {
        self.read(|doc| {
            Ok(doc
                .loans
                .values()
                .filter(|l| filter.matches(l))
                .cloned()
                .collect())
        })
    }

    fn upsert(&self, loan: &LoanRecord) -> LendingResult<()> {
        self.write(|doc| {
            doc.loans.insert(loan.id.clone(), loan.clone());
            Ok(())
        })
    }

    fn modify(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&LoanRecord) -> LendingResult<LoanRecord>,
    ) -> LendingResult<LoanRecord> {
        self.write(|doc| {
            let current = doc
                .loans
                .get(id)
                .ok_or_else(|| LendingError::LoanNotFound(id.to_string()))?;
            let next = apply(current)?;
            doc.loans.insert(id.to_string(), next.clone());
            Ok(next)
        })
    }
}

impl PaymentLedger for JsonFileStore {
    fn append(&self, entry: &PaymentLedgerEntry) -> LendingResult<()> {
        self.write(|doc| {
            doc.ledger.push(entry.clone());
            Ok(())
        })
    }

    fn history(&self, loan_id: &str) -> LendingResult<Vec<PaymentLedgerEntry>> {
        self.read(|doc| {
            let mut history: Vec<PaymentLedgerEntry> = doc
                .ledger
                .iter()
                .filter(|e| e.loan_id == loan_id)
                .cloned()
                .collect();
            history.sort_by_key(|e| e.payment_number);
            Ok(history)
        })
    }
}
