// 📒 Ledger Store - CSV-backed record collection
//
// Identity is the item url (primary key); names are a non-unique secondary
// index. The whole file is loaded at the start of an operation and every
// mutation rewrites it atomically:
//
//   1. build the next state from a copy of the rows
//   2. write it to a temporary sibling file, fsync
//   3. rename over the ledger
//   4. only then swap the next state into memory
//
// A failed write leaves the committed file and the in-memory rows untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dex::normalize_name;
use crate::entities::{Countable, LedgerRecord, PricedRecord};
use crate::error::{Candidate, LedgerError, Result};
use crate::grading::GradeAdvisor;
use crate::quote::{self, PriceQuoteSource};
use crate::refresh::{fetch_all, RefreshFailure, RefreshOptions, RefreshReport};

/// Only one ledger rewrite may be in flight per process.
static PERSIST_LOCK: Mutex<()> = Mutex::new(());

// ============================================================================
// SELECTORS & OUTCOMES
// ============================================================================

/// Picks ledger rows by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    Index(usize),
    Name(String),
}

impl Selector {
    /// All-digit input is an index, anything else a name.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<usize>() {
            Ok(index) => Selector::Index(index),
            Err(_) => Selector::Name(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Index(index) => write!(f, "index {}", index),
            Selector::Name(name) => write!(f, "name '{}'", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    Created { index: usize },
    Updated { index: usize },
}

impl UpsertOutcome {
    pub fn index(&self) -> usize {
        match self {
            UpsertOutcome::Created { index } | UpsertOutcome::Updated { index } => *index,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantityChange {
    /// Add one copy
    Increment,
    /// Set the owned count outright
    Set(u32),
}

// ============================================================================
// LEDGER STORE
// ============================================================================

#[derive(Debug, Clone)]
pub struct LedgerStore<R: LedgerRecord> {
    path: Option<PathBuf>,
    records: Vec<R>,
    by_url: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
}

impl<R: LedgerRecord> LedgerStore<R> {
    /// A ledger that lives only in memory.
    pub fn in_memory() -> Self {
        LedgerStore {
            path: None,
            records: Vec::new(),
            by_url: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Load a ledger file. A missing file is an empty ledger.
    pub fn open(path: &Path) -> Result<Self> {
        let mut store = Self::in_memory();
        store.path = Some(path.to_path_buf());

        if !path.exists() {
            debug!(path = %path.display(), kind = R::KIND, "ledger not found, starting empty");
            return Ok(store);
        }

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        for result in rdr.deserialize() {
            let mut record: R = result?;
            record.after_load()?;
            store.records.push(record);
        }

        store.reindex();
        debug!(path = %path.display(), kind = R::KIND, rows = store.len(), "ledger loaded");
        Ok(store)
    }

    /// Write a new, empty ledger holding only the header row.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(LedgerError::LedgerExists(path.to_path_buf()));
        }

        let mut store = Self::in_memory();
        store.path = Some(path.to_path_buf());
        store.persist()?;
        info!(path = %path.display(), kind = R::KIND, "created ledger");
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find_by_url(&self, url: &str) -> Option<(usize, &R)> {
        self.by_url
            .get(url.trim())
            .map(|&index| (index, &self.records[index]))
    }

    /// Every row whose name matches, case-insensitively.
    pub fn find_by_name(&self, name: &str) -> Vec<(usize, &R)> {
        self.by_name
            .get(&normalize_name(name))
            .map(|indexes| indexes.iter().map(|&i| (i, &self.records[i])).collect())
            .unwrap_or_default()
    }

    /// Resolve a selector to exactly one row index.
    pub fn locate(&self, selector: &Selector) -> Result<usize> {
        match selector {
            Selector::Index(index) => {
                if *index < self.records.len() {
                    Ok(*index)
                } else {
                    Err(LedgerError::RecordNotFound(selector.to_string()))
                }
            }
            Selector::Name(name) => {
                let matches = self.find_by_name(name);
                match matches.as_slice() {
                    [] => Err(LedgerError::RecordNotFound(selector.to_string())),
                    [(index, _)] => Ok(*index),
                    _ => Err(LedgerError::AmbiguousMatch {
                        query: name.clone(),
                        candidates: matches
                            .iter()
                            .map(|(index, record)| Candidate {
                                index: *index,
                                name: record.name().to_string(),
                                set: record.set_name().to_string(),
                                url: record.url().to_string(),
                            })
                            .collect(),
                    }),
                }
            }
        }
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Insert a record, or merge it into the row that has the same url.
    pub fn upsert(&mut self, record: R) -> Result<UpsertOutcome> {
        let mut next = self.records.clone();

        let outcome = match self.by_url.get(record.url().trim()) {
            Some(&index) => {
                next[index].merge_from(record);
                UpsertOutcome::Updated { index }
            }
            None => {
                next.push(record);
                UpsertOutcome::Created {
                    index: next.len() - 1,
                }
            }
        };

        self.commit(next)?;
        debug!(kind = R::KIND, ?outcome, "upsert committed");
        Ok(outcome)
    }

    /// Remove exactly one row. Ambiguous names are refused with the candidates.
    pub fn remove(&mut self, selector: &Selector) -> Result<R> {
        let index = self.locate(selector)?;

        let mut next = self.records.clone();
        let removed = next.remove(index);

        self.commit(next)?;
        info!(kind = R::KIND, index, url = %removed.url(), "removed record");
        Ok(removed)
    }

    /// Replace the row at `index` and upsert `record` in one commit.
    pub fn replace(&mut self, index: usize, record: R) -> Result<(R, UpsertOutcome)> {
        if index >= self.records.len() {
            return Err(LedgerError::RecordNotFound(Selector::Index(index).to_string()));
        }

        let mut next = self.records.clone();
        let replaced = next.remove(index);

        let existing = next
            .iter()
            .position(|r| r.url().trim() == record.url().trim());
        let outcome = match existing {
            Some(i) => {
                next[i].merge_from(record);
                UpsertOutcome::Updated { index: i }
            }
            None => {
                next.insert(index, record);
                UpsertOutcome::Created { index }
            }
        };

        self.commit(next)?;
        Ok((replaced, outcome))
    }

    /// Write the current rows back to the ledger file.
    pub fn persist(&self) -> Result<()> {
        match &self.path {
            Some(path) => write_ledger(path, &self.records),
            None => Ok(()),
        }
    }

    fn commit(&mut self, next: Vec<R>) -> Result<()> {
        if let Some(path) = &self.path {
            write_ledger(path, &next)?;
        }
        self.records = next;
        self.reindex();
        Ok(())
    }

    fn reindex(&mut self) {
        self.by_url.clear();
        self.by_name.clear();

        for (index, record) in self.records.iter().enumerate() {
            let url = record.url().trim().to_string();
            if self.by_url.contains_key(&url) {
                warn!(kind = R::KIND, index, url = %url, "duplicate url in ledger; first row wins");
            } else {
                self.by_url.insert(url, index);
            }

            self.by_name
                .entry(normalize_name(record.name()))
                .or_default()
                .push(index);
        }
    }
}

impl<R: Countable> LedgerStore<R> {
    /// Add one copy or set the owned count of the selected row.
    pub fn update_quantity(&mut self, selector: &Selector, change: QuantityChange) -> Result<u32> {
        let index = self.locate(selector)?;

        let mut next = self.records.clone();
        let quantity = match change {
            QuantityChange::Increment => next[index].quantity().saturating_add(1),
            QuantityChange::Set(quantity) => quantity,
        };
        next[index].set_quantity(quantity);

        self.commit(next)?;
        info!(kind = R::KIND, index, quantity, "quantity updated");
        Ok(quantity)
    }
}

impl<R: PricedRecord> LedgerStore<R> {
    /// Re-price one selected row. The quote failure is surfaced.
    pub fn refresh_one<S>(&mut self, selector: &Selector, source: &S, advisor: &GradeAdvisor) -> Result<&R>
    where
        S: PriceQuoteSource + ?Sized,
    {
        let index = self.locate(selector)?;
        let quote = quote::fetch(source, self.records[index].url())?;

        let mut next = self.records.clone();
        next[index].apply_quote(&quote, advisor);
        self.commit(next)?;

        Ok(&self.records[index])
    }

    /// Re-price every row. Per-row failures are collected, never fatal.
    ///
    /// Rows fetched before cancellation are applied and persisted; the rest
    /// are counted as skipped.
    pub fn bulk_refresh<S>(
        &mut self,
        source: &S,
        advisor: &GradeAdvisor,
        options: &RefreshOptions,
    ) -> Result<RefreshReport>
    where
        S: PriceQuoteSource + ?Sized,
    {
        let rows: Vec<(usize, String)> = self
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| (index, record.url().to_string()))
            .collect();

        let mut report = RefreshReport::new(R::KIND, rows.len());
        let outcomes = fetch_all(source, &rows, options);
        report.skipped = rows.len() - outcomes.len();

        let mut next = self.records.clone();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(quote) => {
                    next[index].apply_quote(&quote, advisor);
                    report.updated += 1;
                }
                Err(reason) => report.record_failure(RefreshFailure {
                    index,
                    name: next[index].name().to_string(),
                    identity: next[index].url().to_string(),
                    reason,
                }),
            }
        }

        if report.updated > 0 {
            self.commit(next)?;
        }

        info!(
            kind = R::KIND,
            updated = report.updated,
            failed = report.failed,
            skipped = report.skipped,
            "bulk refresh finished"
        );
        Ok(report)
    }
}

// ============================================================================
// ATOMIC WRITE
// ============================================================================

/// Temporary sibling used while rewriting `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ledger".to_string());
    path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}

fn encode_rows<R: LedgerRecord>(records: &[R]) -> std::io::Result<Vec<u8>> {
    let invalid = |e: csv::Error| std::io::Error::new(std::io::ErrorKind::InvalidData, e);

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    wtr.write_record(R::HEADERS).map_err(invalid)?;
    for record in records {
        wtr.serialize(record).map_err(invalid)?;
    }

    wtr.into_inner().map_err(|e| e.into_error())
}

fn write_ledger<R: LedgerRecord>(path: &Path, records: &[R]) -> Result<()> {
    let failure = |source: std::io::Error| LedgerError::PersistenceFailure {
        path: path.to_path_buf(),
        source,
    };

    let bytes = encode_rows(records).map_err(failure)?;

    let _guard = PERSIST_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let temp_path = temp_path_for(path);
    let mut file = fs::File::create(&temp_path).map_err(failure)?;

    let written = file
        .write_all(&bytes)
        .and_then(|_| file.sync_all())
        .and_then(|_| fs::rename(&temp_path, path));

    if let Err(source) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(failure(source));
    }

    debug!(path = %path.display(), rows = records.len(), "ledger written");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
