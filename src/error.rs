// Error kinds shared by the placement, reference-table and ledger layers.

use std::path::PathBuf;
use thiserror::Error;

use crate::quote::QuoteFailure;

/// One row a name selector matched when more than one did.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub name: String,
    pub set: String,
    pub url: String,
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({}) {}", self.index, self.name, self.set, self.url)
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid catalog number {value}: expected 1..={max}")]
    InvalidCatalogNumber { value: i64, max: u32 },

    #[error("catalog number {value} is outside the reference table (1..={max})")]
    CatalogNumberOutOfRange { value: u32, max: u32 },

    #[error("unknown name: {0}")]
    UnknownName(String),

    #[error("invalid slot {0}: expected 1..=9")]
    InvalidSlot(u8),

    #[error("quote unavailable for {identifier}: {reason}")]
    QuoteUnavailable {
        identifier: String,
        reason: QuoteFailure,
    },

    #[error("no record matches {0}")]
    RecordNotFound(String),

    #[error("{query} matches {} records; use an index", .candidates.len())]
    AmbiguousMatch {
        query: String,
        candidates: Vec<Candidate>,
    },

    #[error("failed to persist ledger {}: {source}", .path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger already exists: {}", .0.display())]
    LedgerExists(PathBuf),

    #[error("invalid reference table: {0}")]
    InvalidReferenceTable(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// Candidates carried by an ambiguous selector, empty for every other kind.
    pub fn candidates(&self) -> &[Candidate] {
        match self {
            LedgerError::AmbiguousMatch { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
