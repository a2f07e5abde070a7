// Binder Ledger - Core Library
// Exposes all modules for use in the CLI and tests

pub mod config;     // Ledger locations, grading thresholds, refresh pool
pub mod dex;        // Reference table: name ↔ catalog number
pub mod entities;   // Ledger row types (card, product, binder card)
pub mod error;
pub mod grading;    // Grade-or-not decision
pub mod ledger;     // CSV-backed store with atomic rewrites
pub mod placement;  // Catalog number → page/slot
pub mod quote;      // Price quote source seam
pub mod recorder;   // Use cases: add/update, place, locate
pub mod refresh;    // Bulk refresh worker pool

// Re-export commonly used types
pub use config::{LedgerConfig, RefreshConfig, DATA_DIR_ENV};
pub use dex::{normalize_name, DexEntry, DexTable, NameDexResolver};
pub use entities::{
    BinderCardRecord, CardRecord, Countable, LedgerRecord, PricedRecord, ProductRecord,
};
pub use error::{Candidate, LedgerError, Result};
pub use grading::{should_grade, GradeAdvisor, DEFAULT_GRADING_COST, DEFAULT_MULTIPLIER};
pub use ledger::{LedgerStore, QuantityChange, Selector, UpsertOutcome};
pub use placement::{slot_to_grid, DexPlacementCalculator, Placement, PAGE_SIZE};
pub use quote::{
    parse_price_text, PriceQuote, PriceQuoteSource, QuoteFailure, StaticQuoteSource, Throttled,
};
pub use recorder::{
    BinderRecorder, CollectionRecorder, PlacementOutcome, PlacementRequest, Recorded,
};
pub use refresh::{CancelToken, RefreshFailure, RefreshOptions, RefreshReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
