// 💵 Price Quotes - External price source boundary
//
// The ledger never scrapes anything itself. It asks a `PriceQuoteSource`
// for a snapshot and treats every failure as "quote unavailable".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::error::{LedgerError, Result};

/// Price row labels as they appear on the pricing site.
pub const LABEL_UNGRADED: &str = "Ungraded";
pub const LABEL_PSA10: &str = "PSA 10";
pub const LABEL_MARKET: &str = "Market";

// ============================================================================
// PRICE QUOTE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Item title as reported by the source
    pub title: Option<String>,

    /// Set name as reported by the source
    pub set_name: Option<String>,

    pub ungraded_price: Option<f64>,
    pub psa10_price: Option<f64>,
    pub market_price: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new() -> Self {
        PriceQuote {
            title: None,
            set_name: None,
            ungraded_price: None,
            psa10_price: None,
            market_price: None,
            fetched_at: Utc::now(),
        }
    }

    /// Builder pattern: add title and set
    pub fn with_item(mut self, title: &str, set_name: &str) -> Self {
        self.title = Some(title.to_string());
        self.set_name = Some(set_name.to_string());
        self
    }

    /// Builder pattern: add ungraded price
    pub fn with_ungraded(mut self, price: f64) -> Self {
        self.ungraded_price = Some(price);
        self
    }

    /// Builder pattern: add PSA 10 price
    pub fn with_psa10(mut self, price: f64) -> Self {
        self.psa10_price = Some(price);
        self
    }

    /// Builder pattern: add market price
    pub fn with_market(mut self, price: f64) -> Self {
        self.market_price = Some(price);
        self
    }

    /// Price a sealed product sells for: the explicit market price, or the
    /// loose/ungraded price when the source only lists that.
    pub fn product_price(&self) -> Option<f64> {
        self.market_price.or(self.ungraded_price)
    }

    /// Build a quote from scraped (label, price text) rows.
    pub fn from_labelled_prices(prices: &HashMap<String, String>) -> Self {
        let lookup = |label: &str| prices.get(label).and_then(|text| parse_price_text(text));

        PriceQuote {
            ungraded_price: lookup(LABEL_UNGRADED),
            psa10_price: lookup(LABEL_PSA10),
            market_price: lookup(LABEL_MARKET),
            ..PriceQuote::new()
        }
    }
}

impl Default for PriceQuote {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a displayed dollar amount such as `$1,234.50`.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum QuoteFailure {
    #[error("network failure: {0}")]
    Network(String),

    #[error("unparseable response: {0}")]
    Unparseable(String),

    #[error("item not found")]
    NotFound,
}

/// Anything that can price an item by url or search term.
///
/// Implementations must be shareable across refresh workers.
pub trait PriceQuoteSource: Send + Sync {
    fn fetch_quote(&self, identifier: &str) -> std::result::Result<PriceQuote, QuoteFailure>;
}

impl<S: PriceQuoteSource + ?Sized> PriceQuoteSource for &S {
    fn fetch_quote(&self, identifier: &str) -> std::result::Result<PriceQuote, QuoteFailure> {
        (**self).fetch_quote(identifier)
    }
}

impl<S: PriceQuoteSource + ?Sized> PriceQuoteSource for Box<S> {
    fn fetch_quote(&self, identifier: &str) -> std::result::Result<PriceQuote, QuoteFailure> {
        (**self).fetch_quote(identifier)
    }
}

/// Fetch and lift the failure into a `LedgerError`.
pub fn fetch<S: PriceQuoteSource + ?Sized>(source: &S, identifier: &str) -> Result<PriceQuote> {
    source
        .fetch_quote(identifier)
        .map_err(|reason| LedgerError::QuoteUnavailable {
            identifier: identifier.to_string(),
            reason,
        })
}

// ============================================================================
// STATIC SOURCE (snapshots, tests)
// ============================================================================

/// Deterministic source answering from a fixed table.
#[derive(Debug, Default)]
pub struct StaticQuoteSource {
    answers: HashMap<String, std::result::Result<PriceQuote, QuoteFailure>>,
    calls: AtomicUsize,
}

#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    set: Option<String>,
    #[serde(default)]
    prices: HashMap<String, String>,
    #[serde(default)]
    error: Option<QuoteFailure>,
}

impl StaticQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, identifier: &str, quote: PriceQuote) -> Self {
        self.answers.insert(identifier.to_string(), Ok(quote));
        self
    }

    pub fn with_failure(mut self, identifier: &str, failure: QuoteFailure) -> Self {
        self.answers.insert(identifier.to_string(), Err(failure));
        self
    }

    /// Load a JSON snapshot of scraped pages:
    ///
    /// ```json
    /// {
    ///   "https://example.com/card": {
    ///     "title": "Caterpie #10", "set": "Pokemon 151",
    ///     "prices": { "Ungraded": "$0.25", "PSA 10": "$45.00" }
    ///   },
    ///   "https://example.com/gone": { "error": "not_found" }
    /// }
    /// ```
    pub fn from_snapshot_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, SnapshotEntry> = serde_json::from_str(json)
            .map_err(|e| LedgerError::Config(format!("invalid quote snapshot: {}", e)))?;

        let mut source = StaticQuoteSource::new();
        for (identifier, entry) in entries {
            let answer = match entry.error {
                Some(failure) => Err(failure),
                None => {
                    let mut quote = PriceQuote::from_labelled_prices(&entry.prices);
                    quote.title = entry.title;
                    quote.set_name = entry.set;
                    Ok(quote)
                }
            };
            source.answers.insert(identifier, answer);
        }

        Ok(source)
    }

    pub fn from_snapshot_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_snapshot_json(&json)
    }

    /// How many fetches have been made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PriceQuoteSource for StaticQuoteSource {
    fn fetch_quote(&self, identifier: &str) -> std::result::Result<PriceQuote, QuoteFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(identifier.trim()) {
            Some(answer) => answer.clone(),
            None => Err(QuoteFailure::NotFound),
        }
    }
}

// ============================================================================
// THROTTLING
// ============================================================================

/// Waits a fixed delay before every fetch to stay polite to the price site.
pub struct Throttled<S> {
    inner: S,
    delay: Duration,
}

impl<S: PriceQuoteSource> Throttled<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Throttled { inner, delay }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: PriceQuoteSource> PriceQuoteSource for Throttled<S> {
    fn fetch_quote(&self, identifier: &str) -> std::result::Result<PriceQuote, QuoteFailure> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.fetch_quote(identifier)
    }
}
