// 🔄 Bulk Refresh - Re-price every ledger row with partial-failure tolerance
//
// Each row is fetched independently by a bounded pool of scoped workers.
// A failed fetch is recorded and the pass moves on; cancellation stops
// workers from claiming new rows, and unclaimed rows are reported as skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::{debug, warn};

use crate::quote::{PriceQuote, PriceQuoteSource, QuoteFailure};

// ============================================================================
// OPTIONS
// ============================================================================

/// Shared flag that stops a refresh pass at row granularity.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Upper bound on concurrent fetches (default: 4)
    pub workers: usize,

    pub cancel: CancelToken,
}

impl RefreshOptions {
    pub fn new() -> Self {
        RefreshOptions {
            workers: 4,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_workers(workers: usize) -> Self {
        RefreshOptions {
            workers,
            ..Self::new()
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// REFRESH REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshFailure {
    pub index: usize,
    pub name: String,
    /// Row identity (its url)
    pub identity: String,
    pub reason: QuoteFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshReport {
    pub kind: String,
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
    /// Rows never fetched because the pass was cancelled
    pub skipped: usize,
    pub failures: Vec<RefreshFailure>,
    pub refreshed_at: DateTime<Utc>,
}

impl RefreshReport {
    pub fn new(kind: &str, total: usize) -> Self {
        RefreshReport {
            kind: kind.to_string(),
            total,
            updated: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
            refreshed_at: Utc::now(),
        }
    }

    pub fn record_failure(&mut self, failure: RefreshFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "Refreshed {} {} rows: {} updated, {} failed, {} skipped",
            self.total, self.kind, self.updated, self.failed, self.skipped
        )
    }
}

// ============================================================================
// WORKER POOL
// ============================================================================

pub type FetchOutcome = (usize, Result<PriceQuote, QuoteFailure>);

/// Fetch a quote for every `(row index, url)` pair.
///
/// Returns outcomes sorted by row index. Rows not claimed before
/// cancellation are absent.
pub fn fetch_all<S>(source: &S, rows: &[(usize, String)], options: &RefreshOptions) -> Vec<FetchOutcome>
where
    S: PriceQuoteSource + ?Sized,
{
    if rows.is_empty() {
        return Vec::new();
    }

    let workers = options.workers.clamp(1, rows.len());
    let next_row = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<FetchOutcome>();

    thread::scope(|scope| {
        for worker in 0..workers {
            let tx = tx.clone();
            let next_row = &next_row;
            let cancel = &options.cancel;

            scope.spawn(move || loop {
                if cancel.is_cancelled() {
                    debug!(worker, "refresh cancelled");
                    break;
                }

                let claimed = next_row.fetch_add(1, Ordering::SeqCst);
                let Some((index, url)) = rows.get(claimed) else {
                    break;
                };

                let result = source.fetch_quote(url);
                match &result {
                    Ok(_) => debug!(worker, index, url = %url, "quote fetched"),
                    Err(reason) => warn!(worker, index, url = %url, %reason, "quote unavailable"),
                }

                if tx.send((*index, result)).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    let mut outcomes: Vec<FetchOutcome> = rx.into_iter().collect();
    outcomes.sort_by_key(|(index, _)| *index);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::StaticQuoteSource;

    fn rows(urls: &[&str]) -> Vec<(usize, String)> {
        urls.iter().enumerate().map(|(i, u)| (i, u.to_string())).collect()
    }

    #[test]
    fn test_fetch_all_keeps_row_order() {
        let source = StaticQuoteSource::new()
            .with_quote("a", PriceQuote::new().with_ungraded(1.0))
            .with_quote("c", PriceQuote::new().with_ungraded(3.0));

        let outcomes = fetch_all(&source, &rows(&["a", "b", "c"]), &RefreshOptions::with_workers(3));

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].0, 0);
        assert!(outcomes[0].1.is_ok());
        assert_eq!(outcomes[1].1, Err(QuoteFailure::NotFound));
        assert_eq!(outcomes[2].1.as_ref().unwrap().ungraded_price, Some(3.0));
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn test_zero_workers_still_makes_progress() {
        let source = StaticQuoteSource::new().with_quote("a", PriceQuote::new());

        let outcomes = fetch_all(&source, &rows(&["a", "a"]), &RefreshOptions::with_workers(0));

        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn test_cancelled_before_start_fetches_nothing() {
        let source = StaticQuoteSource::new().with_quote("a", PriceQuote::new());
        let cancel = CancelToken::new();
        cancel.cancel();

        let options = RefreshOptions::with_workers(2).with_cancel(cancel);
        let outcomes = fetch_all(&source, &rows(&["a", "a", "a"]), &options);

        assert!(outcomes.is_empty());
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_report_summary() {
        let mut report = RefreshReport::new("card", 2);
        report.updated = 1;
        report.record_failure(RefreshFailure {
            index: 1,
            name: "Caterpie #10".to_string(),
            identity: "https://c".to_string(),
            reason: QuoteFailure::NotFound,
        });

        assert!(!report.is_clean());
        assert_eq!(report.failed, 1);
        assert_eq!(
            report.summary(),
            "Refreshed 2 card rows: 1 updated, 1 failed, 0 skipped"
        );
    }
}
