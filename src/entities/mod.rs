// Ledger record types
//
// Every ledger row has:
// - Stable identity: the item url (primary key)
// - A display name (non-unique secondary lookup)
// - Values that upserts and refreshes overwrite in place

pub mod binder;
pub mod card;
pub mod product;

pub use binder::BinderCardRecord;
pub use card::CardRecord;
pub use product::ProductRecord;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::grading::GradeAdvisor;
use crate::quote::PriceQuote;

/// A row a `LedgerStore` can hold.
pub trait LedgerRecord: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Column order of the persisted file.
    const HEADERS: &'static [&'static str];

    /// Short label used in logs and reports ("card", "product", ...).
    const KIND: &'static str;

    fn url(&self) -> &str;

    fn name(&self) -> &str;

    fn set_name(&self) -> &str;

    /// Fold an incoming version of the same item into this one.
    fn merge_from(&mut self, incoming: Self);

    /// Recompute derived fields after a row is read.
    fn after_load(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Records that carry prices from a `PriceQuoteSource`.
pub trait PricedRecord: LedgerRecord {
    /// Overwrite this row's priced fields from a fresh quote.
    fn apply_quote(&mut self, quote: &PriceQuote, advisor: &GradeAdvisor);
}

/// Records that track how many copies are owned.
pub trait Countable: LedgerRecord {
    fn quantity(&self) -> u32;

    fn set_quantity(&mut self, quantity: u32);
}

/// `Yes`/`No` flag columns.
///
/// Reads `y`, `yes`, `yup`, `true` and `1` (any case) as true.
pub mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(text: &str) -> bool {
        matches!(
            text.trim().to_lowercase().as_str(),
            "y" | "yes" | "yup" | "true" | "1"
        )
    }

    pub fn serialize<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *flag { "Yes" } else { "No" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(parse(&text))
    }
}
