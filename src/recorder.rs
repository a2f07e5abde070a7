// 🧭 Recorders - Use-case orchestration over the ledger
//
// CollectionRecorder: fetch quote → grade decision → upsert (cards, products)
// BinderRecorder:     resolve name/number → placement → upsert (binder)
//
// Recorders hold no state of their own; every call works on the ledger it
// is handed and the ledger persists each mutation.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::dex::{DexEntry, DexTable, NameDexResolver};
use crate::entities::{BinderCardRecord, CardRecord, LedgerRecord, ProductRecord};
use crate::error::{LedgerError, Result};
use crate::grading::GradeAdvisor;
use crate::ledger::{LedgerStore, UpsertOutcome};
use crate::placement::Placement;
use crate::quote::{self, PriceQuoteSource};

/// A record as committed, with how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded<R> {
    pub outcome: UpsertOutcome,
    pub record: R,
}

fn committed<R: LedgerRecord>(store: &LedgerStore<R>, outcome: UpsertOutcome) -> Result<Recorded<R>> {
    let record = store
        .get(outcome.index())
        .cloned()
        .ok_or_else(|| LedgerError::RecordNotFound(format!("index {}", outcome.index())))?;
    Ok(Recorded { outcome, record })
}

// ============================================================================
// COLLECTION RECORDER
// ============================================================================

pub struct CollectionRecorder<'a, S: PriceQuoteSource + ?Sized> {
    source: &'a S,
    advisor: GradeAdvisor,
}

impl<'a, S: PriceQuoteSource + ?Sized> CollectionRecorder<'a, S> {
    pub fn new(source: &'a S, advisor: GradeAdvisor) -> Self {
        CollectionRecorder { source, advisor }
    }

    pub fn advisor(&self) -> &GradeAdvisor {
        &self.advisor
    }

    /// Price a card by url and record it.
    ///
    /// `quantity` of `None` keeps the owned count of an existing row
    /// (new rows start at 1).
    pub fn add_or_update(
        &self,
        store: &mut LedgerStore<CardRecord>,
        url: &str,
        quantity: Option<u32>,
    ) -> Result<Recorded<CardRecord>> {
        let url = url.trim();
        let quote = quote::fetch(self.source, url)?;

        let mut record = CardRecord::from_quote(url, &quote, &self.advisor);
        let existing = store.find_by_url(url).map(|(_, r)| r.quantity);
        record.quantity = quantity.or(existing).unwrap_or(1);

        let outcome = store.upsert(record)?;
        let recorded = committed(store, outcome)?;

        info!(
            url,
            created = outcome.is_created(),
            psa10 = ?recorded.record.psa10_price,
            grade = recorded.record.grade_flag,
            "card recorded"
        );
        Ok(recorded)
    }

    /// Price a sealed product by url and record what was paid and how many
    /// are owned.
    ///
    /// `quantity` of `None` keeps the owned count of an existing row
    /// (new rows start at 1).
    pub fn add_or_update_product(
        &self,
        store: &mut LedgerStore<ProductRecord>,
        url: &str,
        msrp: f64,
        quantity: Option<u32>,
    ) -> Result<Recorded<ProductRecord>> {
        let url = url.trim();
        let quote = quote::fetch(self.source, url)?;

        let existing = store.find_by_url(url).map(|(_, r)| r.quantity);
        let quantity = quantity.or(existing).unwrap_or(1);
        let record = ProductRecord::from_quote(url, &quote, msrp, quantity);
        let outcome = store.upsert(record)?;
        let recorded = committed(store, outcome)?;

        info!(
            url,
            created = outcome.is_created(),
            market = ?recorded.record.market_price,
            "product recorded"
        );
        Ok(recorded)
    }
}

// ============================================================================
// BINDER RECORDER
// ============================================================================

/// Everything needed to slot one card into the binder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRequest {
    /// Species name or catalog number
    pub name_or_number: String,
    pub set: String,
    pub foil_flag: bool,
    pub full_art_flag: bool,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOutcome {
    pub outcome: UpsertOutcome,
    pub record: BinderCardRecord,
    /// Card that previously held the same slot
    pub replaced: Option<BinderCardRecord>,
}

impl PlacementOutcome {
    pub fn placement(&self) -> Placement {
        self.record.placement()
    }
}

pub struct BinderRecorder {
    dex: Arc<DexTable>,
}

impl BinderRecorder {
    pub fn new(dex: Arc<DexTable>) -> Self {
        BinderRecorder { dex }
    }

    pub fn dex(&self) -> &DexTable {
        &self.dex
    }

    /// Reference lookup with placement, regardless of binder contents.
    pub fn lookup(&self, name_or_number: &str) -> Result<(DexEntry, Placement)> {
        let entry = self.dex.resolve(name_or_number)?;
        let placement = self.dex.calculator().compute(entry.catalog_num)?;
        Ok((entry, placement))
    }

    /// Resolve, place and record a card.
    ///
    /// The binder holds one card per catalog number; a different card
    /// already in that slot is replaced in the same commit.
    pub fn place(
        &self,
        store: &mut LedgerStore<BinderCardRecord>,
        request: &PlacementRequest,
    ) -> Result<PlacementOutcome> {
        let (entry, placement) = self.lookup(&request.name_or_number)?;
        let url = request.url.trim();

        let record = BinderCardRecord::new(
            &entry.canonical_name,
            entry.catalog_num,
            request.set.trim(),
            request.foil_flag,
            request.full_art_flag,
            url,
            placement,
        );

        let occupant = store
            .records()
            .iter()
            .position(|r| r.catalog_num == entry.catalog_num && r.url.trim() != url);

        let (outcome, replaced) = match occupant {
            Some(index) => {
                let (replaced, outcome) = store.replace(index, record)?;
                (outcome, Some(replaced))
            }
            None => (store.upsert(record)?, None),
        };

        let record = committed(store, outcome)?.record;
        info!(
            name = %record.pokemon_name,
            catalog_num = record.catalog_num,
            page = record.page_number,
            slot = record.slot_index,
            replaced = replaced.is_some(),
            "binder card placed"
        );

        Ok(PlacementOutcome {
            outcome,
            record,
            replaced,
        })
    }

    /// Find an owned binder card by name or catalog number.
    pub fn locate<'s>(
        &self,
        store: &'s LedgerStore<BinderCardRecord>,
        name_or_number: &str,
    ) -> Result<(usize, &'s BinderCardRecord)> {
        let query = name_or_number.trim();

        let found = match query.parse::<u32>() {
            Ok(num) => store
                .records()
                .iter()
                .enumerate()
                .find(|(_, r)| r.catalog_num == num),
            Err(_) => store.find_by_name(query).into_iter().next(),
        };

        found.ok_or_else(|| LedgerError::RecordNotFound(query.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{QuantityChange, Selector};
    use crate::quote::{PriceQuote, QuoteFailure, StaticQuoteSource};
    use crate::refresh::RefreshOptions;

    fn dex() -> Arc<DexTable> {
        let names = [
            "Bulbasaur", "Ivysaur", "Venusaur", "Charmander", "Charmeleon", "Charizard",
            "Squirtle", "Wartortle", "Blastoise", "Caterpie", "Metapod", "Butterfree",
        ];
        let entries = names
            .iter()
            .enumerate()
            .map(|(i, name)| DexEntry::new(i as u32 + 1, *name));
        Arc::new(DexTable::from_entries(entries).unwrap())
    }

    fn request(query: &str, url: &str) -> PlacementRequest {
        PlacementRequest {
            name_or_number: query.to_string(),
            set: "Pokemon 151".to_string(),
            foil_flag: true,
            full_art_flag: false,
            url: url.to_string(),
        }
    }

    #[test]
    fn test_add_card_then_update() {
        let source = StaticQuoteSource::new().with_quote(
            "https://c/charizard",
            PriceQuote::new()
                .with_item("Charizard ex #199", "Pokemon 151")
                .with_ungraded(110.0)
                .with_psa10(40.0),
        );
        let recorder = CollectionRecorder::new(&source, GradeAdvisor::new());
        let mut store = LedgerStore::in_memory();

        let first = recorder.add_or_update(&mut store, "https://c/charizard", None).unwrap();
        assert!(first.outcome.is_created());
        assert_eq!(first.record.quantity, 1);
        assert!(!first.record.grade_flag);

        let second = recorder.add_or_update(&mut store, " https://c/charizard ", Some(3)).unwrap();
        assert_eq!(second.outcome, UpsertOutcome::Updated { index: 0 });
        assert_eq!(second.record.quantity, 3);

        let third = recorder.add_or_update(&mut store, "https://c/charizard", None).unwrap();
        assert_eq!(third.record.quantity, 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_card_quote_failure_leaves_ledger() {
        let source = StaticQuoteSource::new()
            .with_failure("https://c/x", QuoteFailure::Unparseable("no table".to_string()));
        let recorder = CollectionRecorder::new(&source, GradeAdvisor::new());
        let mut store = LedgerStore::in_memory();

        let result = recorder.add_or_update(&mut store, "https://c/x", None);

        assert!(matches!(result, Err(LedgerError::QuoteUnavailable { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_product() {
        let source = StaticQuoteSource::new().with_quote(
            "https://p/etb",
            PriceQuote::new()
                .with_item("Elite Trainer Box", "Pokemon Prismatic Evolutions")
                .with_ungraded(95.0),
        );
        let recorder = CollectionRecorder::new(&source, GradeAdvisor::new());
        let mut store = LedgerStore::in_memory();

        let recorded = recorder
            .add_or_update_product(&mut store, "https://p/etb", 59.99, Some(2))
            .unwrap();

        assert_eq!(recorded.record.market_price, Some(95.0));
        assert_eq!(recorded.record.msrp, 59.99);
        assert_eq!(recorded.record.quantity, 2);
    }

    #[test]
    fn test_readding_product_keeps_owned_count() {
        let source = StaticQuoteSource::new().with_quote(
            "https://p/bundle",
            PriceQuote::new()
                .with_item("Booster Bundle", "Pokemon 151")
                .with_ungraded(40.0),
        );
        let recorder = CollectionRecorder::new(&source, GradeAdvisor::new());
        let mut store = LedgerStore::in_memory();

        recorder
            .add_or_update_product(&mut store, "https://p/bundle", 26.94, None)
            .unwrap();
        assert_eq!(store.get(0).unwrap().quantity, 1);

        store
            .update_quantity(&Selector::Index(0), QuantityChange::Set(5))
            .unwrap();
        let again = recorder
            .add_or_update_product(&mut store, "https://p/bundle", 49.99, None)
            .unwrap();

        assert_eq!(again.outcome, UpsertOutcome::Updated { index: 0 });
        assert_eq!(again.record.quantity, 5);
        assert_eq!(again.record.msrp, 49.99);

        let set = recorder
            .add_or_update_product(&mut store, "https://p/bundle", 49.99, Some(2))
            .unwrap();
        assert_eq!(set.record.quantity, 2);
    }

    #[test]
    fn test_readd_and_refresh_agree_on_missing_psa10() {
        let first = PriceQuote::new()
            .with_item("Caterpie #10", "Pokemon 151")
            .with_ungraded(0.25)
            .with_psa10(100.0);
        let later = PriceQuote::new()
            .with_item("Caterpie #10", "Pokemon 151")
            .with_ungraded(0.30);
        let advisor = GradeAdvisor::new();

        let before = StaticQuoteSource::new().with_quote("https://c/10", first);
        let after = StaticQuoteSource::new().with_quote("https://c/10", later);

        let mut readded = LedgerStore::in_memory();
        let mut refreshed = LedgerStore::in_memory();
        for store in [&mut readded, &mut refreshed] {
            CollectionRecorder::new(&before, advisor)
                .add_or_update(store, "https://c/10", None)
                .unwrap();
            assert!(store.get(0).unwrap().grade_flag);
        }

        CollectionRecorder::new(&after, advisor)
            .add_or_update(&mut readded, "https://c/10", None)
            .unwrap();
        refreshed
            .bulk_refresh(&after, &advisor, &RefreshOptions::with_workers(1))
            .unwrap();

        let readded = readded.get(0).unwrap();
        let refreshed = refreshed.get(0).unwrap();
        assert_eq!(readded.psa10_price, None);
        assert!(!readded.grade_flag);
        assert_eq!(readded.ungraded_price, Some(0.30));
        assert_eq!(readded, refreshed);
    }

    #[test]
    fn test_place_by_name_and_number() {
        let recorder = BinderRecorder::new(dex());
        let mut store = LedgerStore::in_memory();

        let caterpie = recorder.place(&mut store, &request("caterpie", "https://c/10")).unwrap();
        assert_eq!(caterpie.record.pokemon_name, "Caterpie");
        assert_eq!(caterpie.placement(), Placement { page_number: 2, slot_index: 1 });

        let blastoise = recorder.place(&mut store, &request("9", "https://c/9")).unwrap();
        assert_eq!(blastoise.record.pokemon_name, "Blastoise");
        assert_eq!(blastoise.placement(), Placement { page_number: 1, slot_index: 9 });

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_place_replaces_slot_holder() {
        let recorder = BinderRecorder::new(dex());
        let mut store = LedgerStore::in_memory();

        recorder.place(&mut store, &request("Charizard", "https://c/old")).unwrap();
        let outcome = recorder.place(&mut store, &request("charizard", "https://c/new")).unwrap();

        assert_eq!(outcome.replaced.unwrap().url, "https://c/old");
        assert_eq!(outcome.record.url, "https://c/new");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_place_same_url_updates() {
        let recorder = BinderRecorder::new(dex());
        let mut store = LedgerStore::in_memory();

        recorder.place(&mut store, &request("Metapod", "https://c/11")).unwrap();
        let mut again = request("Metapod", "https://c/11");
        again.set = "Base Set".to_string();
        let outcome = recorder.place(&mut store, &again).unwrap();

        assert_eq!(outcome.outcome, UpsertOutcome::Updated { index: 0 });
        assert!(outcome.replaced.is_none());
        assert_eq!(store.get(0).unwrap().set, "Base Set");
    }

    #[test]
    fn test_place_unknown_name() {
        let recorder = BinderRecorder::new(dex());
        let mut store = LedgerStore::in_memory();

        let result = recorder.place(&mut store, &request("Pikachu", "https://c/25"));

        assert!(matches!(result, Err(LedgerError::UnknownName(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_locate() {
        let recorder = BinderRecorder::new(dex());
        let mut store = LedgerStore::in_memory();
        recorder.place(&mut store, &request("Butterfree", "https://c/12")).unwrap();

        let (index, by_name) = recorder.locate(&store, "BUTTERFREE").unwrap();
        assert_eq!(index, 0);
        assert_eq!(by_name.placement(), Placement { page_number: 2, slot_index: 3 });

        let (_, by_number) = recorder.locate(&store, "12").unwrap();
        assert_eq!(by_number.url, "https://c/12");

        assert!(matches!(
            recorder.locate(&store, "Caterpie"),
            Err(LedgerError::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_lookup_is_independent_of_binder() {
        let recorder = BinderRecorder::new(dex());

        let (entry, placement) = recorder.lookup("Squirtle").unwrap();
        assert_eq!(entry.catalog_num, 7);
        assert_eq!(placement.grid_position().unwrap(), (2, 0));
    }

    // ========================================================================
    // FILE-BACKED FLOWS
    // ========================================================================

    const SNAPSHOT: &str = r#"{
        "https://c/caterpie": {
            "title": "Caterpie #10",
            "set": "Pokemon 151",
            "prices": { "Ungraded": "$0.25", "PSA 10": "$48.38" }
        },
        "https://c/gone": { "error": "not_found" }
    }"#;

    #[test]
    fn test_card_flow_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poke_cards.csv");
        let source = StaticQuoteSource::from_snapshot_json(SNAPSHOT).unwrap();
        let recorder = CollectionRecorder::new(&source, GradeAdvisor::new());

        {
            let mut store = LedgerStore::<CardRecord>::create(&path).unwrap();
            recorder.add_or_update(&mut store, "https://c/caterpie", Some(2)).unwrap();
            let failed = recorder.add_or_update(&mut store, "https://c/gone", None);
            assert!(failed.is_err());
        }

        let store = LedgerStore::<CardRecord>::open(&path).unwrap();
        assert_eq!(store.len(), 1);

        let card = store.get(0).unwrap();
        assert_eq!(card.name, "Caterpie #10");
        assert_eq!(card.ungraded_price, Some(0.25));
        assert_eq!(card.psa10_price, Some(48.38));
        assert!(card.grade_flag);
        assert_eq!(card.quantity, 2);
        println!("✅ Card ledger reopened with {} row", store.len());
    }

    #[test]
    fn test_binder_flow_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binder_record.csv");
        let recorder = BinderRecorder::new(dex());

        {
            let mut store = LedgerStore::<BinderCardRecord>::open(&path).unwrap();
            recorder.place(&mut store, &request("Caterpie", "https://c/10")).unwrap();
            recorder.place(&mut store, &request("Charizard", "https://c/6a")).unwrap();
            recorder.place(&mut store, &request("6", "https://c/6b")).unwrap();
        }

        let store = LedgerStore::<BinderCardRecord>::open(&path).unwrap();
        assert_eq!(store.len(), 2);

        let (_, charizard) = recorder.locate(&store, "charizard").unwrap();
        assert_eq!(charizard.url, "https://c/6b");
        assert_eq!(charizard.placement(), Placement { page_number: 1, slot_index: 6 });

        let (_, caterpie) = recorder.locate(&store, "10").unwrap();
        assert_eq!(caterpie.placement(), Placement { page_number: 2, slot_index: 1 });
    }
}
