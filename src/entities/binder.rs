// 🗂️ Binder Card Record - One card per catalog number, placed by page/slot

use serde::{Deserialize, Serialize};

use super::{yes_no, LedgerRecord};
use crate::error::Result;
use crate::placement::{DexPlacementCalculator, Placement};

/// Binder ledger row.
///
/// Columns: `pokemon_name, nat_dex_num, set, foil_flag, full_art_flag, url`.
/// Page and slot are derived from the catalog number and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinderCardRecord {
    #[serde(rename = "pokemon_name")]
    pub pokemon_name: String,

    #[serde(rename = "nat_dex_num")]
    pub catalog_num: u32,

    #[serde(rename = "set", alias = "set_name")]
    pub set: String,

    #[serde(rename = "foil_flag", with = "yes_no")]
    pub foil_flag: bool,

    #[serde(rename = "full_art_flag", with = "yes_no")]
    pub full_art_flag: bool,

    #[serde(rename = "url")]
    pub url: String,

    #[serde(skip)]
    pub page_number: u32,

    #[serde(skip)]
    pub slot_index: u8,
}

impl BinderCardRecord {
    /// Build a placed record. A card that is not foil is never full art.
    pub fn new(
        pokemon_name: &str,
        catalog_num: u32,
        set: &str,
        foil_flag: bool,
        full_art_flag: bool,
        url: &str,
        placement: Placement,
    ) -> Self {
        BinderCardRecord {
            pokemon_name: pokemon_name.to_string(),
            catalog_num,
            set: set.to_string(),
            foil_flag,
            full_art_flag: foil_flag && full_art_flag,
            url: url.to_string(),
            page_number: placement.page_number,
            slot_index: placement.slot_index,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            page_number: self.page_number,
            slot_index: self.slot_index,
        }
    }

    pub fn describe(&self) -> String {
        let finish = match (self.foil_flag, self.full_art_flag) {
            (true, true) => "full art foil",
            (true, false) => "foil",
            _ => "non-foil",
        };
        format!(
            "{} #{} ({}, {})",
            self.pokemon_name, self.catalog_num, self.set, finish
        )
    }
}

impl LedgerRecord for BinderCardRecord {
    const HEADERS: &'static [&'static str] = &[
        "pokemon_name",
        "nat_dex_num",
        "set",
        "foil_flag",
        "full_art_flag",
        "url",
    ];
    const KIND: &'static str = "binder card";

    fn url(&self) -> &str {
        &self.url
    }

    fn name(&self) -> &str {
        &self.pokemon_name
    }

    fn set_name(&self) -> &str {
        &self.set
    }

    fn merge_from(&mut self, incoming: Self) {
        *self = incoming;
    }

    fn after_load(&mut self) -> Result<()> {
        let placement = DexPlacementCalculator::unbounded().compute(self.catalog_num)?;
        self.page_number = placement.page_number;
        self.slot_index = placement.slot_index;
        Ok(())
    }
}
