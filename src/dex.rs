// 📚 Reference Dex - Canonical name ↔ catalog number
//
// The reference table is loaded once and shared read-only (`Arc<DexTable>`).
// Names match case-insensitively; variants/formes are not modelled, so a
// number listed more than once keeps its first name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::placement::DexPlacementCalculator;

// ============================================================================
// DEX ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexEntry {
    #[serde(alias = "national_dex_num", alias = "nat_dex_num")]
    pub catalog_num: u32,

    #[serde(alias = "NAME", alias = "pokemon_name")]
    pub canonical_name: String,
}

impl DexEntry {
    pub fn new(catalog_num: u32, canonical_name: impl Into<String>) -> Self {
        DexEntry {
            catalog_num,
            canonical_name: canonical_name.into(),
        }
    }
}

/// Lower-cased, trimmed form used for name lookups.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// DEX TABLE
// ============================================================================

/// Immutable reference table, indexed both ways.
#[derive(Debug, Clone)]
pub struct DexTable {
    /// entries[n - 1] holds catalog number n
    entries: Vec<DexEntry>,
    by_name: HashMap<String, u32>,
}

impl DexTable {
    /// Build a table from entries in any order.
    ///
    /// Repeated numbers keep the first entry. The distinct numbers must be
    /// exactly `1..=N`.
    pub fn from_entries(entries: impl IntoIterator<Item = DexEntry>) -> Result<Self> {
        let mut by_number: HashMap<u32, DexEntry> = HashMap::new();

        for entry in entries {
            if entry.catalog_num == 0 {
                return Err(LedgerError::InvalidReferenceTable(format!(
                    "catalog number 0 for {}",
                    entry.canonical_name
                )));
            }
            if entry.canonical_name.trim().is_empty() {
                return Err(LedgerError::InvalidReferenceTable(format!(
                    "empty name for catalog number {}",
                    entry.catalog_num
                )));
            }

            if let Some(existing) = by_number.get(&entry.catalog_num) {
                debug!(
                    catalog_num = entry.catalog_num,
                    kept = %existing.canonical_name,
                    skipped = %entry.canonical_name,
                    "skipping repeated catalog number"
                );
                continue;
            }
            by_number.insert(entry.catalog_num, entry);
        }

        let size = by_number.len() as u32;
        let mut ordered = Vec::with_capacity(by_number.len());
        for num in 1..=size {
            match by_number.remove(&num) {
                Some(entry) => ordered.push(entry),
                None => {
                    return Err(LedgerError::InvalidReferenceTable(format!(
                        "catalog number {} missing; numbers must run 1..={}",
                        num, size
                    )))
                }
            }
        }

        let mut by_name = HashMap::with_capacity(ordered.len());
        for entry in &ordered {
            by_name
                .entry(normalize_name(&entry.canonical_name))
                .or_insert(entry.catalog_num);
        }

        Ok(DexTable {
            entries: ordered,
            by_name,
        })
    }

    /// Load from CSV with a `catalog_num,canonical_name` header
    /// (`national_dex_num,NAME` is accepted too).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: DexEntry = result?;
            entries.push(entry);
        }

        Self::from_entries(entries)
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        debug!(path = %path.display(), entries = table.len(), "loaded reference dex");
        Ok(table)
    }

    /// N, the highest catalog number.
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DexEntry] {
        &self.entries
    }

    pub fn calculator(&self) -> DexPlacementCalculator {
        DexPlacementCalculator::new(self.len())
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Name ↔ number lookups against the shared reference table.
pub trait NameDexResolver {
    fn resolve_by_name(&self, name: &str) -> Result<u32>;

    fn resolve_by_number(&self, catalog_num: u32) -> Result<&str>;

    /// N, the highest catalog number known.
    fn max_catalog_num(&self) -> u32;

    /// Resolve a query that is either a catalog number or a name.
    ///
    /// Anything that reads as an integer is a number; zero and negatives
    /// fail with `InvalidCatalogNumber`.
    fn resolve(&self, query: &str) -> Result<DexEntry> {
        let query = query.trim();
        match query.parse::<i64>() {
            Ok(value) => {
                let num = u32::try_from(value)
                    .ok()
                    .filter(|num| *num >= 1)
                    .ok_or(LedgerError::InvalidCatalogNumber {
                        value,
                        max: self.max_catalog_num(),
                    })?;
                let name = self.resolve_by_number(num)?;
                Ok(DexEntry::new(num, name))
            }
            Err(_) => {
                let num = self.resolve_by_name(query)?;
                let name = self.resolve_by_number(num)?;
                Ok(DexEntry::new(num, name))
            }
        }
    }
}

impl NameDexResolver for DexTable {
    fn max_catalog_num(&self) -> u32 {
        self.len()
    }

    fn resolve_by_name(&self, name: &str) -> Result<u32> {
        self.by_name
            .get(&normalize_name(name))
            .copied()
            .ok_or_else(|| LedgerError::UnknownName(name.trim().to_string()))
    }

    fn resolve_by_number(&self, catalog_num: u32) -> Result<&str> {
        if catalog_num == 0 || catalog_num > self.len() {
            return Err(LedgerError::CatalogNumberOutOfRange {
                value: catalog_num,
                max: self.len(),
            });
        }
        Ok(&self.entries[(catalog_num - 1) as usize].canonical_name)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> DexTable {
        DexTable::from_entries(vec![
            DexEntry::new(1, "Bulbasaur"),
            DexEntry::new(2, "Ivysaur"),
            DexEntry::new(3, "Venusaur"),
            DexEntry::new(4, "Charmander"),
            DexEntry::new(5, "Charmeleon"),
            DexEntry::new(6, "Charizard"),
            DexEntry::new(7, "Squirtle"),
            DexEntry::new(8, "Wartortle"),
            DexEntry::new(9, "Blastoise"),
            DexEntry::new(10, "Caterpie"),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_by_name_is_case_insensitive() {
        let dex = fixture();

        assert_eq!(dex.resolve_by_name("caterpie").unwrap(), 10);
        assert_eq!(dex.resolve_by_name("Caterpie").unwrap(), 10);
        assert_eq!(dex.resolve_by_name("  CATERPIE ").unwrap(), 10);
    }

    #[test]
    fn test_resolve_unknown_name() {
        let dex = fixture();

        match dex.resolve_by_name("Pikachu") {
            Err(LedgerError::UnknownName(name)) => assert_eq!(name, "Pikachu"),
            other => panic!("expected UnknownName, got {:?}", other),
        }

        // No fuzzy matching
        assert!(dex.resolve_by_name("Caterpi").is_err());
    }

    #[test]
    fn test_resolve_by_number() {
        let dex = fixture();

        assert_eq!(dex.resolve_by_number(1).unwrap(), "Bulbasaur");
        assert_eq!(dex.resolve_by_number(10).unwrap(), "Caterpie");
        assert!(matches!(
            dex.resolve_by_number(0),
            Err(LedgerError::CatalogNumberOutOfRange { value: 0, max: 10 })
        ));
        assert!(matches!(
            dex.resolve_by_number(11),
            Err(LedgerError::CatalogNumberOutOfRange { value: 11, max: 10 })
        ));
    }

    #[test]
    fn test_resolve_name_or_number() {
        let dex = fixture();

        assert_eq!(dex.resolve("6").unwrap(), DexEntry::new(6, "Charizard"));
        assert_eq!(dex.resolve("charizard").unwrap(), DexEntry::new(6, "Charizard"));
        assert!(dex.resolve("99").is_err());
    }

    #[test]
    fn test_resolve_non_positive_number() {
        let dex = fixture();

        for (query, expected) in [("-3", -3i64), ("0", 0), (" -10 ", -10)] {
            match dex.resolve(query) {
                Err(LedgerError::InvalidCatalogNumber { value, max }) => {
                    assert_eq!(value, expected);
                    assert_eq!(max, 10);
                }
                other => panic!("expected InvalidCatalogNumber for {:?}, got {:?}", query, other),
            }
        }
    }

    #[test]
    fn test_load_csv_with_original_headers() {
        let csv = "national_dex_num,NAME\n1,Bulbasaur\n2,Ivysaur\n3,Venusaur\n3,Mega Venusaur\n";
        let dex = DexTable::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(dex.len(), 3);
        assert_eq!(dex.resolve_by_number(3).unwrap(), "Venusaur");
        assert!(dex.resolve_by_name("Mega Venusaur").is_err());
    }

    #[test]
    fn test_load_csv_with_canonical_headers() {
        let csv = "catalog_num,canonical_name\n2, Ivysaur\n1,Bulbasaur\n";
        let dex = DexTable::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(dex.len(), 2);
        assert_eq!(dex.resolve_by_name("ivysaur").unwrap(), 2);
    }

    #[test]
    fn test_gap_in_numbers_is_rejected() {
        let result = DexTable::from_entries(vec![
            DexEntry::new(1, "Bulbasaur"),
            DexEntry::new(3, "Venusaur"),
        ]);

        assert!(matches!(result, Err(LedgerError::InvalidReferenceTable(_))));
    }

    #[test]
    fn test_calculator_uses_table_size() {
        let dex = fixture();
        let calc = dex.calculator();

        assert_eq!(calc.max_catalog_num(), 10);
        assert!(calc.compute(10).is_ok());
        assert!(calc.compute(11).is_err());
    }

    #[test]
    fn test_bundled_kanto_table() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/pokemon_dex_num.csv");
        let dex = DexTable::from_csv_path(&path).unwrap();

        assert_eq!(dex.len(), 151);
        assert_eq!(dex.resolve_by_name("caterpie").unwrap(), 10);
        assert_eq!(dex.resolve_by_number(151).unwrap(), "Mew");
        assert_eq!(dex.calculator().page_count(), 17);
        println!("✅ Bundled table: {} entries", dex.len());
    }
}
