// 📖 Binder Placement - Catalog number → page/slot
//
// A binder page is a 3×3 grid, filled in catalog order:
//   page_number = (catalog_num - 1) / 9 + 1
//   slot_index  = (catalog_num - 1) % 9 + 1
//
// Slots read left to right, top to bottom:
//   1 2 3
//   4 5 6
//   7 8 9

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Cards per binder page.
pub const PAGE_SIZE: u32 = 9;

/// Columns (and rows) of the page grid.
pub const GRID_COLUMNS: u8 = 3;

// ============================================================================
// PLACEMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub page_number: u32,
    pub slot_index: u8,
}

impl Placement {
    /// 0-based (row, col) of this slot on its page.
    pub fn grid_position(&self) -> Result<(u8, u8)> {
        slot_to_grid(self.slot_index)
    }

    /// Text diagram of the page with the slot marked by `*`.
    pub fn render_grid(&self) -> String {
        let border = format!("+{}\n", "---+".repeat(GRID_COLUMNS as usize));
        let mut out = format!("Page {}\n", self.page_number);
        out.push_str(&border);

        for row in 0..GRID_COLUMNS {
            out.push('|');
            for col in 0..GRID_COLUMNS {
                let slot = row * GRID_COLUMNS + col + 1;
                if slot == self.slot_index {
                    out.push_str(" * |");
                } else {
                    out.push_str(&format!(" {} |", slot));
                }
            }
            out.push('\n');
            out.push_str(&border);
        }

        out
    }

    pub fn summary(&self) -> String {
        match self.grid_position() {
            Ok((row, col)) => format!(
                "page {}, slot {} (row {}, column {})",
                self.page_number,
                self.slot_index,
                row + 1,
                col + 1
            ),
            Err(_) => format!("page {}, slot {}", self.page_number, self.slot_index),
        }
    }
}

/// Convert a slot (1..=9) to its 0-based (row, col).
pub fn slot_to_grid(slot_index: u8) -> Result<(u8, u8)> {
    if !(1..=PAGE_SIZE as u8).contains(&slot_index) {
        return Err(LedgerError::InvalidSlot(slot_index));
    }

    let zero_based = slot_index - 1;
    Ok((zero_based / GRID_COLUMNS, zero_based % GRID_COLUMNS))
}

// ============================================================================
// CALCULATOR
// ============================================================================

/// Maps catalog numbers in `1..=max_catalog_num` onto binder coordinates.
#[derive(Debug, Clone, Copy)]
pub struct DexPlacementCalculator {
    max_catalog_num: u32,
}

impl DexPlacementCalculator {
    pub fn new(max_catalog_num: u32) -> Self {
        DexPlacementCalculator { max_catalog_num }
    }

    /// Accepts any positive catalog number. Used to derive placements of
    /// rows already in a ledger, where the reference table is not loaded.
    pub fn unbounded() -> Self {
        DexPlacementCalculator::new(u32::MAX)
    }

    pub fn max_catalog_num(&self) -> u32 {
        self.max_catalog_num
    }

    /// Compute the page and slot for a catalog number.
    ///
    /// Fails with `InvalidCatalogNumber` for anything outside `1..=N`.
    pub fn compute(&self, catalog_num: impl Into<i64>) -> Result<Placement> {
        let value = catalog_num.into();

        if value < 1 || value > self.max_catalog_num as i64 {
            return Err(LedgerError::InvalidCatalogNumber {
                value,
                max: self.max_catalog_num,
            });
        }

        let zero_based = (value - 1) as u32;
        Ok(Placement {
            page_number: zero_based / PAGE_SIZE + 1,
            slot_index: (zero_based % PAGE_SIZE + 1) as u8,
        })
    }

    /// Number of pages needed to hold every catalog number.
    pub fn page_count(&self) -> u32 {
        self.max_catalog_num.div_ceil(PAGE_SIZE)
    }
}

// ============================================================================
// TESTS
// ============================================================================
