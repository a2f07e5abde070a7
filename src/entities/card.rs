// 🃏 Card Record - A single owned card with raw and PSA 10 prices

use serde::{Deserialize, Serialize};

use super::{yes_no, Countable, LedgerRecord, PricedRecord};
use crate::grading::GradeAdvisor;
use crate::quote::PriceQuote;

fn default_quantity() -> u32 {
    1
}

/// Card ledger row.
///
/// Columns: `Card_Name, Set_Name, url, ungraded_price, PSA10_price, grade_yn, quantity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    #[serde(rename = "Card_Name")]
    pub name: String,

    #[serde(rename = "Set_Name")]
    pub set: String,

    #[serde(rename = "url")]
    pub url: String,

    #[serde(rename = "ungraded_price")]
    pub ungraded_price: Option<f64>,

    #[serde(rename = "PSA10_price")]
    pub psa10_price: Option<f64>,

    #[serde(rename = "grade_yn", with = "yes_no")]
    pub grade_flag: bool,

    /// Older ledgers have no quantity column
    #[serde(rename = "quantity", default = "default_quantity")]
    pub quantity: u32,
}

impl CardRecord {
    pub fn new(name: &str, set: &str, url: &str) -> Self {
        CardRecord {
            name: name.to_string(),
            set: set.to_string(),
            url: url.to_string(),
            ungraded_price: None,
            psa10_price: None,
            grade_flag: false,
            quantity: default_quantity(),
        }
    }

    /// Build a new row from a quote, taking name and set from the source.
    pub fn from_quote(url: &str, quote: &PriceQuote, advisor: &GradeAdvisor) -> Self {
        let mut record = CardRecord::new(
            quote.title.as_deref().unwrap_or_default(),
            quote.set_name.as_deref().unwrap_or_default(),
            url,
        );
        record.apply_quote(quote, advisor);
        record
    }
}

impl LedgerRecord for CardRecord {
    const HEADERS: &'static [&'static str] = &[
        "Card_Name",
        "Set_Name",
        "url",
        "ungraded_price",
        "PSA10_price",
        "grade_yn",
        "quantity",
    ];
    const KIND: &'static str = "card";

    fn url(&self) -> &str {
        &self.url
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&self) -> &str {
        &self.set
    }

    fn merge_from(&mut self, incoming: Self) {
        if !incoming.name.is_empty() {
            self.name = incoming.name;
        }
        if !incoming.set.is_empty() {
            self.set = incoming.set;
        }
        // Prices always come from the latest quote, same as a refresh
        self.ungraded_price = incoming.ungraded_price;
        self.psa10_price = incoming.psa10_price;
        self.grade_flag = incoming.grade_flag;
        self.quantity = incoming.quantity;
    }
}

impl PricedRecord for CardRecord {
    fn apply_quote(&mut self, quote: &PriceQuote, advisor: &GradeAdvisor) {
        self.ungraded_price = quote.ungraded_price;
        self.psa10_price = quote.psa10_price;
        self.grade_flag = advisor.advise(quote.psa10_price);
    }
}

impl Countable for CardRecord {
    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}
