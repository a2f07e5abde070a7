// 📦 Product Record - Sealed product with MSRP vs market price

use serde::{Deserialize, Serialize};

use super::{Countable, LedgerRecord, PricedRecord};
use crate::grading::GradeAdvisor;
use crate::quote::PriceQuote;

/// Product ledger row.
///
/// Columns: `Product_Name, Set_Name, url, MSRP, market_price, quantity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "Product_Name")]
    pub name: String,

    #[serde(rename = "Set_Name")]
    pub set: String,

    #[serde(rename = "url")]
    pub url: String,

    /// Price paid at the time
    #[serde(rename = "MSRP")]
    pub msrp: f64,

    #[serde(rename = "market_price")]
    pub market_price: Option<f64>,

    #[serde(rename = "quantity")]
    pub quantity: u32,
}

impl ProductRecord {
    pub fn new(name: &str, set: &str, url: &str, msrp: f64, quantity: u32) -> Self {
        ProductRecord {
            name: name.to_string(),
            set: set.to_string(),
            url: url.to_string(),
            msrp,
            market_price: None,
            quantity,
        }
    }

    pub fn from_quote(url: &str, quote: &PriceQuote, msrp: f64, quantity: u32) -> Self {
        let mut record = ProductRecord::new(
            quote.title.as_deref().unwrap_or_default(),
            quote.set_name.as_deref().unwrap_or_default(),
            url,
            msrp,
            quantity,
        );
        record.market_price = quote.product_price();
        record
    }

    /// Market value of every copy owned, when a market price is known.
    pub fn holding_value(&self) -> Option<f64> {
        self.market_price.map(|price| price * self.quantity as f64)
    }

    /// Market price minus MSRP, per copy.
    pub fn gain_per_unit(&self) -> Option<f64> {
        self.market_price.map(|price| price - self.msrp)
    }
}

impl LedgerRecord for ProductRecord {
    const HEADERS: &'static [&'static str] = &[
        "Product_Name",
        "Set_Name",
        "url",
        "MSRP",
        "market_price",
        "quantity",
    ];
    const KIND: &'static str = "product";

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
        self.market_price = incoming.market_price;
        self.msrp = incoming.msrp;
        self.quantity = incoming.quantity;
    }
}

impl PricedRecord for ProductRecord {
    fn apply_quote(&mut self, quote: &PriceQuote, _advisor: &GradeAdvisor) {
        self.market_price = quote.product_price();
    }
}

impl Countable for ProductRecord {
    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}
