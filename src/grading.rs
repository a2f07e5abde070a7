// 💎 Grade Advisor - Is a card worth sending off for grading?
//
// A card is worth grading when its PSA 10 price covers the grading fee
// times a safety multiplier:
//   psa10_price >= grading_cost * multiplier

use serde::{Deserialize, Serialize};

pub const DEFAULT_GRADING_COST: f64 = 21.99;
pub const DEFAULT_MULTIPLIER: f64 = 2.2;

/// Threshold check with explicit parameters.
pub fn should_grade(psa10_price: f64, grading_cost: f64, multiplier: f64) -> bool {
    psa10_price >= grading_cost * multiplier
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeAdvisor {
    /// Fee charged per card (default: $21.99)
    #[serde(default = "default_cost")]
    pub cost: f64,

    /// How many times the fee a PSA 10 must fetch (default: 2.2)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_cost() -> f64 {
    DEFAULT_GRADING_COST
}

fn default_multiplier() -> f64 {
    DEFAULT_MULTIPLIER
}

impl GradeAdvisor {
    pub fn new() -> Self {
        GradeAdvisor {
            cost: DEFAULT_GRADING_COST,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }

    pub fn with_thresholds(cost: f64, multiplier: f64) -> Self {
        GradeAdvisor { cost, multiplier }
    }

    /// Break-even PSA 10 price.
    pub fn threshold(&self) -> f64 {
        self.cost * self.multiplier
    }

    pub fn should_grade(&self, psa10_price: f64) -> bool {
        should_grade(psa10_price, self.cost, self.multiplier)
    }

    /// Unknown PSA 10 prices are never worth grading.
    pub fn advise(&self, psa10_price: Option<f64>) -> bool {
        psa10_price.is_some_and(|price| self.should_grade(price))
    }
}

impl Default for GradeAdvisor {
    fn default() -> Self {
        Self::new()
    }
}
