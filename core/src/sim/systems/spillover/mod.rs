mod aggregate;
mod descriptions;
mod detailed;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use aggregate::{PolicyChanges, policy_changes, simulate_regional};
pub use detailed::{PolicyCategory, classify_product, detailed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    TradeGdp,
    Infrastructure,
    Environment,
    Manufacturing,
    Technology,
    Energy,
}

impl PolicyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyType::TradeGdp => "trade_gdp",
            PolicyType::Infrastructure => "infrastructure",
            PolicyType::Environment => "environment",
            PolicyType::Manufacturing => "manufacturing",
            PolicyType::Technology => "technology",
            PolicyType::Energy => "energy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PolicyType::TradeGdp => "通商政策",
            PolicyType::Infrastructure => "インフラ投資",
            PolicyType::Environment => "環境政策",
            PolicyType::Manufacturing => "製造業振興",
            PolicyType::Technology => "技術投資",
            PolicyType::Energy => "エネルギー政策",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    Low,
    Medium,
    High,
}

impl Magnitude {
    /// Buckets `|effect|` against the (medium, high) lower bounds.
    pub fn classify(effect: f64, medium: f64, high: f64) -> Self {
        let size = effect.abs();
        if size >= high {
            Magnitude::High
        } else if size >= medium {
            Magnitude::Medium
        } else {
            Magnitude::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Timeframe {
    Immediate,
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Immediate => "immediate",
            Timeframe::ShortTerm => "short-term",
            Timeframe::MediumTerm => "medium-term",
            Timeframe::LongTerm => "long-term",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpillover {
    pub source_country: String,
    pub target_country: String,
    pub policy_type: PolicyType,
    pub effect: f64,
    pub description: String,
    pub magnitude: Magnitude,
    pub timeframe: Timeframe,
}

/// Product-aware spillover computed for the player's country. Display data only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedSpillover {
    pub source_country: String,
    pub target_country: String,
    pub policy_type: PolicyType,
    pub effect: f64,
    pub description: String,
    pub magnitude: Magnitude,
    pub timeframe: Timeframe,
    pub policy_category: PolicyCategory,
    pub effect_type: String,
    pub trade_products: Vec<String>,
    pub sector: String,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_thresholds_are_inclusive() {
        assert_eq!(Magnitude::classify(0.04, 0.05, 0.2), Magnitude::Low);
        assert_eq!(Magnitude::classify(-0.05, 0.05, 0.2), Magnitude::Medium);
        assert_eq!(Magnitude::classify(0.2, 0.05, 0.2), Magnitude::High);
    }

    #[test]
    fn wire_names_match_documented_enums() {
        assert_eq!(
            serde_json::to_string(&PolicyType::TradeGdp).unwrap(),
            "\"trade_gdp\""
        );
        assert_eq!(
            serde_json::to_string(&Timeframe::ShortTerm).unwrap(),
            "\"short-term\""
        );
        assert_eq!(serde_json::to_string(&Magnitude::High).unwrap(), "\"high\"");
    }
}
