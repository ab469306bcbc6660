use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::descriptions::describe;
use super::{DetailedSpillover, Magnitude, PolicyType, Timeframe};
use crate::sim::country::CountryState;
use crate::sim::decision::{PolicyDecision, decision_value};
use crate::sim::levers::LeverTable;
use crate::sim::products::{ProductFlow, TradeProductCatalog};
use crate::sim::trade::TradeGraph;

const NOISE_FLOOR: f64 = 0.01;
const GENERAL_CHANGE_THRESHOLD: f64 = 0.1;
const MEDIUM_THRESHOLD: f64 = 0.05;
const HIGH_THRESHOLD: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCategory {
    Agriculture,
    Energy,
    Manufacturing,
    Technology,
    Infrastructure,
    Health,
    Education,
    Trade,
    Environment,
}

impl PolicyCategory {
    pub const ALL: [PolicyCategory; 9] = [
        PolicyCategory::Agriculture,
        PolicyCategory::Energy,
        PolicyCategory::Manufacturing,
        PolicyCategory::Technology,
        PolicyCategory::Infrastructure,
        PolicyCategory::Health,
        PolicyCategory::Education,
        PolicyCategory::Trade,
        PolicyCategory::Environment,
    ];

    /// Categories that emit a general spillover when no traded product matched them.
    const GENERAL: [PolicyCategory; 5] = [
        PolicyCategory::Infrastructure,
        PolicyCategory::Education,
        PolicyCategory::Health,
        PolicyCategory::Trade,
        PolicyCategory::Environment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyCategory::Agriculture => "agriculture",
            PolicyCategory::Energy => "energy",
            PolicyCategory::Manufacturing => "manufacturing",
            PolicyCategory::Technology => "technology",
            PolicyCategory::Infrastructure => "infrastructure",
            PolicyCategory::Health => "health",
            PolicyCategory::Education => "education",
            PolicyCategory::Trade => "trade",
            PolicyCategory::Environment => "environment",
        }
    }

    pub fn lever(self) -> &'static str {
        match self {
            PolicyCategory::Trade => "trade_liberalization",
            other => other.as_str(),
        }
    }

    pub fn policy_type(self) -> PolicyType {
        match self {
            PolicyCategory::Agriculture | PolicyCategory::Health | PolicyCategory::Trade => {
                PolicyType::TradeGdp
            }
            PolicyCategory::Energy => PolicyType::Energy,
            PolicyCategory::Manufacturing => PolicyType::Manufacturing,
            PolicyCategory::Technology | PolicyCategory::Education => PolicyType::Technology,
            PolicyCategory::Infrastructure => PolicyType::Infrastructure,
            PolicyCategory::Environment => PolicyType::Environment,
        }
    }

    pub fn sector(self) -> &'static str {
        match self {
            PolicyCategory::Agriculture => "農業",
            PolicyCategory::Energy => "エネルギー",
            PolicyCategory::Manufacturing => "製造業",
            PolicyCategory::Technology => "情報技術",
            PolicyCategory::Infrastructure => "建設",
            PolicyCategory::Health => "保健医療",
            PolicyCategory::Education => "教育",
            PolicyCategory::Trade => "貿易",
            PolicyCategory::Environment => "環境",
        }
    }

    fn timeframe(self) -> Timeframe {
        match self {
            PolicyCategory::Energy | PolicyCategory::Trade => Timeframe::Immediate,
            PolicyCategory::Agriculture | PolicyCategory::Manufacturing => Timeframe::ShortTerm,
            PolicyCategory::Infrastructure => Timeframe::MediumTerm,
            PolicyCategory::Technology
            | PolicyCategory::Health
            | PolicyCategory::Education
            | PolicyCategory::Environment => Timeframe::LongTerm,
        }
    }

    fn product_coefficient(self) -> Option<f64> {
        match self {
            PolicyCategory::Agriculture | PolicyCategory::Energy => Some(0.25),
            PolicyCategory::Manufacturing | PolicyCategory::Technology => Some(0.18),
            PolicyCategory::Infrastructure => Some(0.15),
            PolicyCategory::Health => Some(0.12),
            _ => None,
        }
    }

    fn general_coefficient(self) -> Option<f64> {
        match self {
            PolicyCategory::Infrastructure => Some(0.1),
            PolicyCategory::Education => Some(0.05),
            PolicyCategory::Health => Some(0.04),
            PolicyCategory::Trade => Some(0.12),
            PolicyCategory::Environment => Some(0.06),
            _ => None,
        }
    }

    fn product_confidence(self) -> f64 {
        match self {
            PolicyCategory::Agriculture | PolicyCategory::Energy => 0.75,
            PolicyCategory::Manufacturing | PolicyCategory::Technology => 0.7,
            _ => 0.6,
        }
    }
}

impl fmt::Display for PolicyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword → category, scanned in order. The first keyword contained in the product name wins,
/// so "palm oil" must stay ahead of "oil".
const PRODUCT_KEYWORDS: &[(&str, PolicyCategory)] = &[
    ("rice", PolicyCategory::Agriculture),
    ("wheat", PolicyCategory::Agriculture),
    ("maize", PolicyCategory::Agriculture),
    ("palm oil", PolicyCategory::Agriculture),
    ("rubber", PolicyCategory::Agriculture),
    ("coffee", PolicyCategory::Agriculture),
    ("fruit", PolicyCategory::Agriculture),
    ("fish", PolicyCategory::Agriculture),
    ("sugar", PolicyCategory::Agriculture),
    ("crude", PolicyCategory::Energy),
    ("petroleum", PolicyCategory::Energy),
    ("oil", PolicyCategory::Energy),
    ("natural gas", PolicyCategory::Energy),
    ("gas", PolicyCategory::Energy),
    ("coal", PolicyCategory::Energy),
    ("electricity", PolicyCategory::Energy),
    ("semiconductor", PolicyCategory::Technology),
    ("electronic", PolicyCategory::Technology),
    ("computer", PolicyCategory::Technology),
    ("telecom", PolicyCategory::Technology),
    ("software", PolicyCategory::Technology),
    ("machinery", PolicyCategory::Manufacturing),
    ("vehicle", PolicyCategory::Manufacturing),
    ("steel", PolicyCategory::Manufacturing),
    ("textile", PolicyCategory::Manufacturing),
    ("garment", PolicyCategory::Manufacturing),
    ("chemical", PolicyCategory::Manufacturing),
    ("plastic", PolicyCategory::Manufacturing),
    ("cement", PolicyCategory::Infrastructure),
    ("construction", PolicyCategory::Infrastructure),
    ("pharmaceutical", PolicyCategory::Health),
    ("medical", PolicyCategory::Health),
];

pub fn classify_product(product: &str) -> Option<(&'static str, PolicyCategory)> {
    let lowered = product.to_ascii_lowercase();
    PRODUCT_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .copied()
}

/// Product-level spillovers of `source`'s decisions on each trading partner.
pub fn detailed(
    levers: &LeverTable,
    source: &str,
    decisions: &[PolicyDecision],
    graph: &TradeGraph,
    source_state: &CountryState,
    catalog: &TradeProductCatalog,
) -> Vec<DetailedSpillover> {
    let deltas: BTreeMap<PolicyCategory, f64> = PolicyCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let lever = levers.get(category.lever())?;
            let value = decision_value(decisions, &lever.id)?;
            Some((category, value - lever.previous(source_state)))
        })
        .collect();
    if deltas.is_empty() {
        return Vec::new();
    }

    let mut spillovers = Vec::new();
    for partner in catalog.partners(source) {
        let Some(volume) = graph.bilateral_volume(source, &partner) else {
            continue;
        };
        let scale = volume / 100.0;
        let mut matched = BTreeSet::new();

        for (product, flow) in catalog.traded_with(source, &partner) {
            let Some((keyword, category)) = classify_product(product) else {
                continue;
            };
            matched.insert(category);
            let (Some(delta), Some(coefficient)) =
                (deltas.get(&category), category.product_coefficient())
            else {
                continue;
            };
            let magnitude = delta * scale * coefficient;
            if magnitude.abs() <= NOISE_FLOOR {
                continue;
            }
            let effect_type = match flow {
                ProductFlow::Import => "export_demand",
                ProductFlow::Export => "supply_price",
            };
            spillovers.push(build(
                source,
                &partner,
                category,
                magnitude,
                Some((keyword, product)),
                effect_type,
                category.product_confidence(),
            ));
        }

        for category in PolicyCategory::GENERAL {
            if matched.contains(&category) {
                continue;
            }
            let (Some(delta), Some(coefficient)) =
                (deltas.get(&category), category.general_coefficient())
            else {
                continue;
            };
            if delta.abs() <= GENERAL_CHANGE_THRESHOLD {
                continue;
            }
            let magnitude = delta * scale * coefficient;
            if magnitude.abs() <= NOISE_FLOOR {
                continue;
            }
            spillovers.push(build(
                source, &partner, category, magnitude, None, "general", 0.45,
            ));
        }
    }

    debug!(
        source,
        spillovers = spillovers.len(),
        "品目別スピルオーバーを算出しました"
    );
    spillovers
}

fn build(
    source: &str,
    target: &str,
    category: PolicyCategory,
    magnitude: f64,
    product: Option<(&str, &str)>,
    effect_type: &str,
    confidence: f64,
) -> DetailedSpillover {
    let keyword = product.map(|(keyword, _)| keyword);
    let product_name = product.map(|(_, name)| name);
    DetailedSpillover {
        source_country: source.to_string(),
        target_country: target.to_string(),
        policy_type: category.policy_type(),
        effect: magnitude,
        description: describe(category, keyword, magnitude, source, target, product_name),
        magnitude: Magnitude::classify(magnitude, MEDIUM_THRESHOLD, HIGH_THRESHOLD),
        timeframe: category.timeframe(),
        policy_category: category,
        effect_type: effect_type.to_string(),
        trade_products: product_name.map(str::to_string).into_iter().collect(),
        sector: category.sector().to_string(),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::trade::edge;

    fn levers() -> LeverTable {
        LeverTable::from_embedded().unwrap()
    }

    fn catalog() -> TradeProductCatalog {
        TradeProductCatalog::from_json_str(
            "inline.json",
            r#"{ "flows": [
                { "importer": "Asteria", "exporter": "Borealis",
                  "products": ["rice", "palm oil", "cement"] },
                { "importer": "Borealis", "exporter": "Asteria",
                  "products": ["crude oil", "antiques"] },
                { "importer": "Caldera", "exporter": "Asteria", "products": ["semiconductors"] }
            ] }"#,
        )
        .unwrap()
    }

    fn graph() -> TradeGraph {
        TradeGraph::new(
            vec![
                edge("Asteria", "Borealis", 40.0, 10.0, 50.0),
                edge("Borealis", "Asteria", 80.0, 10.0, 50.0),
            ],
            vec![],
        )
        .unwrap()
    }

    fn decide(entries: &[(&str, f64)]) -> Vec<PolicyDecision> {
        let levers = levers();
        entries
            .iter()
            .map(|(id, value)| levers.get(id).unwrap().decision(*value))
            .collect()
    }

    #[test]
    fn first_matching_keyword_wins() {
        assert_eq!(
            classify_product("Palm Oil"),
            Some(("palm oil", PolicyCategory::Agriculture))
        );
        assert_eq!(
            classify_product("crude oil"),
            Some(("crude", PolicyCategory::Energy))
        );
        assert_eq!(
            classify_product("refined petroleum"),
            Some(("petroleum", PolicyCategory::Energy))
        );
        assert_eq!(classify_product("antiques"), None);
    }

    #[test]
    fn product_spillovers_scale_with_delta_and_volume() {
        let mut state = CountryState::new("Asteria", 2024);
        state.policy.set("agriculture_spending", 2.0);
        let result = detailed(
            &levers(),
            "Asteria",
            &decide(&[("agriculture", 4.0)]),
            &graph(),
            &state,
            &catalog(),
        );
        assert_eq!(result.len(), 2);
        for spill in &result {
            assert_eq!(spill.target_country, "Borealis");
            assert_eq!(spill.policy_category, PolicyCategory::Agriculture);
            assert!((spill.effect - 2.0 * 0.8 * 0.25).abs() < 1e-9);
            assert_eq!(spill.effect_type, "export_demand");
            assert_eq!(spill.magnitude, Magnitude::High);
            assert!(!spill.description.is_empty());
        }
        assert_eq!(result[0].trade_products, vec!["rice".to_string()]);
        assert_eq!(result[1].trade_products, vec!["palm oil".to_string()]);
    }

    #[test]
    fn partners_without_trade_edges_are_skipped() {
        let state = CountryState::new("Asteria", 2024);
        let result = detailed(
            &levers(),
            "Asteria",
            &decide(&[("technology", 6.0)]),
            &graph(),
            &state,
            &catalog(),
        );
        assert!(result.iter().all(|spill| spill.target_country != "Caldera"));
    }

    #[test]
    fn general_spillover_needs_unmatched_category() {
        let state = CountryState::new("Asteria", 2024);
        let result = detailed(
            &levers(),
            "Asteria",
            &decide(&[("infrastructure", 8.0), ("education", 6.0)]),
            &graph(),
            &state,
            &catalog(),
        );
        let infrastructure: Vec<_> = result
            .iter()
            .filter(|spill| spill.policy_category == PolicyCategory::Infrastructure)
            .collect();
        assert_eq!(infrastructure.len(), 1);
        assert_eq!(infrastructure[0].trade_products, vec!["cement".to_string()]);
        assert!((infrastructure[0].effect - 3.0 * 0.8 * 0.15).abs() < 1e-9);

        let education: Vec<_> = result
            .iter()
            .filter(|spill| spill.policy_category == PolicyCategory::Education)
            .collect();
        assert_eq!(education.len(), 1);
        assert_eq!(education[0].effect_type, "general");
        assert!(education[0].trade_products.is_empty());
        assert!((education[0].effect - 2.0 * 0.8 * 0.05).abs() < 1e-9);
    }

    #[test]
    fn small_changes_are_dropped_as_noise() {
        let mut state = CountryState::new("Asteria", 2024);
        state.policy.set("education_spending", 4.0);
        state.policy.set("energy_spending", 2.0);
        let result = detailed(
            &levers(),
            "Asteria",
            &decide(&[("education", 4.1), ("energy", 2.04)]),
            &graph(),
            &state,
            &catalog(),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn missing_catalog_entries_yield_nothing() {
        let state = CountryState::new("Dunmere", 2024);
        let result = detailed(
            &levers(),
            "Dunmere",
            &decide(&[("agriculture", 9.0)]),
            &graph(),
            &state,
            &catalog(),
        );
        assert!(result.is_empty());
    }
}
