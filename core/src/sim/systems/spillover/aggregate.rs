use std::collections::BTreeMap;

use tracing::debug;

use super::{Magnitude, PolicySpillover, PolicyType, Timeframe};
use crate::sim::country::CountryState;
use crate::sim::decision::{PolicyDecision, decision_value};
use crate::sim::levers::LeverTable;
use crate::sim::trade::{TradeGraph, TradeRelationship};

/// Lever id → change against last year's realized value.
pub type PolicyChanges = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scaling {
    TradeAndCooperation,
    TradeOnly,
    Flat,
}

impl Scaling {
    fn factor(self, edge: &TradeRelationship) -> f64 {
        match self {
            Scaling::TradeAndCooperation => edge.trade_intensity() * edge.cooperation_factor(),
            Scaling::TradeOnly => edge.trade_intensity(),
            Scaling::Flat => 1.0,
        }
    }
}

struct SpilloverRule {
    lever: &'static str,
    /// -1.0 turns a tariff increase into a negative spillover.
    direction: f64,
    policy_type: PolicyType,
    coefficient: f64,
    scaling: Scaling,
    energy_pair_only: bool,
    medium: f64,
    high: f64,
    timeframe: Timeframe,
}

const RULES: &[SpilloverRule] = &[
    SpilloverRule {
        lever: "trade_liberalization",
        direction: 1.0,
        policy_type: PolicyType::TradeGdp,
        coefficient: 0.25,
        scaling: Scaling::TradeAndCooperation,
        energy_pair_only: false,
        medium: 0.1,
        high: 0.3,
        timeframe: Timeframe::ShortTerm,
    },
    SpilloverRule {
        lever: "tariffs",
        direction: -1.0,
        policy_type: PolicyType::TradeGdp,
        coefficient: 0.02,
        scaling: Scaling::TradeAndCooperation,
        energy_pair_only: false,
        medium: 0.05,
        high: 0.15,
        timeframe: Timeframe::Immediate,
    },
    SpilloverRule {
        lever: "infrastructure",
        direction: 1.0,
        policy_type: PolicyType::Infrastructure,
        coefficient: 0.15,
        scaling: Scaling::TradeAndCooperation,
        energy_pair_only: false,
        medium: 0.05,
        high: 0.2,
        timeframe: Timeframe::MediumTerm,
    },
    SpilloverRule {
        lever: "environment",
        direction: 1.0,
        policy_type: PolicyType::Environment,
        coefficient: 0.08,
        scaling: Scaling::Flat,
        energy_pair_only: false,
        medium: 0.05,
        high: 0.15,
        timeframe: Timeframe::LongTerm,
    },
    SpilloverRule {
        lever: "manufacturing",
        direction: 1.0,
        policy_type: PolicyType::Manufacturing,
        coefficient: 0.2,
        scaling: Scaling::TradeAndCooperation,
        energy_pair_only: false,
        medium: 0.05,
        high: 0.2,
        timeframe: Timeframe::ShortTerm,
    },
    SpilloverRule {
        lever: "technology",
        direction: 1.0,
        policy_type: PolicyType::Technology,
        coefficient: 0.2,
        scaling: Scaling::TradeAndCooperation,
        energy_pair_only: false,
        medium: 0.05,
        high: 0.15,
        timeframe: Timeframe::LongTerm,
    },
    SpilloverRule {
        lever: "energy",
        direction: 1.0,
        policy_type: PolicyType::Energy,
        coefficient: 0.15,
        scaling: Scaling::TradeOnly,
        energy_pair_only: true,
        medium: 0.05,
        high: 0.2,
        timeframe: Timeframe::Immediate,
    },
];

/// Changes for every lever present in `decisions`; unchanged levers are omitted.
pub fn policy_changes(
    levers: &LeverTable,
    state: &CountryState,
    decisions: &[PolicyDecision],
) -> PolicyChanges {
    levers
        .iter()
        .filter_map(|lever| {
            let value = decision_value(decisions, &lever.id)?;
            let change = value - lever.previous(state);
            (change != 0.0).then(|| (lever.id.clone(), change))
        })
        .collect()
}

/// Aggregate spillovers from every country's policy changes, grouped by receiving country.
pub fn simulate_regional(
    levers: &LeverTable,
    states: &[CountryState],
    decisions: &BTreeMap<String, Vec<PolicyDecision>>,
    graph: &TradeGraph,
) -> BTreeMap<String, Vec<PolicySpillover>> {
    let mut by_target: BTreeMap<String, Vec<PolicySpillover>> = BTreeMap::new();

    for state in states {
        let Some(source_decisions) = decisions.get(&state.country) else {
            continue;
        };
        let changes = policy_changes(levers, state, source_decisions);
        if changes.is_empty() {
            continue;
        }

        for (edge, partner) in graph.edges_touching(&state.country) {
            for rule in RULES {
                let Some(change) = changes.get(rule.lever) else {
                    continue;
                };
                if rule.energy_pair_only && !graph.is_energy_pair(&state.country, partner) {
                    continue;
                }
                let effect = rule.direction * change * rule.scaling.factor(edge) * rule.coefficient;
                by_target
                    .entry(partner.to_string())
                    .or_default()
                    .push(PolicySpillover {
                        source_country: state.country.clone(),
                        target_country: partner.to_string(),
                        policy_type: rule.policy_type,
                        effect,
                        description: describe(&state.country, partner, rule.policy_type, effect),
                        magnitude: Magnitude::classify(effect, rule.medium, rule.high),
                        timeframe: rule.timeframe,
                    });
            }
        }
    }

    debug!(
        targets = by_target.len(),
        spillovers = by_target.values().map(Vec::len).sum::<usize>(),
        "集計スピルオーバーを算出しました"
    );
    by_target
}

fn describe(source: &str, target: &str, policy_type: PolicyType, effect: f64) -> String {
    let tone = if effect > 0.0 {
        "追い風"
    } else if effect < 0.0 {
        "逆風"
    } else {
        "影響なし"
    };
    format!(
        "{} の{}が {} に波及しています ({})",
        source,
        policy_type.label(),
        target,
        tone
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::trade::edge;

    fn levers() -> LeverTable {
        LeverTable::from_embedded().unwrap()
    }

    fn states() -> Vec<CountryState> {
        ["Asteria", "Borealis", "Caldera"]
            .into_iter()
            .map(|name| CountryState::new(name, 2024))
            .collect()
    }

    fn decide(levers: &LeverTable, entries: &[(&str, f64)]) -> Vec<PolicyDecision> {
        entries
            .iter()
            .map(|(id, value)| levers.get(id).unwrap().decision(*value))
            .collect()
    }

    #[test]
    fn gdp_spillover_scales_with_trade_and_cooperation() {
        let levers = levers();
        let graph =
            TradeGraph::new(vec![edge("Asteria", "Borealis", 60.0, 10.0, 50.0)], vec![]).unwrap();
        let mut decisions = BTreeMap::new();
        decisions.insert(
            "Asteria".to_string(),
            decide(&levers, &[("trade_liberalization", 60.0)]),
        );

        let result = simulate_regional(&levers, &states(), &decisions, &graph);
        let inbound = &result["Borealis"];
        assert_eq!(inbound.len(), 1);
        let spill = &inbound[0];
        assert_eq!(spill.policy_type, PolicyType::TradeGdp);
        assert_eq!(spill.source_country, "Asteria");
        assert!((spill.effect - 10.0 * 0.6 * 0.5 * 0.25).abs() < 1e-9);
        assert_eq!(spill.magnitude, Magnitude::High);
        assert!(!result.contains_key("Asteria"));
    }

    #[test]
    fn edges_are_followed_in_both_directions() {
        let levers = levers();
        let graph =
            TradeGraph::new(vec![edge("Borealis", "Asteria", 40.0, 10.0, 100.0)], vec![]).unwrap();
        let mut decisions = BTreeMap::new();
        decisions.insert("Asteria".to_string(), decide(&levers, &[("technology", 2.5)]));
        let result = simulate_regional(&levers, &states(), &decisions, &graph);
        let spill = &result["Borealis"][0];
        assert_eq!(spill.policy_type, PolicyType::Technology);
        assert!((spill.effect - 1.0 * 0.4 * 1.0 * 0.2).abs() < 1e-9);
    }

    #[test]
    fn zero_cooperation_zeroes_cooperation_scaled_rules() {
        let levers = levers();
        let graph =
            TradeGraph::new(vec![edge("Asteria", "Borealis", 80.0, 10.0, 0.0)], vec![]).unwrap();
        let mut decisions = BTreeMap::new();
        decisions.insert(
            "Asteria".to_string(),
            decide(
                &levers,
                &[
                    ("trade_liberalization", 70.0),
                    ("tariffs", 5.0),
                    ("infrastructure", 9.0),
                    ("manufacturing", 6.0),
                    ("environment", 4.0),
                ],
            ),
        );
        let result = simulate_regional(&levers, &states(), &decisions, &graph);
        for spill in &result["Borealis"] {
            match spill.policy_type {
                PolicyType::Environment => assert!((spill.effect - 3.0 * 0.08).abs() < 1e-9),
                _ => assert_eq!(spill.effect, 0.0),
            }
        }
        assert_eq!(result["Borealis"].len(), 5);
    }

    #[test]
    fn tariff_cuts_are_positive_for_partners() {
        let levers = levers();
        let graph =
            TradeGraph::new(vec![edge("Asteria", "Borealis", 50.0, 10.0, 100.0)], vec![]).unwrap();
        let mut decisions = BTreeMap::new();
        decisions.insert("Asteria".to_string(), decide(&levers, &[("tariffs", 5.0)]));
        let result = simulate_regional(&levers, &states(), &decisions, &graph);
        let spill = &result["Borealis"][0];
        assert!((spill.effect - 10.0 * 0.5 * 0.02).abs() < 1e-9);
        assert_eq!(spill.timeframe, Timeframe::Immediate);
    }

    #[test]
    fn energy_requires_whitelisted_pair() {
        let levers = levers();
        let graph = TradeGraph::new(
            vec![
                edge("Asteria", "Borealis", 50.0, 10.0, 50.0),
                edge("Asteria", "Caldera", 50.0, 10.0, 50.0),
            ],
            vec![("Caldera".into(), "Asteria".into())],
        )
        .unwrap();
        let mut decisions = BTreeMap::new();
        decisions.insert("Asteria".to_string(), decide(&levers, &[("energy", 4.0)]));
        let result = simulate_regional(&levers, &states(), &decisions, &graph);
        assert!(!result.contains_key("Borealis"));
        let spill = &result["Caldera"][0];
        assert_eq!(spill.policy_type, PolicyType::Energy);
        assert!((spill.effect - 2.0 * 0.5 * 0.15).abs() < 1e-9);
    }

    #[test]
    fn unchanged_policies_produce_nothing() {
        let levers = levers();
        let graph =
            TradeGraph::new(vec![edge("Asteria", "Borealis", 50.0, 10.0, 50.0)], vec![]).unwrap();
        let states = states();
        let mut decisions = BTreeMap::new();
        decisions.insert(
            "Asteria".to_string(),
            levers.remembered_decisions(&states[0]),
        );
        assert!(simulate_regional(&levers, &states, &decisions, &graph).is_empty());
    }
}
