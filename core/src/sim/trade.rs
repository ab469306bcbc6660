use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::constants::{MAX_COOPERATION, MAX_TARIFF_RATE, MAX_TRADE_VOLUME};
use super::country::CountryState;
use super::levers::{LeverTable, TARIFFS, TRADE_LIBERALIZATION, TRUST};
use crate::error::TradeGraphError;

const EMBEDDED_TRADE: &str = include_str!("../../../config/trade.yaml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRelationship {
    pub from: String,
    pub to: String,
    pub trade_volume: f64,
    pub tariff_rate: f64,
    pub cooperation: f64,
}

impl TradeRelationship {
    pub fn trade_intensity(&self) -> f64 {
        self.trade_volume / 100.0
    }

    pub fn cooperation_factor(&self) -> f64 {
        self.cooperation / 100.0
    }

    fn check_range(
        &self,
        field: &'static str,
        value: f64,
        max: f64,
    ) -> std::result::Result<(), TradeGraphError> {
        if value.is_finite() && (0.0..=max).contains(&value) {
            Ok(())
        } else {
            Err(TradeGraphError::OutOfRange {
                from: self.from.clone(),
                to: self.to.clone(),
                field,
                value,
            })
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TradeFile {
    #[serde(default)]
    energy_pairs: Vec<(String, String)>,
    #[serde(default)]
    edges: Vec<TradeRelationship>,
}

/// Directed trade relationships plus the pairs allowed to exchange energy spillovers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeGraph {
    edges: Vec<TradeRelationship>,
    energy_pairs: Vec<(String, String)>,
}

impl TradeGraph {
    pub fn new(
        edges: Vec<TradeRelationship>,
        energy_pairs: Vec<(String, String)>,
    ) -> std::result::Result<Self, TradeGraphError> {
        let mut seen = HashSet::new();
        for edge in &edges {
            if edge.from == edge.to {
                return Err(TradeGraphError::SelfLoop(edge.from.clone()));
            }
            if !seen.insert((edge.from.as_str(), edge.to.as_str())) {
                return Err(TradeGraphError::DuplicateEdge {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                });
            }
            edge.check_range("trade_volume", edge.trade_volume, MAX_TRADE_VOLUME)?;
            edge.check_range("tariff_rate", edge.tariff_rate, MAX_TARIFF_RATE)?;
            edge.check_range("cooperation", edge.cooperation, MAX_COOPERATION)?;
        }

        let mut pairs = Vec::with_capacity(energy_pairs.len());
        for (a, b) in energy_pairs {
            if a == b {
                return Err(TradeGraphError::SelfLoop(a));
            }
            let pair = normalise_pair(&a, &b);
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }

        Ok(Self {
            edges,
            energy_pairs: pairs,
        })
    }

    pub fn from_embedded() -> Result<Self> {
        Self::from_yaml_str("trade.yaml", EMBEDDED_TRADE)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("ファイルの読み込みに失敗しました: {}", path.display()))?;
        Self::from_yaml_str(&path.display().to_string(), &content)
    }

    pub fn from_yaml_str(name: &str, content: &str) -> Result<Self> {
        let file: TradeFile = serde_yaml::from_str(content)
            .with_context(|| format!("貿易関係 YAML の解析に失敗しました: {}", name))?;
        let graph = Self::new(file.edges, file.energy_pairs)
            .with_context(|| format!("貿易関係の定義が不正です: {}", name))?;
        Ok(graph)
    }

    /// Rejects edges or energy pairs naming countries outside the roster.
    pub fn validate_roster(&self, roster: &[&str]) -> std::result::Result<(), TradeGraphError> {
        let known: HashSet<&str> = roster.iter().copied().collect();
        let names = self
            .edges
            .iter()
            .flat_map(|edge| [edge.from.as_str(), edge.to.as_str()])
            .chain(
                self.energy_pairs
                    .iter()
                    .flat_map(|(a, b)| [a.as_str(), b.as_str()]),
            );
        for name in names {
            if !known.contains(name) {
                return Err(TradeGraphError::UnknownCountry(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn edges(&self) -> &[TradeRelationship] {
        &self.edges
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&TradeRelationship> {
        self.edges
            .iter()
            .find(|edge| edge.from == from && edge.to == to)
    }

    /// Every edge with `country` at either end, paired with the other endpoint.
    pub fn edges_touching<'a>(
        &'a self,
        country: &'a str,
    ) -> impl Iterator<Item = (&'a TradeRelationship, &'a str)> + 'a {
        self.edges.iter().filter_map(move |edge| {
            if edge.from == country {
                Some((edge, edge.to.as_str()))
            } else if edge.to == country {
                Some((edge, edge.from.as_str()))
            } else {
                None
            }
        })
    }

    /// Larger of the two directed volumes between `a` and `b`.
    pub fn bilateral_volume(&self, a: &str, b: &str) -> Option<f64> {
        let forward = self.edge(a, b).map(|edge| edge.trade_volume);
        let backward = self.edge(b, a).map(|edge| edge.trade_volume);
        match (forward, backward) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (x, y) => x.or(y),
        }
    }

    pub fn is_energy_pair(&self, a: &str, b: &str) -> bool {
        self.energy_pairs.contains(&normalise_pair(a, b))
    }

    /// Next year's graph given the freshly applied country states.
    ///
    /// Tariffs follow the importer's realized tariff, cooperation the mean trust of both ends,
    /// and volume responds to the tariff change and the exporter's openness.
    pub fn updated(&self, states: &[CountryState], levers: &LeverTable) -> TradeGraph {
        let by_name: HashMap<&str, &CountryState> = states
            .iter()
            .map(|state| (state.country.as_str(), state))
            .collect();
        let realized = |state: &CountryState, id: &str, fallback: f64| {
            levers.realized(id, &[], state).unwrap_or(fallback)
        };

        let edges = self
            .edges
            .iter()
            .map(|edge| {
                let (Some(from), Some(to)) =
                    (by_name.get(edge.from.as_str()), by_name.get(edge.to.as_str()))
                else {
                    return edge.clone();
                };
                let new_tariff =
                    realized(to, TARIFFS, edge.tariff_rate).clamp(0.0, MAX_TARIFF_RATE);
                let trust = (realized(from, TRUST, edge.cooperation)
                    + realized(to, TRUST, edge.cooperation))
                    / 2.0;
                let openness = realized(from, TRADE_LIBERALIZATION, 50.0);
                let volume = edge.trade_volume * (1.0 + 0.01 * (edge.tariff_rate - new_tariff))
                    + 0.05 * (openness - 50.0) / 10.0;
                TradeRelationship {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    trade_volume: volume.clamp(0.0, MAX_TRADE_VOLUME),
                    tariff_rate: new_tariff,
                    cooperation: trust.clamp(0.0, MAX_COOPERATION),
                }
            })
            .collect();

        TradeGraph {
            edges,
            energy_pairs: self.energy_pairs.clone(),
        }
    }
}

fn normalise_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
pub(crate) fn edge(
    from: &str,
    to: &str,
    volume: f64,
    tariff: f64,
    cooperation: f64,
) -> TradeRelationship {
    TradeRelationship {
        from: from.into(),
        to: to.into(),
        trade_volume: volume,
        tariff_rate: tariff,
        cooperation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_loops() {
        let err = TradeGraph::new(vec![edge("Asteria", "Asteria", 10.0, 5.0, 50.0)], vec![])
            .expect_err("self loop");
        assert_eq!(err, TradeGraphError::SelfLoop("Asteria".into()));
    }

    #[test]
    fn rejects_duplicate_directed_edges() {
        let err = TradeGraph::new(
            vec![
                edge("Asteria", "Borealis", 10.0, 5.0, 50.0),
                edge("Asteria", "Borealis", 20.0, 5.0, 50.0),
            ],
            vec![],
        )
        .expect_err("duplicate");
        assert!(matches!(err, TradeGraphError::DuplicateEdge { .. }));
    }

    #[test]
    fn opposite_directions_are_distinct_edges() {
        let graph = TradeGraph::new(
            vec![
                edge("Asteria", "Borealis", 10.0, 5.0, 50.0),
                edge("Borealis", "Asteria", 30.0, 5.0, 50.0),
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(graph.edges_touching("Asteria").count(), 2);
        assert_eq!(graph.bilateral_volume("Asteria", "Borealis"), Some(30.0));
        assert_eq!(graph.bilateral_volume("Asteria", "Caldera"), None);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = TradeGraph::new(vec![edge("Asteria", "Borealis", 10.0, 75.0, 50.0)], vec![])
            .expect_err("tariff above 50");
        assert!(matches!(
            err,
            TradeGraphError::OutOfRange {
                field: "tariff_rate",
                ..
            }
        ));
    }

    #[test]
    fn energy_pairs_are_unordered() {
        let graph = TradeGraph::new(vec![], vec![("Caldera".into(), "Asteria".into())]).unwrap();
        assert!(graph.is_energy_pair("Asteria", "Caldera"));
        assert!(graph.is_energy_pair("Caldera", "Asteria"));
        assert!(!graph.is_energy_pair("Asteria", "Borealis"));
    }

    #[test]
    fn embedded_graph_matches_roster() {
        let graph = TradeGraph::from_embedded().expect("embedded trade graph");
        assert!(!graph.edges().is_empty());
        graph
            .validate_roster(&["Asteria", "Borealis", "Caldera", "Dunmere", "Estoria"])
            .expect("roster");
        assert_eq!(
            graph.validate_roster(&["Asteria"]),
            Err(TradeGraphError::UnknownCountry("Borealis".into()))
        );
    }

    #[test]
    fn update_follows_importer_tariff_and_mean_trust() {
        let levers = LeverTable::from_embedded().unwrap();
        let graph =
            TradeGraph::new(vec![edge("Asteria", "Borealis", 50.0, 15.0, 40.0)], vec![]).unwrap();
        let mut asteria = CountryState::new("Asteria", 2025);
        asteria.policy.set("trust_index", 80.0);
        let mut borealis = CountryState::new("Borealis", 2025);
        borealis.policy.set("tariff_rate", 5.0);
        borealis.policy.set("trust_index", 60.0);

        let next = graph.updated(&[asteria, borealis], &levers);
        let updated = next.edge("Asteria", "Borealis").unwrap();
        assert_eq!(updated.tariff_rate, 5.0);
        assert_eq!(updated.cooperation, 70.0);
        assert!((updated.trade_volume - 55.0).abs() < 1e-9);
    }
}
