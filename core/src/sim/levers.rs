use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};

use super::country::{CountryState, Indicator};
use super::decision::{PolicyDecision, decision_value};

const EMBEDDED_LEVERS: &str = include_str!("../../../config/levers.yaml");

pub const TARIFFS: &str = "tariffs";
pub const NON_TARIFF_BARRIERS: &str = "non_tariff_barriers";
pub const CONNECTIVITY: &str = "connectivity";
pub const TRUST: &str = "trust";
pub const TRADE_LIBERALIZATION: &str = "trade_liberalization";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    #[default]
    Additive,
    Multiplicative,
}

/// Sector whose share of GDP scales a lever's delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorShare {
    Agriculture,
    Manufacturing,
    Services,
}

impl SectorShare {
    pub fn indicator(self) -> Indicator {
        match self {
            SectorShare::Agriculture => Indicator::AgricultureGdpPercent,
            SectorShare::Manufacturing => Indicator::ManufacturingGdpPercent,
            SectorShare::Services => Indicator::ServicesGdpPercent,
        }
    }

    pub fn factor(self, state: &CountryState) -> f64 {
        state.indicator(self.indicator()) / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverResponse {
    pub target: Indicator,
    pub coefficient: f64,
    #[serde(default)]
    pub mode: ResponseMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverDefinition {
    pub id: String,
    /// Policy memory field holding the last realized value.
    pub memory: String,
    /// Value assumed when the country has no remembered value.
    pub default: f64,
    pub min: f64,
    pub max: f64,
    /// Present for absolute-stance levers; effects are measured against it instead of last year.
    #[serde(default)]
    pub baseline: Option<f64>,
    #[serde(default)]
    pub scale_by: Option<SectorShare>,
    #[serde(default)]
    pub responses: Vec<LeverResponse>,
}

impl LeverDefinition {
    pub fn previous(&self, state: &CountryState) -> f64 {
        state.policy.get_or(&self.memory, self.default)
    }

    pub fn decision(&self, value: f64) -> PolicyDecision {
        PolicyDecision::new(self.id.clone(), value, self.min, self.max)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LeverFile {
    levers: Vec<LeverDefinition>,
}

/// Ordered lever definitions. Declaration order is evaluation order.
#[derive(Debug, Clone, Default)]
pub struct LeverTable {
    levers: Vec<LeverDefinition>,
}

impl LeverTable {
    pub fn new(levers: Vec<LeverDefinition>) -> Result<Self> {
        let mut ids = HashSet::new();
        let mut memories = HashSet::new();
        for lever in &levers {
            ensure!(!lever.id.trim().is_empty(), "レバー ID が空です");
            ensure!(
                ids.insert(lever.id.as_str()),
                "レバー ID が重複しています: {}",
                lever.id
            );
            ensure!(
                memories.insert(lever.memory.as_str()),
                "記憶フィールドが重複しています: {}",
                lever.memory
            );
            if Indicator::from_key(&lever.memory).is_some() {
                bail!(
                    "記憶フィールド {} は指標名と衝突しています",
                    lever.memory
                );
            }
            ensure!(
                lever.min.is_finite() && lever.max.is_finite() && lever.min <= lever.max,
                "レバー {} の範囲が不正です",
                lever.id
            );
            ensure!(
                lever.default >= lever.min && lever.default <= lever.max,
                "レバー {} の既定値が範囲外です",
                lever.id
            );
            if lever.baseline.is_some() {
                ensure!(
                    lever
                        .responses
                        .iter()
                        .all(|response| response.mode == ResponseMode::Additive),
                    "基準値型レバー {} は乗算型の効果を持てません",
                    lever.id
                );
                ensure!(
                    lever.scale_by.is_none(),
                    "基準値型レバー {} は GDP 構成比で補正できません",
                    lever.id
                );
            }
        }
        Ok(Self { levers })
    }

    pub fn from_embedded() -> Result<Self> {
        Self::from_yaml_str("levers.yaml", EMBEDDED_LEVERS)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("ファイルの読み込みに失敗しました: {}", path.display()))?;
        Self::from_yaml_str(&path.display().to_string(), &content)
    }

    pub fn from_yaml_str(name: &str, content: &str) -> Result<Self> {
        let file: LeverFile = serde_yaml::from_str(content)
            .with_context(|| format!("レバー定義 YAML の解析に失敗しました: {}", name))?;
        Self::new(file.levers).with_context(|| format!("レバー定義が不正です: {}", name))
    }

    pub fn get(&self, id: &str) -> Option<&LeverDefinition> {
        self.levers.iter().find(|lever| lever.id == id)
    }

    pub fn by_memory(&self, field: &str) -> Option<&LeverDefinition> {
        self.levers.iter().find(|lever| lever.memory == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LeverDefinition> {
        self.levers.iter()
    }

    pub fn len(&self) -> usize {
        self.levers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levers.is_empty()
    }

    /// Decision value if supplied this year, otherwise the remembered value, otherwise the default.
    pub fn realized(
        &self,
        id: &str,
        decisions: &[PolicyDecision],
        state: &CountryState,
    ) -> Option<f64> {
        let lever = self.get(id)?;
        Some(decision_value(decisions, id).unwrap_or_else(|| lever.previous(state)))
    }

    /// One decision per lever, holding the remembered (or default) value.
    pub fn remembered_decisions(&self, state: &CountryState) -> Vec<PolicyDecision> {
        self.levers
            .iter()
            .map(|lever| lever.decision(lever.previous(state)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_levers_load() {
        let table = LeverTable::from_embedded().expect("embedded levers");
        assert_eq!(table.len(), 15);
        let health = table.get("health").unwrap();
        assert_eq!(health.memory, "health_expenditure");
        assert_eq!(health.default, 3.0);
        assert_eq!(table.get("infrastructure").unwrap().default, 5.0);
        assert_eq!(table.get(TARIFFS).unwrap().baseline, Some(15.0));
        assert_eq!(table.get(TRUST).unwrap().baseline, Some(50.0));
        assert_eq!(table.get(NON_TARIFF_BARRIERS).unwrap().baseline, Some(60.0));
        assert_eq!(
            table.get("agriculture").unwrap().scale_by,
            Some(SectorShare::Agriculture)
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let yaml = r#"
levers:
  - { id: education, memory: education_spending, default: 4.0, min: 0.0, max: 15.0 }
  - { id: education, memory: other_spending, default: 4.0, min: 0.0, max: 15.0 }
"#;
        let err = LeverTable::from_yaml_str("dup.yaml", yaml).expect_err("duplicate id");
        assert!(format!("{:#}", err).contains("重複"));
    }

    #[test]
    fn memory_field_may_not_shadow_indicator() {
        let yaml = r#"
levers:
  - { id: growth, memory: gdp_growth, default: 0.0, min: -5.0, max: 5.0 }
"#;
        assert!(LeverTable::from_yaml_str("shadow.yaml", yaml).is_err());
    }

    #[test]
    fn realized_prefers_decision_then_memory_then_default() {
        let table = LeverTable::from_embedded().unwrap();
        let mut state = CountryState::new("Asteria", 2024);
        assert_eq!(table.realized(TARIFFS, &[], &state), Some(15.0));
        state.policy.set("tariff_rate", 8.0);
        assert_eq!(table.realized(TARIFFS, &[], &state), Some(8.0));
        let decisions = vec![table.get(TARIFFS).unwrap().decision(4.0)];
        assert_eq!(table.realized(TARIFFS, &decisions, &state), Some(4.0));
        assert_eq!(table.realized("missing", &decisions, &state), None);
    }
}
