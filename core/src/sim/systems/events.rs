use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sim::constants::DEFAULT_COOPERATION_INDEX;
use crate::sim::country::CountryState;
use crate::sim::levers::{LeverTable, TRUST};
use crate::sim::systems::policy::EventEffects;

const EMBEDDED_EVENTS: &str = include_str!("../../../../config/events/regional.yaml");

/// Chance that the yearly draw goes on to consider the catalog at all.
const PROCEED_PROBABILITY: f64 = 0.4;
const SUMMIT: &str = "regional_cooperation_summit";
const BORDER_TENSIONS: &str = "border_tensions";
pub const REGIONAL_STABILITY: &str = "regional_stability";
const STABILITY_INTERVAL: i32 = 3;
const STABILITY_GDP_BOOST: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalEvent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub year: i32,
    pub effects: EventEffects,
    pub target_countries: Vec<String>,
}

impl RegionalEvent {
    pub fn targets(&self, country: &str) -> bool {
        self.target_countries.iter().any(|target| target == country)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub probability: f64,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub region_wide: bool,
    /// Fires at most once per run.
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub effects: EventEffects,
}

#[derive(Debug, Deserialize)]
struct EventFile {
    events: Vec<EventDefinition>,
}

#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<EventDefinition>,
}

impl EventCatalog {
    pub fn new(events: Vec<EventDefinition>) -> Result<Self> {
        let mut ids = HashSet::new();
        for event in &events {
            ensure!(!event.id.trim().is_empty(), "イベント ID が空です");
            ensure!(
                ids.insert(event.id.as_str()),
                "イベント ID が重複しています: {}",
                event.id
            );
            ensure!(
                (0.0..=1.0).contains(&event.probability),
                "イベント {} の発生確率は 0 から 1 の範囲で指定してください",
                event.id
            );
            ensure!(
                event.region_wide || !event.targets.is_empty(),
                "イベント {} には対象国か region_wide の指定が必要です",
                event.id
            );
            ensure!(
                event.effects.values().all(|delta| delta.is_finite()),
                "イベント {} の効果値が不正です",
                event.id
            );
        }
        Ok(Self { events })
    }

    pub fn from_embedded() -> Result<Self> {
        Self::from_yaml_str("regional.yaml", EMBEDDED_EVENTS)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("ファイルの読み込みに失敗しました: {}", path.display()))?;
        Self::from_yaml_str(&path.display().to_string(), &content)
    }

    pub fn from_yaml_str(name: &str, content: &str) -> Result<Self> {
        let file: EventFile = serde_yaml::from_str(content)
            .with_context(|| format!("イベント定義 YAML の解析に失敗しました: {}", name))?;
        Self::new(file.events).with_context(|| format!("イベント定義が不正です: {}", name))
    }

    pub fn get(&self, id: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventDefinition> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Draws at most one regional shock per year from a fixed catalog.
#[derive(Debug, Clone)]
pub struct RegionalEventGenerator {
    catalog: EventCatalog,
    roster: Vec<String>,
}

impl RegionalEventGenerator {
    pub fn new(catalog: EventCatalog, roster: Vec<String>) -> Self {
        for event in catalog.iter().filter(|event| !event.region_wide) {
            for target in &event.targets {
                if !roster.contains(target) {
                    warn!(
                        event = %event.id,
                        target = %target,
                        "対象国が登録されていないため除外します"
                    );
                }
            }
        }
        Self { catalog, roster }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        year: i32,
        cooperation_index: f64,
        history: &[RegionalEvent],
        rng: &mut R,
    ) -> Vec<RegionalEvent> {
        if !rng.gen_bool(PROCEED_PROBABILITY) {
            debug!(year, "地域イベントは発生しませんでした");
            return Vec::new();
        }

        let mut candidates: Vec<&EventDefinition> = self
            .catalog
            .iter()
            .filter(|event| !event.unique || !history.iter().any(|past| past.id == event.id))
            .filter(|event| self.reaches_roster(event))
            .collect();
        candidates.shuffle(rng);

        let cooperation_index = if cooperation_index.is_finite() {
            cooperation_index
        } else {
            DEFAULT_COOPERATION_INDEX
        };
        for definition in candidates {
            let probability = effective_probability(definition, cooperation_index);
            if rng.gen_bool(probability) {
                let event = self.instantiate(definition, year);
                info!(
                    year,
                    event = %event.id,
                    targets = event.target_countries.len(),
                    "地域イベントが発生しました"
                );
                return vec![event];
            }
        }

        if year % STABILITY_INTERVAL == 0 {
            info!(year, "地域の安定期が訪れました");
            return vec![self.stability_event(year)];
        }
        Vec::new()
    }

    /// Events whose targets all lie outside the roster never fire.
    fn reaches_roster(&self, definition: &EventDefinition) -> bool {
        definition.region_wide
            || definition
                .targets
                .iter()
                .any(|target| self.roster.contains(target))
    }

    fn instantiate(&self, definition: &EventDefinition, year: i32) -> RegionalEvent {
        let target_countries = if definition.region_wide {
            self.roster.clone()
        } else {
            definition
                .targets
                .iter()
                .filter(|target| self.roster.contains(target))
                .cloned()
                .collect()
        };
        RegionalEvent {
            id: definition.id.clone(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            year,
            effects: definition.effects.clone(),
            target_countries,
        }
    }

    fn stability_event(&self, year: i32) -> RegionalEvent {
        RegionalEvent {
            id: REGIONAL_STABILITY.to_string(),
            name: "地域の安定".to_string(),
            description: "目立った混乱のない一年となり、投資家心理が改善しました。".to_string(),
            year,
            effects: EventEffects::from([("gdp_growth".to_string(), STABILITY_GDP_BOOST)]),
            target_countries: self.roster.clone(),
        }
    }
}

fn effective_probability(definition: &EventDefinition, cooperation_index: f64) -> f64 {
    let scale = match definition.id.as_str() {
        SUMMIT => cooperation_index / 50.0,
        BORDER_TENSIONS => (100.0 - cooperation_index) / 50.0,
        _ => 1.0,
    };
    (definition.probability * scale).clamp(0.0, 1.0)
}

/// Sum of the effects of every event targeting `country`.
pub fn merge_effects(events: &[RegionalEvent], country: &str) -> EventEffects {
    let mut merged = EventEffects::new();
    for event in events.iter().filter(|event| event.targets(country)) {
        for (field, delta) in &event.effects {
            *merged.entry(field.clone()).or_insert(0.0) += delta;
        }
    }
    merged
}

/// Mean realized trust across the region. 50 when there is nobody to average.
pub fn cooperation_index(states: &[CountryState], levers: &LeverTable) -> f64 {
    if states.is_empty() {
        return DEFAULT_COOPERATION_INDEX;
    }
    let total: f64 = states
        .iter()
        .map(|state| {
            levers
                .realized(TRUST, &[], state)
                .unwrap_or(DEFAULT_COOPERATION_INDEX)
        })
        .sum();
    total / states.len() as f64
}
