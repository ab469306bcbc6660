use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, warn};

use super::{
    country::{CountryDefinition, CountryState, Indicator},
    decision::{DecisionSource, HeuristicAdvisor},
    indicators::IndicatorTable,
    levers::{CONNECTIVITY, LeverTable, NON_TARIFF_BARRIERS, TARIFFS, TRUST},
    products::TradeProductCatalog,
    state::Simulation,
    systems::events::{EventCatalog, RegionalEventGenerator},
    systems::policy::{consumer_welfare, tariff_revenue, trade_volume_proxy},
    trade::TradeGraph,
};
use crate::error::EngineError;

const EMBEDDED_COUNTRIES: &str = include_str!("../../../config/countries.json");
const DEFAULT_START_YEAR: i32 = 2024;

pub fn embedded_definitions() -> Result<Vec<CountryDefinition>> {
    parse_definitions("countries.json", EMBEDDED_COUNTRIES)
}

pub fn load_definitions<P: AsRef<Path>>(path: P) -> Result<Vec<CountryDefinition>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("ファイルの読み込みに失敗しました: {}", path.display()))?;
    parse_definitions(&path.display().to_string(), &content)
}

fn parse_definitions(name: &str, content: &str) -> Result<Vec<CountryDefinition>> {
    serde_json::from_str(content)
        .with_context(|| format!("国定義 JSON の解析に失敗しました: {}", name))
}

pub struct SimulationBuilder {
    definitions: Vec<CountryDefinition>,
    rng: StdRng,
    indicators: Option<IndicatorTable>,
    products: Option<TradeProductCatalog>,
    graph: Option<TradeGraph>,
    levers: Option<LeverTable>,
    events: Option<EventCatalog>,
    player: Option<String>,
    advisor: Box<dyn DecisionSource>,
    start_year: Option<i32>,
}

impl SimulationBuilder {
    pub fn new(definitions: Vec<CountryDefinition>) -> Self {
        Self {
            definitions,
            rng: StdRng::from_entropy(),
            indicators: None,
            products: None,
            graph: None,
            levers: None,
            events: None,
            player: None,
            advisor: Box::new(HeuristicAdvisor),
            start_year: None,
        }
    }

    /// Scenario compiled into the binary from `config/`.
    pub fn from_embedded() -> Result<Self> {
        Ok(Self::new(embedded_definitions()?)
            .with_indicators(IndicatorTable::from_embedded()?)
            .with_trade_products(TradeProductCatalog::from_embedded()?)
            .with_trade_graph(TradeGraph::from_embedded()?)
            .with_levers(LeverTable::from_embedded()?)
            .with_event_catalog(EventCatalog::from_embedded()?))
    }

    /// Same layout as `config/`, read from disk.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self::new(load_definitions(dir.join("countries.json"))?)
            .with_indicators(IndicatorTable::load_from_file(dir.join("indicators.json"))?)
            .with_trade_products(TradeProductCatalog::load_from_file(
                dir.join("trade_products.json"),
            )?)
            .with_trade_graph(TradeGraph::load_from_file(dir.join("trade.yaml"))?)
            .with_levers(LeverTable::load_from_file(dir.join("levers.yaml"))?)
            .with_event_catalog(EventCatalog::load_from_file(
                dir.join("events").join("regional.yaml"),
            )?))
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_indicators(mut self, indicators: IndicatorTable) -> Self {
        self.indicators = Some(indicators);
        self
    }

    pub fn with_trade_products(mut self, products: TradeProductCatalog) -> Self {
        self.products = Some(products);
        self
    }

    pub fn with_trade_graph(mut self, graph: TradeGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_levers(mut self, levers: LeverTable) -> Self {
        self.levers = Some(levers);
        self
    }

    pub fn with_event_catalog(mut self, events: EventCatalog) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    pub fn with_decision_source(mut self, advisor: impl DecisionSource + 'static) -> Self {
        self.advisor = Box::new(advisor);
        self
    }

    pub fn with_start_year(mut self, year: i32) -> Self {
        self.start_year = Some(year);
        self
    }

    pub fn build(self) -> Result<Simulation> {
        let bootstrap = self.into_bootstrap()?;
        Ok(Simulation::new(bootstrap))
    }

    pub(crate) fn into_bootstrap(self) -> Result<SimulationBootstrap> {
        self.validate_definitions()?;
        let SimulationBuilder {
            definitions,
            rng,
            indicators,
            products,
            graph,
            levers,
            events,
            player,
            advisor,
            start_year,
        } = self;

        let indicators = indicators.ok_or(EngineError::ReferenceDataNotLoaded("indicators"))?;
        let products = products.ok_or(EngineError::ReferenceDataNotLoaded("trade_products"))?;
        let levers = match levers {
            Some(levers) => levers,
            None => LeverTable::from_embedded()?,
        };
        let events = match events {
            Some(events) => events,
            None => EventCatalog::from_embedded()?,
        };

        let roster: Vec<String> = definitions.iter().map(|def| def.name.clone()).collect();
        let graph = graph.unwrap_or_default();
        let names: Vec<&str> = roster.iter().map(String::as_str).collect();
        graph.validate_roster(&names).map_err(EngineError::from)?;

        let player = player.unwrap_or_else(|| roster[0].clone());
        if !roster.contains(&player) {
            return Err(EngineError::UnknownCountry(player).into());
        }

        let year = start_year
            .or_else(|| indicators.latest_year())
            .unwrap_or(DEFAULT_START_YEAR);
        let countries: Vec<CountryState> = definitions
            .iter()
            .map(|definition| initial_state(definition, &indicators, &levers, year))
            .collect();
        info!(
            countries = countries.len(),
            player = %player,
            year,
            "シミュレーションを初期化しました"
        );

        Ok(SimulationBootstrap {
            year,
            rng,
            countries,
            levers,
            graph,
            products,
            generator: RegionalEventGenerator::new(events, roster),
            player,
            advisor,
        })
    }

    fn validate_definitions(&self) -> Result<()> {
        if self.definitions.is_empty() {
            return Err(EngineError::EmptyRoster.into());
        }
        let mut seen = HashSet::new();
        for definition in &self.definitions {
            ensure!(
                !definition.name.trim().is_empty(),
                "国名が空の定義があります"
            );
            ensure!(
                seen.insert(definition.name.as_str()),
                "国名が重複しています: {}",
                definition.name
            );
        }
        Ok(())
    }
}

pub(crate) struct SimulationBootstrap {
    pub(crate) year: i32,
    pub(crate) rng: StdRng,
    pub(crate) countries: Vec<CountryState>,
    pub(crate) levers: LeverTable,
    pub(crate) graph: TradeGraph,
    pub(crate) products: TradeProductCatalog,
    pub(crate) generator: RegionalEventGenerator,
    pub(crate) player: String,
    pub(crate) advisor: Box<dyn DecisionSource>,
}

/// Latest observed indicator, else the scenario's value, else the built-in fallback.
fn initial_state(
    definition: &CountryDefinition,
    indicators: &IndicatorTable,
    levers: &LeverTable,
    year: i32,
) -> CountryState {
    let mut state = CountryState::new(definition.name.clone(), year);
    for indicator in Indicator::OUTCOMES {
        let scenario = match indicator {
            Indicator::Population => definition
                .indicators
                .get(&indicator)
                .copied()
                .or(Some(definition.population)),
            _ => definition.indicators.get(&indicator).copied(),
        };
        let value = indicators
            .latest(indicator.key(), &definition.name)
            .or(scenario)
            .unwrap_or_else(|| indicator.fallback_value());
        state.set_indicator(indicator, value);
    }
    state.agriculture_gdp_percent = definition.agriculture_gdp_percent;
    state.manufacturing_gdp_percent = definition.manufacturing_gdp_percent;
    state.services_gdp_percent = definition.services_gdp_percent;

    for (field, value) in &definition.policies {
        match levers.by_memory(field) {
            Some(lever) => state.policy.set(field.clone(), lever.clamp(*value)),
            None => warn!(
                country = %definition.name,
                field = %field,
                "未知の政策フィールドを無視します"
            ),
        }
    }

    let realized = |id: &str, fallback: f64| levers.realized(id, &[], &state).unwrap_or(fallback);
    let tariff = realized(TARIFFS, 15.0);
    let ntb = realized(NON_TARIFF_BARRIERS, 60.0);
    let proxy = trade_volume_proxy(tariff, ntb, realized(CONNECTIVITY, 5.0), realized(TRUST, 50.0));
    state.tariff_revenue = tariff_revenue(tariff, proxy);
    state.consumer_welfare = consumer_welfare(tariff, ntb);
    state.clamped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::trade::edge;

    fn definition(name: &str) -> CountryDefinition {
        CountryDefinition {
            name: name.to_string(),
            population: 5_000_000.0,
            agriculture_gdp_percent: 10.0,
            manufacturing_gdp_percent: 30.0,
            services_gdp_percent: 60.0,
            indicators: Default::default(),
            policies: Default::default(),
        }
    }

    fn builder(definitions: Vec<CountryDefinition>) -> SimulationBuilder {
        SimulationBuilder::new(definitions)
            .with_seed(1)
            .with_indicators(IndicatorTable::default())
            .with_trade_products(TradeProductCatalog::default())
    }

    fn error_of(result: Result<Simulation>) -> EngineError {
        match result {
            Ok(_) => panic!("build should fail"),
            Err(err) => err.downcast::<EngineError>().expect("engine error"),
        }
    }

    #[test]
    fn empty_roster_is_rejected() {
        assert_eq!(error_of(builder(Vec::new()).build()), EngineError::EmptyRoster);
    }

    #[test]
    fn missing_reference_data_is_reported() {
        let err = error_of(
            SimulationBuilder::new(vec![definition("Asteria")])
                .with_trade_products(TradeProductCatalog::default())
                .build(),
        );
        assert_eq!(err, EngineError::ReferenceDataNotLoaded("indicators"));

        let err = error_of(
            SimulationBuilder::new(vec![definition("Asteria")])
                .with_indicators(IndicatorTable::default())
                .build(),
        );
        assert_eq!(err, EngineError::ReferenceDataNotLoaded("trade_products"));
    }

    #[test]
    fn unknown_player_is_rejected() {
        let err = error_of(builder(vec![definition("Asteria")]).with_player("Zephyria").build());
        assert_eq!(err, EngineError::UnknownCountry("Zephyria".into()));
    }

    #[test]
    fn trade_graph_must_match_roster() {
        let graph =
            TradeGraph::new(vec![edge("Asteria", "Zephyria", 10.0, 5.0, 50.0)], vec![]).unwrap();
        let err = error_of(builder(vec![definition("Asteria")]).with_trade_graph(graph).build());
        assert!(matches!(err, EngineError::TradeGraph(_)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        assert!(builder(vec![definition("Asteria"), definition("Asteria")]).build().is_err());
    }

    #[test]
    fn seeding_prefers_indicator_table_then_definition() {
        let mut indicators = IndicatorTable::default();
        indicators.insert("gdp_growth", "Asteria", 2022, 2.0);
        indicators.insert("gdp_growth", "Asteria", 2023, 4.2);
        let mut def = definition("Asteria");
        def.indicators.insert(Indicator::GdpGrowth, 9.0);
        def.indicators.insert(Indicator::LiteracyRate, 97.0);
        def.indicators.insert(Indicator::PovertyRate, 400.0);
        def.policies.insert("tariff_rate".into(), 8.0);
        def.policies.insert("unknown_field".into(), 1.0);

        let levers = LeverTable::from_embedded().unwrap();
        let state = initial_state(&def, &indicators, &levers, 2023);
        assert_eq!(state.gdp_growth, 4.2);
        assert_eq!(state.literacy_rate, 97.0);
        assert_eq!(state.poverty_rate, 90.0);
        assert_eq!(state.population, 5_000_000.0);
        assert_eq!(state.unemployment, Indicator::Unemployment.fallback_value());
        assert_eq!(state.policy.get("tariff_rate"), Some(8.0));
        assert_eq!(state.policy.get("unknown_field"), None);
        assert_eq!(state.consumer_welfare, consumer_welfare(8.0, 60.0));
    }

    #[test]
    fn embedded_scenario_builds() {
        let simulation = SimulationBuilder::from_embedded()
            .unwrap()
            .with_seed(3)
            .build()
            .expect("embedded scenario");
        assert_eq!(simulation.countries().len(), 5);
        assert_eq!(simulation.year(), 2023);
        assert_eq!(simulation.player(), "Asteria");
        let estoria = simulation.country("Estoria").unwrap();
        assert!(estoria.literacy_rate > 0.0);
    }
}
