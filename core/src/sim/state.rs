use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result, anyhow, ensure};
use rand::rngs::StdRng;
use tracing::info;

use super::{
    bootstrap::SimulationBootstrap,
    country::CountryState,
    decision::{DecisionSource, PolicyDecision},
    export::write_history,
    levers::LeverTable,
    products::TradeProductCatalog,
    systems::events::{RegionalEvent, RegionalEventGenerator, cooperation_index, merge_effects},
    systems::policy,
    systems::scoring::score,
    systems::spillover::{self, DetailedSpillover, PolicySpillover},
    trade::TradeGraph,
};
use crate::error::EngineError;

/// Everything one call to [`Simulation::advance_year`] produced.
#[derive(Debug, Clone)]
pub struct YearReport {
    pub year: i32,
    pub lines: Vec<String>,
    pub events: Vec<RegionalEvent>,
    pub spillovers: BTreeMap<String, Vec<PolicySpillover>>,
    pub detailed: Vec<DetailedSpillover>,
    pub score: f64,
}

pub struct Simulation {
    year: i32,
    rng: StdRng,
    countries: Vec<CountryState>,
    levers: LeverTable,
    graph: TradeGraph,
    products: TradeProductCatalog,
    generator: RegionalEventGenerator,
    player: String,
    pending: Vec<PolicyDecision>,
    advisor: Box<dyn DecisionSource>,
    initial_player: CountryState,
    player_history: Vec<CountryState>,
    event_history: Vec<RegionalEvent>,
    spillover_log: BTreeMap<i32, Vec<PolicySpillover>>,
    detailed_log: BTreeMap<i32, Vec<DetailedSpillover>>,
}

impl Simulation {
    pub(crate) fn new(bootstrap: SimulationBootstrap) -> Self {
        let initial_player = bootstrap
            .countries
            .iter()
            .find(|state| state.country == bootstrap.player)
            .cloned()
            .unwrap_or_else(|| CountryState::new(bootstrap.player.clone(), bootstrap.year));
        Self {
            year: bootstrap.year,
            rng: bootstrap.rng,
            countries: bootstrap.countries,
            levers: bootstrap.levers,
            graph: bootstrap.graph,
            products: bootstrap.products,
            generator: bootstrap.generator,
            player: bootstrap.player,
            pending: Vec::new(),
            advisor: bootstrap.advisor,
            player_history: vec![initial_player.clone()],
            initial_player,
            event_history: Vec::new(),
            spillover_log: BTreeMap::new(),
            detailed_log: BTreeMap::new(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn levers(&self) -> &LeverTable {
        &self.levers
    }

    pub fn countries(&self) -> &[CountryState] {
        &self.countries
    }

    pub fn country(&self, name: &str) -> Option<&CountryState> {
        self.countries.iter().find(|state| state.country == name)
    }

    /// Accepts a 1-based roster index or a case-insensitive name.
    pub fn find_country(&self, name_or_index: &str) -> Option<&CountryState> {
        if let Ok(id) = name_or_index.parse::<usize>() {
            if id > 0 && id <= self.countries.len() {
                return self.countries.get(id - 1);
            }
        }
        let needle = name_or_index.to_ascii_lowercase();
        self.countries
            .iter()
            .find(|state| state.country.to_ascii_lowercase() == needle)
    }

    pub fn player_history(&self) -> &[CountryState] {
        &self.player_history
    }

    pub fn initial_player_state(&self) -> &CountryState {
        &self.initial_player
    }

    pub fn current_score(&self) -> f64 {
        let last = self.player_history.last().unwrap_or(&self.initial_player);
        score(last, &self.initial_player)
    }

    pub fn event_history(&self) -> &[RegionalEvent] {
        &self.event_history
    }

    pub fn spillover_log(&self) -> &BTreeMap<i32, Vec<PolicySpillover>> {
        &self.spillover_log
    }

    pub fn detailed_log(&self) -> &BTreeMap<i32, Vec<DetailedSpillover>> {
        &self.detailed_log
    }

    pub fn trade_graph(&self) -> &TradeGraph {
        &self.graph
    }

    pub fn cooperation_index(&self) -> f64 {
        cooperation_index(&self.countries, &self.levers)
    }

    pub fn pending_decisions(&self) -> &[PolicyDecision] {
        &self.pending
    }

    /// Queues a lever value for the player's next year. The value is clamped to the lever range.
    pub fn set_player_decision(&mut self, lever: &str, value: f64) -> Result<PolicyDecision> {
        let definition = self
            .levers
            .get(lever)
            .ok_or_else(|| EngineError::UnknownLever(lever.to_string()))?;
        ensure!(value.is_finite(), "政策値が不正です: {}", value);
        let decision = definition.decision(value);
        self.pending.retain(|pending| pending.id != decision.id);
        self.pending.push(decision.clone());
        Ok(decision)
    }

    pub fn clear_player_decisions(&mut self) {
        self.pending.clear();
    }

    /// Runs one simulated year. Nothing is committed unless every step succeeds.
    pub fn advance_year(&mut self) -> Result<YearReport> {
        let next_year = self
            .year
            .checked_add(1)
            .ok_or_else(|| anyhow!("これ以上年を進められません"))?;
        let mut rng = self.rng.clone();

        let decisions = self.collect_decisions();
        let events = self.generator.generate(
            next_year,
            self.cooperation_index(),
            &self.event_history,
            &mut rng,
        );

        let spillovers =
            spillover::simulate_regional(&self.levers, &self.countries, &decisions, &self.graph);
        let player_state = self
            .country(&self.player)
            .ok_or_else(|| EngineError::UnknownCountry(self.player.clone()))?;
        let detailed = spillover::detailed(
            &self.levers,
            &self.player,
            decisions_of(&decisions, &self.player),
            &self.graph,
            player_state,
            &self.products,
        );

        let mut next_states = Vec::with_capacity(self.countries.len());
        for state in &self.countries {
            let inbound = spillovers
                .get(&state.country)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut next = policy::apply(
                &self.levers,
                state,
                decisions_of(&decisions, &state.country),
                inbound,
                &merge_effects(&events, &state.country),
                &mut rng,
            );
            next.year = next_year;
            next_states.push(next);
        }
        let graph = self.graph.updated(&next_states, &self.levers);

        let next_player = next_states
            .iter()
            .find(|state| state.country == self.player)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCountry(self.player.clone()))?;
        let previous_player = player_state.clone();
        let year_score = score(&next_player, &self.initial_player);
        let lines = summarize(
            next_year,
            &events,
            &spillovers,
            &detailed,
            &previous_player,
            &next_player,
            year_score,
        );

        self.rng = rng;
        self.countries = next_states;
        self.graph = graph;
        self.year = next_year;
        self.player_history.push(next_player);
        self.event_history.extend(events.iter().cloned());
        self.spillover_log
            .insert(next_year, spillovers.values().flatten().cloned().collect());
        self.detailed_log.insert(next_year, detailed.clone());
        self.pending.clear();

        info!(
            year = next_year,
            events = events.len(),
            spillovers = spillovers.values().map(Vec::len).sum::<usize>(),
            score = year_score,
            "1年分のシミュレーションを完了しました"
        );

        Ok(YearReport {
            year: next_year,
            lines,
            events,
            spillovers,
            detailed,
            score: year_score,
        })
    }

    pub fn advance_years(&mut self, years: u32) -> Result<Vec<YearReport>> {
        (0..years).map(|_| self.advance_year()).collect()
    }

    pub fn export_csv<W: Write>(&self, writer: W) -> Result<()> {
        write_history(writer, &self.player_history)
            .with_context(|| format!("{} の履歴を書き出せませんでした", self.player))
    }

    fn collect_decisions(&self) -> BTreeMap<String, Vec<PolicyDecision>> {
        let mut decisions = BTreeMap::new();
        for state in &self.countries {
            let chosen = if state.country == self.player {
                let mut chosen = self.levers.remembered_decisions(state);
                chosen.extend(self.pending.iter().cloned());
                chosen
            } else {
                self.advisor.decide(state, &self.levers)
            };
            decisions.insert(state.country.clone(), chosen);
        }
        decisions
    }
}

fn decisions_of<'a>(
    decisions: &'a BTreeMap<String, Vec<PolicyDecision>>,
    country: &str,
) -> &'a [PolicyDecision] {
    decisions.get(country).map(Vec::as_slice).unwrap_or(&[])
}

fn summarize(
    year: i32,
    events: &[RegionalEvent],
    spillovers: &BTreeMap<String, Vec<PolicySpillover>>,
    detailed: &[DetailedSpillover],
    before: &CountryState,
    after: &CountryState,
    year_score: f64,
) -> Vec<String> {
    let mut lines = vec![format!("{} 年のシミュレーションを実行しました。", year)];
    for event in events {
        lines.push(format!(
            "地域イベント: {} ({}) 対象: {}",
            event.name,
            event.description,
            event.target_countries.join(", ")
        ));
    }
    let inbound = spillovers.get(&after.country).map(Vec::len).unwrap_or(0);
    let total: usize = spillovers.values().map(Vec::len).sum();
    lines.push(format!(
        "スピルオーバー {} 件 ({} 向け {} 件)、品目別 {} 件",
        total,
        after.country,
        inbound,
        detailed.len()
    ));
    lines.push(format!(
        "{}: GDP 成長率 {:.2}% ({:+.2})、失業率 {:.2}% ({:+.2})、貧困率 {:.2}% ({:+.2})",
        after.country,
        after.gdp_growth,
        after.gdp_growth - before.gdp_growth,
        after.unemployment,
        after.unemployment - before.unemployment,
        after.poverty_rate,
        after.poverty_rate - before.poverty_rate
    ));
    lines.push(format!("現在のスコア: {:.0} / 1000", year_score));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::bootstrap::SimulationBuilder;

    fn simulation(seed: u64) -> Simulation {
        SimulationBuilder::from_embedded()
            .unwrap()
            .with_seed(seed)
            .build()
            .unwrap()
    }

    #[test]
    fn advance_increments_year_and_records_history() {
        let mut sim = simulation(1);
        let start = sim.year();
        let report = sim.advance_year().unwrap();
        assert_eq!(report.year, start + 1);
        assert_eq!(sim.year(), start + 1);
        assert_eq!(sim.player_history().len(), 2);
        assert!(sim.countries().iter().all(|state| state.year == start + 1));
        assert!(sim.countries().iter().all(CountryState::is_within_bounds));
        assert!(sim.spillover_log().contains_key(&(start + 1)));
        assert!(!report.lines.is_empty());
    }

    #[test]
    fn player_decision_is_clamped_and_persisted() {
        let mut sim = simulation(2);
        let decision = sim.set_player_decision("tariffs", 80.0).unwrap();
        assert_eq!(decision.value, 50.0);
        sim.set_player_decision("tariffs", 5.0).unwrap();
        assert_eq!(sim.pending_decisions().len(), 1);
        sim.advance_year().unwrap();
        let player = sim.country("Asteria").unwrap();
        assert_eq!(player.policy.get("tariff_rate"), Some(5.0));
        assert!(sim.pending_decisions().is_empty());
    }

    #[test]
    fn unknown_lever_is_rejected() {
        let mut sim = simulation(3);
        let err = sim.set_player_decision("space_program", 1.0).unwrap_err();
        assert_eq!(
            err.downcast::<EngineError>().unwrap(),
            EngineError::UnknownLever("space_program".into())
        );
        assert!(sim.set_player_decision("tariffs", f64::NAN).is_err());
    }

    #[test]
    fn same_seed_replays_identically() {
        let mut a = simulation(9);
        let mut b = simulation(9);
        a.set_player_decision("education", 6.0).unwrap();
        b.set_player_decision("education", 6.0).unwrap();
        a.advance_years(5).unwrap();
        b.advance_years(5).unwrap();
        assert_eq!(a.countries(), b.countries());
        assert_eq!(a.event_history(), b.event_history());
        assert_eq!(a.trade_graph(), b.trade_graph());
    }

    struct MaxTariffs;

    impl DecisionSource for MaxTariffs {
        fn decide(&self, _state: &CountryState, levers: &LeverTable) -> Vec<PolicyDecision> {
            levers
                .get("tariffs")
                .map(|lever| vec![lever.decision(lever.max)])
                .unwrap_or_default()
        }
    }

    #[test]
    fn custom_source_drives_every_ai_country() {
        let build = || {
            SimulationBuilder::from_embedded()
                .unwrap()
                .with_seed(21)
                .with_decision_source(MaxTariffs)
                .build()
                .unwrap()
        };
        let mut a = build();
        let mut b = build();
        a.advance_years(2).unwrap();
        b.advance_years(2).unwrap();
        for state in a.countries().iter().filter(|state| state.country != a.player()) {
            assert_eq!(state.policy.get("tariff_rate"), Some(50.0), "{}", state.country);
        }
        assert_eq!(a.countries(), b.countries());
    }

    #[test]
    fn find_country_by_index_or_name() {
        let sim = simulation(4);
        assert_eq!(sim.find_country("1").unwrap().country, "Asteria");
        assert_eq!(sim.find_country("borealis").unwrap().country, "Borealis");
        assert!(sim.find_country("0").is_none());
        assert!(sim.find_country("Zephyria").is_none());
    }

    #[test]
    fn score_starts_at_five_hundred() {
        let sim = simulation(5);
        assert_eq!(sim.current_score(), 500.0);
    }
}
