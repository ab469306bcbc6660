use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use crate::sim::constants::GDP_JITTER;
use crate::sim::country::CountryState;
use crate::sim::decision::{PolicyDecision, decision_value};
use crate::sim::levers::{
    CONNECTIVITY, LeverDefinition, LeverTable, NON_TARIFF_BARRIERS, ResponseMode, TARIFFS, TRUST,
};
use crate::sim::systems::spillover::{PolicySpillover, PolicyType};

/// Field name → additive delta, merged from the year's regional events.
pub type EventEffects = BTreeMap<String, f64>;

const FALLBACK_TARIFF: f64 = 15.0;
const FALLBACK_NTB: f64 = 60.0;
const FALLBACK_CONNECTIVITY: f64 = 5.0;
const FALLBACK_TRUST: f64 = 50.0;

struct SpilloverRoute {
    policy_type: PolicyType,
    field: &'static str,
    share: f64,
}

const SPILLOVER_ROUTES: &[SpilloverRoute] = &[
    SpilloverRoute {
        policy_type: PolicyType::TradeGdp,
        field: "gdp_growth",
        share: 1.0,
    },
    SpilloverRoute {
        policy_type: PolicyType::Infrastructure,
        field: "infrastructure_investment",
        share: 1.0,
    },
    SpilloverRoute {
        policy_type: PolicyType::Infrastructure,
        field: "gdp_growth",
        share: 0.1,
    },
    SpilloverRoute {
        policy_type: PolicyType::Technology,
        field: "gdp_growth",
        share: 0.15,
    },
    SpilloverRoute {
        policy_type: PolicyType::Technology,
        field: "literacy_rate",
        share: 0.3,
    },
    SpilloverRoute {
        policy_type: PolicyType::Manufacturing,
        field: "gdp_growth",
        share: 0.2,
    },
    SpilloverRoute {
        policy_type: PolicyType::Manufacturing,
        field: "unemployment",
        share: -0.1,
    },
    SpilloverRoute {
        policy_type: PolicyType::Energy,
        field: "gdp_growth",
        share: 0.1,
    },
    SpilloverRoute {
        policy_type: PolicyType::Energy,
        field: "co2_emissions",
        share: 0.05,
    },
    SpilloverRoute {
        policy_type: PolicyType::Environment,
        field: "co2_emissions",
        share: -0.5,
    },
    SpilloverRoute {
        policy_type: PolicyType::Environment,
        field: "life_expectancy",
        share: 0.05,
    },
];

/// Computes a country's next state from last year's state and this year's inputs.
///
/// Order is fixed: delta levers, baseline levers, derived KPIs, spillovers, event effects,
/// GDP jitter, clamping, then policy memory. The input state is never modified.
pub fn apply<R: Rng + ?Sized>(
    levers: &LeverTable,
    state: &CountryState,
    decisions: &[PolicyDecision],
    spillovers: &[PolicySpillover],
    event_effects: &EventEffects,
    rng: &mut R,
) -> CountryState {
    let mut next = state.clone();
    let applied: Vec<(&LeverDefinition, f64)> = levers
        .iter()
        .filter_map(|lever| decision_value(decisions, &lever.id).map(|value| (lever, value)))
        .collect();

    for (lever, value) in applied.iter().filter(|(lever, _)| lever.baseline.is_none()) {
        apply_delta_lever(&mut next, state, lever, *value);
    }
    for (lever, value) in &applied {
        if let Some(baseline) = lever.baseline {
            apply_baseline_lever(&mut next, lever, *value, baseline);
        }
    }

    derive_kpis(&mut next, state, levers, decisions);
    apply_spillovers(&mut next, levers, spillovers);
    apply_event_effects(&mut next, event_effects);

    next.gdp_growth += rng.gen_range(-GDP_JITTER..=GDP_JITTER);
    next.clamp_bounds();

    for (lever, value) in &applied {
        next.policy.set(lever.memory.clone(), *value);
    }

    debug!(
        country = %next.country,
        gdp_growth = next.gdp_growth,
        unemployment = next.unemployment,
        levers = applied.len(),
        spillovers = spillovers.len(),
        "政策効果を適用しました"
    );
    next
}

fn apply_delta_lever(
    next: &mut CountryState,
    previous: &CountryState,
    lever: &LeverDefinition,
    value: f64,
) {
    let share = lever
        .scale_by
        .map(|sector| sector.factor(previous))
        .unwrap_or(1.0);
    let delta = (value - lever.previous(previous)) * share;
    if delta == 0.0 {
        return;
    }
    for response in &lever.responses {
        let target = next.indicator_mut(response.target);
        match response.mode {
            ResponseMode::Additive => *target += delta * response.coefficient,
            ResponseMode::Multiplicative => *target *= 1.0 + delta * response.coefficient,
        }
    }
}

fn apply_baseline_lever(
    next: &mut CountryState,
    lever: &LeverDefinition,
    value: f64,
    baseline: f64,
) {
    let stance = (value - baseline) / 100.0;
    for response in &lever.responses {
        *next.indicator_mut(response.target) += stance * response.coefficient;
    }
}

pub fn trade_volume_proxy(tariff: f64, ntb: f64, connectivity: f64, trust: f64) -> f64 {
    100.0 - 0.5 * tariff - 0.3 * ntb + 2.0 * connectivity + 0.2 * trust
}

pub fn tariff_revenue(tariff: f64, volume_proxy: f64) -> f64 {
    (tariff / 100.0) * volume_proxy * 0.5
}

pub fn consumer_welfare(tariff: f64, ntb: f64) -> f64 {
    (100.0 - 0.8 * tariff - 0.4 * ntb).clamp(0.0, 100.0)
}

fn derive_kpis(
    next: &mut CountryState,
    previous: &CountryState,
    levers: &LeverTable,
    decisions: &[PolicyDecision],
) {
    let realized = |id: &str, fallback: f64| {
        levers
            .realized(id, decisions, previous)
            .unwrap_or(fallback)
    };
    let tariff = realized(TARIFFS, FALLBACK_TARIFF);
    let ntb = realized(NON_TARIFF_BARRIERS, FALLBACK_NTB);
    let connectivity = realized(CONNECTIVITY, FALLBACK_CONNECTIVITY);
    let trust = realized(TRUST, FALLBACK_TRUST);

    let proxy = trade_volume_proxy(tariff, ntb, connectivity, trust);
    next.tariff_revenue = tariff_revenue(tariff, proxy);
    next.consumer_welfare = consumer_welfare(tariff, ntb);
}

fn apply_spillovers(next: &mut CountryState, levers: &LeverTable, spillovers: &[PolicySpillover]) {
    for spillover in spillovers {
        for route in SPILLOVER_ROUTES
            .iter()
            .filter(|route| route.policy_type == spillover.policy_type)
        {
            add_to_field(next, levers, route.field, spillover.effect * route.share);
        }
    }
}

fn add_to_field(next: &mut CountryState, levers: &LeverTable, field: &str, amount: f64) {
    if let Some(value) = next.field_mut(field) {
        *value += amount;
        return;
    }
    if let Some(lever) = levers.by_memory(field) {
        next.policy.set(field, lever.default + amount);
    }
}

fn apply_event_effects(next: &mut CountryState, effects: &EventEffects) {
    for (field, delta) in effects {
        if !delta.is_finite() {
            continue;
        }
        if let Some(value) = next.field_mut(field) {
            *value += delta;
        }
    }
}
