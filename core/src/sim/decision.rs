use serde::{Deserialize, Serialize};

use super::country::{CountryState, Indicator};
use super::levers::LeverTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub id: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl PolicyDecision {
    /// Builds a decision with `value` already clamped into `[min, max]`.
    pub fn new(id: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Self {
            id: id.into(),
            value,
            min,
            max,
        }
        .clamped()
    }

    /// A NaN bound leaves that side open. A NaN value falls back to the nearest finite bound.
    pub fn clamped(mut self) -> Self {
        if self.min.is_nan() {
            self.min = f64::NEG_INFINITY;
        }
        if self.max.is_nan() {
            self.max = f64::INFINITY;
        }
        if self.min > self.max {
            std::mem::swap(&mut self.min, &mut self.max);
        }
        self.value = if self.value.is_nan() {
            [self.min, self.max]
                .into_iter()
                .find(|bound| bound.is_finite())
                .unwrap_or(0.0)
        } else {
            self.value.clamp(self.min, self.max)
        };
        self
    }
}

/// Value of the last decision with this id. Decisions without an id never match.
pub fn decision_value(decisions: &[PolicyDecision], id: &str) -> Option<f64> {
    if id.is_empty() {
        return None;
    }
    decisions
        .iter()
        .rev()
        .find(|decision| decision.id == id)
        .map(|decision| decision.value)
}

/// Produces one year's clamped decisions for a country.
pub trait DecisionSource {
    fn decide(&self, state: &CountryState, levers: &LeverTable) -> Vec<PolicyDecision>;
}

/// Keeps every lever where it was last year.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldCourse;

impl DecisionSource for HoldCourse {
    fn decide(&self, state: &CountryState, levers: &LeverTable) -> Vec<PolicyDecision> {
        levers.remembered_decisions(state)
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Above(f64),
    Below(f64),
}

#[derive(Debug, Clone, Copy)]
struct Nudge {
    indicator: Indicator,
    trigger: Trigger,
    lever: &'static str,
    step: f64,
}

const NUDGES: &[Nudge] = &[
    Nudge {
        indicator: Indicator::Unemployment,
        trigger: Trigger::Above(8.0),
        lever: "infrastructure",
        step: 0.5,
    },
    Nudge {
        indicator: Indicator::GdpGrowth,
        trigger: Trigger::Below(2.0),
        lever: "tariffs",
        step: -1.0,
    },
    Nudge {
        indicator: Indicator::GdpGrowth,
        trigger: Trigger::Below(2.0),
        lever: "trade_liberalization",
        step: 2.0,
    },
    Nudge {
        indicator: Indicator::Co2Emissions,
        trigger: Trigger::Above(8.0),
        lever: "environment",
        step: 0.3,
    },
    Nudge {
        indicator: Indicator::LiteracyRate,
        trigger: Trigger::Below(90.0),
        lever: "education",
        step: 0.3,
    },
    Nudge {
        indicator: Indicator::LifeExpectancy,
        trigger: Trigger::Below(70.0),
        lever: "health",
        step: 0.3,
    },
];

/// Threshold-based nudges from last year's levers, used for non-player countries.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAdvisor;

impl DecisionSource for HeuristicAdvisor {
    fn decide(&self, state: &CountryState, levers: &LeverTable) -> Vec<PolicyDecision> {
        let mut decisions = levers.remembered_decisions(state);
        for nudge in NUDGES {
            let value = state.indicator(nudge.indicator);
            let triggered = match nudge.trigger {
                Trigger::Above(threshold) => value > threshold,
                Trigger::Below(threshold) => value < threshold,
            };
            if !triggered {
                continue;
            }
            if let Some(decision) = decisions.iter_mut().find(|d| d.id == nudge.lever) {
                decision.value = (decision.value + nudge.step).clamp(decision.min, decision.max);
            }
        }
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_value_into_range() {
        assert_eq!(PolicyDecision::new("tariffs", 80.0, 0.0, 50.0).value, 50.0);
        assert_eq!(PolicyDecision::new("tariffs", -1.0, 0.0, 50.0).value, 0.0);
        assert_eq!(PolicyDecision::new("tariffs", f64::NAN, 0.0, 50.0).value, 0.0);
    }

    #[test]
    fn nan_bounds_leave_that_side_open() {
        let open_min = PolicyDecision::new("tariffs", 5.0, f64::NAN, 50.0);
        assert_eq!(open_min.value, 5.0);
        assert_eq!(PolicyDecision::new("tariffs", 80.0, f64::NAN, 50.0).value, 50.0);
        assert_eq!(PolicyDecision::new("tariffs", -3.0, 0.0, f64::NAN).value, 0.0);
        assert_eq!(PolicyDecision::new("tariffs", f64::NAN, f64::NAN, 50.0).value, 50.0);
        assert_eq!(PolicyDecision::new("tariffs", f64::NAN, f64::NAN, f64::NAN).value, 0.0);
    }

    #[test]
    fn later_decisions_override_earlier_ones() {
        let decisions = vec![
            PolicyDecision::new("education", 4.0, 0.0, 15.0),
            PolicyDecision::new("education", 6.0, 0.0, 15.0),
            PolicyDecision::new("", 9.0, 0.0, 15.0),
        ];
        assert_eq!(decision_value(&decisions, "education"), Some(6.0));
        assert_eq!(decision_value(&decisions, ""), None);
        assert_eq!(decision_value(&decisions, "health"), None);
    }

    #[test]
    fn advisor_cuts_tariffs_when_growth_stalls() {
        let levers = LeverTable::from_embedded().unwrap();
        let mut state = CountryState::new("Borealis", 2024);
        state.gdp_growth = 1.0;
        state.policy.set("tariff_rate", 12.0);

        let decisions = HeuristicAdvisor.decide(&state, &levers);
        assert_eq!(decisions.len(), levers.len());
        assert_eq!(decision_value(&decisions, "tariffs"), Some(11.0));
        assert_eq!(decision_value(&decisions, "trade_liberalization"), Some(52.0));
    }

    #[test]
    fn advisor_respects_lever_ranges() {
        let levers = LeverTable::from_embedded().unwrap();
        let mut state = CountryState::new("Borealis", 2024);
        state.gdp_growth = 0.0;
        state.policy.set("tariff_rate", 0.0);
        let decisions = HeuristicAdvisor.decide(&state, &levers);
        assert_eq!(decision_value(&decisions, "tariffs"), Some(0.0));
    }

    #[test]
    fn hold_course_repeats_memory() {
        let levers = LeverTable::from_embedded().unwrap();
        let mut state = CountryState::new("Borealis", 2024);
        state.policy.set("education_spending", 7.5);
        let decisions = HoldCourse.decide(&state, &levers);
        assert_eq!(decision_value(&decisions, "education"), Some(7.5));
        assert_eq!(decision_value(&decisions, "health"), Some(3.0));
    }
}
