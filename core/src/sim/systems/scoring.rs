use crate::sim::country::{CountryState, Indicator};

const BASE_SCORE: f64 = 400.0;
const BALANCED_BONUS: f64 = 100.0;
const BALANCED_FLOOR: f64 = -50.0;
const COLLAPSE_PENALTY: f64 = 200.0;
const COLLAPSE_FLOOR: f64 = -100.0;
const MAX_SCORE: f64 = 1000.0;

/// Positive weights reward increases, negative weights reward decreases.
const WEIGHTS: &[(Indicator, f64)] = &[
    (Indicator::GdpGrowth, 15.0),
    (Indicator::LiteracyRate, 3.0),
    (Indicator::LifeExpectancy, 8.0),
    (Indicator::Unemployment, -5.0),
    (Indicator::PovertyRate, -4.0),
    (Indicator::Co2Emissions, -15.0),
    (Indicator::InfantMortality, -2.0),
];

/// Rates the change from `initial` to `last` on a 0-1000 scale. No change scores 500.
pub fn score(last: &CountryState, initial: &CountryState) -> f64 {
    let weighted: Vec<f64> = WEIGHTS
        .iter()
        .map(|(indicator, weight)| {
            (last.indicator(*indicator) - initial.indicator(*indicator)) * weight
        })
        .collect();

    let mut total = BASE_SCORE + weighted.iter().sum::<f64>();
    if weighted.iter().all(|delta| *delta > BALANCED_FLOOR) {
        total += BALANCED_BONUS;
    }
    if weighted.iter().any(|delta| *delta < COLLAPSE_FLOOR) {
        total -= COLLAPSE_PENALTY;
    }
    if total.is_nan() {
        return 0.0;
    }
    total.clamp(0.0, MAX_SCORE)
}
