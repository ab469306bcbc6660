use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use super::constants::{
    GDP_GROWTH_RANGE, INFANT_MORTALITY_RANGE, LIFE_EXPECTANCY_RANGE, LITERACY_RANGE,
    MIN_CO2_EMISSIONS, MIN_POPULATION, POVERTY_RANGE, UNEMPLOYMENT_RANGE,
};

/// Numeric country fields other than policy memory, addressable by their snake_case key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    GdpGrowth,
    Unemployment,
    LiteracyRate,
    LifeExpectancy,
    PovertyRate,
    Co2Emissions,
    InfantMortality,
    Population,
    AgricultureGdpPercent,
    ManufacturingGdpPercent,
    ServicesGdpPercent,
    TariffRevenue,
    ConsumerWelfare,
}

impl Indicator {
    pub const ALL: [Indicator; 13] = [
        Indicator::GdpGrowth,
        Indicator::Unemployment,
        Indicator::LiteracyRate,
        Indicator::LifeExpectancy,
        Indicator::PovertyRate,
        Indicator::Co2Emissions,
        Indicator::InfantMortality,
        Indicator::Population,
        Indicator::AgricultureGdpPercent,
        Indicator::ManufacturingGdpPercent,
        Indicator::ServicesGdpPercent,
        Indicator::TariffRevenue,
        Indicator::ConsumerWelfare,
    ];

    /// Outcome indicators, in export column order.
    pub const OUTCOMES: [Indicator; 8] = [
        Indicator::GdpGrowth,
        Indicator::Unemployment,
        Indicator::LiteracyRate,
        Indicator::LifeExpectancy,
        Indicator::PovertyRate,
        Indicator::Co2Emissions,
        Indicator::InfantMortality,
        Indicator::Population,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Indicator::GdpGrowth => "gdp_growth",
            Indicator::Unemployment => "unemployment",
            Indicator::LiteracyRate => "literacy_rate",
            Indicator::LifeExpectancy => "life_expectancy",
            Indicator::PovertyRate => "poverty_rate",
            Indicator::Co2Emissions => "co2_emissions",
            Indicator::InfantMortality => "infant_mortality",
            Indicator::Population => "population",
            Indicator::AgricultureGdpPercent => "agriculture_gdp_percent",
            Indicator::ManufacturingGdpPercent => "manufacturing_gdp_percent",
            Indicator::ServicesGdpPercent => "services_gdp_percent",
            Indicator::TariffRevenue => "tariff_revenue",
            Indicator::ConsumerWelfare => "consumer_welfare",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|indicator| indicator.key() == key)
    }

    /// Closed interval every update must respect. `None` for unbounded fields.
    pub fn bounds(self) -> Option<(f64, f64)> {
        match self {
            Indicator::GdpGrowth => Some(GDP_GROWTH_RANGE),
            Indicator::Unemployment => Some(UNEMPLOYMENT_RANGE),
            Indicator::LiteracyRate => Some(LITERACY_RANGE),
            Indicator::LifeExpectancy => Some(LIFE_EXPECTANCY_RANGE),
            Indicator::PovertyRate => Some(POVERTY_RANGE),
            Indicator::Co2Emissions => Some((MIN_CO2_EMISSIONS, f64::INFINITY)),
            Indicator::InfantMortality => Some(INFANT_MORTALITY_RANGE),
            Indicator::Population => Some((MIN_POPULATION, f64::INFINITY)),
            _ => None,
        }
    }

    /// Seed value used when neither reference data nor the scenario provides one.
    pub fn fallback_value(self) -> f64 {
        match self {
            Indicator::GdpGrowth => 3.0,
            Indicator::Unemployment => 5.0,
            Indicator::LiteracyRate => 90.0,
            Indicator::LifeExpectancy => 72.0,
            Indicator::PovertyRate => 15.0,
            Indicator::Co2Emissions => 4.0,
            Indicator::InfantMortality => 20.0,
            Indicator::Population => 10_000_000.0,
            Indicator::AgricultureGdpPercent => 10.0,
            Indicator::ManufacturingGdpPercent => 25.0,
            Indicator::ServicesGdpPercent => 55.0,
            Indicator::TariffRevenue | Indicator::ConsumerWelfare => 0.0,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Indicator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key(s.trim()).ok_or_else(|| anyhow!("未知の指標です: {}", s))
    }
}

/// Last realized value of every lever, keyed by memory field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyMemory(BTreeMap<String, f64>);

impl PolicyMemory {
    pub fn get(&self, field: &str) -> Option<f64> {
        self.0.get(field).copied()
    }

    pub fn get_or(&self, field: &str, default: f64) -> f64 {
        self.get(field).unwrap_or(default)
    }

    pub fn set(&mut self, field: impl Into<String>, value: f64) {
        self.0.insert(field.into(), value);
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut f64> {
        self.0.get_mut(field)
    }

}

impl FromIterator<(String, f64)> for PolicyMemory {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryState {
    pub country: String,
    pub year: i32,
    pub gdp_growth: f64,
    pub unemployment: f64,
    pub literacy_rate: f64,
    pub life_expectancy: f64,
    pub poverty_rate: f64,
    pub co2_emissions: f64,
    pub infant_mortality: f64,
    pub population: f64,
    pub agriculture_gdp_percent: f64,
    pub manufacturing_gdp_percent: f64,
    pub services_gdp_percent: f64,
    pub tariff_revenue: f64,
    pub consumer_welfare: f64,
    #[serde(default)]
    pub policy: PolicyMemory,
}

impl CountryState {
    /// A state with every indicator at its fallback value.
    pub fn new(country: impl Into<String>, year: i32) -> Self {
        let mut state = Self {
            country: country.into(),
            year,
            gdp_growth: 0.0,
            unemployment: 0.0,
            literacy_rate: 0.0,
            life_expectancy: 0.0,
            poverty_rate: 0.0,
            co2_emissions: 0.0,
            infant_mortality: 0.0,
            population: 0.0,
            agriculture_gdp_percent: 0.0,
            manufacturing_gdp_percent: 0.0,
            services_gdp_percent: 0.0,
            tariff_revenue: 0.0,
            consumer_welfare: 0.0,
            policy: PolicyMemory::default(),
        };
        for indicator in Indicator::ALL {
            state.set_indicator(indicator, indicator.fallback_value());
        }
        state
    }

    pub fn indicator(&self, indicator: Indicator) -> f64 {
        match indicator {
            Indicator::GdpGrowth => self.gdp_growth,
            Indicator::Unemployment => self.unemployment,
            Indicator::LiteracyRate => self.literacy_rate,
            Indicator::LifeExpectancy => self.life_expectancy,
            Indicator::PovertyRate => self.poverty_rate,
            Indicator::Co2Emissions => self.co2_emissions,
            Indicator::InfantMortality => self.infant_mortality,
            Indicator::Population => self.population,
            Indicator::AgricultureGdpPercent => self.agriculture_gdp_percent,
            Indicator::ManufacturingGdpPercent => self.manufacturing_gdp_percent,
            Indicator::ServicesGdpPercent => self.services_gdp_percent,
            Indicator::TariffRevenue => self.tariff_revenue,
            Indicator::ConsumerWelfare => self.consumer_welfare,
        }
    }

    pub fn indicator_mut(&mut self, indicator: Indicator) -> &mut f64 {
        match indicator {
            Indicator::GdpGrowth => &mut self.gdp_growth,
            Indicator::Unemployment => &mut self.unemployment,
            Indicator::LiteracyRate => &mut self.literacy_rate,
            Indicator::LifeExpectancy => &mut self.life_expectancy,
            Indicator::PovertyRate => &mut self.poverty_rate,
            Indicator::Co2Emissions => &mut self.co2_emissions,
            Indicator::InfantMortality => &mut self.infant_mortality,
            Indicator::Population => &mut self.population,
            Indicator::AgricultureGdpPercent => &mut self.agriculture_gdp_percent,
            Indicator::ManufacturingGdpPercent => &mut self.manufacturing_gdp_percent,
            Indicator::ServicesGdpPercent => &mut self.services_gdp_percent,
            Indicator::TariffRevenue => &mut self.tariff_revenue,
            Indicator::ConsumerWelfare => &mut self.consumer_welfare,
        }
    }

    pub fn set_indicator(&mut self, indicator: Indicator, value: f64) {
        *self.indicator_mut(indicator) = value;
    }

    /// Looks a numeric field up by name: indicators first, then policy memory.
    pub fn field(&self, name: &str) -> Option<f64> {
        match Indicator::from_key(name) {
            Some(indicator) => Some(self.indicator(indicator)),
            None => self.policy.get(name),
        }
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        match Indicator::from_key(name) {
            Some(indicator) => Some(self.indicator_mut(indicator)),
            None => self.policy.get_mut(name),
        }
    }

    pub fn clamp_bounds(&mut self) {
        for indicator in Indicator::ALL {
            if let Some((min, max)) = indicator.bounds() {
                let value = self.indicator_mut(indicator);
                *value = if value.is_nan() { min } else { value.clamp(min, max) };
            }
        }
    }

    pub fn clamped(mut self) -> Self {
        self.clamp_bounds();
        self
    }

    pub fn is_within_bounds(&self) -> bool {
        Indicator::ALL.into_iter().all(|indicator| match indicator.bounds() {
            Some((min, max)) => {
                let value = self.indicator(indicator);
                value >= min && value <= max
            }
            None => true,
        })
    }
}

/// Scenario seed for one country.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryDefinition {
    pub name: String,
    pub population: f64,
    pub agriculture_gdp_percent: f64,
    pub manufacturing_gdp_percent: f64,
    pub services_gdp_percent: f64,
    /// Outcome values used when the indicator table has nothing for this country.
    #[serde(default)]
    pub indicators: BTreeMap<Indicator, f64>,
    /// Initial policy memory, keyed by memory field.
    #[serde(default)]
    pub policies: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_keys_round_trip() {
        for indicator in Indicator::ALL {
            assert_eq!(Indicator::from_key(indicator.key()), Some(indicator));
        }
        assert!("gdp".parse::<Indicator>().is_err());
    }

    #[test]
    fn serde_names_match_field_keys() {
        let json = serde_json::to_string(&Indicator::Co2Emissions).unwrap();
        assert_eq!(json, "\"co2_emissions\"");
    }

    #[test]
    fn field_lookup_covers_indicators_and_memory() {
        let mut state = CountryState::new("Asteria", 2024);
        state.policy.set("tariff_rate", 12.0);
        assert_eq!(state.field("literacy_rate"), Some(90.0));
        assert_eq!(state.field("tariff_rate"), Some(12.0));
        assert_eq!(state.field("morale"), None);

        *state.field_mut("gdp_growth").unwrap() += 1.0;
        assert_eq!(state.gdp_growth, 4.0);
        assert!(state.field_mut("morale").is_none());
    }

    #[test]
    fn clamping_is_idempotent() {
        let mut state = CountryState::new("Asteria", 2024);
        state.gdp_growth = 40.0;
        state.unemployment = -3.0;
        state.population = 10.0;
        state.co2_emissions = f64::NAN;
        let once = state.clamped();
        assert!(once.is_within_bounds());
        assert_eq!(once.gdp_growth, 15.0);
        assert_eq!(once.unemployment, 0.5);
        assert_eq!(once.population, 100_000.0);
        assert_eq!(once.co2_emissions, 0.0);
        let twice = once.clone().clamped();
        assert_eq!(once, twice);
    }
}
