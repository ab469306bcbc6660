pub(crate) const GDP_GROWTH_RANGE: (f64, f64) = (-10.0, 15.0);
pub(crate) const UNEMPLOYMENT_RANGE: (f64, f64) = (0.5, 50.0);
pub(crate) const LITERACY_RANGE: (f64, f64) = (0.0, 100.0);
pub(crate) const LIFE_EXPECTANCY_RANGE: (f64, f64) = (45.0, 90.0);
pub(crate) const POVERTY_RANGE: (f64, f64) = (0.0, 90.0);
pub(crate) const INFANT_MORTALITY_RANGE: (f64, f64) = (1.0, 150.0);
pub(crate) const MIN_CO2_EMISSIONS: f64 = 0.0;
pub(crate) const MIN_POPULATION: f64 = 100_000.0;

pub(crate) const MAX_TRADE_VOLUME: f64 = 100.0;
pub(crate) const MAX_TARIFF_RATE: f64 = 50.0;
pub(crate) const MAX_COOPERATION: f64 = 100.0;

pub(crate) const GDP_JITTER: f64 = 0.25;
pub(crate) const DEFAULT_COOPERATION_INDEX: f64 = 50.0;
