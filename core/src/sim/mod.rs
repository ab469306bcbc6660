mod bootstrap;
mod constants;
mod country;
mod decision;
mod export;
mod indicators;
mod levers;
mod products;
mod state;
pub mod systems;
mod trade;

pub use bootstrap::{SimulationBuilder, embedded_definitions, load_definitions};
pub use country::{CountryDefinition, CountryState, Indicator, PolicyMemory};
pub use decision::{DecisionSource, HeuristicAdvisor, HoldCourse, PolicyDecision, decision_value};
pub use export::write_history;
pub use indicators::IndicatorTable;
pub use levers::{LeverDefinition, LeverResponse, LeverTable, ResponseMode, SectorShare};
pub use products::{ProductFlow, ProductFlowEntry, TradeProductCatalog};
pub use state::{Simulation, YearReport};
pub use trade::{TradeGraph, TradeRelationship};
