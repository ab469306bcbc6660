mod error;
mod sim;

pub use error::{EngineError, TradeGraphError};
pub use sim::systems::events::{
    EventCatalog, EventDefinition, RegionalEvent, RegionalEventGenerator, cooperation_index,
    merge_effects,
};
pub use sim::systems::policy::{EventEffects, apply as apply_policies};
pub use sim::systems::scoring::score;
pub use sim::systems::spillover::{
    DetailedSpillover, Magnitude, PolicyCategory, PolicySpillover, PolicyType, Timeframe,
    classify_product, detailed as detailed_spillovers, simulate_regional,
};
pub use sim::*;
