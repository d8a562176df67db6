pub mod cache;
pub mod calendar;
pub mod config;
pub mod error;
pub mod types;

pub use cache::{HeatCache, TtlCache};
pub use calendar::{Calendar, TimePeriod};
pub use config::{ConfigError, GateConfig};
pub use error::{GateError, Result};
pub use types::{Actor, ActorId, BlockPos, DoorId, Scope, Tri};
