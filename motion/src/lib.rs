//! Position control for a segment tracker: geometry, stepper drive,
//! persisted position and the AUTO/MANUAL controller.

pub mod command;
pub mod config;
pub mod driver;
pub mod geometry;
pub mod position;
pub mod states;
pub mod tracker;

pub use command::{Command, CommandSource, LineBuffer};
pub use config::{ConfigError, LightSettings, TrackerConfig};
pub use driver::{Drive, DriverError, MotorConfig, MotorDriver, NoEnable};
pub use geometry::SegmentLayout;
pub use position::{PositionStorage, PositionStore};
pub use states::OperatingMode;
pub use tracker::{LightRange, Tick, Tracker};
