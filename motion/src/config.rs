use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::MotorConfig;
use crate::geometry::SegmentLayout;
use crate::tracker::LightRange;

/// Rejected configuration values. Raised before any hardware is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("steps_per_rev must be greater than zero")]
    StepsPerRev,
    #[error("microstepping must be greater than zero")]
    Microstepping,
    #[error("segment count {0} must be between 1 and 254")]
    SegmentCount(u16),
    #[error("degrees_per_segment must be greater than zero")]
    DegreesPerSegment,
    #[error("light range {min}..{max} lux is empty")]
    LightRange { min: i32, max: i32 },
    #[error("update_interval_ms must be greater than zero")]
    UpdateInterval,
}

/// The position-control part of the tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub motor: MotorSettings,
    pub segments: SegmentSettings,
    #[serde(default)]
    pub light: LightSettings,
    #[serde(default)]
    pub control: ControlSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorSettings {
    pub steps_per_rev: u32,
    pub microstepping: u32,
    pub rpm: i32,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u32,
    #[serde(default = "default_true")]
    pub enable_active_low: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSettings {
    pub count: u16,
    #[serde(default = "default_degrees_per_segment")]
    pub degrees_per_segment: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSettings {
    pub min_lux: i32,
    pub max_lux: i32,
}

impl Default for LightSettings {
    fn default() -> Self {
        LightSettings {
            min_lux: 0,
            max_lux: 4000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default = "default_true")]
    pub persist_position: bool,
    #[serde(default = "default_true")]
    pub command_channel: bool,
}

impl Default for ControlSettings {
    fn default() -> Self {
        ControlSettings {
            update_interval_ms: default_update_interval_ms(),
            persist_position: true,
            command_channel: true,
        }
    }
}

fn default_settle_ms() -> u32 {
    50
}

fn default_degrees_per_segment() -> u16 {
    360
}

fn default_update_interval_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl TrackerConfig {
    pub fn motor_config(&self) -> Result<MotorConfig, ConfigError> {
        let motor = &self.motor;
        Ok(
            MotorConfig::new(motor.steps_per_rev, motor.microstepping, motor.rpm)?
                .with_settle_ms(motor.settle_ms)
                .with_enable_active_low(motor.enable_active_low),
        )
    }

    /// The count has to fit the persisted byte and stay clear of the 255
    /// value an erased store reads back.
    pub fn segment_layout(&self) -> Result<SegmentLayout, ConfigError> {
        let segments = &self.segments;
        let count =
            u8::try_from(segments.count).map_err(|_| ConfigError::SegmentCount(segments.count))?;
        SegmentLayout::new(count, segments.degrees_per_segment)
    }

    pub fn light_range(&self) -> Result<LightRange, ConfigError> {
        LightRange::new(self.light.min_lux, self.light.max_lux)
    }

    pub fn update_interval(&self) -> Result<Duration, ConfigError> {
        match self.control.update_interval_ms {
            0 => Err(ConfigError::UpdateInterval),
            ms => Ok(Duration::from_millis(ms)),
        }
    }

    /// Checks every section at once so a bad file fails at boot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.motor_config()?;
        self.segment_layout()?;
        self.light_range()?;
        self.update_interval()?;
        Ok(())
    }
}
