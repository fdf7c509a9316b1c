//! Conversions between segment indices, degrees and motor microsteps.
//!
//! Everything in here is pure integer arithmetic. Degrees and microsteps are
//! carried as `i64` so a full sweep across every segment at high microstepping
//! never overflows.

use crate::config::ConfigError;
use crate::driver::MotorConfig;
use crate::position::ERASED;

/// Converts an angle into a signed microstep count, truncating toward zero.
pub fn degrees_to_microsteps(degrees: i64, motor: &MotorConfig) -> i64 {
    degrees * motor.microsteps_per_rev() / 360
}

/// Inverse of [`degrees_to_microsteps`], used for diagnostics only.
pub fn microsteps_to_degrees(microsteps: i64, motor: &MotorConfig) -> i64 {
    microsteps * 360 / motor.microsteps_per_rev()
}

/// The discrete positions the tracker can occupy: segments `0..=count`, each
/// spanning `degrees_per_segment` degrees of motor rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    count: u8,
    degrees_per_segment: u16,
}

impl SegmentLayout {
    /// `count` must be in `1..=254`: the index is persisted as one byte and
    /// 255 is what an erased store reads back.
    pub fn new(count: u8, degrees_per_segment: u16) -> Result<Self, ConfigError> {
        if count == 0 || count == ERASED {
            return Err(ConfigError::SegmentCount(count as u16));
        }
        if degrees_per_segment == 0 {
            return Err(ConfigError::DegreesPerSegment);
        }
        Ok(SegmentLayout {
            count,
            degrees_per_segment,
        })
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn degrees_per_segment(&self) -> u16 {
        self.degrees_per_segment
    }

    /// Highest legal segment index.
    pub fn max_segment(&self) -> u8 {
        self.count
    }

    pub fn contains(&self, segment: i32) -> bool {
        (0..=self.count as i32).contains(&segment)
    }

    /// Clamps a raw target into `[0, count]`.
    pub fn clamp(&self, segment: i32) -> u8 {
        segment.clamp(0, self.count as i32) as u8
    }

    /// Signed rotation in degrees needed to go from `from` to `to`.
    pub fn delta_degrees(&self, from: u8, to: u8) -> i32 {
        (to as i32 - from as i32) * self.degrees_per_segment as i32
    }
}
