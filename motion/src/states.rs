// This module contains the operating mode of the tracker.
// To add or modify modes, edit this file only.

use core::fmt;

/// - Auto: positioned from the averaged light sensors every cycle
/// - Manual: positioned only by segment commands, light sampling suspended
///
/// The tracker boots in `Auto` and only an explicit command changes the mode.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum OperatingMode {
    #[default]
    Auto,
    Manual,
}

impl OperatingMode {
    /// Check if light-driven positioning should run this cycle
    pub fn is_auto(&self) -> bool {
        matches!(self, OperatingMode::Auto)
    }

    /// Check if segment commands are accepted
    pub fn accepts_segments(&self) -> bool {
        matches!(self, OperatingMode::Manual)
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Auto => f.write_str("AUTO"),
            OperatingMode::Manual => f.write_str("MANUAL"),
        }
    }
}
