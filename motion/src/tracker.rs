use log::*;
use sensors::LightSource;

use crate::command::{Command, CommandSource};
use crate::config::ConfigError;
use crate::driver::Drive;
use crate::geometry::SegmentLayout;
use crate::position::{PositionStorage, PositionStore};
use crate::states::OperatingMode;

/// Illuminance span mapped linearly onto `[0, count]` in automatic mode.
/// Never empty: `min_lux < max_lux`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightRange {
    min_lux: i32,
    max_lux: i32,
}

impl LightRange {
    pub fn new(min_lux: i32, max_lux: i32) -> Result<Self, ConfigError> {
        if max_lux <= min_lux {
            return Err(ConfigError::LightRange {
                min: min_lux,
                max: max_lux,
            });
        }
        Ok(LightRange { min_lux, max_lux })
    }

    pub fn min_lux(&self) -> i32 {
        self.min_lux
    }

    pub fn max_lux(&self) -> i32 {
        self.max_lux
    }
}

impl Default for LightRange {
    fn default() -> Self {
        LightRange {
            min_lux: 0,
            max_lux: 4000,
        }
    }
}

/// Integer linear interpolation on the truncated lux value, clamped at both
/// ends: below `min_lux` is segment 0, above `max_lux` is the last segment.
pub fn lux_to_segment(lux: f32, range: &LightRange, layout: &SegmentLayout) -> u8 {
    let min = range.min_lux() as i64;
    let max = range.max_lux() as i64;
    // `as` saturates and maps NaN to 0
    let lux = (lux as i64).clamp(min, max);
    let mapped = (lux - min) * layout.count() as i64 / (max - min);
    layout.clamp(mapped as i32)
}

/// What a single control cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick {
    pub command: Option<Command>,
    /// Degrees turned in response to a command.
    pub manual_rotation: i32,
    /// Degrees turned by the light-driven update, `None` when it did not run.
    pub auto_rotation: Option<i32>,
}

/// Arbitrates between light-driven and operator-driven positioning.
pub struct Tracker<M, S, L, C> {
    store: PositionStore<M, S>,
    light: L,
    commands: Option<C>,
    light_range: LightRange,
    mode: OperatingMode,
}

impl<M, S, L, C> Tracker<M, S, L, C>
where
    M: Drive,
    S: PositionStorage,
    L: LightSource,
    C: CommandSource,
{
    pub fn new(
        store: PositionStore<M, S>,
        light: L,
        commands: Option<C>,
        light_range: LightRange,
    ) -> Self {
        Tracker {
            store,
            light,
            commands,
            light_range,
            mode: OperatingMode::default(),
        }
    }

    /// Restores the persisted segment. Call once before the first tick.
    pub fn start(&mut self) -> u8 {
        let segment = self.store.restore();
        info!("Tracker starting at segment {} in {} mode", segment, self.mode);
        segment
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn current_segment(&self) -> u8 {
        self.store.current()
    }

    pub fn store(&self) -> &PositionStore<M, S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PositionStore<M, S> {
        &mut self.store
    }

    /// One control cycle: at most one command, then the automatic update if
    /// the tracker is in `Auto`. Idling between cycles is up to the caller.
    pub fn tick(&mut self) -> Tick {
        let mut tick = Tick::default();

        let line = self.commands.as_mut().and_then(|source| source.read_line());
        if let Some(line) = line {
            match Command::parse(&line) {
                Some(command) => {
                    tick.command = Some(command);
                    tick.manual_rotation = self.dispatch(command);
                }
                None => debug!("Ignoring unrecognised command {:?}", line.as_str()),
            }
        }

        if self.mode.is_auto() {
            tick.auto_rotation = self.auto_update();
        }
        tick
    }

    /// Applies a command and returns the degrees rotated because of it.
    pub fn dispatch(&mut self, command: Command) -> i32 {
        match command {
            Command::Auto => {
                self.set_mode(OperatingMode::Auto);
                0
            }
            Command::Manual => {
                self.set_mode(OperatingMode::Manual);
                0
            }
            Command::Segment(segment) if !self.mode.accepts_segments() => {
                debug!("Ignoring segment {} while in {} mode", segment, self.mode);
                0
            }
            Command::Segment(segment) if !self.store.layout().contains(segment) => {
                debug!(
                    "Ignoring segment {} outside 0..={}",
                    segment,
                    self.store.layout().max_segment()
                );
                0
            }
            Command::Segment(segment) => {
                let rotated = self.store.move_to(segment);
                self.report_move(rotated);
                rotated
            }
        }
    }

    /// Samples the light sensors and moves to the matching segment. Returns
    /// `None` when no usable reading was available this cycle.
    pub fn auto_update(&mut self) -> Option<i32> {
        let lux = match self.light.sample() {
            Ok(lux) => lux,
            Err(e) => {
                warn!("Skipping automatic update: {}", e);
                return None;
            }
        };

        let target = lux_to_segment(lux, &self.light_range, self.store.layout());
        debug!("Average light {} lux -> segment {}", lux, target);
        let rotated = self.store.move_to(target as i32);
        self.report_move(rotated);
        Some(rotated)
    }

    fn set_mode(&mut self, mode: OperatingMode) {
        if self.mode != mode {
            info!("Switching from {} to {} mode", self.mode, mode);
        }
        self.mode = mode;
    }

    fn report_move(&self, rotated: i32) {
        if rotated != 0 {
            info!(
                "Moved to segment {} (rotated {} deg)",
                self.store.current(),
                rotated
            );
        }
    }
}
