use core::fmt::Debug;

use log::*;

use crate::driver::Drive;
use crate::geometry::{degrees_to_microsteps, SegmentLayout};

/// What an erased EEPROM or a missing NVS key reads back as.
pub const ERASED: u8 = 0xFF;

/// Single byte of non-volatile storage holding the committed segment.
pub trait PositionStorage {
    type Error: Debug;

    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Writes `value`, skipping the write when it is already stored.
    fn update_byte(&mut self, value: u8) -> Result<(), Self::Error>;
}

/// Owns the motor and the persisted segment.
///
/// `current` always mirrors the last committed move; with storage attached it
/// also mirrors the stored byte. Without storage the tracker forgets its
/// position across resets and starts from segment 0.
pub struct PositionStore<M, S> {
    motor: M,
    storage: Option<S>,
    layout: SegmentLayout,
    current: u8,
}

impl<M, S> PositionStore<M, S>
where
    M: Drive,
    S: PositionStorage,
{
    pub fn new(motor: M, storage: Option<S>, layout: SegmentLayout) -> Self {
        PositionStore {
            motor,
            storage,
            layout,
            current: 0,
        }
    }

    pub fn current(&self) -> u8 {
        self.current
    }

    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }

    pub fn storage(&self) -> Option<&S> {
        self.storage.as_ref()
    }

    /// Loads the persisted segment. Anything outside `[0, count]` (including a
    /// failed read) resets the position to 0 and rewrites the store.
    ///
    /// The motor is not moved: the last committed segment is trusted to match
    /// the physical orientation.
    pub fn restore(&mut self) -> u8 {
        let Some(storage) = self.storage.as_mut() else {
            info!("Position persistence disabled, starting at segment 0");
            self.current = 0;
            return 0;
        };

        let stored = match storage.read_byte() {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read stored segment: {:?}", e);
                ERASED
            }
        };

        if self.layout.contains(stored as i32) {
            info!("Restored segment {} from storage", stored);
            self.current = stored;
        } else {
            warn!(
                "Stored segment {} outside 0..={}, resetting to 0",
                stored,
                self.layout.max_segment()
            );
            self.current = 0;
            self.persist();
        }
        self.current
    }

    /// Rotates to `target` (clamped) and commits it. Returns the degrees
    /// rotated, 0 when already there.
    pub fn move_to(&mut self, target: i32) -> i32 {
        let target = self.layout.clamp(target);
        if target == self.current {
            return 0;
        }

        let degrees = self.layout.delta_degrees(self.current, target);
        let microsteps = degrees_to_microsteps(degrees as i64, self.motor.config());
        debug!(
            "Segment {} -> {}: {} deg, {} microsteps",
            self.current, target, degrees, microsteps
        );
        if let Err(e) = self.motor.drive(microsteps) {
            // Open loop: nothing tells us where the shaft stopped.
            error!("Motor drive failed: {}", e);
        }

        self.current = target;
        self.persist();
        degrees
    }

    pub fn move_by(&mut self, relative: i32) -> i32 {
        self.move_to((self.current as i32).saturating_add(relative))
    }

    /// Turns the motor without updating the tracked segment or storage.
    ///
    /// Used for fine mechanical adjustment. Afterwards `current` no longer
    /// matches the physical orientation.
    pub fn move_raw_degrees(&mut self, degrees: i32) {
        let microsteps = degrees_to_microsteps(degrees as i64, self.motor.config());
        info!("Raw move of {} deg ({} microsteps)", degrees, microsteps);
        if let Err(e) = self.motor.drive(microsteps) {
            error!("Motor drive failed: {}", e);
        }
    }

    fn persist(&mut self) {
        let current = self.current;
        if let Some(storage) = self.storage.as_mut() {
            match storage.update_byte(current) {
                Ok(()) => debug!("Stored segment {}", current),
                Err(e) => warn!("Failed to store segment {}: {:?}", current, e),
            }
        }
    }
}
