//! Constant-speed step/direction stepper driver.
//!
//! The enable line, when wired, is held only for the length of a pulse train
//! plus the settle delay, so the coil is unpowered between moves.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorKind, ErrorType, OutputPin};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while driving the stepper outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("stepper output pin failed: {0:?}")]
    Pin(ErrorKind),
}

fn pin_error<E: embedded_hal::digital::Error>(err: E) -> DriverError {
    DriverError::Pin(err.kind())
}

/// Immutable stepper configuration. Step timing is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorConfig {
    steps_per_rev: u32,
    microstepping: u32,
    rpm: u32,
    settle_ms: u32,
    enable_active_low: bool,
}

impl MotorConfig {
    /// An RPM below 1 is clamped to 1 here so the drive loop never sees it.
    pub fn new(steps_per_rev: u32, microstepping: u32, rpm: i32) -> Result<Self, ConfigError> {
        if steps_per_rev == 0 {
            return Err(ConfigError::StepsPerRev);
        }
        if microstepping == 0 {
            return Err(ConfigError::Microstepping);
        }
        let rpm = if rpm < 1 {
            log::warn!("Motor rpm {} is below 1, clamping to 1", rpm);
            1
        } else {
            rpm as u32
        };

        Ok(MotorConfig {
            steps_per_rev,
            microstepping,
            rpm,
            settle_ms: 50,
            enable_active_low: true,
        })
    }

    pub fn with_settle_ms(mut self, settle_ms: u32) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    pub fn with_enable_active_low(mut self, active_low: bool) -> Self {
        self.enable_active_low = active_low;
        self
    }

    pub fn rpm(&self) -> u32 {
        self.rpm
    }

    pub fn settle_ms(&self) -> u32 {
        self.settle_ms
    }

    pub fn microsteps_per_rev(&self) -> i64 {
        self.steps_per_rev as i64 * self.microstepping as i64
    }

    pub fn steps_per_second(&self) -> i64 {
        self.microsteps_per_rev() * self.rpm as i64 / 60
    }

    /// Half of one step period in microseconds, never less than 1.
    pub fn half_period_us(&self) -> u32 {
        match self.steps_per_second() {
            0 => 500_000,
            sps => (500_000 / sps).max(1) as u32,
        }
    }
}

/// Something that can turn the tracker by a signed number of microsteps.
///
/// Implementors block until the rotation is complete.
pub trait Drive {
    fn config(&self) -> &MotorConfig;

    fn drive(&mut self, microsteps: i64) -> Result<(), DriverError>;
}

/// Placeholder for boards that hard-wire the driver enable input.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnable;

impl ErrorType for NoEnable {
    type Error = Infallible;
}

impl OutputPin for NoEnable {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Step/direction stepper driver (TB6600, A4988, DRV8825 style) generating a
/// constant-speed square wave with a busy-wait delay.
pub struct MotorDriver<Step, Dir, En, D> {
    step: Step,
    direction: Dir,
    enable: Option<En>,
    delay: D,
    config: MotorConfig,
}

impl<Step, Dir, D> MotorDriver<Step, Dir, NoEnable, D>
where
    Step: OutputPin,
    Dir: OutputPin,
    D: DelayNs,
{
    pub fn new(step: Step, direction: Dir, delay: D, config: MotorConfig) -> Self {
        MotorDriver {
            step,
            direction,
            enable: None,
            delay,
            config,
        }
    }
}

impl<Step, Dir, En, D> MotorDriver<Step, Dir, En, D>
where
    Step: OutputPin,
    Dir: OutputPin,
    En: OutputPin,
    D: DelayNs,
{
    /// Builds a driver with an enable output. The motor starts de-energised.
    pub fn with_enable(
        step: Step,
        direction: Dir,
        enable: En,
        delay: D,
        config: MotorConfig,
    ) -> Result<Self, DriverError> {
        let mut driver = MotorDriver {
            step,
            direction,
            enable: Some(enable),
            delay,
            config,
        };
        driver.set_enabled(false)?;
        Ok(driver)
    }

    fn set_direction(&mut self, forward: bool) -> Result<(), DriverError> {
        if forward {
            self.direction.set_high().map_err(pin_error)
        } else {
            self.direction.set_low().map_err(pin_error)
        }
    }

    fn set_enabled(&mut self, energised: bool) -> Result<(), DriverError> {
        let active_low = self.config.enable_active_low;
        let Some(enable) = self.enable.as_mut() else {
            return Ok(());
        };
        if energised != active_low {
            enable.set_high().map_err(pin_error)
        } else {
            enable.set_low().map_err(pin_error)
        }
    }

    fn pulse(&mut self, half_period_us: u32) -> Result<(), DriverError> {
        self.step.set_high().map_err(pin_error)?;
        self.delay.delay_us(half_period_us);
        self.step.set_low().map_err(pin_error)?;
        self.delay.delay_us(half_period_us);
        Ok(())
    }

    fn pulse_train(&mut self, pulses: u64, half_period_us: u32) -> Result<(), DriverError> {
        for _ in 0..pulses {
            self.pulse(half_period_us)?;
        }
        Ok(())
    }
}

impl<Step, Dir, En, D> Drive for MotorDriver<Step, Dir, En, D>
where
    Step: OutputPin,
    Dir: OutputPin,
    En: OutputPin,
    D: DelayNs,
{
    fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// Blocks for `|microsteps| * 2 * half_period` plus the settle delay.
    fn drive(&mut self, microsteps: i64) -> Result<(), DriverError> {
        if microsteps == 0 {
            return Ok(());
        }
        let half_period_us = self.config.half_period_us();

        self.set_direction(microsteps > 0)?;
        self.set_enabled(true)?;
        let pulsed = self.pulse_train(microsteps.unsigned_abs(), half_period_us);

        // Release the coils even when the train was cut short.
        if self.enable.is_some() {
            self.delay.delay_ms(self.config.settle_ms);
        }
        let released = self.set_enabled(false);
        pulsed.and(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Wait {
        Us(u32),
        Ms(u32),
    }

    #[derive(Clone, Default)]
    struct RecordingDelay(Rc<RefCell<Vec<Wait>>>);

    impl RecordingDelay {
        fn waits(&self) -> Vec<Wait> {
            self.0.borrow().clone()
        }
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(Wait::Us(ns / 1000));
        }

        fn delay_us(&mut self, us: u32) {
            self.0.borrow_mut().push(Wait::Us(us));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().push(Wait::Ms(ms));
        }
    }

    fn pulses(count: usize) -> Vec<PinTransaction> {
        let mut expectations = Vec::new();
        for _ in 0..count {
            expectations.push(PinTransaction::set(PinState::High));
            expectations.push(PinTransaction::set(PinState::Low));
        }
        expectations
    }

    #[test]
    fn half_period_follows_rpm() {
        // 6400 microsteps/rev at 60 rpm is 6400 steps/s
        let config = MotorConfig::new(200, 32, 60).unwrap();
        assert_eq!(config.steps_per_second(), 6400);
        assert_eq!(config.half_period_us(), 78);

        let slow = MotorConfig::new(200, 1, 1).unwrap();
        assert_eq!(slow.steps_per_second(), 3);
        assert_eq!(slow.half_period_us(), 166_666);

        let fast = MotorConfig::new(200, 256, 1000).unwrap();
        assert_eq!(fast.half_period_us(), 1);
    }

    #[test]
    fn zero_steps_per_second_uses_longest_period() {
        let config = MotorConfig::new(1, 1, 1).unwrap();
        assert_eq!(config.steps_per_second(), 0);
        assert_eq!(config.half_period_us(), 500_000);
    }

    #[test]
    fn rpm_below_one_is_clamped() {
        assert_eq!(MotorConfig::new(200, 32, 0).unwrap().rpm(), 1);
        assert_eq!(MotorConfig::new(200, 32, -30).unwrap().rpm(), 1);
    }

    #[test]
    fn zero_geometry_is_rejected() {
        assert_eq!(
            MotorConfig::new(0, 32, 60).unwrap_err(),
            ConfigError::StepsPerRev
        );
        assert_eq!(
            MotorConfig::new(200, 0, 60).unwrap_err(),
            ConfigError::Microstepping
        );
    }

    #[test]
    fn zero_microsteps_touches_nothing() {
        let mut step = PinMock::new(&[]);
        let mut dir = PinMock::new(&[]);
        let delay = RecordingDelay::default();
        let config = MotorConfig::new(200, 32, 60).unwrap();

        let mut driver = MotorDriver::new(step.clone(), dir.clone(), delay.clone(), config);
        driver.drive(0).unwrap();

        assert!(delay.waits().is_empty());
        step.done();
        dir.done();
    }

    #[test]
    fn forward_drive_sets_direction_high_and_pulses() {
        let mut step = PinMock::new(&pulses(3));
        let mut dir = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let delay = RecordingDelay::default();
        let config = MotorConfig::new(200, 32, 60).unwrap();

        let mut driver = MotorDriver::new(step.clone(), dir.clone(), delay.clone(), config);
        driver.drive(3).unwrap();

        assert_eq!(delay.waits(), vec![Wait::Us(78); 6]);
        step.done();
        dir.done();
    }

    #[test]
    fn reverse_drive_sets_direction_low() {
        let mut step = PinMock::new(&pulses(2));
        let mut dir = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let delay = RecordingDelay::default();
        let config = MotorConfig::new(200, 32, 60).unwrap();

        let mut driver = MotorDriver::new(step.clone(), dir.clone(), delay.clone(), config);
        driver.drive(-2).unwrap();

        assert_eq!(delay.waits().len(), 4);
        step.done();
        dir.done();
    }

    #[test]
    fn enable_wraps_the_pulse_train() {
        let mut step = PinMock::new(&pulses(1));
        let mut dir = PinMock::new(&[PinTransaction::set(PinState::High)]);
        // active low: released at construction, energised, released again
        let mut enable = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let delay = RecordingDelay::default();
        let config = MotorConfig::new(200, 32, 60).unwrap().with_settle_ms(20);

        let mut driver = MotorDriver::with_enable(
            step.clone(),
            dir.clone(),
            enable.clone(),
            delay.clone(),
            config,
        )
        .unwrap();
        driver.drive(1).unwrap();

        assert_eq!(
            delay.waits(),
            vec![Wait::Us(78), Wait::Us(78), Wait::Ms(20)]
        );
        step.done();
        dir.done();
        enable.done();
    }

    #[test]
    fn active_high_enable_polarity() {
        let mut step = PinMock::new(&pulses(1));
        let mut dir = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut enable = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let config = MotorConfig::new(200, 32, 60)
            .unwrap()
            .with_enable_active_low(false);

        let mut driver = MotorDriver::with_enable(
            step.clone(),
            dir.clone(),
            enable.clone(),
            RecordingDelay::default(),
            config,
        )
        .unwrap();
        driver.drive(-1).unwrap();

        step.done();
        dir.done();
        enable.done();
    }
}
