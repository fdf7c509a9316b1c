pub mod sensors {
    use bh1750::Bh1750;
    use core::fmt::Debug;
    use log::*;
    use thiserror::Error;

    /// One illuminance sensor.
    pub trait LightSensor {
        type Error: Debug;

        fn read_illuminance(&mut self) -> Result<f32, Self::Error>;
    }

    impl<I2C> LightSensor for Bh1750<I2C>
    where
        I2C: embedded_hal::i2c::I2c,
    {
        type Error = bh1750::Error;

        fn read_illuminance(&mut self) -> Result<f32, Self::Error> {
            self.illuminance()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
    pub enum SampleError {
        #[error("no light sensor returned a usable reading")]
        NoReading,
    }

    /// A single representative illuminance value per control cycle.
    pub trait LightSource {
        fn sample(&mut self) -> Result<f32, SampleError>;
    }

    /// Averages two sensors.
    ///
    /// A reading counts only if the read succeeded and the value is finite and
    /// non-negative. The result is the mean of the readings that count: a
    /// single faulty sensor is skipped, and when both fail the sample is an
    /// error so the caller skips its automatic update.
    pub struct LightAggregator<A, B> {
        first: A,
        second: B,
    }

    impl<A, B> LightAggregator<A, B>
    where
        A: LightSensor,
        B: LightSensor,
    {
        pub fn new(first: A, second: B) -> Self {
            LightAggregator { first, second }
        }
    }

    fn usable<S: LightSensor>(id: u8, sensor: &mut S) -> Option<f32> {
        match sensor.read_illuminance() {
            Ok(lux) if lux.is_finite() && lux >= 0.0 => {
                info!("Light sensor {}: {}", id, lux);
                Some(lux)
            }
            Ok(lux) => {
                warn!("Light sensor {} returned unusable value {}", id, lux);
                None
            }
            Err(e) => {
                warn!("Light sensor {} read failed: {:?}", id, e);
                None
            }
        }
    }

    impl<A, B> LightSource for LightAggregator<A, B>
    where
        A: LightSensor,
        B: LightSensor,
    {
        fn sample(&mut self) -> Result<f32, SampleError> {
            let first = usable(1, &mut self.first);
            let second = usable(2, &mut self.second);
            match (first, second) {
                (Some(a), Some(b)) => Ok((a + b) / 2.0),
                (Some(lux), None) | (None, Some(lux)) => Ok(lux),
                (None, None) => Err(SampleError::NoReading),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use embedded_hal::i2c::ErrorKind;
        use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

        struct Fixed(Result<f32, ()>);

        impl LightSensor for Fixed {
            type Error = ();

            fn read_illuminance(&mut self) -> Result<f32, ()> {
                self.0
            }
        }

        #[test]
        fn averages_two_healthy_readings() {
            let mut light = LightAggregator::new(Fixed(Ok(1000.0)), Fixed(Ok(3000.0)));
            assert_eq!(light.sample(), Ok(2000.0));
        }

        #[test]
        fn falls_back_to_the_healthy_sensor() {
            let mut light = LightAggregator::new(Fixed(Err(())), Fixed(Ok(1200.0)));
            assert_eq!(light.sample(), Ok(1200.0));

            let mut light = LightAggregator::new(Fixed(Ok(800.0)), Fixed(Err(())));
            assert_eq!(light.sample(), Ok(800.0));
        }

        #[test]
        fn sentinel_values_are_not_averaged() {
            // Arduino style drivers report -1 / -2 on failure
            let mut light = LightAggregator::new(Fixed(Ok(-1.0)), Fixed(Ok(500.0)));
            assert_eq!(light.sample(), Ok(500.0));

            let mut light = LightAggregator::new(Fixed(Ok(f32::NAN)), Fixed(Ok(250.0)));
            assert_eq!(light.sample(), Ok(250.0));
        }

        #[test]
        fn both_failed_is_an_error() {
            let mut light = LightAggregator::new(Fixed(Err(())), Fixed(Ok(-2.0)));
            assert_eq!(light.sample(), Err(SampleError::NoReading));
        }

        #[test]
        fn reads_two_bh1750_on_one_bus() {
            let expectations = [
                I2cTransaction::read(0x23, vec![0x12, 0xC0]),
                I2cTransaction::read(0x5C, vec![0x00, 0x00]).with_error(ErrorKind::Other),
            ];
            let mut i2c = I2cMock::new(&expectations);
            let mut light = LightAggregator::new(
                Bh1750::new(i2c.clone(), 0x23),
                Bh1750::new(i2c.clone(), 0x5C),
            );
            // 0x12C0 = 4800 counts = 4000 lux
            assert_eq!(light.sample(), Ok(4000.0));
            i2c.done();
        }
    }
}

pub use sensors::{LightAggregator, LightSensor, LightSource, SampleError};
