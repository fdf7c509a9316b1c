#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

/// All possible errors in this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// I²C bus error
    Comm,
}

/// Measurement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// 1 lx resolution, 120 ms per measurement (default)
    #[default]
    ContinuousHighRes,
    /// 0.5 lx resolution, 120 ms per measurement
    ContinuousHighRes2,
    /// 4 lx resolution, 16 ms per measurement
    ContinuousLowRes,
}

impl Mode {
    fn opcode(self) -> u8 {
        match self {
            Mode::ContinuousHighRes => Opcode::CONT_HIGH_RES,
            Mode::ContinuousHighRes2 => Opcode::CONT_HIGH_RES_2,
            Mode::ContinuousLowRes => Opcode::CONT_LOW_RES,
        }
    }

    /// Raw counts to lux with the default measurement time. The datasheet
    /// divides by 1.2, done here as `* 10 / 12` so round values stay exact.
    fn to_lux(self, raw: u16) -> f32 {
        let lux = raw as f32 * 10.0 / 12.0;
        match self {
            Mode::ContinuousHighRes2 => lux / 2.0,
            _ => lux,
        }
    }
}

struct Opcode;

impl Opcode {
    const POWER_DOWN: u8 = 0x00;
    const POWER_ON: u8 = 0x01;
    const RESET: u8 = 0x07;
    const CONT_HIGH_RES: u8 = 0x10;
    const CONT_HIGH_RES_2: u8 = 0x11;
    const CONT_LOW_RES: u8 = 0x13;
}

/// Address with the ADDR pin low
pub const ADDRESS_LOW: u8 = 0x23;
/// Address with the ADDR pin high
pub const ADDRESS_HIGH: u8 = 0x5C;

/// BH1750 ambient light sensor driver
#[derive(Debug)]
pub struct Bh1750<I2C> {
    i2c: I2C,
    address: u8,
    mode: Mode,
}

impl<I2C> Bh1750<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Create a new instance. Nothing is sent until [`init`](#method.init).
    pub fn new(i2c: I2C, address: u8) -> Self {
        Bh1750 {
            i2c,
            address,
            mode: Mode::default(),
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Power the sensor on and start continuous measurement in `mode`.
    pub fn init(&mut self, mode: Mode) -> Result<(), Error> {
        self.power_on()?;
        self.set_mode(mode)
    }

    pub fn power_on(&mut self) -> Result<(), Error> {
        self.write_opcode(Opcode::POWER_ON)
    }

    pub fn power_down(&mut self) -> Result<(), Error> {
        self.write_opcode(Opcode::POWER_DOWN)
    }

    /// Clear the data register. Only valid while powered on.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.write_opcode(Opcode::RESET)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error> {
        self.write_opcode(mode.opcode())?;
        self.mode = mode;
        Ok(())
    }

    /// Read the latest measurement in lux.
    pub fn illuminance(&mut self) -> Result<f32, Error> {
        let mut data = [0u8; 2];
        self.i2c
            .read(self.address, &mut data)
            .map_err(|_err| Error::Comm)?;
        Ok(self.mode.to_lux(u16::from_be_bytes(data)))
    }

    /// Destroy driver instance, return I²C bus instance.
    pub fn destroy(self) -> I2C {
        self.i2c
    }

    fn write_opcode(&mut self, opcode: u8) -> Result<(), Error> {
        self.i2c
            .write(self.address, &[opcode])
            .map_err(|_err| Error::Comm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn init_powers_on_then_selects_mode() {
        let expectations = [
            I2cTransaction::write(ADDRESS_LOW, vec![0x01]),
            I2cTransaction::write(ADDRESS_LOW, vec![0x10]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Bh1750::new(i2c.clone(), ADDRESS_LOW);
        sensor.init(Mode::ContinuousHighRes).unwrap();
        assert_eq!(sensor.mode(), Mode::ContinuousHighRes);
        i2c.done();
    }

    #[test]
    fn converts_counts_to_lux() {
        let expectations = [
            I2cTransaction::read(ADDRESS_HIGH, vec![0x01, 0xE0]),
            I2cTransaction::read(ADDRESS_HIGH, vec![0x00, 0x00]),
            I2cTransaction::read(ADDRESS_HIGH, vec![0xFF, 0xFF]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Bh1750::new(i2c.clone(), ADDRESS_HIGH);
        // 480 counts / 1.2
        assert_eq!(sensor.illuminance().unwrap(), 400.0);
        assert_eq!(sensor.illuminance().unwrap(), 0.0);
        assert_eq!(sensor.illuminance().unwrap(), 54612.5);
        i2c.done();
    }

    #[test]
    fn high_res_2_halves_the_reading() {
        let expectations = [
            I2cTransaction::write(ADDRESS_LOW, vec![0x11]),
            I2cTransaction::read(ADDRESS_LOW, vec![0x01, 0xE0]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Bh1750::new(i2c.clone(), ADDRESS_LOW);
        sensor.set_mode(Mode::ContinuousHighRes2).unwrap();
        assert_eq!(sensor.illuminance().unwrap(), 200.0);
        i2c.done();
    }

    #[test]
    fn bus_errors_surface_as_comm() {
        let expectations = [
            I2cTransaction::write(ADDRESS_LOW, vec![0x01]).with_error(ErrorKind::Other),
            I2cTransaction::read(ADDRESS_LOW, vec![0x00, 0x00]).with_error(ErrorKind::Other),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Bh1750::new(i2c.clone(), ADDRESS_LOW);
        assert_eq!(sensor.init(Mode::ContinuousLowRes), Err(Error::Comm));
        // mode is unchanged when the bus fails
        assert_eq!(sensor.mode(), Mode::ContinuousHighRes);
        assert_eq!(sensor.illuminance(), Err(Error::Comm));
        i2c.done();
    }
}
