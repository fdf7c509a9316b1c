use std::thread;

use anyhow::anyhow;
use bh1750::{Bh1750, Mode};
use esp_idf_svc::{
    hal::{
        delay::Ets,
        gpio::{AnyIOPin, PinDriver},
        i2c::{I2cConfig, I2cDriver},
        peripherals::Peripherals,
        prelude::*,
        uart::{config::Config as UartConfig, UartDriver},
        units::Hertz,
    },
    log::EspLogger,
    nvs::{EspDefaultNvsPartition, EspNvs},
};
use log::*;
use motion::{MotorDriver, PositionStore, Tracker};
use sensors::LightAggregator;

mod config;
mod serial;
mod storage;

use config::Config;
use serial::SerialCommands;
use storage::NvsPositionStorage;

fn main() -> anyhow::Result<()> {
    // Required for ESP-IDF patches
    esp_idf_svc::sys::link_patches();

    // Initialize logger
    EspLogger::initialize_default();

    let config = Config::load()?;
    let tracker_config = &config.tracker;
    let motor_config = tracker_config.motor_config()?;
    let layout = tracker_config.segment_layout()?;
    let light_range = tracker_config.light_range()?;
    let update_interval = tracker_config.update_interval()?;
    info!(
        "Motor: {} microsteps/rev at {} rpm, {} segments of {} deg",
        motor_config.microsteps_per_rev(),
        motor_config.rpm(),
        layout.count(),
        layout.degrees_per_segment()
    );
    if layout.degrees_per_segment() == 360 {
        warn!("Each segment is a full motor revolution, check degrees_per_segment");
    }

    // Initialize peripherals and nvs
    let peripherals = Peripherals::take()?;
    let nvs_default = EspDefaultNvsPartition::take()?;

    // ======== Position storage ========
    let position_storage = if tracker_config.control.persist_position {
        let nvs = EspNvs::new(nvs_default, storage::NAMESPACE, true)?;
        info!("Got namespace {:?} from default partition", storage::NAMESPACE);
        Some(NvsPositionStorage::new(nvs))
    } else {
        warn!("Position persistence disabled, position is lost on reset");
        None
    };

    // ======== Motor: TB6600 step / direction / enable ========
    let step = PinDriver::output(peripherals.pins.gpio15)?;
    let direction = PinDriver::output(peripherals.pins.gpio16)?;
    let enable = PinDriver::output(peripherals.pins.gpio17)?;
    let motor = MotorDriver::with_enable(step, direction, enable, Ets, motor_config)?;

    // ======== Light sensors: two BH1750 on one I2C bus ========
    let sda = peripherals.pins.gpio8;
    let scl = peripherals.pins.gpio9;
    let i2c_config = I2cConfig::new().baudrate(100_u32.kHz().into());
    let i2c = I2cDriver::new(peripherals.i2c0, sda, scl, &i2c_config)?;
    let bus: &'static _ = shared_bus::new_std!(I2cDriver = i2c)
        .ok_or_else(|| anyhow!("I2C bus manager already created"))?;

    let mut light_1 = Bh1750::new(bus.acquire_i2c(), config.sensors.address_1);
    if let Err(e) = light_1.init(Mode::ContinuousHighRes) {
        error!("Error initializing BH1750 #1: {:?}", e);
    }
    let mut light_2 = Bh1750::new(bus.acquire_i2c(), config.sensors.address_2);
    if let Err(e) = light_2.init(Mode::ContinuousHighRes) {
        error!("Error initializing BH1750 #2: {:?}", e);
    }
    let light = LightAggregator::new(light_1, light_2);

    // ======== Command channel ========
    let commands = if tracker_config.control.command_channel {
        let uart_config = UartConfig::default().baudrate(Hertz(config.serial.baudrate));
        let uart = UartDriver::new(
            peripherals.uart1,
            peripherals.pins.gpio10,
            peripherals.pins.gpio11,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &uart_config,
        )?;
        info!("Listening for commands at {} baud", config.serial.baudrate);
        Some(SerialCommands::new(uart))
    } else {
        info!("Command channel disabled, tracker stays in AUTO mode");
        None
    };

    let store = PositionStore::new(motor, position_storage, layout);
    let mut tracker = Tracker::new(store, light, commands, light_range);
    tracker.start();

    loop {
        tracker.tick();
        thread::sleep(update_interval);
    }
}
