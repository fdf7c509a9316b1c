use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::uart::UartDriver;
use log::*;
use motion::command::{CommandSource, Line, LineBuffer};

/// Command lines arriving on a UART, typically from a serial Bluetooth module.
pub struct SerialCommands<'d> {
    uart: UartDriver<'d>,
    line: LineBuffer,
}

impl<'d> SerialCommands<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        SerialCommands {
            uart,
            line: LineBuffer::new(),
        }
    }
}

impl CommandSource for SerialCommands<'_> {
    fn read_line(&mut self) -> Option<Line> {
        let mut byte = [0u8; 1];
        loop {
            match self.uart.read(&mut byte, NON_BLOCK) {
                Ok(1) => {
                    if let Some(line) = self.line.push(byte[0]) {
                        return Some(line);
                    }
                }
                Ok(_) => return None,
                Err(e) => {
                    warn!("Command channel read failed: {:?}", e);
                    return None;
                }
            }
        }
    }
}
