//! Operator commands and the line framing of the command channel.

use log::*;

/// Longest command line kept; longer lines are dropped whole.
pub const LINE_CAPACITY: usize = 32;

pub type Line = heapless::String<LINE_CAPACITY>;

/// Source of newline-terminated command lines. Must never block.
pub trait CommandSource {
    /// Returns a complete line if one is pending.
    fn read_line(&mut self) -> Option<Line>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Auto,
    Manual,
    /// Raw segment request; range checks happen at dispatch.
    Segment(i32),
}

impl Command {
    /// Case-insensitive, surrounding whitespace ignored. Anything that is not a
    /// mode keyword or a decimal integer yields `None`.
    pub fn parse(line: &str) -> Option<Command> {
        let token = line.trim();
        if token.eq_ignore_ascii_case("AUTO") {
            Some(Command::Auto)
        } else if token.eq_ignore_ascii_case("MANUAL") {
            Some(Command::Manual)
        } else {
            token.parse::<i32>().ok().map(Command::Segment)
        }
    }
}

/// Assembles bytes from a serial stream into lines.
///
/// `\r` is ignored. A line that outgrows [`LINE_CAPACITY`] or carries non-ASCII
/// bytes is discarded up to and including its newline.
#[derive(Debug, Default)]
pub struct LineBuffer {
    line: Line,
    discarding: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\n' => {
                let line = core::mem::take(&mut self.line);
                if core::mem::take(&mut self.discarding) || line.is_empty() {
                    return None;
                }
                Some(line)
            }
            b'\r' => None,
            _ if self.discarding => None,
            byte if byte.is_ascii() => {
                if self.line.push(byte as char).is_err() {
                    warn!("Command line longer than {} bytes, dropping it", LINE_CAPACITY);
                    self.line.clear();
                    self.discarding = true;
                }
                None
            }
            _ => {
                debug!("Non-ASCII byte {:#04x} on command channel", byte);
                self.line.clear();
                self.discarding = true;
                None
            }
        }
    }
}
