//! Line-oriented AT command parser.
//!
//! Bytes accumulate until `\r`, which completes the line; `\n` discards
//! whatever was collected. Lines longer than the buffer are truncated.
//!
//! ```text
//! AT#MZ                no-op
//! AT#MY                reply with the firmware date
//! AT#HP<m><i><kkk>     key press: modifier char, report id digit,
//!                      three-digit decimal keycode
//! ```

use heapless::Vec;

use crate::config::COMMAND_LINE_CAPACITY;
use crate::error::Error;
use crate::hid::keyboard::Modifier;
use crate::hid::personality::KeyEvent;

/// One command line, terminator stripped.
pub type Line = Vec<u8, COMMAND_LINE_CAPACITY>;

const PREFIX_LEN: usize = 5;
const HP_LINE_LEN: usize = PREFIX_LEN + 5;

/// Accumulates received bytes into command lines.
#[derive(Debug, Default)]
pub struct CommandParser {
    line: Line,
}

impl CommandParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns the completed line on `\r`.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\n' => {
                self.line.clear();
                None
            }
            b'\r' => Some(core::mem::take(&mut self.line)),
            _ => {
                // Full buffer: drop the byte.
                let _ = self.line.push(byte);
                None
            }
        }
    }

    /// Bytes collected so far.
    pub fn pending(&self) -> &[u8] {
        &self.line
    }
}

/// A recognised command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Nop,
    Version,
    KeyPress {
        modifier: Modifier,
        report_id: u8,
        keycode: u16,
    },
}

/// A command line that failed validation. Answered with `ER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    Modifier(u8),
    ReportId,
    Keycode,
    Truncated,
}

impl From<CommandError> for Error {
    fn from(_: CommandError) -> Self {
        Error::MalformedCommand
    }
}

fn digit(b: u8) -> Option<u16> {
    b.is_ascii_digit().then(|| u16::from(b - b'0'))
}

impl Command {
    /// Parse a completed line. `Ok(None)` for lines that are not commands.
    pub fn parse(line: &[u8]) -> Result<Option<Self>, CommandError> {
        let Some((prefix, args)) = line.split_at_checked(PREFIX_LEN) else {
            return Ok(None);
        };
        match prefix {
            b"AT#MZ" => Ok(Some(Command::Nop)),
            b"AT#MY" => Ok(Some(Command::Version)),
            b"AT#HP" => Self::parse_key_press(line, args).map(Some),
            _ => Ok(None),
        }
    }

    fn parse_key_press(line: &[u8], args: &[u8]) -> Result<Self, CommandError> {
        let &m = args.first().ok_or(CommandError::Truncated)?;
        let modifier = Modifier::from_wire(m).ok_or(CommandError::Modifier(m))?;
        if line.len() < HP_LINE_LEN {
            return Err(CommandError::Truncated);
        }
        let report_id = digit(args[1]).ok_or(CommandError::ReportId)? as u8;
        let keycode = args[2..5].iter().try_fold(0u16, |acc, &b| {
            digit(b).map(|d| acc * 10 + d).ok_or(CommandError::Keycode)
        })?;
        Ok(Command::KeyPress {
            modifier,
            report_id,
            keycode,
        })
    }

    /// Key event for a key press command. Keycodes past 255 keep the low byte.
    pub fn key_event(&self) -> Option<KeyEvent> {
        match *self {
            Command::KeyPress {
                modifier,
                report_id,
                keycode,
            } => Some(KeyEvent::new(modifier.bits(), report_id, keycode as u8)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut CommandParser, bytes: &[u8]) -> Option<Line> {
        bytes.iter().fold(None, |done, &b| parser.push(b).or(done))
    }

    #[test]
    fn carriage_return_completes_line() {
        let mut parser = CommandParser::new();
        let line = feed(&mut parser, b"AT#MY\r").unwrap();
        assert_eq!(line.as_slice(), b"AT#MY");
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn newline_discards_partial_line() {
        let mut parser = CommandParser::new();
        assert!(feed(&mut parser, b"garbage\nAT#").is_none());
        assert_eq!(parser.pending(), b"AT#");
    }

    #[test]
    fn overlong_line_is_truncated() {
        let mut parser = CommandParser::new();
        for _ in 0..COMMAND_LINE_CAPACITY + 10 {
            parser.push(b'x');
        }
        assert_eq!(parser.push(b'\r').unwrap().len(), COMMAND_LINE_CAPACITY);
    }

    #[test]
    fn key_press() {
        assert_eq!(
            Command::parse(b"AT#HP30100"),
            Ok(Some(Command::KeyPress {
                modifier: Modifier::LeftAlt,
                report_id: 0,
                keycode: 100,
            }))
        );
    }

    #[test]
    fn invalid_modifier() {
        assert_eq!(
            Command::parse(b"AT#HPZ00000"),
            Err(CommandError::Modifier(b'Z'))
        );
    }

    #[test]
    fn malformed_arguments() {
        assert_eq!(Command::parse(b"AT#HP0"), Err(CommandError::Truncated));
        assert_eq!(Command::parse(b"AT#HP"), Err(CommandError::Truncated));
        assert_eq!(Command::parse(b"AT#HP0x100"), Err(CommandError::ReportId));
        assert_eq!(Command::parse(b"AT#HP001a0"), Err(CommandError::Keycode));
    }

    #[test]
    fn unrecognised_lines() {
        assert_eq!(Command::parse(b""), Ok(None));
        assert_eq!(Command::parse(b"AT#"), Ok(None));
        assert_eq!(Command::parse(b"AT#ZZ"), Ok(None));
        assert_eq!(Command::parse(b"AT#MZ"), Ok(Some(Command::Nop)));
    }

    #[test]
    fn keycode_keeps_low_byte() {
        let cmd = Command::parse(b"AT#HP00999").unwrap().unwrap();
        assert_eq!(cmd.key_event().unwrap().keycode, (999u16 & 0xFF) as u8);
        assert_eq!(Command::Version.key_event(), None);
    }
}
