//! UART command channel: AT command parsing and the receive handoff
//! between the UART driver and the application task.

pub mod parser;
pub mod rx;

pub use parser::{Command, CommandError, CommandParser, Line};
pub use rx::RxHandoff;

/// Transmit side of the UART.
pub trait UartTx {
    /// Queue `bytes` for transmission. Bytes that do not fit are dropped.
    fn write(&mut self, bytes: &[u8]);
}

/// Line break used around reply payloads.
pub const CRLF: &[u8] = b"\r\n";

/// Reply to a malformed command.
pub const REPLY_ERROR: &[u8] = b"\r\nER\r\n";

/// Reply after a key press was sent.
pub const REPLY_OK: &[u8] = b"\r\nOK\r\n";

/// Printed once at startup.
pub const HELLO: &[u8] = b"HS\n";
