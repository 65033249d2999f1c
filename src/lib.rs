//! Host-testable core of the hid-goc BLE HID peripheral.
//!
//! Everything here is `no_std` and free of hardware access: the HID
//! service table and report dispatch, the AT command parser, the
//! application event loop and the advertising payloads. The BLE stack,
//! UART and buttons are reached through small traits implemented by the
//! embedded binary (`main.rs`) and by fakes in the tests.
//!
//! Usage: `cargo test` on the host, `cargo run --release --features
//! embedded` on the board.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gap;
pub mod gatt;
pub mod hid;
pub mod uart;

pub use error::Error;

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
