//! Application-wide constants and compile-time configuration.
//!
//! Connection parameters, HID profile settings, UART sizing and queue
//! depths live here so they can be tuned in one place. Nothing is read
//! at runtime; there is no persisted configuration.

use crate::hid::personality::Personality;

// Device identity

/// GAP device name, also carried in the scan response.
pub const DEVICE_NAME: &str = "Hid-Goc";

/// Build date reported by `AT#MY`.
pub const FIRMWARE_DATE: &str = "20191231";

/// Report map personality compiled into this image.
pub const PERSONALITY: Personality = Personality::DEFAULT;

// BLE

/// Maximum number of simultaneous peripheral links.
pub const MAX_CONNECTIONS: usize = 2;

/// Desired connection interval range (in 1.25 ms units). 8 = 10 ms.
pub const CONN_INTERVAL_MIN: u16 = 8;
pub const CONN_INTERVAL_MAX: u16 = 8;

/// Slave latency (connection events the peripheral may skip).
pub const SLAVE_LATENCY: u16 = 50;

/// Supervision timeout (in 10 ms units). 500 = 5 s.
pub const SUPERVISION_TIMEOUT: u16 = 500;

/// Ask the central for the desired parameters once connected.
pub const CONN_PARAM_UPDATE_REQUEST: bool = true;

/// Seconds to wait after connecting before requesting a parameter update.
pub const CONN_PAUSE_PERIPHERAL_SECS: u64 = 10;

/// When `false` the link layer's connection-parameters-request procedure is
/// masked out of the local supported features at startup.
pub const USE_LL_CONN_PARAM_UPDATE: bool = false;

/// ATT MTU negotiated with the SoftDevice.
pub const ATT_MTU: usize = 23;

// Bond manager

/// Pairing waits for the central to send a pairing request.
pub const PAIRING_WAIT_FOR_REQUEST: bool = true;

/// Man-in-the-middle protection.
pub const MITM_PROTECTION: bool = false;

/// Store bonds after pairing.
pub const BONDING_ENABLED: bool = true;

// HID profile

/// A link with no input report sent for this long is disconnected (ms).
/// 0 disables the timeout.
pub const HID_IDLE_TIMEOUT_MS: u32 = 60_000;

/// HID Information flags: remote wake.
pub const HID_INFO_FLAGS: u8 = 0x01;

/// Number of per-connection CCCD tables available to services.
pub const CCCD_POOL_TABLES: usize = 3;

// UART

/// UART receive and transmit buffer sizes.
pub const UART_RX_BUF_SIZE: usize = 256;
pub const UART_TX_BUF_SIZE: usize = 256;

/// Longest AT command line accepted; extra bytes are dropped.
pub const COMMAND_LINE_CAPACITY: usize = 64;

/// One-shot delay between the first received chunk and parsing (ms).
pub const UART_RX_DEBOUNCE_MS: u64 = 100;

/// UART baud rate.
pub const UART_BAUD: u32 = 115_200;

// Task queues

/// Depth of the stack-to-application message channel.
pub const STACK_QUEUE_DEPTH: usize = 8;

/// Depth of the key event channel.
pub const APP_QUEUE_DEPTH: usize = 8;

// GPIO pin assignments (nRF52840-DK defaults)
//
//   Button SELECT → P0.11
//   Button UP     → P0.12
//   Button DOWN   → P0.24
//   Button LEFT   → P0.25
//   Button RIGHT  → P1.08
//   UART RX       → P0.08
//   UART TX       → P0.06

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;
