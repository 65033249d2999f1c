//! Messages delivered to the application task.
//!
//! Producers move a message into a bounded channel. The task takes it out,
//! handles it and drops it, so nothing is freed by hand.

use heapless::Vec;

use crate::config::ATT_MTU;

/// Largest HCI command complete return parameter block kept.
pub const HCI_PARAMS_LEN: usize = 16;

/// HCI LE Read Local Supported Features opcode.
pub const HCI_LE_READ_LOCAL_SUPPORTED_FEATURES: u16 = 0x2003;

/// Byte 0 bit of the LE feature set: connection parameters request procedure.
pub const LL_FEATURE_CONN_PARAMS_REQ: u8 = 0x02;

/// ATT traffic forwarded by the stack.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GattRequest {
    Read {
        conn: u16,
        handle: u16,
        offset: u16,
    },
    Write {
        conn: u16,
        handle: u16,
        offset: u16,
        value: Vec<u8, ATT_MTU>,
    },
    /// Any other ATT method (MTU exchange, confirmations, ...).
    Other(u8),
}

/// Link state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GapEvent {
    LinkEstablished { conn: u16 },
    LinkTerminated { conn: u16 },
    LinkEncrypted { conn: u16 },
}

/// A message from the BLE stack.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackMessage {
    Gatt(GattRequest),
    /// Return parameters start with the status byte.
    HciCommandComplete {
        opcode: u16,
        params: Vec<u8, HCI_PARAMS_LEN>,
    },
    /// Other HCI event, by event code.
    HciEvent(u8),
    Gap(GapEvent),
    Unknown(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppEvent {
    KeyChange,
}

/// Application queue entry: event tag plus a one-byte state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppMessage {
    pub event: AppEvent,
    pub state: u8,
}

impl AppMessage {
    pub const fn key_change(keys: u8) -> Self {
        Self {
            event: AppEvent::KeyChange,
            state: keys,
        }
    }
}

/// Board button bits carried by [`AppEvent::KeyChange`].
pub mod keys {
    pub const SELECT: u8 = 0x01;
    pub const UP: u8 = 0x02;
    pub const DOWN: u8 = 0x04;
    pub const LEFT: u8 = 0x08;
    pub const RIGHT: u8 = 0x10;
}
