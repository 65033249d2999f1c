//! GATT side of the HID profile.
//!
//! The BLE stack itself stays outside this crate. It is reached through
//! [`AttributeRegistry`] at startup, [`GattServer`] afterwards
//! (notifications, ATT responses) and the battery companion service
//! through [`BatteryService`].

pub mod attr;
pub mod cccd;
pub mod service;
pub mod uuid;

pub use attr::{Attribute, Permissions, Properties, Value};
pub use cccd::{CccdPool, CccdTable};
pub use service::{HidService, ReportMapEntry};

use crate::error::Error;

/// Connection the request arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Link {
    pub conn: u16,
    pub encrypted: bool,
}

/// Answer to an ATT read or write request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttResponse<'a> {
    Read(&'a [u8]),
    Write,
    Error { handle: u16, code: u8 },
}

/// Service registration with the underlying BLE stack.
pub trait AttributeRegistry {
    /// Register a service table. Implementations assign `handle` on every
    /// entry, in order.
    fn register_service(&mut self, attrs: &mut [Attribute]) -> Result<(), Error>;
}

/// The running GATT server of the underlying BLE stack.
pub trait GattServer {
    /// Send a notification on `conn`.
    fn notify(&mut self, conn: u16, handle: u16, value: &[u8]) -> Result<(), Error>;

    /// Complete a pending ATT request.
    fn respond(&mut self, conn: u16, response: AttResponse<'_>);

    /// A value the service owns changed outside a peer write. Stacks that
    /// serve reads from their own attribute storage mirror it here.
    fn value_changed(&mut self, _handle: u16, _value: &[u8]) {}
}

/// The battery service the HID service includes.
pub trait BatteryService {
    /// First and last handle of the service.
    fn handle_range(&self) -> (u16, u16);

    /// Battery Level value handle and its CCCD handle.
    fn level_handles(&self) -> (u16, u16);
}
