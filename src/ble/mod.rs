//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Server** - registers the battery and HID services, forwards peer
//!    writes to the application task and sends its notifications.
//! 2. **Peripheral** - advertises, pairs and bonds, and runs one GATT
//!    task per connected central.
//!
//! Communication with the application task goes through the mailbox
//! defined in the crate root.

pub mod peripheral;
pub mod server;
