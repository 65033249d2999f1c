//! GAP peripheral settings: advertising payloads, desired connection
//! parameters and bond manager configuration.
//!
//! The advertising itself runs in the BLE stack; this module only supplies
//! the bytes and settings it is started with.

pub mod adv;

pub use adv::{ADV_DATA, SCAN_RSP_DATA};

use crate::config::{
    BONDING_ENABLED, CONN_INTERVAL_MAX, CONN_INTERVAL_MIN, CONN_PARAM_UPDATE_REQUEST,
    CONN_PAUSE_PERIPHERAL_SECS, MITM_PROTECTION, PAIRING_WAIT_FOR_REQUEST, SLAVE_LATENCY,
    SUPERVISION_TIMEOUT,
};

/// Connection parameters the peripheral asks the central for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnParams {
    /// 1.25 ms units.
    pub min_interval: u16,
    /// 1.25 ms units.
    pub max_interval: u16,
    pub slave_latency: u16,
    /// 10 ms units.
    pub supervision_timeout: u16,
    /// Send an update request once connected.
    pub request_update: bool,
    /// Delay before the update request.
    pub pause_secs: u64,
}

impl ConnParams {
    pub const DEFAULT: Self = Self {
        min_interval: CONN_INTERVAL_MIN,
        max_interval: CONN_INTERVAL_MAX,
        slave_latency: SLAVE_LATENCY,
        supervision_timeout: SUPERVISION_TIMEOUT,
        request_update: CONN_PARAM_UPDATE_REQUEST,
        pause_secs: CONN_PAUSE_PERIPHERAL_SECS,
    };

    /// Bluetooth Core limits: interval 7.5 ms..4 s, latency < 500, timeout
    /// 100 ms..32 s and longer than `(1 + latency) * interval * 2`.
    pub fn is_valid(&self) -> bool {
        let interval_ok = (6..=3200).contains(&self.min_interval)
            && (self.min_interval..=3200).contains(&self.max_interval);
        let timeout_ok = (10..=3200).contains(&self.supervision_timeout);
        // Timeout in 10 ms units vs interval in 1.25 ms units: scale both to 1.25 ms.
        let min_timeout =
            (1 + u32::from(self.slave_latency)) * u32::from(self.max_interval) * 2;
        interval_ok
            && self.slave_latency < 500
            && timeout_ok
            && u32::from(self.supervision_timeout) * 8 > min_timeout
    }
}

impl Default for ConnParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Security handler capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoCapabilities {
    NoInputNoOutput,
    DisplayOnly,
    KeyboardOnly,
}

/// Bond manager configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BondConfig {
    /// Wait for the central's pairing request instead of asking for security.
    pub wait_for_request: bool,
    pub mitm: bool,
    pub io_capabilities: IoCapabilities,
    pub bonding: bool,
}

impl BondConfig {
    pub const DEFAULT: Self = Self {
        wait_for_request: PAIRING_WAIT_FOR_REQUEST,
        mitm: MITM_PROTECTION,
        io_capabilities: IoCapabilities::NoInputNoOutput,
        bonding: BONDING_ENABLED,
    };
}

impl Default for BondConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
