//! Report identities shared by the service table, dispatch and the app.

/// HID report type as carried in the Report Reference descriptor.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportType {
    Input = 1,
    Output = 2,
    Feature = 3,
}

/// HID protocol mode (Protocol Mode characteristic value).
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolMode {
    Boot = 0,
    #[default]
    Report = 1,
}

impl ProtocolMode {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ProtocolMode::Boot),
            1 => Some(ProtocolMode::Report),
            _ => None,
        }
    }
}

// Report IDs used in the report map

pub const REPORT_ID_KEY_IN: u8 = 0;
pub const REPORT_ID_LED_OUT: u8 = 0;
pub const REPORT_ID_FEATURE: u8 = 0;
pub const REPORT_ID_MOUSE_IN: u8 = 1;
pub const REPORT_ID_BATTERY_LEVEL_IN: u8 = 4;

// Report lengths

/// LED output report length.
pub const LED_OUT_REPORT_LEN: usize = 1;

/// Feature report length.
pub const FEATURE_REPORT_LEN: usize = 1;

/// Boot keyboard output report length.
pub const BOOT_KEY_OUT_REPORT_LEN: usize = 1;

/// Largest input report any personality produces (gamepad).
pub const MAX_INPUT_REPORT_LEN: usize = 11;

/// Buffer for one outbound input report.
pub type InputReport = heapless::Vec<u8, MAX_INPUT_REPORT_LEN>;
