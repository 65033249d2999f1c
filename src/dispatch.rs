//! Report value store and the report read/write dispatch.
//!
//! `set_parameter` / `get_parameter` are the only way report-backed
//! attribute values change or are inspected. Unknown UUIDs are tolerated
//! on both paths: writes are ignored, reads come back empty.

use heapless::Vec;

use crate::error::Error;
use crate::gatt::uuid;
use crate::hid::mouse::BOOT_MOUSE_REPORT_SIZE;
use crate::hid::report::{
    InputReport, ProtocolMode, ReportType, BOOT_KEY_OUT_REPORT_LEN, FEATURE_REPORT_LEN,
    LED_OUT_REPORT_LEN, MAX_INPUT_REPORT_LEN,
};

/// Bytes returned by a report read.
pub type ReportValue = Vec<u8, MAX_INPUT_REPORT_LEN>;

/// What the application learns from a peer write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidNotice {
    /// LED output report written (num/caps/scroll/compose/kana bits).
    Led(u8),
    NotificationsEnabled { id: u8, report_type: ReportType },
    NotificationsDisabled { id: u8, report_type: ReportType },
    ProtocolMode(ProtocolMode),
    Suspend,
    ExitSuspend,
}

/// Values of every report the HID service exposes.
#[derive(Debug, Default)]
pub struct ReportStore {
    led_out: u8,
    feature: u8,
    boot_key_out: u8,
    // Boot keyboard input reads share this value.
    key_in: InputReport,
    boot_mouse_in: Vec<u8, BOOT_MOUSE_REPORT_SIZE>,
}

fn single_byte(data: &[u8], expected: usize) -> Result<u8, Error> {
    match data.first() {
        Some(&b) if data.len() == expected => Ok(b),
        _ => Err(Error::InvalidValueSize),
    }
}

/// LED output handler: the report must be exactly one byte.
pub fn receive_report(data: &[u8]) -> Result<u8, Error> {
    single_byte(data, LED_OUT_REPORT_LEN)
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a peer-written value.
    ///
    /// Output and feature reports must be exactly one byte, input reports
    /// cannot be written, and writes to any other UUID are accepted and
    /// dropped.
    pub fn set_parameter(
        &mut self,
        id: u8,
        report_type: ReportType,
        uuid: u16,
        data: &[u8],
    ) -> Result<(), Error> {
        debug!("set report id={} uuid={=u16:#x} len={}", id, uuid, data.len());
        match uuid {
            uuid::REPORT => match report_type {
                ReportType::Output => {
                    self.led_out = single_byte(data, LED_OUT_REPORT_LEN)?;
                }
                ReportType::Feature => {
                    self.feature = single_byte(data, FEATURE_REPORT_LEN)?;
                }
                ReportType::Input => return Err(Error::AttributeNotFound),
            },
            uuid::BOOT_KEY_OUTPUT => {
                self.boot_key_out = single_byte(data, BOOT_KEY_OUT_REPORT_LEN)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Current value of a report. Unknown UUIDs read as zero length.
    pub fn get_parameter(&self, _id: u8, report_type: ReportType, uuid: u16) -> ReportValue {
        let bytes: &[u8] = match (uuid, report_type) {
            (uuid::REPORT, ReportType::Output) => core::slice::from_ref(&self.led_out),
            (uuid::REPORT, ReportType::Feature) => core::slice::from_ref(&self.feature),
            (uuid::REPORT, ReportType::Input) | (uuid::BOOT_KEY_INPUT, _) => &self.key_in,
            (uuid::BOOT_KEY_OUTPUT, _) => core::slice::from_ref(&self.boot_key_out),
            (uuid::BOOT_MOUSE_INPUT, _) => &self.boot_mouse_in,
            _ => &[],
        };
        // Every stored value fits in a ReportValue.
        ReportValue::from_slice(bytes).unwrap_or_default()
    }

    /// Peer write to a report characteristic. LED output writes go through
    /// [`receive_report`] before they are stored.
    pub fn write(
        &mut self,
        id: u8,
        report_type: ReportType,
        uuid: u16,
        data: &[u8],
    ) -> Result<Option<HidNotice>, Error> {
        let notice = if uuid == uuid::REPORT && report_type == ReportType::Output {
            Some(HidNotice::Led(receive_report(data)?))
        } else {
            None
        };
        self.set_parameter(id, report_type, uuid, data)?;
        Ok(notice)
    }

    /// Remember the last input report sent on `uuid`.
    pub fn record_input(&mut self, uuid: u16, data: &[u8]) {
        match uuid {
            uuid::BOOT_MOUSE_INPUT => {
                self.boot_mouse_in.clear();
                let n = data.len().min(BOOT_MOUSE_REPORT_SIZE);
                let _ = self.boot_mouse_in.extend_from_slice(&data[..n]);
            }
            uuid::REPORT | uuid::BOOT_KEY_INPUT => {
                self.key_in.clear();
                let n = data.len().min(MAX_INPUT_REPORT_LEN);
                let _ = self.key_in.extend_from_slice(&data[..n]);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_output_round_trip() {
        let mut store = ReportStore::new();
        store.set_parameter(0, ReportType::Output, uuid::REPORT, &[0x02]).unwrap();
        let value = store.get_parameter(0, ReportType::Output, uuid::REPORT);
        assert_eq!(value.as_slice(), &[0x02]);
    }

    #[test]
    fn wrong_length_leaves_value_unchanged() {
        let mut store = ReportStore::new();
        store.set_parameter(0, ReportType::Feature, uuid::REPORT, &[0x07]).unwrap();
        for bad in [&[][..], &[1, 2][..], &[1, 2, 3][..]] {
            assert_eq!(
                store.set_parameter(0, ReportType::Feature, uuid::REPORT, bad),
                Err(Error::InvalidValueSize)
            );
            assert_eq!(
                store.set_parameter(0, ReportType::Output, uuid::REPORT, bad),
                Err(Error::InvalidValueSize)
            );
        }
        assert_eq!(
            store.get_parameter(0, ReportType::Feature, uuid::REPORT).as_slice(),
            &[0x07]
        );
        assert_eq!(
            store.get_parameter(0, ReportType::Output, uuid::REPORT).as_slice(),
            &[0x00]
        );
    }

    #[test]
    fn input_report_not_writable() {
        let mut store = ReportStore::new();
        assert_eq!(
            store.set_parameter(0, ReportType::Input, uuid::REPORT, &[0; 8]),
            Err(Error::AttributeNotFound)
        );
    }

    #[test]
    fn unknown_uuid_is_permissive() {
        let mut store = ReportStore::new();
        assert_eq!(
            store.set_parameter(0, ReportType::Input, uuid::BOOT_KEY_INPUT, &[1, 2, 3]),
            Ok(())
        );
        assert_eq!(store.set_parameter(0, ReportType::Input, 0x1234, &[1]), Ok(()));
        assert!(store.get_parameter(0, ReportType::Input, 0x1234).is_empty());
    }

    #[test]
    fn boot_keyboard_input_aliases_key_input() {
        let mut store = ReportStore::new();
        store.record_input(uuid::REPORT, &[0x02, 0, 0x04, 0, 0, 0, 0, 0]);
        assert_eq!(
            store.get_parameter(0, ReportType::Input, uuid::BOOT_KEY_INPUT),
            store.get_parameter(0, ReportType::Input, uuid::REPORT)
        );
    }

    #[test]
    fn led_write_reports_notice() {
        let mut store = ReportStore::new();
        let notice = store.write(0, ReportType::Output, uuid::REPORT, &[0x03]).unwrap();
        assert_eq!(notice, Some(HidNotice::Led(0x03)));
        assert_eq!(store.get_parameter(0, ReportType::Output, uuid::REPORT).as_slice(), &[0x03]);
        assert_eq!(
            store.write(0, ReportType::Output, uuid::REPORT, &[1, 2]),
            Err(Error::InvalidValueSize)
        );
        assert_eq!(store.get_parameter(0, ReportType::Output, uuid::REPORT).as_slice(), &[0x03]);
    }

    #[test]
    fn boot_keyboard_output_round_trip() {
        let mut store = ReportStore::new();
        store.set_parameter(0, ReportType::Output, uuid::BOOT_KEY_OUTPUT, &[0x05]).unwrap();
        assert_eq!(
            store.get_parameter(0, ReportType::Output, uuid::BOOT_KEY_OUTPUT).as_slice(),
            &[0x05]
        );
        for bad in [&[][..], &[1, 2][..]] {
            assert_eq!(
                store.set_parameter(0, ReportType::Output, uuid::BOOT_KEY_OUTPUT, bad),
                Err(Error::InvalidValueSize)
            );
        }
        assert_eq!(
            store.get_parameter(0, ReportType::Output, uuid::BOOT_KEY_OUTPUT).as_slice(),
            &[0x05]
        );
        // Separate from the report-mode LED output.
        assert_eq!(store.get_parameter(0, ReportType::Output, uuid::REPORT).as_slice(), &[0x00]);
    }
}
