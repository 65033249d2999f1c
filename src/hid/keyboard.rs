//! Keyboard input report and the modifier alphabet used by `AT#HP`.
//!
//! Layout (8 bytes):
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Report ID digit from the command line (0 for button presses)
//! Byte 2: Key code (USB HID usage code)
//! Byte 3-7: 0x00
//! ```

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 8;

/// Keyboard input report as sent over the Report characteristic.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifier: u8,
    /// Second byte, carries the report ID digit of the command.
    pub report_id: u8,
    /// Up to 6 simultaneously pressed key codes.
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    /// Single key press.
    pub const fn key(modifier: u8, report_id: u8, keycode: u8) -> Self {
        Self {
            modifier,
            report_id,
            keycodes: [keycode, 0, 0, 0, 0, 0],
        }
    }

    /// Serialise into a byte slice.
    /// Returns the number of bytes written (8, or 0 if `buf` is too small).
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < KEYBOARD_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.modifier;
        buf[1] = self.report_id;
        buf[2..8].copy_from_slice(&self.keycodes);
        KEYBOARD_REPORT_SIZE
    }
}

/// Modifier selected by the character after `AT#HP`.
///
/// The wire alphabet is `'0'..='8'`, in the order of the variants.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Modifier {
    None = 0x00,
    LeftControl = 0x01,
    LeftShift = 0x02,
    LeftAlt = 0x04,
    LeftGui = 0x08,
    RightControl = 0x10,
    RightShift = 0x20,
    RightAlt = 0x40,
    RightGui = 0x80,
}

impl Modifier {
    /// Decode the command character, `None` when outside the alphabet.
    pub const fn from_wire(c: u8) -> Option<Self> {
        Some(match c {
            b'0' => Modifier::None,
            b'1' => Modifier::LeftControl,
            b'2' => Modifier::LeftShift,
            b'3' => Modifier::LeftAlt,
            b'4' => Modifier::LeftGui,
            b'5' => Modifier::RightControl,
            b'6' => Modifier::RightShift,
            b'7' => Modifier::RightAlt,
            b'8' => Modifier::RightGui,
            _ => return None,
        })
    }

    /// Bit in the report's modifier byte.
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// LED output report bits written by the host.
pub mod led {
    pub const NUM_LOCK: u8 = 0x01;
    pub const CAPS_LOCK: u8 = 0x02;
    pub const SCROLL_LOCK: u8 = 0x04;
}

// Key codes bound to the board buttons

pub const KEY_RIGHT_ARROW: u8 = 0x4F;
pub const KEY_LEFT_ARROW: u8 = 0x50;
pub const KEY_DOWN_ARROW: u8 = 0x51;
pub const KEY_UP_ARROW: u8 = 0x52;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_report_layout() {
        let mut buf = [0xAAu8; 8];
        let written = KeyboardReport::key(0x02, 7, 0x04).serialize(&mut buf);
        assert_eq!(written, 8);
        assert_eq!(buf, [0x02, 0x07, 0x04, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn serialize_buffer_too_small() {
        let mut buf = [0u8; 4];
        assert_eq!(KeyboardReport::default().serialize(&mut buf), 0);
    }

    #[test]
    fn modifier_alphabet() {
        let expected = [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80];
        for (i, bits) in expected.iter().enumerate() {
            let m = Modifier::from_wire(b'0' + i as u8).unwrap();
            assert_eq!(m.bits(), *bits);
        }
        assert_eq!(Modifier::from_wire(b'9'), None);
        assert_eq!(Modifier::from_wire(b'Z'), None);
        assert_eq!(Modifier::from_wire(b'/'), None);
    }
}
