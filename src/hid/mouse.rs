//! Boot protocol mouse input report.
//!
//! Layout (5 bytes):
//! ```text
//! Byte 0: Button bitfield
//!         Bit 0 = Left, Bit 1 = Right, Bit 2 = Middle
//! Byte 1: X displacement (signed)
//! Byte 2: Y displacement (signed)
//! Byte 3: Scroll wheel  (signed)
//! Byte 4: Horizontal pan (signed)
//! ```

/// Boot mouse input report size in bytes.
pub const BOOT_MOUSE_REPORT_SIZE: usize = 5;

/// Left button bit.
pub const MOUSE_BUTTON_1: u8 = 0x01;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootMouseReport {
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
    pub pan: i8,
}

impl BootMouseReport {
    /// Buttons only, no movement.
    pub const fn buttons(buttons: u8) -> Self {
        Self {
            buttons,
            x: 0,
            y: 0,
            wheel: 0,
            pan: 0,
        }
    }

    pub const fn to_bytes(&self) -> [u8; BOOT_MOUSE_REPORT_SIZE] {
        [
            self.buttons,
            self.x as u8,
            self.y as u8,
            self.wheel as u8,
            self.pan as u8,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_layout() {
        assert_eq!(
            BootMouseReport::buttons(MOUSE_BUTTON_1).to_bytes(),
            [0x01, 0, 0, 0, 0]
        );
    }

    #[test]
    fn signed_fields() {
        let report = BootMouseReport {
            buttons: 0,
            x: -1,
            y: 127,
            wheel: -128,
            pan: 0,
        };
        assert_eq!(report.to_bytes(), [0x00, 0xFF, 0x7F, 0x80, 0x00]);
    }
}
