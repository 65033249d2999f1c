//! HID report descriptors, one per device personality.
//!
//! Served verbatim as the Report Map characteristic value.

/// Boot-compatible keyboard.
///
///   - 8 modifier bits (input)
///   - 1 reserved byte
///   - 5 LED indicators + 3 bits padding (output)
///   - 6 key code bytes, usages 0..=101 (input)
pub const KEYBOARD_REPORT_MAP: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    //
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    //
    //   - Modifier byte -
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    //   - Reserved byte -
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant)
    //
    //   - LED report -
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    //
    //   - LED report padding -
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant)
    //
    //   - Key arrays (6 bytes) -
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x81, 0x00, //   Input (Data, Array)
    //
    0xC0, // End Collection
];

/// Game pad, report ID 3: hat switch, 15 buttons, X/Y, Z/Rz, brake and
/// accelerator.
pub const GAMEPAD_REPORT_MAP: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x03, //   Report ID (3)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x15, 0x01, //   Logical Minimum (1)
    0x25, 0x08, //   Logical Maximum (8)
    0x81, 0x01, //   Input (Constant, Array, Absolute)
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x01, //   Report Count (1)
    0x15, 0x01, //   Logical Minimum (1)
    0x25, 0x07, //   Logical Maximum (7)
    0x46, 0x3B, 0x01, // Physical Maximum (315)
    0x65, 0x14, //   Unit (Eng Rot: Angular Pos)
    0x09, 0x39, //   Usage (Hat switch)
    0x81, 0x42, //   Input (Data, Variable, Absolute, Null)
    0x65, 0x00, //   Unit (None)
    0x05, 0x09, //   Usage Page (Button)
    0x15, 0x01, //   Logical Minimum (1)
    0x25, 0x01, //   Logical Maximum (1)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x0F, //   Usage Maximum (Button 15)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x0F, //   Report Count (15)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x01, //   Input (Constant, Array, Absolute)
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x02, //   Report Count (2)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x35, 0x00, //   Physical Minimum (0)
    0x46, 0xFF, 0x00, // Physical Maximum (255)
    0xA1, 0x00, //   Collection (Physical)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //         End Collection
    0xA1, 0x00, //   Collection (Physical)
    0x09, 0x32, //     Usage (Z)
    0x09, 0x35, //     Usage (Rz)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //         End Collection
    0x05, 0x02, //   Usage Page (Simulation Controls)
    0x09, 0xC5, //   Usage (Brake)
    0x09, 0xC4, //   Usage (Accelerator)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x02, //   Report Count (2)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x35, 0x00, //   Physical Minimum (0)
    0x46, 0xFF, 0x00, // Physical Maximum (255)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0xC0, // End Collection
];

/// Consumer control, report ID 1: one 8-bit selector over 23 usages
/// (menu navigation, captions, transport and volume).
pub const CONSUMER_REPORT_MAP: &[u8] = &[
    0x05, 0x0C, // Usage Page (Consumer Devices)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    0x09, 0x80, //   Usage (Selection)
    0x09, 0x81, //   Usage (Assign Selection)
    0x09, 0x40, //   Usage (Menu)
    0x09, 0x41, //   Usage (Menu Pick)
    0x09, 0x42, //   Usage (Menu Up)
    0x09, 0x43, //   Usage (Menu Down)
    0x09, 0x44, //   Usage (Menu Left)
    0x09, 0x45, //   Usage (Menu Right)
    0x09, 0x46, //   Usage (Menu Escape)
    0x09, 0x47, //   Usage (Menu Value Increase)
    0x09, 0x48, //   Usage (Menu Value Decrease)
    0x09, 0x60, //   Usage (Data On Screen)
    0x09, 0x61, //   Usage (Closed Caption)
    0x09, 0x62, //   Usage (Closed Caption Select)
    0x09, 0xB0, //   Usage (Play)
    0x09, 0xB1, //   Usage (Pause)
    0x09, 0xB4, //   Usage (Rewind)
    0x09, 0xB3, //   Usage (Fast Forward)
    0x09, 0xB5, //   Usage (Scan Next Track)
    0x09, 0xB6, //   Usage (Scan Previous Track)
    0x09, 0xB7, //   Usage (Stop)
    0x09, 0xE9, //   Usage (Volume Up)
    0x09, 0xEA, //   Usage (Volume Down)
    0x15, 0x01, //   Logical Minimum (1)
    0x25, 0x17, //   Logical Maximum (23)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];

/// System control, report ID 1: one 8-bit selector over the system menu
/// usages.
pub const SYSTEM_CONTROL_REPORT_MAP: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    0x09, 0x80, //   Usage (System Control)
    0x09, 0x85, //   Usage (System Main Menu)
    0x09, 0x86, //   Usage (System App Menu)
    0x09, 0x89, //   Usage (System Menu Select)
    0x09, 0x8A, //   Usage (System Menu Right)
    0x09, 0x8B, //   Usage (System Menu Left)
    0x09, 0x8C, //   Usage (System Menu Up)
    0x09, 0x8D, //   Usage (System Menu Down)
    0x15, 0x01, //   Logical Minimum (1)
    0x25, 0x08, //   Logical Maximum (8)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];

/// Gaming controls page: one 6-bit selector over movement, lean and gun
/// selector usages. No report ID.
pub const GAME_REPORT_MAP: &[u8] = &[
    0x05, 0x05, // Usage Page (Gaming Controls)
    0x0B, 0x01, 0x00, 0x01, 0x00, // Usage (Generic Desktop: Pointer)
    0xA1, 0x01, // Collection (Application)
    0x75, 0x01, //   Report Size (1)
    0x09, 0x24, //   Usage (Move Right/Left)
    0x09, 0x26, //   Usage (Move Up/Down)
    0x09, 0x25, //   Usage (Move Forward/Backward)
    0x09, 0x27, //   Usage (Lean Right/Left)
    0x09, 0x28, //   Usage (Lean Forward/Backward)
    0x09, 0x32, //   Usage (Gun Selector)
    0x15, 0x01, //   Logical Minimum (1)
    0x25, 0x06, //   Logical Maximum (6)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x06, //   Report Size (6)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;

    fn collections_balanced(map: &[u8]) -> bool {
        // Short items only: prefix low two bits give the payload size (3 = 4 bytes).
        let mut depth = 0i32;
        let mut i = 0;
        while i < map.len() {
            let prefix = map[i];
            let size = match prefix & 0x03 {
                3 => 4,
                n => n as usize,
            };
            match prefix & 0xFC {
                0xA0 => depth += 1,
                0xC0 => depth -= 1,
                _ => {}
            }
            i += 1 + size;
        }
        i == map.len() && depth == 0
    }

    #[test]
    fn descriptor_lengths() {
        assert_eq!(KEYBOARD_REPORT_MAP.len(), 63);
        assert_eq!(GAMEPAD_REPORT_MAP.len(), 118);
        assert_eq!(CONSUMER_REPORT_MAP.len(), 65);
        assert_eq!(SYSTEM_CONTROL_REPORT_MAP.len(), 33);
        assert_eq!(GAME_REPORT_MAP.len(), 34);
    }

    #[test]
    fn descriptors_are_well_formed() {
        for map in [
            KEYBOARD_REPORT_MAP,
            GAMEPAD_REPORT_MAP,
            CONSUMER_REPORT_MAP,
            SYSTEM_CONTROL_REPORT_MAP,
            GAME_REPORT_MAP,
        ] {
            assert!(collections_balanced(map));
        }
    }

    #[test]
    fn report_ids_declared() {
        assert_eq!(&GAMEPAD_REPORT_MAP[6..8], &[0x85, 0x03]);
        assert_eq!(&CONSUMER_REPORT_MAP[6..8], &[0x85, 0x01]);
        assert_eq!(&SYSTEM_CONTROL_REPORT_MAP[4..6], &[0x85, 0x01]);
    }
}
