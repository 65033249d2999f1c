//! 16-bit UUIDs used by the HID and battery services.

// GATT declarations and descriptors
pub const PRIMARY_SERVICE: u16 = 0x2800;
pub const INCLUDE: u16 = 0x2802;
pub const CHARACTERISTIC: u16 = 0x2803;
pub const CLIENT_CHAR_CONFIG: u16 = 0x2902;
pub const EXT_REPORT_REF: u16 = 0x2907;
pub const REPORT_REF: u16 = 0x2908;

// Services
pub const HID_SERVICE: u16 = 0x1812;
pub const BATTERY_SERVICE: u16 = 0x180F;

// Characteristics
pub const BATTERY_LEVEL: u16 = 0x2A19;
pub const BOOT_KEY_INPUT: u16 = 0x2A22;
pub const BOOT_KEY_OUTPUT: u16 = 0x2A32;
pub const BOOT_MOUSE_INPUT: u16 = 0x2A33;
pub const HID_INFORMATION: u16 = 0x2A4A;
pub const REPORT_MAP: u16 = 0x2A4B;
pub const HID_CONTROL_POINT: u16 = 0x2A4C;
pub const REPORT: u16 = 0x2A4D;
pub const PROTOCOL_MODE: u16 = 0x2A4E;
