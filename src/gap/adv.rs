//! Advertising and scan response payloads, plus AD structure helpers.

use heapless::String;

/// AD types used here.
pub mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const INCOMPLETE_16BIT_UUIDS: u8 = 0x02;
    pub const COMPLETE_16BIT_UUIDS: u8 = 0x03;
    pub const SHORT_LOCAL_NAME: u8 = 0x08;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
    pub const APPEARANCE: u8 = 0x19;
}

/// LE limited discoverable, BR/EDR not supported.
pub const FLAGS_LIMITED_NO_BREDR: u8 = 0x05;

/// GAP appearance: HID gamepad.
pub const APPEARANCE_HID_GAMEPAD: u16 = 0x03C4;

#[rustfmt::skip]
pub static ADV_DATA: [u8; 13] = [
    0x02, ad_type::FLAGS, FLAGS_LIMITED_NO_BREDR,
    0x03, ad_type::APPEARANCE, 0xC4, 0x03,
    // HID service, battery service
    0x05, ad_type::INCOMPLETE_16BIT_UUIDS, 0x12, 0x18, 0x0F, 0x18,
];

#[rustfmt::skip]
pub static SCAN_RSP_DATA: [u8; 9] = [
    0x08, ad_type::COMPLETE_LOCAL_NAME, b'H', b'i', b'd', b'-', b'G', b'o', b'c',
];

/// Iterator over `(ad_type, payload)` pairs. Stops at the first zero
/// length or truncated structure.
pub struct AdStructures<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.data.split_first()?;
        let len = usize::from(len);
        if len == 0 || len > rest.len() {
            self.data = &[];
            return None;
        }
        let (field, tail) = rest.split_at(len);
        self.data = tail;
        Some((field[0], &field[1..]))
    }
}

pub fn structures(data: &[u8]) -> AdStructures<'_> {
    AdStructures { data }
}

/// Payload of the first structure of type `ty`.
pub fn find(data: &[u8], ty: u8) -> Option<&[u8]> {
    structures(data).find(|&(t, _)| t == ty).map(|(_, p)| p)
}

/// Whether a 16-bit UUID list in `data` carries `uuid`.
pub fn contains_service_uuid16(data: &[u8], uuid: u16) -> bool {
    let le = uuid.to_le_bytes();
    structures(data)
        .filter(|&(t, _)| {
            t == ad_type::INCOMPLETE_16BIT_UUIDS || t == ad_type::COMPLETE_16BIT_UUIDS
        })
        .any(|(_, p)| p.chunks_exact(2).any(|c| c == le))
}

pub fn appearance(data: &[u8]) -> Option<u16> {
    match find(data, ad_type::APPEARANCE)? {
        [lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// Complete or shortened local name, truncated to 32 bytes on a character
/// boundary. `None` when absent or not UTF-8.
pub fn local_name(data: &[u8]) -> Option<String<32>> {
    let (_, bytes) = structures(data).find(|&(t, _)| {
        t == ad_type::COMPLETE_LOCAL_NAME || t == ad_type::SHORT_LOCAL_NAME
    })?;
    let mut name = String::new();
    for c in core::str::from_utf8(bytes).ok()?.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    Some(name)
}
