//! Device personality: which report map the service exposes and how a key
//! event is laid out on the wire.
//!
//! Picked once at startup (see [`crate::config::PERSONALITY`]); everything
//! downstream receives the already-chosen descriptor and layout.

use super::descriptor::{
    CONSUMER_REPORT_MAP, GAMEPAD_REPORT_MAP, GAME_REPORT_MAP, KEYBOARD_REPORT_MAP,
    SYSTEM_CONTROL_REPORT_MAP,
};
use super::keyboard::KeyboardReport;
use super::report::InputReport;

/// Semantic key event: modifier bits, the report ID byte and one keycode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub modifier: u8,
    pub report_id: u8,
    pub keycode: u8,
}

impl KeyEvent {
    /// Key up: nothing held.
    pub const RELEASE: Self = Self {
        modifier: 0,
        report_id: 0,
        keycode: 0,
    };

    pub const fn new(modifier: u8, report_id: u8, keycode: u8) -> Self {
        Self {
            modifier,
            report_id,
            keycode,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Personality {
    Keyboard,
    Gamepad,
    ConsumerControl,
    SystemControl,
    Game,
}

// Gamepad frame: report id, hat, button bytes, then centred sticks.
const GAMEPAD_FRAME: [u8; 11] = [0x03, 0x00, 0x0F, 0x00, 0x00, 0x80, 0x80, 0x80, 0x80, 0x00, 0x00];
const GAMEPAD_KEY_OFFSET: usize = 3;

// Consumer and system control frames lead with their report ID.
const SELECTOR_REPORT_ID: u8 = 0x01;

impl Personality {
    /// Personality selected through cargo features.
    #[cfg(feature = "gamepad")]
    pub const DEFAULT: Self = Personality::Gamepad;
    #[cfg(all(feature = "consumer-control", not(feature = "gamepad")))]
    pub const DEFAULT: Self = Personality::ConsumerControl;
    #[cfg(all(
        feature = "system-control",
        not(any(feature = "gamepad", feature = "consumer-control"))
    ))]
    pub const DEFAULT: Self = Personality::SystemControl;
    #[cfg(all(
        feature = "game",
        not(any(
            feature = "gamepad",
            feature = "consumer-control",
            feature = "system-control"
        ))
    ))]
    pub const DEFAULT: Self = Personality::Game;
    #[cfg(not(any(
        feature = "gamepad",
        feature = "consumer-control",
        feature = "system-control",
        feature = "game"
    )))]
    pub const DEFAULT: Self = Personality::Keyboard;

    /// Report descriptor served through the Report Map characteristic.
    pub const fn report_map(self) -> &'static [u8] {
        match self {
            Personality::Keyboard => KEYBOARD_REPORT_MAP,
            Personality::Gamepad => GAMEPAD_REPORT_MAP,
            Personality::ConsumerControl => CONSUMER_REPORT_MAP,
            Personality::SystemControl => SYSTEM_CONTROL_REPORT_MAP,
            Personality::Game => GAME_REPORT_MAP,
        }
    }

    /// Assemble the key input report for `event`.
    pub fn key_report(self, event: KeyEvent) -> InputReport {
        let mut buf = [0u8; GAMEPAD_FRAME.len()];
        let len = match self {
            Personality::Keyboard => {
                KeyboardReport::key(event.modifier, event.report_id, event.keycode)
                    .serialize(&mut buf)
            }
            Personality::Gamepad => {
                buf = GAMEPAD_FRAME;
                buf[GAMEPAD_KEY_OFFSET] = event.keycode;
                GAMEPAD_FRAME.len()
            }
            Personality::ConsumerControl | Personality::SystemControl => {
                buf[0] = SELECTOR_REPORT_ID;
                buf[1] = event.keycode;
                2
            }
            Personality::Game => {
                buf[0] = event.keycode;
                1
            }
        };
        // `len` never exceeds the buffer, which has the vector's capacity.
        InputReport::from_slice(&buf[..len]).unwrap_or_default()
    }

    /// Key-up report: the same layout with no key held.
    pub fn release_report(self) -> InputReport {
        self.key_report(KeyEvent::RELEASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Personality; 5] = [
        Personality::Keyboard,
        Personality::Gamepad,
        Personality::ConsumerControl,
        Personality::SystemControl,
        Personality::Game,
    ];

    #[test]
    fn keyboard_layout() {
        let report = Personality::Keyboard.key_report(KeyEvent::new(0x04, 0, 100));
        assert_eq!(report.as_slice(), &[0x04, 0x00, 100, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn keyboard_release_is_all_zero() {
        assert_eq!(Personality::Keyboard.release_report().as_slice(), &[0u8; 8]);
    }

    #[test]
    fn gamepad_layout() {
        let report = Personality::Gamepad.key_report(KeyEvent::new(0, 0, 0x21));
        assert_eq!(
            report.as_slice(),
            &[0x03, 0x00, 0x0F, 0x21, 0x00, 0x80, 0x80, 0x80, 0x80, 0x00, 0x00]
        );
    }

    #[test]
    fn selector_layouts() {
        let event = KeyEvent::new(0x02, 5, 0x09);
        assert_eq!(
            Personality::ConsumerControl.key_report(event).as_slice(),
            &[0x01, 0x09]
        );
        assert_eq!(
            Personality::SystemControl.key_report(event).as_slice(),
            &[0x01, 0x09]
        );
        assert_eq!(Personality::Game.key_report(event).as_slice(), &[0x09]);
    }

    #[test]
    fn release_matches_layout_length() {
        let expected = [8, GAMEPAD_FRAME.len(), 2, 2, 1];
        for (p, len) in ALL.into_iter().zip(expected) {
            assert_eq!(p.release_report().len(), len);
            assert_eq!(p.key_report(KeyEvent::new(1, 1, 1)).len(), len);
        }
    }
}
