//! HID report types: descriptors, personalities and report layouts.

pub mod descriptor;
pub mod keyboard;
pub mod mouse;
pub mod personality;
pub mod report;

pub use keyboard::{KeyboardReport, Modifier};
pub use mouse::BootMouseReport;
pub use personality::{KeyEvent, Personality};
pub use report::{InputReport, ProtocolMode, ReportType};
