//! Unified error type for hid-goc.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! GATT-facing variants map onto ATT status codes so the server glue can
//! answer the peer without further translation.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Report dispatch
    /// Write length does not match the report's fixed size.
    InvalidValueSize,

    /// No report exists for the UUID / report type combination.
    AttributeNotFound,

    /// Value is the right size but outside the allowed set.
    InvalidValue,

    // GATT server
    /// Handle does not belong to this service.
    InvalidHandle,

    /// Attribute permissions forbid reading.
    ReadNotPermitted,

    /// Attribute permissions forbid writing.
    WriteNotPermitted,

    /// The link must be encrypted first.
    InsufficientEncryption,

    /// Read or write offset is past the end of the value.
    InvalidOffset,

    /// Offset given for a value that cannot be read in parts.
    AttributeNotLong,

    /// CCCD write with a configuration the characteristic does not support.
    ImproperConfiguration,

    /// No free per-connection slot left in a CCCD table.
    InsufficientResources,

    // Registration
    /// A per-connection CCCD table could not be allocated.
    AllocationFailed,

    /// The BLE stack rejected a request with a raw status code.
    Stack(u8),

    // Application
    /// A UART command line failed validation.
    MalformedCommand,

    /// A bounded channel was full and the message was dropped.
    QueueFull,
}

impl Error {
    /// ATT status byte sent to the peer for this error.
    pub const fn att_code(self) -> u8 {
        match self {
            Error::InvalidHandle => 0x01,
            Error::ReadNotPermitted => 0x02,
            Error::WriteNotPermitted => 0x03,
            Error::InvalidOffset => 0x07,
            Error::AttributeNotFound => 0x0A,
            Error::AttributeNotLong => 0x0B,
            Error::InvalidValueSize => 0x0D,
            Error::InsufficientEncryption => 0x0F,
            Error::InsufficientResources => 0x11,
            Error::AllocationFailed => 0x13,
            Error::InvalidValue => 0x80,
            Error::ImproperConfiguration => 0xFD,
            Error::Stack(code) => code,
            // Never leaves the device; reported as an unlikely error.
            Error::MalformedCommand | Error::QueueFull => 0x0E,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn att_codes_match_core_spec_values() {
        assert_eq!(Error::InvalidValueSize.att_code(), 0x0D);
        assert_eq!(Error::AttributeNotFound.att_code(), 0x0A);
        assert_eq!(Error::InsufficientEncryption.att_code(), 0x0F);
        assert_eq!(Error::ImproperConfiguration.att_code(), 0xFD);
    }

    #[test]
    fn stack_code_passes_through() {
        assert_eq!(Error::Stack(0x85).att_code(), 0x85);
    }
}
