//! GATT attribute model: permissions, characteristic properties and the
//! attribute record the service table is built from.

use bitflags::bitflags;

use crate::error::Error;

bitflags! {
    /// Attribute access permissions.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const AUTHEN_READ = 0x04;
        const AUTHEN_WRITE = 0x08;
        const AUTHOR_READ = 0x10;
        const AUTHOR_WRITE = 0x20;
        const ENCRYPT_READ = 0x40;
        const ENCRYPT_WRITE = 0x80;
    }
}

bitflags! {
    /// Characteristic properties advertised in the declaration.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Properties: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_NO_RSP = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
    }
}

impl Permissions {
    /// Encrypted read only.
    pub const ENC_R: Self = Self::ENCRYPT_READ;
    /// Encrypted write only.
    pub const ENC_W: Self = Self::ENCRYPT_WRITE;
    /// Encrypted read and write.
    pub const ENC_RW: Self = Self::ENCRYPT_READ.union(Self::ENCRYPT_WRITE);

    /// Whether a read is allowed on a link with the given encryption state.
    pub fn check_read(self, encrypted: bool) -> Result<(), Error> {
        check(self, Self::READ, Self::ENCRYPT_READ, encrypted, Error::ReadNotPermitted)
    }

    /// Whether a write is allowed on a link with the given encryption state.
    pub fn check_write(self, encrypted: bool) -> Result<(), Error> {
        check(self, Self::WRITE, Self::ENCRYPT_WRITE, encrypted, Error::WriteNotPermitted)
    }
}

fn check(
    perms: Permissions,
    open: Permissions,
    encrypted_only: Permissions,
    encrypted: bool,
    denied: Error,
) -> Result<(), Error> {
    if perms.contains(open) {
        Ok(())
    } else if perms.contains(encrypted_only) {
        if encrypted {
            Ok(())
        } else {
            Err(Error::InsufficientEncryption)
        }
    } else {
        Err(denied)
    }
}

/// Where an attribute's value lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    /// Primary service declaration carrying the service UUID.
    Service(u16),
    /// Included service declaration; the range is filled in at registration.
    Include { start: u16, end: u16, uuid: u16 },
    /// Characteristic declaration. Handle and UUID come from the next entry.
    Declaration(Properties),
    /// Constant bytes.
    Static(&'static [u8]),
    /// Report value, resolved through the report map by handle.
    Report,
    /// Client characteristic configuration, index into the service's CCCD tables.
    Cccd(usize),
    /// Protocol Mode characteristic value.
    ProtocolMode,
    /// HID Control Point characteristic value.
    ControlPoint,
}

/// One entry of a service's attribute table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub uuid: u16,
    pub permissions: Permissions,
    /// Assigned by the GATT server at registration, 0 until then.
    pub handle: u16,
    pub value: Value,
}

impl Attribute {
    pub const fn new(uuid: u16, permissions: Permissions, value: Value) -> Self {
        Self {
            uuid,
            permissions,
            handle: 0,
            value,
        }
    }
}
