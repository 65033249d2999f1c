//! HID service: attribute table, report map and the read/write hooks the
//! GATT server calls into.

use heapless::Vec;

use super::attr::{Attribute, Permissions, Properties, Value};
use super::cccd::{CccdPool, CccdTable, CCCD_NOTIFY};
use super::uuid;
use super::{AttributeRegistry, BatteryService, GattServer, Link};
use crate::config::HID_INFO_FLAGS;
use crate::dispatch::{HidNotice, ReportStore, ReportValue};
use crate::error::Error;
use crate::hid::personality::Personality;
use crate::hid::report::{
    ProtocolMode, ReportType, REPORT_ID_BATTERY_LEVEL_IN, REPORT_ID_FEATURE, REPORT_ID_KEY_IN,
    REPORT_ID_LED_OUT, REPORT_ID_MOUSE_IN,
};

/// Entries in the HID attribute table.
pub const HID_ATTR_COUNT: usize = 29;

/// Entries in the report map.
pub const HID_NUM_REPORTS: usize = 7;

/// Largest attribute value served (the report map).
pub const MAX_ATTR_LEN: usize = 128;

/// Bytes returned by [`HidService::read_attr`].
pub type AttValue = Vec<u8, MAX_ATTR_LEN>;

// Attribute table indices
const INCLUDED_SERVICE_IDX: usize = 1;
const KEY_IN_IDX: usize = 12;
const LED_OUT_IDX: usize = 16;
const BOOT_KEY_IN_IDX: usize = 19;
const BOOT_KEY_OUT_IDX: usize = 22;
const BOOT_MOUSE_IN_IDX: usize = 24;
const FEATURE_IDX: usize = 27;

// CCCD table indices
const KEY_IN_CCCD: usize = 0;
const BOOT_KEY_IN_CCCD: usize = 1;
const BOOT_MOUSE_IN_CCCD: usize = 2;

// HID Information: bcdHID 1.11, country code 0, flags.
static HID_INFO: [u8; 4] = [0x11, 0x01, 0x00, HID_INFO_FLAGS];

// Report map points at the Battery Level characteristic.
static EXT_REPORT_REF: [u8; 2] = uuid::BATTERY_LEVEL.to_le_bytes();

static KEY_IN_REPORT_REF: [u8; 2] = [REPORT_ID_KEY_IN, ReportType::Input as u8];
static LED_OUT_REPORT_REF: [u8; 2] = [REPORT_ID_LED_OUT, ReportType::Output as u8];
static FEATURE_REPORT_REF: [u8; 2] = [REPORT_ID_FEATURE, ReportType::Feature as u8];

/// Where a report's notification configuration lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CccdRef {
    /// One of this service's CCCD tables.
    Table(usize),
    /// Owned by another service (battery level), by handle.
    External(u16),
}

/// Logical HID report and the attribute backing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportMapEntry {
    pub id: u8,
    pub report_type: ReportType,
    pub handle: u16,
    pub cccd: Option<CccdRef>,
    pub mode: ProtocolMode,
}

fn declaration(props: Properties) -> Attribute {
    Attribute::new(uuid::CHARACTERISTIC, Permissions::READ, Value::Declaration(props))
}

fn cccd(table: usize) -> Attribute {
    Attribute::new(
        uuid::CLIENT_CHAR_CONFIG,
        Permissions::READ | Permissions::ENCRYPT_WRITE,
        Value::Cccd(table),
    )
}

fn report_ref(value: &'static [u8; 2]) -> Attribute {
    Attribute::new(uuid::REPORT_REF, Permissions::READ, Value::Static(value))
}

/// Attribute table for `personality`, handles unassigned.
pub fn attribute_table(personality: Personality) -> [Attribute; HID_ATTR_COUNT] {
    let notify = Properties::READ | Properties::NOTIFY;
    let writable = Properties::READ | Properties::WRITE | Properties::WRITE_NO_RSP;
    [
        Attribute::new(
            uuid::PRIMARY_SERVICE,
            Permissions::READ,
            Value::Service(uuid::HID_SERVICE),
        ),
        Attribute::new(
            uuid::INCLUDE,
            Permissions::READ,
            Value::Include {
                start: 0,
                end: 0,
                uuid: uuid::BATTERY_SERVICE,
            },
        ),
        // HID Information
        declaration(Properties::READ),
        Attribute::new(uuid::HID_INFORMATION, Permissions::ENC_R, Value::Static(&HID_INFO)),
        // HID Control Point
        declaration(Properties::WRITE_NO_RSP),
        Attribute::new(uuid::HID_CONTROL_POINT, Permissions::ENC_W, Value::ControlPoint),
        // Protocol Mode
        declaration(Properties::READ | Properties::WRITE_NO_RSP),
        Attribute::new(uuid::PROTOCOL_MODE, Permissions::ENC_RW, Value::ProtocolMode),
        // Report Map
        declaration(Properties::READ),
        Attribute::new(
            uuid::REPORT_MAP,
            Permissions::ENC_R,
            Value::Static(personality.report_map()),
        ),
        Attribute::new(uuid::EXT_REPORT_REF, Permissions::READ, Value::Static(&EXT_REPORT_REF)),
        // Key input report
        declaration(notify),
        Attribute::new(uuid::REPORT, Permissions::ENC_R, Value::Report),
        cccd(KEY_IN_CCCD),
        report_ref(&KEY_IN_REPORT_REF),
        // LED output report
        declaration(writable),
        Attribute::new(uuid::REPORT, Permissions::ENC_RW, Value::Report),
        report_ref(&LED_OUT_REPORT_REF),
        // Boot keyboard input report
        declaration(notify),
        Attribute::new(uuid::BOOT_KEY_INPUT, Permissions::ENC_R, Value::Report),
        cccd(BOOT_KEY_IN_CCCD),
        // Boot keyboard output report
        declaration(writable),
        Attribute::new(uuid::BOOT_KEY_OUTPUT, Permissions::ENC_RW, Value::Report),
        // Boot mouse input report
        declaration(notify),
        Attribute::new(uuid::BOOT_MOUSE_INPUT, Permissions::ENC_R, Value::Report),
        cccd(BOOT_MOUSE_IN_CCCD),
        // Feature report
        declaration(Properties::READ | Properties::WRITE),
        Attribute::new(uuid::REPORT, Permissions::ENC_RW, Value::Report),
        report_ref(&FEATURE_REPORT_REF),
    ]
}

/// A registered HID service.
pub struct HidService<'p> {
    personality: Personality,
    attrs: [Attribute; HID_ATTR_COUNT],
    reports: [ReportMapEntry; HID_NUM_REPORTS],
    cccds: [CccdTable<'p>; 3],
    store: ReportStore,
    protocol_mode: ProtocolMode,
    suspended: bool,
}

impl<'p> HidService<'p> {
    /// Allocate the CCCD tables, register the attribute table, link the
    /// included battery service and build the report map.
    ///
    /// All or nothing: if any table cannot be allocated, tables already
    /// taken go back to the pool and nothing is registered.
    pub fn register<R, B>(
        personality: Personality,
        pool: &'p CccdPool,
        registry: &mut R,
        battery: &B,
    ) -> Result<Self, Error>
    where
        R: AttributeRegistry,
        B: BatteryService,
    {
        let key_in = pool.alloc().ok_or(Error::AllocationFailed)?;
        let boot_key_in = pool.alloc().ok_or(Error::AllocationFailed)?;
        let boot_mouse_in = pool.alloc().ok_or(Error::AllocationFailed)?;

        let mut attrs = attribute_table(personality);
        registry.register_service(&mut attrs)?;

        let (start, end) = battery.handle_range();
        attrs[INCLUDED_SERVICE_IDX].value = Value::Include {
            start,
            end,
            uuid: uuid::BATTERY_SERVICE,
        };

        let entry = |idx: usize, id, report_type, cccd, mode| ReportMapEntry {
            id,
            report_type,
            handle: attrs[idx].handle,
            cccd,
            mode,
        };
        let (level_handle, level_cccd) = battery.level_handles();
        let reports = [
            entry(
                KEY_IN_IDX,
                REPORT_ID_KEY_IN,
                ReportType::Input,
                Some(CccdRef::Table(KEY_IN_CCCD)),
                ProtocolMode::Report,
            ),
            entry(
                LED_OUT_IDX,
                REPORT_ID_LED_OUT,
                ReportType::Output,
                None,
                ProtocolMode::Report,
            ),
            entry(
                BOOT_KEY_IN_IDX,
                REPORT_ID_KEY_IN,
                ReportType::Input,
                Some(CccdRef::Table(BOOT_KEY_IN_CCCD)),
                ProtocolMode::Boot,
            ),
            entry(
                BOOT_KEY_OUT_IDX,
                REPORT_ID_LED_OUT,
                ReportType::Output,
                None,
                ProtocolMode::Boot,
            ),
            entry(
                BOOT_MOUSE_IN_IDX,
                REPORT_ID_MOUSE_IN,
                ReportType::Input,
                Some(CccdRef::Table(BOOT_MOUSE_IN_CCCD)),
                ProtocolMode::Boot,
            ),
            entry(
                FEATURE_IDX,
                REPORT_ID_FEATURE,
                ReportType::Feature,
                None,
                ProtocolMode::Report,
            ),
            ReportMapEntry {
                id: REPORT_ID_BATTERY_LEVEL_IN,
                report_type: ReportType::Input,
                handle: level_handle,
                cccd: Some(CccdRef::External(level_cccd)),
                mode: ProtocolMode::Report,
            },
        ];

        info!(
            "HID service registered: {=u16}..{=u16}, {} report map",
            attrs[0].handle,
            attrs[HID_ATTR_COUNT - 1].handle,
            personality
        );

        Ok(Self {
            personality,
            attrs,
            reports,
            cccds: [key_in, boot_key_in, boot_mouse_in],
            store: ReportStore::new(),
            protocol_mode: ProtocolMode::Report,
            suspended: false,
        })
    }

    pub fn personality(&self) -> Personality {
        self.personality
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    pub fn report_map(&self) -> &[ReportMapEntry] {
        &self.reports
    }

    pub fn protocol_mode(&self) -> ProtocolMode {
        self.protocol_mode
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Stored value behind a report characteristic, `None` for any other
    /// handle.
    pub fn report_value(&self, handle: u16) -> Option<ReportValue> {
        let attr = self.attrs[self.index_of(handle).ok()?];
        if attr.value != Value::Report {
            return None;
        }
        let report = self.report_by_handle(handle).ok()?;
        Some(self.store.get_parameter(report.id, report.report_type, attr.uuid))
    }

    /// Peer-facing write into the report store (same rules as a GATT write
    /// on the report characteristic).
    pub fn set_parameter(
        &mut self,
        id: u8,
        report_type: ReportType,
        uuid: u16,
        data: &[u8],
    ) -> Result<(), Error> {
        self.store.set_parameter(id, report_type, uuid, data)
    }

    pub fn get_parameter(&self, id: u8, report_type: ReportType, uuid: u16) -> ReportValue {
        self.store.get_parameter(id, report_type, uuid)
    }

    fn index_of(&self, handle: u16) -> Result<usize, Error> {
        self.attrs
            .iter()
            .position(|a| a.handle == handle && handle != 0)
            .ok_or(Error::InvalidHandle)
    }

    fn report_by_handle(&self, handle: u16) -> Result<ReportMapEntry, Error> {
        self.reports
            .iter()
            .copied()
            .find(|r| r.handle == handle)
            .ok_or(Error::AttributeNotFound)
    }

    /// ATT read hook.
    pub fn read_attr(&self, link: Link, handle: u16, offset: usize) -> Result<AttValue, Error> {
        let idx = self.index_of(handle)?;
        let attr = self.attrs[idx];
        attr.permissions.check_read(link.encrypted)?;

        let mut out = AttValue::new();
        let long = match attr.value {
            Value::Service(service) => {
                push(&mut out, &service.to_le_bytes());
                false
            }
            Value::Include { start, end, uuid } => {
                push(&mut out, &start.to_le_bytes());
                push(&mut out, &end.to_le_bytes());
                push(&mut out, &uuid.to_le_bytes());
                false
            }
            Value::Declaration(props) => {
                let value = self.attrs.get(idx + 1).ok_or(Error::AttributeNotFound)?;
                push(&mut out, &[props.bits()]);
                push(&mut out, &value.handle.to_le_bytes());
                push(&mut out, &value.uuid.to_le_bytes());
                false
            }
            Value::Static(bytes) => {
                push(&mut out, bytes);
                true
            }
            Value::Report => {
                let report = self.report_by_handle(handle)?;
                push(&mut out, &self.store.get_parameter(report.id, report.report_type, attr.uuid));
                false
            }
            Value::Cccd(table) => {
                push(&mut out, &self.cccds[table].get(link.conn).to_le_bytes());
                false
            }
            Value::ProtocolMode => {
                push(&mut out, &[self.protocol_mode as u8]);
                false
            }
            Value::ControlPoint => return Err(Error::ReadNotPermitted),
        };

        if offset == 0 {
            return Ok(out);
        }
        if !long {
            return Err(Error::AttributeNotLong);
        }
        if offset > out.len() {
            return Err(Error::InvalidOffset);
        }
        AttValue::from_slice(&out[offset..]).map_err(|_| Error::InvalidOffset)
    }

    /// ATT write hook. Returns what the application should hear about.
    pub fn write_attr(
        &mut self,
        link: Link,
        handle: u16,
        offset: usize,
        data: &[u8],
    ) -> Result<Option<HidNotice>, Error> {
        let idx = self.index_of(handle)?;
        let attr = self.attrs[idx];
        attr.permissions.check_write(link.encrypted)?;
        if offset != 0 {
            return Err(Error::AttributeNotLong);
        }

        match attr.value {
            Value::Cccd(table) => {
                let [lo, hi] = data else {
                    return Err(Error::InvalidValueSize);
                };
                let value = u16::from_le_bytes([*lo, *hi]);
                if value & !CCCD_NOTIFY != 0 {
                    return Err(Error::ImproperConfiguration);
                }
                self.cccds[table].set(link.conn, value)?;
                let report = self
                    .reports
                    .iter()
                    .find(|r| r.cccd == Some(CccdRef::Table(table)))
                    .ok_or(Error::AttributeNotFound)?;
                info!(
                    "conn {=u16}: report {} {} notifications {}",
                    link.conn,
                    report.id,
                    report.report_type,
                    value != 0
                );
                Ok(Some(if value & CCCD_NOTIFY != 0 {
                    HidNotice::NotificationsEnabled {
                        id: report.id,
                        report_type: report.report_type,
                    }
                } else {
                    HidNotice::NotificationsDisabled {
                        id: report.id,
                        report_type: report.report_type,
                    }
                }))
            }
            Value::ProtocolMode => {
                let [value] = data else {
                    return Err(Error::InvalidValueSize);
                };
                let mode = ProtocolMode::from_u8(*value).ok_or(Error::InvalidValue)?;
                self.protocol_mode = mode;
                info!("protocol mode: {}", mode);
                Ok(Some(HidNotice::ProtocolMode(mode)))
            }
            Value::ControlPoint => {
                let [value] = data else {
                    return Err(Error::InvalidValueSize);
                };
                match *value {
                    0 => {
                        self.suspended = true;
                        Ok(Some(HidNotice::Suspend))
                    }
                    1 => {
                        self.suspended = false;
                        Ok(Some(HidNotice::ExitSuspend))
                    }
                    _ => Err(Error::InvalidValue),
                }
            }
            Value::Report => {
                let report = self.report_by_handle(handle)?;
                self.store.write(report.id, report.report_type, attr.uuid, data)
            }
            _ => Err(Error::WriteNotPermitted),
        }
    }

    /// Send an input report on whichever characteristic serves (`id`,
    /// `report_type`) in the current protocol mode, to every connection
    /// that enabled notifications. Notify failures are logged and dropped.
    pub fn report<G: GattServer>(
        &mut self,
        id: u8,
        report_type: ReportType,
        data: &[u8],
        gatt: &mut G,
    ) -> Result<(), Error> {
        let mode = self.protocol_mode;
        let report = self
            .reports
            .iter()
            .copied()
            .find(|r| r.id == id && r.report_type == report_type && r.mode == mode)
            .ok_or(Error::AttributeNotFound)?;

        if let Ok(idx) = self.index_of(report.handle) {
            self.store.record_input(self.attrs[idx].uuid, data);
            gatt.value_changed(report.handle, data);
        }

        match report.cccd {
            Some(CccdRef::Table(table)) => {
                for conn in self.cccds[table].subscribers() {
                    if let Err(e) = gatt.notify(conn, report.handle, data) {
                        warn!("notify conn {=u16} failed: {:?}", conn, e);
                    }
                }
            }
            Some(CccdRef::External(_)) | None => {
                debug!("report {} not notified from this service", id);
            }
        }
        Ok(())
    }

    /// Forget a disconnected peer's notification settings.
    pub fn release_connection(&self, conn: u16) {
        for table in &self.cccds {
            table.release(conn);
        }
    }
}

fn push(out: &mut AttValue, bytes: &[u8]) {
    let room = out.capacity() - out.len();
    let _ = out.extend_from_slice(&bytes[..bytes.len().min(room)]);
}
