//! SoftDevice GATT glue.
//!
//! The HID attribute table is registered through [`ServiceBuilder`]; the
//! SoftDevice then owns the values and answers reads itself. Peer writes
//! come back through [`GattBridge`] and are queued for the application
//! task, which keeps the authoritative copy and mirrors changes back with
//! `set_value`.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use defmt::{debug, info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{
    Attribute as SdAttribute, Metadata, Properties as SdProperties,
};
use nrf_softdevice::ble::gatt_server::{self, RegisterError, Service, WriteOp};
use nrf_softdevice::ble::{Connection, SecurityMode, Uuid};
use nrf_softdevice::{raw, Softdevice};

use hid_goc::app::HciController;
use hid_goc::config::{ATT_MTU, MAX_CONNECTIONS};
use hid_goc::gatt::{
    AttResponse, Attribute, AttributeRegistry, BatteryService, GattServer, Permissions,
    Properties, Value,
};
use hid_goc::hid::report::MAX_INPUT_REPORT_LEN;
use hid_goc::Error;

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct Battery {
    #[characteristic(uuid = "2a19", read, notify, security = "justworks")]
    battery_level: u8,
}

impl BatteryService for Battery {
    fn handle_range(&self) -> (u16, u16) {
        // Service declaration, characteristic declaration, value, CCCD.
        (
            self.battery_level_value_handle - 2,
            self.battery_level_cccd_handle,
        )
    }

    fn level_handles(&self) -> (u16, u16) {
        (self.battery_level_value_handle, self.battery_level_cccd_handle)
    }
}

fn register_error(e: RegisterError) -> Error {
    warn!("GATT registration failed: {:?}", e);
    Error::InsufficientResources
}

fn sd_properties(props: Properties) -> SdProperties {
    let mut out = SdProperties::new();
    if props.contains(Properties::READ) {
        out = out.read();
    }
    if props.contains(Properties::WRITE) {
        out = out.write();
    }
    if props.contains(Properties::WRITE_NO_RSP) {
        out = out.write_without_response();
    }
    if props.contains(Properties::NOTIFY) {
        out = out.notify();
    }
    out
}

/// Input reports vary in length with the personality. Output and feature
/// reports are one byte, fixed, so the SoftDevice rejects other lengths
/// before storing them.
fn sd_attribute(attr: &Attribute, props: Properties) -> SdAttribute<&'static [u8]> {
    let initial: &'static [u8] = match attr.value {
        Value::Static(bytes) => bytes,
        Value::ProtocolMode => &[0x01],
        Value::ControlPoint => &[0x00],
        Value::Report if !props.contains(Properties::NOTIFY) => &[0x00],
        _ => &[],
    };
    let mut out = SdAttribute::new(initial);
    if attr.value == Value::Report && props.contains(Properties::NOTIFY) {
        out = out.variable_len(MAX_INPUT_REPORT_LEN as u16);
    }
    if attr.permissions.contains(Permissions::ENCRYPT_READ) {
        out = out.read_security(SecurityMode::JustWorks);
    }
    if attr.permissions.contains(Permissions::ENCRYPT_WRITE) {
        out = out.write_security(SecurityMode::JustWorks);
    }
    out
}

/// Startup-time registration. Borrows the SoftDevice mutably, so it must
/// be dropped before the SoftDevice task is spawned.
pub struct SdRegistry<'d> {
    sd: &'d mut Softdevice,
    battery_range: (u16, u16),
}

impl<'d> SdRegistry<'d> {
    /// Register the battery service first; the HID service includes it.
    pub fn new(sd: &'d mut Softdevice) -> Result<(Self, Battery), Error> {
        let battery = Battery::new(sd).map_err(register_error)?;
        if let Err(e) = battery.battery_level_set(sd, &100) {
            warn!("battery level not set: {:?}", e);
        }
        let battery_range = battery.handle_range();
        Ok((Self { sd, battery_range }, battery))
    }
}

impl AttributeRegistry for SdRegistry<'_> {
    fn register_service(&mut self, attrs: &mut [Attribute]) -> Result<(), Error> {
        let Some((service, rest)) = attrs.split_first_mut() else {
            return Err(Error::InvalidValue);
        };
        let Value::Service(service_uuid) = service.value else {
            return Err(Error::InvalidValue);
        };

        // Handles are assigned sequentially; this service follows the battery service.
        service.handle = self.battery_range.1 + 1;
        let mut sb =
            ServiceBuilder::new(self.sd, Uuid::new_16(service_uuid)).map_err(register_error)?;

        let mut i = 0;
        while i < rest.len() {
            match rest[i].value {
                Value::Include { .. } => {
                    let mut handle = 0u16;
                    let ret = unsafe {
                        raw::sd_ble_gatts_include_add(
                            raw::BLE_GATT_HANDLE_INVALID as u16,
                            self.battery_range.0,
                            &mut handle,
                        )
                    };
                    if ret != raw::NRF_SUCCESS {
                        return Err(Error::Stack(ret as u8));
                    }
                    rest[i].handle = handle;
                    i += 1;
                }
                Value::Declaration(props) => {
                    let Some(value) = rest.get(i + 1).copied() else {
                        return Err(Error::InvalidValue);
                    };
                    let metadata = if props.contains(Properties::NOTIFY) {
                        Metadata::with_security(sd_properties(props), SecurityMode::JustWorks)
                    } else {
                        Metadata::new(sd_properties(props))
                    };
                    let mut cb = sb
                        .add_characteristic(
                            Uuid::new_16(value.uuid),
                            sd_attribute(&value, props),
                            metadata,
                        )
                        .map_err(register_error)?;

                    // Descriptors run until the next declaration. The CCCD is
                    // created by the SoftDevice with the characteristic.
                    let mut end = i + 2;
                    while end < rest.len() && !matches!(rest[end].value, Value::Declaration(_)) {
                        if let Value::Static(bytes) = rest[end].value {
                            let mut attr = SdAttribute::new(bytes);
                            if rest[end].permissions.contains(Permissions::ENCRYPT_READ) {
                                attr = attr.read_security(SecurityMode::JustWorks);
                            }
                            cb.add_descriptor(Uuid::new_16(rest[end].uuid), attr)
                                .map_err(register_error)?;
                        }
                        end += 1;
                    }
                    let handles = cb.build();

                    rest[i].handle = handles.value_handle - 1;
                    rest[i + 1].handle = handles.value_handle;
                    let mut next = handles.value_handle + 1;
                    for attr in &mut rest[i + 2..end] {
                        if let Value::Cccd(_) = attr.value {
                            attr.handle = handles.cccd_handle;
                            next = handles.cccd_handle + 1;
                        }
                    }
                    for attr in &mut rest[i + 2..end] {
                        if let Value::Static(_) = attr.value {
                            attr.handle = next;
                            next += 1;
                        }
                    }
                    i = end;
                }
                _ => return Err(Error::InvalidValue),
            }
        }
        sb.build();

        info!(
            "service {=u16:#x} registered at {=u16:#x}..={=u16:#x}",
            service_uuid,
            service.handle,
            rest.last().map_or(service.handle, |a| a.handle)
        );
        Ok(())
    }
}

static CONNECTIONS: Mutex<CriticalSectionRawMutex, RefCell<Vec<Connection, MAX_CONNECTIONS>>> =
    Mutex::new(RefCell::new(Vec::new()));

/// Remember a live connection so notifications can find it by handle.
pub fn track(conn: &Connection) {
    CONNECTIONS.lock(|c| {
        if c.borrow_mut().push(conn.clone()).is_err() {
            warn!("connection table full");
        }
    });
}

pub fn untrack(handle: u16) {
    CONNECTIONS.lock(|c| c.borrow_mut().retain(|conn| conn.handle() != Some(handle)));
}

fn connection(handle: u16) -> Option<Connection> {
    CONNECTIONS.lock(|c| {
        c.borrow()
            .iter()
            .find(|conn| conn.handle() == Some(handle))
            .cloned()
    })
}

// Low 32 bits of the uptime in ms at the last input report.
static LAST_REPORT_MS: AtomicU32 = AtomicU32::new(0);

fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}

/// Restart the idle timer.
pub fn mark_activity() {
    LAST_REPORT_MS.store(now_ms(), Ordering::Relaxed);
}

/// Milliseconds since the last input report.
pub fn idle_ms() -> u32 {
    now_ms().wrapping_sub(LAST_REPORT_MS.load(Ordering::Relaxed))
}

/// Runtime GATT server used by the application task.
pub struct SdGatt {
    sd: &'static Softdevice,
}

impl SdGatt {
    pub fn new(sd: &'static Softdevice) -> Self {
        Self { sd }
    }
}

impl GattServer for SdGatt {
    fn notify(&mut self, conn: u16, handle: u16, value: &[u8]) -> Result<(), Error> {
        let connection = connection(conn).ok_or(Error::InvalidHandle)?;
        mark_activity();
        gatt_server::notify_value(&connection, handle, value).map_err(|e| {
            debug!("notify {=u16:#x} failed: {:?}", handle, e);
            Error::InsufficientResources
        })
    }

    fn respond(&mut self, conn: u16, response: AttResponse<'_>) {
        // The SoftDevice has already answered the peer; the application
        // restores rejected report values through `value_changed`.
        if let AttResponse::Error { handle, code } = response {
            warn!("conn {=u16}: write to {=u16:#x} rejected ({=u8:#x})", conn, handle, code);
        }
    }

    fn value_changed(&mut self, handle: u16, value: &[u8]) {
        if let Err(e) = gatt_server::set_value(self.sd, handle, value) {
            warn!("set_value {=u16:#x} failed: {:?}", handle, e);
        }
    }
}

/// A peer write inside the HID service.
pub struct GattWrite {
    pub handle: u16,
    pub offset: u16,
    pub value: Vec<u8, ATT_MTU>,
}

/// Receives write events from the SoftDevice for every connection.
pub struct GattBridge {
    battery: Battery,
    hid_range: (u16, u16),
}

impl GattBridge {
    pub fn new(battery: Battery, hid_range: (u16, u16)) -> Self {
        Self { battery, hid_range }
    }
}

impl gatt_server::Server for GattBridge {
    type Event = GattWrite;

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        _op: WriteOp,
        offset: usize,
        data: &[u8],
    ) -> Option<GattWrite> {
        if let Some(BatteryEvent::BatteryLevelCccdWrite { notifications }) =
            self.battery.on_write(handle, data)
        {
            debug!("battery level notifications: {}", notifications);
            return None;
        }
        let (first, last) = self.hid_range;
        if !(first..=last).contains(&handle) {
            return None;
        }
        let mut value = Vec::new();
        let n = data.len().min(ATT_MTU);
        let _ = value.extend_from_slice(&data[..n]);
        Some(GattWrite {
            handle,
            offset: offset as u16,
            value,
        })
    }
}

/// The SoftDevice keeps its link layer feature set to itself; there is no
/// HCI to mask the connection parameters request procedure through.
pub struct SdHci;

impl HciController for SdHci {
    fn read_local_supported_features(&mut self) {
        info!("LL features are fixed by the SoftDevice");
    }

    fn set_local_supported_features(&mut self, features: &[u8; 8]) {
        debug!("LL features {:#x} ignored", features);
    }
}
