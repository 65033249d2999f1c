//! Advertising, pairing and per-connection GATT tasks.
//!
//! One advertising loop hands every accepted link to its own connection
//! task (up to `MAX_CONNECTIONS`). Link events reach the application task
//! through the shared mailbox.

use core::cell::RefCell;

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select3, Either3};
use embassy_time::Timer;
use heapless::Vec;
use nrf_softdevice::ble::gatt_server;
use nrf_softdevice::ble::peripheral::{self, advertise_pairable, ConnectableAdvertisement};
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode};
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;

use hid_goc::app::{GapEvent, GattRequest, StackMessage};
use hid_goc::config::{HID_IDLE_TIMEOUT_MS, MAX_CONNECTIONS};
use hid_goc::gap::{self, BondConfig, ConnParams, ADV_DATA, SCAN_RSP_DATA};

use super::server::{self, GattBridge};
use crate::AppMailbox;

/// Bonds kept in RAM; the oldest is evicted when full.
const MAX_BONDS: usize = 4;

struct PeerBond {
    master_id: MasterId,
    key: EncryptionInfo,
    peer_id: IdentityKey,
}

struct Bonder {
    config: BondConfig,
    peers: RefCell<Vec<PeerBond, MAX_BONDS>>,
    mailbox: AppMailbox,
}

impl Bonder {
    fn new(config: BondConfig, mailbox: AppMailbox) -> Self {
        Self {
            config,
            peers: RefCell::new(Vec::new()),
            mailbox,
        }
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        match self.config.io_capabilities {
            gap::IoCapabilities::NoInputNoOutput => IoCapabilities::None,
            gap::IoCapabilities::DisplayOnly => IoCapabilities::DisplayOnly,
            gap::IoCapabilities::KeyboardOnly => IoCapabilities::KeyboardOnly,
        }
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        self.config.bonding
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        let mut peers = self.peers.borrow_mut();
        if let Some(existing) = peers.iter_mut().find(|p| p.master_id == master_id) {
            existing.key = key;
            existing.peer_id = peer_id;
            return;
        }

        if peers.is_full() {
            peers.remove(0);
        }

        let _ = peers.push(PeerBond {
            master_id,
            key,
            peer_id,
        });
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.peers
            .borrow()
            .iter()
            .find_map(|p| (p.master_id == master_id).then_some(p.key))
    }

    fn get_peripheral_key(&self, conn: &Connection) -> Option<(MasterId, EncryptionInfo)> {
        self.peers.borrow().iter().find_map(|p| {
            p.peer_id
                .is_match(conn.peer_address())
                .then_some((p.master_id, p.key))
        })
    }

    fn on_security_update(&self, conn: &Connection, mode: SecurityMode) {
        info!("security mode updated: {}", mode);
        if matches!(mode, SecurityMode::NoAccess | SecurityMode::Open) {
            return;
        }
        if let Some(handle) = conn.handle() {
            post(self.mailbox, GapEvent::LinkEncrypted { conn: handle });
        }
    }
}

fn bonder(mailbox: AppMailbox) -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder::new(BondConfig::DEFAULT, mailbox))
}

/// For callbacks that cannot wait. Losing `LinkEncrypted` leaves the link
/// treated as unencrypted.
fn post(mailbox: AppMailbox, event: GapEvent) {
    if mailbox.post_stack(StackMessage::Gap(event)).is_err() {
        warn!("stack queue full, {} dropped", event);
    }
}

/// Advertise until a central connects, hand the link off, repeat.
#[embassy_executor::task]
pub async fn advertise_task(
    spawner: Spawner,
    sd: &'static Softdevice,
    server: &'static GattBridge,
    mailbox: AppMailbox,
) -> ! {
    let bonder = bonder(mailbox);
    let config = peripheral::Config::default();

    loop {
        let advertisement = ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_RSP_DATA,
        };
        match advertise_pairable(sd, advertisement, &config, bonder).await {
            Ok(conn) => {
                info!("central connected");
                if spawner.spawn(connection_task(conn, server, mailbox)).is_err() {
                    warn!("no free connection task, dropping link");
                }
            }
            Err(e) => {
                warn!("advertising failed: {:?}", e);
                Timer::after_secs(1).await;
            }
        }
    }
}

#[embassy_executor::task(pool_size = MAX_CONNECTIONS)]
async fn connection_task(conn: Connection, server: &'static GattBridge, mailbox: AppMailbox) {
    let Some(handle) = conn.handle() else {
        return;
    };
    server::track(&conn);
    server::mark_activity();
    mailbox
        .send_stack(StackMessage::Gap(GapEvent::LinkEstablished { conn: handle }))
        .await;

    if !BondConfig::DEFAULT.wait_for_request {
        if let Err(e) = conn.request_pairing() {
            warn!("security request failed: {:?}", e);
        }
    }

    let gatt = gatt_server::run(&conn, server, |write| {
        let request = GattRequest::Write {
            conn: handle,
            handle: write.handle,
            offset: write.offset,
            value: write.value,
        };
        if mailbox.post_stack(StackMessage::Gatt(request)).is_err() {
            warn!("stack queue full, write to {=u16:#x} dropped", write.handle);
        }
    });

    match select3(
        gatt,
        update_params(&conn, ConnParams::DEFAULT),
        idle_timeout(&conn),
    )
    .await
    {
        Either3::First(e) => info!("link {=u16} closed: {:?}", handle, e),
        Either3::Second(never) | Either3::Third(never) => match never {},
    }

    server::untrack(handle);
    mailbox
        .send_stack(StackMessage::Gap(GapEvent::LinkTerminated { conn: handle }))
        .await;
}

/// Ask for the preferred parameters once the link has settled.
async fn update_params(conn: &Connection, params: ConnParams) -> core::convert::Infallible {
    if params.request_update && !params.is_valid() {
        warn!("connection parameters out of range, no update requested");
    } else if params.request_update {
        Timer::after_secs(params.pause_secs).await;
        let raw_params = raw::ble_gap_conn_params_t {
            min_conn_interval: params.min_interval,
            max_conn_interval: params.max_interval,
            slave_latency: params.slave_latency,
            conn_sup_timeout: params.supervision_timeout,
        };
        if let Err(e) = conn.set_conn_params(raw_params) {
            warn!("connection parameter update failed: {:?}", e);
        }
    }
    core::future::pending().await
}

/// Disconnect once no input report has gone out for `HID_IDLE_TIMEOUT_MS`.
async fn idle_timeout(conn: &Connection) -> core::convert::Infallible {
    if HID_IDLE_TIMEOUT_MS > 0 {
        loop {
            let idle = server::idle_ms();
            if idle >= HID_IDLE_TIMEOUT_MS {
                info!("idle for {=u32} ms, disconnecting", idle);
                if let Err(e) = conn.disconnect() {
                    warn!("disconnect failed: {:?}", e);
                }
                break;
            }
            Timer::after_millis(u64::from(HID_IDLE_TIMEOUT_MS - idle)).await;
        }
    }
    core::future::pending().await
}
