//! hid-goc firmware entry point.
//!
//! Brings up the SoftDevice, registers the battery and HID services and
//! spawns the tasks:
//!
//! - SoftDevice event loop
//! - advertising, plus one GATT task per connected central
//! - the application task that owns all HID state
//! - UART receive, debounce and transmit
//! - one debounce task per button

#![no_std]
#![no_main]

mod ble;
mod serial;
mod ui;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::Pin;
use embassy_nrf::interrupt::{self, InterruptExt};
use embassy_nrf::{bind_interrupts, peripherals, uarte};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use nrf_softdevice::{self as sd, Softdevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use hid_goc::app::{keys, App, AppQueue, EventGroup, Mailbox, StackQueue};
use hid_goc::config::{ATT_MTU, DEVICE_NAME, MAX_CONNECTIONS, PERSONALITY, UART_BAUD};
use hid_goc::gatt::{CccdPool, HidService};
use hid_goc::uart::RxHandoff;

use ble::server::{GattBridge, SdGatt, SdHci, SdRegistry};
use serial::UartWriter;

/// Mailbox shared by every producer task.
pub type AppMailbox = Mailbox<'static, CriticalSectionRawMutex>;

type HidApp = App<'static, SdGatt, SdHci, UartWriter>;

static EVENTS: EventGroup<CriticalSectionRawMutex> = EventGroup::new();
static STACK_QUEUE: StackQueue<CriticalSectionRawMutex> = Channel::new();
static APP_QUEUE: AppQueue<CriticalSectionRawMutex> = Channel::new();
static UART_RX: RxHandoff<CriticalSectionRawMutex> = RxHandoff::new();

bind_interrupts!(struct Irqs {
    UARTE0_UART0 => uarte::InterruptHandler<peripherals::UARTE0>;
});

fn mailbox() -> AppMailbox {
    Mailbox {
        events: &EVENTS,
        stack: &STACK_QUEUE,
        queue: &APP_QUEUE,
        uart_rx: &UART_RX,
    }
}

fn embassy_init() -> embassy_nrf::Peripherals {
    let mut config = embassy_nrf::config::Config::default();

    // The SoftDevice reserves priorities 0, 1 and 4.
    config.gpiote_interrupt_priority = interrupt::Priority::P2;
    config.time_interrupt_priority = interrupt::Priority::P2;

    embassy_nrf::init(config)
}

fn softdevice_config() -> sd::Config {
    sd::Config {
        clock: Some(sd::raw::nrf_clock_lf_cfg_t {
            source: sd::raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: sd::raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(sd::raw::ble_gap_conn_cfg_t {
            conn_count: MAX_CONNECTIONS as u8,
            event_length: 24,
        }),
        conn_gatt: Some(sd::raw::ble_gatt_conn_cfg_t {
            att_mtu: ATT_MTU as u16,
        }),
        gatts_attr_tab_size: Some(sd::raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: sd::raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(sd::raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: MAX_CONNECTIONS as u8,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: sd::raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(sd::raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: sd::raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                sd::raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

fn baudrate(baud: u32) -> uarte::Baudrate {
    match baud {
        9_600 => uarte::Baudrate::BAUD9600,
        38_400 => uarte::Baudrate::BAUD38400,
        57_600 => uarte::Baudrate::BAUD57600,
        230_400 => uarte::Baudrate::BAUD230400,
        460_800 => uarte::Baudrate::BAUD460800,
        1_000_000 => uarte::Baudrate::BAUD1M,
        _ => uarte::Baudrate::BAUD115200,
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn app_task(mut app: HidApp, mailbox: AppMailbox) -> ! {
    app.start();
    app.run(mailbox).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_init();
    info!("hid-goc starting, {} link(s)", MAX_CONNECTIONS);

    let mailbox = mailbox();
    let sd = Softdevice::enable(&softdevice_config());

    static CCCD_POOL: StaticCell<CccdPool> = StaticCell::new();
    let pool = CCCD_POOL.init(CccdPool::new());

    let (mut registry, battery) = unwrap!(SdRegistry::new(sd));
    let hid = unwrap!(HidService::register(PERSONALITY, pool, &mut registry, &battery));
    drop(registry);

    let attrs = hid.attributes();
    let hid_range = (
        attrs.first().map_or(0, |a| a.handle),
        attrs.last().map_or(0, |a| a.handle),
    );
    static BRIDGE: StaticCell<GattBridge> = StaticCell::new();
    let bridge: &'static GattBridge = BRIDGE.init(GattBridge::new(battery, hid_range));

    let sd: &'static Softdevice = sd;
    spawner.must_spawn(softdevice_task(sd));

    interrupt::UARTE0_UART0.set_priority(interrupt::Priority::P2);
    let mut uart_config = uarte::Config::default();
    uart_config.parity = uarte::Parity::EXCLUDED;
    uart_config.baudrate = baudrate(UART_BAUD);
    let uart = uarte::Uarte::new(p.UARTE0, Irqs, p.P0_08, p.P0_06, uart_config);
    // TIMER0 and the upper PPI channels belong to the SoftDevice.
    let (tx, rx) = uart.split_with_idle(p.TIMER1, p.PPI_CH0, p.PPI_CH1);
    spawner.must_spawn(serial::uart_tx_task(tx));
    spawner.must_spawn(serial::uart_rx_task(rx, mailbox));
    spawner.must_spawn(serial::uart_debounce_task(mailbox));

    let app = App::new(hid, SdGatt::new(sd), SdHci, UartWriter);
    spawner.must_spawn(app_task(app, mailbox));

    spawner.must_spawn(ui::buttons::button_task(p.P0_11.degrade(), keys::SELECT, mailbox));
    spawner.must_spawn(ui::buttons::button_task(p.P0_12.degrade(), keys::UP, mailbox));
    spawner.must_spawn(ui::buttons::button_task(p.P0_24.degrade(), keys::DOWN, mailbox));
    spawner.must_spawn(ui::buttons::button_task(p.P0_25.degrade(), keys::LEFT, mailbox));
    spawner.must_spawn(ui::buttons::button_task(p.P1_08.degrade(), keys::RIGHT, mailbox));

    spawner.must_spawn(ble::peripheral::advertise_task(spawner, sd, bridge, mailbox));
}
