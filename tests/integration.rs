//! Integration tests for the hid-goc application flow.
//!
//! The BLE stack, the HCI controller and the UART are replaced by fakes
//! that write into one shared log, so the tests can check both what
//! happened and in which order.

use std::cell::RefCell;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec as HVec;

use hid_goc::app::{
    keys, App, AppQueue, EventFlags, EventGroup, GapEvent, GattRequest, HciController, Mailbox,
    StackMessage, StackQueue,
};
use hid_goc::gatt::{
    uuid, AttResponse, Attribute, AttributeRegistry, BatteryService, CccdPool, GattServer,
    HidService,
};
use hid_goc::hid::report::{ProtocolMode, ReportType, REPORT_ID_KEY_IN};
use hid_goc::hid::Personality;
use hid_goc::uart::{RxHandoff, UartTx};
use hid_goc::Error;

// ═══════════════════════════════════════════════════════════════════════════
// Fakes
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
enum Reply {
    Read(Vec<u8>),
    Write,
    Error { handle: u16, code: u8 },
}

#[derive(Clone, Debug, PartialEq)]
enum Seen {
    Notify { conn: u16, handle: u16, value: Vec<u8> },
    Reply { conn: u16, reply: Reply },
    Uart(Vec<u8>),
}

type Log = Rc<RefCell<Vec<Seen>>>;

/// Sequential handles from 1, everything else goes to the log.
struct FakeGatt {
    next_handle: u16,
    registered: usize,
    mirrored: Vec<(u16, Vec<u8>)>,
    log: Log,
}

impl FakeGatt {
    fn new(log: Log) -> Self {
        Self {
            next_handle: 0,
            registered: 0,
            mirrored: Vec::new(),
            log,
        }
    }
}

impl AttributeRegistry for FakeGatt {
    fn register_service(&mut self, attrs: &mut [Attribute]) -> Result<(), Error> {
        for attr in attrs.iter_mut() {
            self.next_handle += 1;
            attr.handle = self.next_handle;
        }
        self.registered += 1;
        Ok(())
    }
}

impl GattServer for FakeGatt {
    fn notify(&mut self, conn: u16, handle: u16, value: &[u8]) -> Result<(), Error> {
        self.log.borrow_mut().push(Seen::Notify {
            conn,
            handle,
            value: value.to_vec(),
        });
        Ok(())
    }

    fn respond(&mut self, conn: u16, response: AttResponse<'_>) {
        let reply = match response {
            AttResponse::Read(v) => Reply::Read(v.to_vec()),
            AttResponse::Write => Reply::Write,
            AttResponse::Error { handle, code } => Reply::Error { handle, code },
        };
        self.log.borrow_mut().push(Seen::Reply { conn, reply });
    }

    fn value_changed(&mut self, handle: u16, value: &[u8]) {
        self.mirrored.push((handle, value.to_vec()));
    }
}

struct FakeBattery;

impl BatteryService for FakeBattery {
    fn handle_range(&self) -> (u16, u16) {
        (0x0100, 0x0103)
    }

    fn level_handles(&self) -> (u16, u16) {
        (0x0102, 0x0103)
    }
}

#[derive(Default)]
struct FakeHci {
    reads: usize,
    written: Vec<[u8; 8]>,
}

impl HciController for FakeHci {
    fn read_local_supported_features(&mut self) {
        self.reads += 1;
    }

    fn set_local_supported_features(&mut self, features: &[u8; 8]) {
        self.written.push(*features);
    }
}

struct FakeUart(Log);

impl UartTx for FakeUart {
    fn write(&mut self, bytes: &[u8]) {
        self.0.borrow_mut().push(Seen::Uart(bytes.to_vec()));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Harness
// ═══════════════════════════════════════════════════════════════════════════

type TestApp<'p> = App<'p, FakeGatt, FakeHci, FakeUart>;

struct Queues {
    events: EventGroup<NoopRawMutex>,
    stack: StackQueue<NoopRawMutex>,
    queue: AppQueue<NoopRawMutex>,
    uart_rx: RxHandoff<NoopRawMutex>,
}

impl Queues {
    fn new() -> Self {
        Self {
            events: EventGroup::new(),
            stack: Channel::new(),
            queue: Channel::new(),
            uart_rx: RxHandoff::new(),
        }
    }

    fn mailbox(&self) -> Mailbox<'_, NoopRawMutex> {
        Mailbox {
            events: &self.events,
            stack: &self.stack,
            queue: &self.queue,
            uart_rx: &self.uart_rx,
        }
    }
}

fn app<'p>(pool: &'p CccdPool, log: &Log) -> TestApp<'p> {
    let mut gatt = FakeGatt::new(log.clone());
    let hid = HidService::register(Personality::Keyboard, pool, &mut gatt, &FakeBattery).unwrap();
    App::new(hid, gatt, FakeHci::default(), FakeUart(log.clone()))
}

/// Service wakeups until nothing is pending.
fn pump(app: &mut TestApp<'_>, mailbox: &Mailbox<'_, NoopRawMutex>) {
    loop {
        let ready = mailbox.events.take(EventFlags::all());
        if ready.is_empty() {
            break;
        }
        app.service(ready, mailbox);
    }
}

fn value_handle(app: &TestApp<'_>, uuid: u16, nth: usize) -> u16 {
    app.hid()
        .attributes()
        .iter()
        .filter(|a| a.uuid == uuid)
        .nth(nth)
        .map(|a| a.handle)
        .unwrap()
}

fn write(mailbox: &Mailbox<'_, NoopRawMutex>, conn: u16, handle: u16, data: &[u8]) {
    mailbox
        .post_stack(StackMessage::Gatt(GattRequest::Write {
            conn,
            handle,
            offset: 0,
            value: HVec::from_slice(data).unwrap(),
        }))
        .unwrap();
}

fn gap(mailbox: &Mailbox<'_, NoopRawMutex>, event: GapEvent) {
    mailbox.post_stack(StackMessage::Gap(event)).unwrap();
}

/// Encrypted link on `conn` with key input notifications enabled.
fn subscribe_key_input(app: &mut TestApp<'_>, mailbox: &Mailbox<'_, NoopRawMutex>, conn: u16) {
    gap(mailbox, GapEvent::LinkEstablished { conn });
    gap(mailbox, GapEvent::LinkEncrypted { conn });
    let cccd = value_handle(app, uuid::REPORT, 0) + 1;
    write(mailbox, conn, cccd, &[0x01, 0x00]);
    pump(app, mailbox);
}

fn uart_feed(app: &mut TestApp<'_>, mailbox: &Mailbox<'_, NoopRawMutex>, bytes: &[u8]) {
    if mailbox.uart_received(bytes) {
        mailbox.uart_debounced();
    }
    pump(app, mailbox);
}

fn uart_output(log: &Log) -> Vec<u8> {
    log.borrow()
        .iter()
        .filter_map(|s| match s {
            Seen::Uart(bytes) => Some(bytes.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn notifications(log: &Log) -> Vec<(u16, Vec<u8>)> {
    log.borrow()
        .iter()
        .filter_map(|s| match s {
            Seen::Notify { handle, value, .. } => Some((*handle, value.clone())),
            _ => None,
        })
        .collect()
}

fn replies(log: &Log) -> Vec<Reply> {
    log.borrow()
        .iter()
        .filter_map(|s| match s {
            Seen::Reply { reply, .. } => Some(reply.clone()),
            _ => None,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn registration_fails_cleanly_without_cccd_tables() {
    let pool = CccdPool::with_capacity(1);
    let log = Log::default();
    let mut gatt = FakeGatt::new(log);

    let result = HidService::register(Personality::Keyboard, &pool, &mut gatt, &FakeBattery);

    assert_eq!(result.err(), Some(Error::AllocationFailed));
    assert_eq!(pool.available(), 1);
    assert_eq!(gatt.registered, 0);
}

#[test]
fn start_masks_link_layer_feature_and_greets() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    app.start();
    assert_eq!(app.hci().reads, 1);
    assert_eq!(uart_output(&log), b"HS\n");

    let complete = |params: &[u8]| StackMessage::HciCommandComplete {
        opcode: 0x2003,
        params: HVec::from_slice(params).unwrap(),
    };
    mailbox
        .post_stack(complete(&[0x00, 0xFF, 0x01, 0, 0, 0, 0, 0, 0]))
        .unwrap();
    // Failed status and unrelated opcodes are ignored.
    mailbox
        .post_stack(complete(&[0x0C, 0xFF, 0, 0, 0, 0, 0, 0, 0]))
        .unwrap();
    mailbox
        .post_stack(StackMessage::HciCommandComplete {
            opcode: 0x0C03,
            params: HVec::from_slice(&[0x00]).unwrap(),
        })
        .unwrap();
    pump(&mut app, &mailbox);

    assert_eq!(app.hci().written, vec![[0xFD, 0x01, 0, 0, 0, 0, 0, 0]]);
}

// ═══════════════════════════════════════════════════════════════════════════
// GATT requests through the event loop
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn cccd_write_needs_encryption() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    gap(&mailbox, GapEvent::LinkEstablished { conn: 3 });
    let cccd = value_handle(&app, uuid::REPORT, 0) + 1;
    write(&mailbox, 3, cccd, &[0x01, 0x00]);
    pump(&mut app, &mailbox);

    assert_eq!(
        replies(&log),
        vec![Reply::Error {
            handle: cccd,
            code: 0x0F
        }]
    );
    assert_eq!(app.links().len(), 1);
    assert!(!app.links()[0].encrypted);
}

#[test]
fn read_request_is_answered() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    gap(&mailbox, GapEvent::LinkEstablished { conn: 0 });
    gap(&mailbox, GapEvent::LinkEncrypted { conn: 0 });
    let protocol_mode = value_handle(&app, uuid::PROTOCOL_MODE, 0);
    mailbox
        .post_stack(StackMessage::Gatt(GattRequest::Read {
            conn: 0,
            handle: protocol_mode,
            offset: 0,
        }))
        .unwrap();
    mailbox
        .post_stack(StackMessage::Gatt(GattRequest::Read {
            conn: 0,
            handle: 0x0FFF,
            offset: 0,
        }))
        .unwrap();
    pump(&mut app, &mailbox);

    assert_eq!(
        replies(&log),
        vec![
            Reply::Read(vec![ProtocolMode::Report as u8]),
            Reply::Error {
                handle: 0x0FFF,
                code: 0x01
            },
        ]
    );
}

#[test]
fn feature_report_round_trip_and_size_check() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    gap(&mailbox, GapEvent::LinkEstablished { conn: 0 });
    gap(&mailbox, GapEvent::LinkEncrypted { conn: 0 });
    // Key input, LED output, feature.
    let feature = value_handle(&app, uuid::REPORT, 2);
    write(&mailbox, 0, feature, &[0x5A]);
    write(&mailbox, 0, feature, &[0x01, 0x02]);
    pump(&mut app, &mailbox);

    assert_eq!(
        replies(&log),
        vec![
            Reply::Write,
            Reply::Error {
                handle: feature,
                code: 0x0D
            },
        ]
    );
    assert_eq!(
        app.hid()
            .get_parameter(0, ReportType::Feature, uuid::REPORT)
            .as_slice(),
        &[0x5A]
    );
}

#[test]
fn boot_keyboard_output_write_and_restore() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    gap(&mailbox, GapEvent::LinkEstablished { conn: 0 });
    gap(&mailbox, GapEvent::LinkEncrypted { conn: 0 });
    let boot_out = value_handle(&app, uuid::BOOT_KEY_OUTPUT, 0);
    write(&mailbox, 0, boot_out, &[0x01]);
    write(&mailbox, 0, boot_out, &[0x01, 0x02]);
    pump(&mut app, &mailbox);

    assert_eq!(
        replies(&log),
        vec![
            Reply::Write,
            Reply::Error {
                handle: boot_out,
                code: 0x0D
            },
        ]
    );
    assert_eq!(
        app.hid()
            .get_parameter(0, ReportType::Output, uuid::BOOT_KEY_OUTPUT)
            .as_slice(),
        &[0x01]
    );
    // The rejected bytes are overwritten with the stored value.
    assert_eq!(app.gatt().mirrored, vec![(boot_out, vec![0x01])]);
}

#[test]
fn rejected_cccd_write_is_not_mirrored() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    gap(&mailbox, GapEvent::LinkEstablished { conn: 0 });
    gap(&mailbox, GapEvent::LinkEncrypted { conn: 0 });
    let cccd = value_handle(&app, uuid::REPORT, 0) + 1;
    write(&mailbox, 0, cccd, &[0x01]);
    pump(&mut app, &mailbox);

    assert_eq!(
        replies(&log),
        vec![Reply::Error {
            handle: cccd,
            code: 0x0D
        }]
    );
    assert!(app.gatt().mirrored.is_empty());
}

#[test]
fn reused_handle_starts_unencrypted_and_unsubscribed() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    subscribe_key_input(&mut app, &mailbox, 0);

    // The disconnect never arrives; the next central gets the same handle.
    gap(&mailbox, GapEvent::LinkEstablished { conn: 0 });
    let cccd = value_handle(&app, uuid::REPORT, 0) + 1;
    write(&mailbox, 0, cccd, &[0x01, 0x00]);
    mailbox.post_keys(keys::UP).unwrap();
    pump(&mut app, &mailbox);

    assert_eq!(app.links().len(), 1);
    assert!(!app.links()[0].encrypted);
    assert_eq!(
        replies(&log).last(),
        Some(&Reply::Error {
            handle: cccd,
            code: 0x0F
        })
    );
    assert!(notifications(&log).is_empty());
}

#[test]
fn lifecycle_events_wait_for_queue_room() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    gap(&mailbox, GapEvent::LinkEstablished { conn: 2 });
    let protocol_mode = value_handle(&app, uuid::PROTOCOL_MODE, 0);
    let read = StackMessage::Gatt(GattRequest::Read {
        conn: 2,
        handle: protocol_mode,
        offset: 0,
    });
    while mailbox.post_stack(read.clone()).is_ok() {}
    let terminated = StackMessage::Gap(GapEvent::LinkTerminated { conn: 2 });
    assert_eq!(mailbox.post_stack(terminated.clone()), Err(Error::QueueFull));

    let mut send = core::pin::pin!(mailbox.send_stack(terminated));
    assert!(embassy_futures::poll_once(send.as_mut()).is_pending());
    // One wakeup frees a slot.
    app.service(mailbox.events.take(EventFlags::all()), &mailbox);
    assert!(embassy_futures::poll_once(send.as_mut()).is_ready());
    pump(&mut app, &mailbox);

    assert!(app.links().is_empty());
}

#[test]
fn disconnect_forgets_subscription() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    subscribe_key_input(&mut app, &mailbox, 7);
    gap(&mailbox, GapEvent::LinkTerminated { conn: 7 });
    mailbox.post_keys(keys::UP).unwrap();
    pump(&mut app, &mailbox);

    assert!(app.links().is_empty());
    assert!(notifications(&log).is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// UART commands
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn key_press_command_sends_press_and_release() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);
    subscribe_key_input(&mut app, &mailbox, 0);
    let key_in = value_handle(&app, uuid::REPORT, 0);

    uart_feed(&mut app, &mailbox, b"AT#HP30100\r");

    assert_eq!(
        notifications(&log),
        vec![
            (key_in, vec![0x04, 0x00, 100, 0, 0, 0, 0, 0]),
            (key_in, vec![0; 8]),
        ]
    );
    assert_eq!(uart_output(&log), b"AT#HP30100\r\n\r\nOK\r\n");
    // The last sent input report is what a read returns.
    assert_eq!(
        app.hid()
            .get_parameter(REPORT_ID_KEY_IN, ReportType::Input, uuid::REPORT)
            .as_slice(),
        &[0; 8]
    );
    assert_eq!(app.gatt().mirrored.len(), 2);
}

#[test]
fn malformed_key_press_answers_error() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);
    subscribe_key_input(&mut app, &mailbox, 0);

    uart_feed(&mut app, &mailbox, b"AT#HPZ00000\r");
    uart_feed(&mut app, &mailbox, b"AT#HP3\r");

    assert!(notifications(&log).is_empty());
    assert_eq!(uart_output(&log), b"\r\nER\r\n\r\nER\r\n");
}

#[test]
fn version_and_nop_commands() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    uart_feed(&mut app, &mailbox, b"AT#MZ\r");
    uart_feed(&mut app, &mailbox, b"hello\r");
    assert!(uart_output(&log).is_empty());

    // A line feed throws away the partial line before it.
    uart_feed(&mut app, &mailbox, b"AT#H\nAT#MY\r");
    assert_eq!(uart_output(&log), b"\r\n20191231\r\n");
}

#[test]
fn command_split_across_bursts() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    uart_feed(&mut app, &mailbox, b"AT#");
    assert!(uart_output(&log).is_empty());
    uart_feed(&mut app, &mailbox, b"MY\r");
    assert_eq!(uart_output(&log), b"\r\n20191231\r\n");
}

// ═══════════════════════════════════════════════════════════════════════════
// Buttons
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn arrow_buttons_send_in_fixed_order() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);
    subscribe_key_input(&mut app, &mailbox, 0);

    mailbox
        .post_keys(keys::RIGHT | keys::LEFT | keys::DOWN | keys::UP)
        .unwrap();
    pump(&mut app, &mailbox);

    let pressed: Vec<u8> = notifications(&log)
        .into_iter()
        .map(|(_, v)| v[2])
        .filter(|&k| k != 0)
        .collect();
    assert_eq!(pressed, vec![0x52, 0x51, 0x50, 0x4F]);
}

#[test]
fn select_clicks_boot_mouse_only_when_enabled_in_boot_mode() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);
    gap(&mailbox, GapEvent::LinkEstablished { conn: 0 });
    gap(&mailbox, GapEvent::LinkEncrypted { conn: 0 });
    pump(&mut app, &mailbox);

    mailbox.post_keys(keys::SELECT).unwrap();
    pump(&mut app, &mailbox);
    assert!(notifications(&log).is_empty());

    let mouse = value_handle(&app, uuid::BOOT_MOUSE_INPUT, 0);
    write(&mailbox, 0, mouse + 1, &[0x01, 0x00]);
    pump(&mut app, &mailbox);
    assert!(app.boot_mouse_enabled());

    // Enabled, but the boot mouse report does not exist in report mode.
    mailbox.post_keys(keys::SELECT).unwrap();
    pump(&mut app, &mailbox);
    assert!(notifications(&log).is_empty());

    let protocol_mode = value_handle(&app, uuid::PROTOCOL_MODE, 0);
    write(&mailbox, 0, protocol_mode, &[ProtocolMode::Boot as u8]);
    mailbox.post_keys(keys::SELECT).unwrap();
    pump(&mut app, &mailbox);

    assert_eq!(
        notifications(&log),
        vec![(mouse, vec![0x01, 0, 0, 0, 0]), (mouse, vec![0; 5])]
    );

    write(&mailbox, 0, mouse + 1, &[0x00, 0x00]);
    pump(&mut app, &mailbox);
    assert!(!app.boot_mouse_enabled());
}

// ═══════════════════════════════════════════════════════════════════════════
// Event loop
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn one_stack_message_per_wakeup_then_queue_then_uart() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);
    subscribe_key_input(&mut app, &mailbox, 0);
    log.borrow_mut().clear();

    let protocol_mode = value_handle(&app, uuid::PROTOCOL_MODE, 0);
    let read = || {
        StackMessage::Gatt(GattRequest::Read {
            conn: 0,
            handle: protocol_mode,
            offset: 0,
        })
    };
    mailbox.post_stack(read()).unwrap();
    mailbox.post_stack(read()).unwrap();
    mailbox.post_keys(keys::UP).unwrap();
    if mailbox.uart_received(b"AT#MY\r") {
        mailbox.uart_debounced();
    }

    let ready = mailbox.events.take(EventFlags::all());
    assert_eq!(ready, EventFlags::all());
    app.service(ready, &mailbox);

    let seen = log.borrow().clone();
    assert_eq!(seen.len(), 1 + 2 + 3);
    assert!(matches!(seen[0], Seen::Reply { .. }));
    assert!(matches!(seen[1], Seen::Notify { .. }));
    assert!(matches!(seen[2], Seen::Notify { .. }));
    assert!(matches!(seen[3], Seen::Uart(_)));

    // The second stack message is still queued and its flag re-posted.
    assert_eq!(mailbox.events.pending(), EventFlags::STACK);
    pump(&mut app, &mailbox);
    assert_eq!(replies(&log).len(), 2);
}

#[test]
fn unknown_stack_messages_are_dropped() {
    let pool = CccdPool::new();
    let log = Log::default();
    let queues = Queues::new();
    let mailbox = queues.mailbox();
    let mut app = app(&pool, &log);

    mailbox.post_stack(StackMessage::Unknown(0x42)).unwrap();
    mailbox.post_stack(StackMessage::HciEvent(0x3E)).unwrap();
    mailbox
        .post_stack(StackMessage::Gatt(GattRequest::Other(0x02)))
        .unwrap();
    pump(&mut app, &mailbox);

    assert!(log.borrow().is_empty());
}
