//! Application task: one event group, one stack queue, one app queue and
//! the UART receive handoff, serviced by a single owner of all HID state.
//!
//! Each wakeup is serviced in a fixed order:
//!
//! 1. one BLE stack message, if any (re-posted while more are queued),
//! 2. the whole application queue,
//! 3. the UART receive buffer, once.

pub mod events;
pub mod messages;

pub use events::{EventFlags, EventGroup};
pub use messages::{keys, AppEvent, AppMessage, GapEvent, GattRequest, StackMessage};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::config::{
    APP_QUEUE_DEPTH, FIRMWARE_DATE, MAX_CONNECTIONS, STACK_QUEUE_DEPTH, USE_LL_CONN_PARAM_UPDATE,
};
use crate::dispatch::HidNotice;
use crate::error::Error;
use crate::gatt::{AttResponse, GattServer, HidService, Link};
use crate::hid::keyboard::{led, KEY_DOWN_ARROW, KEY_LEFT_ARROW, KEY_RIGHT_ARROW, KEY_UP_ARROW};
use crate::hid::mouse::{BootMouseReport, MOUSE_BUTTON_1};
use crate::hid::personality::KeyEvent;
use crate::hid::report::{ReportType, REPORT_ID_KEY_IN, REPORT_ID_MOUSE_IN};
use crate::uart::{Command, CommandParser, RxHandoff, UartTx, CRLF, HELLO, REPLY_ERROR, REPLY_OK};
use messages::{HCI_LE_READ_LOCAL_SUPPORTED_FEATURES, LL_FEATURE_CONN_PARAMS_REQ};

/// Link layer controller commands the application issues.
pub trait HciController {
    /// Request the LE local supported features. The answer arrives later
    /// as a [`StackMessage::HciCommandComplete`].
    fn read_local_supported_features(&mut self);

    fn set_local_supported_features(&mut self, features: &[u8; 8]);
}

pub type StackQueue<M> = Channel<M, StackMessage, STACK_QUEUE_DEPTH>;
pub type AppQueue<M> = Channel<M, AppMessage, APP_QUEUE_DEPTH>;

/// Everything producers use to reach the application task.
pub struct Mailbox<'a, M: RawMutex> {
    pub events: &'a EventGroup<M>,
    pub stack: &'a StackQueue<M>,
    pub queue: &'a AppQueue<M>,
    pub uart_rx: &'a RxHandoff<M>,
}

impl<M: RawMutex> Clone for Mailbox<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex> Copy for Mailbox<'_, M> {}

impl<M: RawMutex> Mailbox<'_, M> {
    /// Queue a stack message. Dropped with [`Error::QueueFull`] when the
    /// queue is full.
    pub fn post_stack(&self, msg: StackMessage) -> Result<(), Error> {
        self.stack.try_send(msg).map_err(|_| Error::QueueFull)?;
        self.events.post(EventFlags::STACK);
        Ok(())
    }

    /// Queue a stack message, waiting for room. Used for link lifecycle
    /// events, which must not be lost.
    pub async fn send_stack(&self, msg: StackMessage) {
        self.stack.send(msg).await;
        self.events.post(EventFlags::STACK);
    }

    /// Queue a button state change.
    pub fn post_keys(&self, keys: u8) -> Result<(), Error> {
        self.queue
            .try_send(AppMessage::key_change(keys))
            .map_err(|_| Error::QueueFull)?;
        self.events.post(EventFlags::QUEUE);
        Ok(())
    }

    /// UART driver receive callback. Returns `true` when the debounce
    /// timer must be started.
    pub fn uart_received(&self, data: &[u8]) -> bool {
        self.uart_rx.on_receive(data)
    }

    /// Debounce timer expiry.
    pub fn uart_debounced(&self) {
        self.events.post(EventFlags::UART_RX);
    }
}

/// The application: HID service plus the collaborators it drives.
pub struct App<'p, G, H, U> {
    hid: HidService<'p>,
    gatt: G,
    hci: H,
    uart: U,
    parser: CommandParser,
    links: Vec<Link, MAX_CONNECTIONS>,
    boot_mouse_enabled: bool,
}

impl<'p, G, H, U> App<'p, G, H, U>
where
    G: GattServer,
    H: HciController,
    U: UartTx,
{
    pub fn new(hid: HidService<'p>, gatt: G, hci: H, uart: U) -> Self {
        Self {
            hid,
            gatt,
            hci,
            uart,
            parser: CommandParser::new(),
            links: Vec::new(),
            boot_mouse_enabled: false,
        }
    }

    /// One-time startup after the service is registered.
    pub fn start(&mut self) {
        if !USE_LL_CONN_PARAM_UPDATE {
            self.hci.read_local_supported_features();
        }
        self.uart.write(HELLO);
        info!("app started, {} personality", self.hid.personality());
    }

    /// Task body. Never returns.
    pub async fn run<M: RawMutex>(&mut self, mailbox: Mailbox<'_, M>) -> ! {
        loop {
            let ready = mailbox.events.pend(EventFlags::all()).await;
            self.service(ready, &mailbox);
        }
    }

    /// Service the sources in `ready`, in order.
    pub fn service<M: RawMutex>(&mut self, ready: EventFlags, mailbox: &Mailbox<'_, M>) {
        if ready.contains(EventFlags::STACK) {
            if let Ok(msg) = mailbox.stack.try_receive() {
                self.handle_stack(msg);
            }
            if !mailbox.stack.is_empty() {
                mailbox.events.post(EventFlags::STACK);
            }
        }

        if ready.contains(EventFlags::QUEUE) {
            while let Ok(msg) = mailbox.queue.try_receive() {
                self.handle_app(msg);
            }
        }

        if ready.contains(EventFlags::UART_RX) {
            let data = mailbox.uart_rx.take();
            self.handle_uart(&data);
        }
    }

    fn link(&self, conn: u16) -> Link {
        self.links
            .iter()
            .copied()
            .find(|l| l.conn == conn)
            .unwrap_or(Link {
                conn,
                encrypted: false,
            })
    }

    fn handle_stack(&mut self, msg: StackMessage) {
        match msg {
            StackMessage::Gatt(GattRequest::Read {
                conn,
                handle,
                offset,
            }) => match self.hid.read_attr(self.link(conn), handle, usize::from(offset)) {
                Ok(value) => self.gatt.respond(conn, AttResponse::Read(&value)),
                Err(e) => self.respond_error(conn, handle, e),
            },
            StackMessage::Gatt(GattRequest::Write {
                conn,
                handle,
                offset,
                value,
            }) => {
                let link = self.link(conn);
                match self.hid.write_attr(link, handle, usize::from(offset), &value) {
                    Ok(notice) => {
                        self.gatt.respond(conn, AttResponse::Write);
                        if let Some(notice) = notice {
                            self.apply_notice(notice);
                        }
                    }
                    Err(e) => {
                        self.respond_error(conn, handle, e);
                        // The stack may already hold the rejected bytes.
                        if let Some(value) = self.hid.report_value(handle) {
                            self.gatt.value_changed(handle, &value);
                        }
                    }
                }
            }
            StackMessage::HciCommandComplete { opcode, params } => {
                self.handle_command_complete(opcode, &params);
            }
            StackMessage::Gap(event) => self.handle_gap(event),
            other => warn!("dropped stack message {:?}", other),
        }
    }

    fn respond_error(&mut self, conn: u16, handle: u16, e: Error) {
        debug!("att error on {=u16:#x}: {:?}", handle, e);
        self.gatt.respond(
            conn,
            AttResponse::Error {
                handle,
                code: e.att_code(),
            },
        );
    }

    fn handle_command_complete(&mut self, opcode: u16, params: &[u8]) {
        if USE_LL_CONN_PARAM_UPDATE || opcode != HCI_LE_READ_LOCAL_SUPPORTED_FEATURES {
            return;
        }
        match params {
            [0, features @ ..] if features.len() >= 8 => {
                let mut set = [0u8; 8];
                set.copy_from_slice(&features[..8]);
                set[0] &= !LL_FEATURE_CONN_PARAMS_REQ;
                self.hci.set_local_supported_features(&set);
                info!("LL connection parameter request disabled");
            }
            _ => warn!("read local supported features failed"),
        }
    }

    fn handle_gap(&mut self, event: GapEvent) {
        match event {
            GapEvent::LinkEstablished { conn } => {
                // A handle reused after a lost disconnect starts from scratch.
                if self.links.iter().any(|l| l.conn == conn) {
                    warn!("conn {=u16} reused, dropping stale link state", conn);
                    self.links.retain(|l| l.conn != conn);
                    self.hid.release_connection(conn);
                }
                if self
                    .links
                    .push(Link {
                        conn,
                        encrypted: false,
                    })
                    .is_err()
                {
                    warn!("link table full, conn {=u16} untracked", conn);
                }
                info!("connected: {=u16}", conn);
            }
            GapEvent::LinkEncrypted { conn } => {
                if let Some(link) = self.links.iter_mut().find(|l| l.conn == conn) {
                    link.encrypted = true;
                }
                info!("encrypted: {=u16}", conn);
            }
            GapEvent::LinkTerminated { conn } => {
                self.links.retain(|l| l.conn != conn);
                self.hid.release_connection(conn);
                info!("disconnected: {=u16}", conn);
            }
        }
    }

    fn apply_notice(&mut self, notice: HidNotice) {
        match notice {
            HidNotice::NotificationsEnabled {
                id: REPORT_ID_MOUSE_IN,
                report_type: ReportType::Input,
            } => self.boot_mouse_enabled = true,
            HidNotice::NotificationsDisabled {
                id: REPORT_ID_MOUSE_IN,
                report_type: ReportType::Input,
            } => self.boot_mouse_enabled = false,
            HidNotice::Led(bits) => info!(
                "LEDs: num {} caps {} scroll {}",
                bits & led::NUM_LOCK != 0,
                bits & led::CAPS_LOCK != 0,
                bits & led::SCROLL_LOCK != 0
            ),
            other => debug!("{:?}", other),
        }
    }

    fn handle_app(&mut self, msg: AppMessage) {
        match msg.event {
            AppEvent::KeyChange => self.handle_keys(msg.state),
        }
    }

    fn handle_keys(&mut self, state: u8) {
        if state & keys::UP != 0 {
            self.send_key(KeyEvent::new(0, 0, KEY_UP_ARROW));
        }
        if state & keys::DOWN != 0 {
            self.send_key(KeyEvent::new(0, 0, KEY_DOWN_ARROW));
        }
        if state & keys::SELECT != 0 && self.boot_mouse_enabled {
            self.send_mouse(MOUSE_BUTTON_1);
            self.send_mouse(0);
        }
        if state & keys::LEFT != 0 {
            self.send_key(KeyEvent::new(0, 0, KEY_LEFT_ARROW));
        }
        if state & keys::RIGHT != 0 {
            self.send_key(KeyEvent::new(0, 0, KEY_RIGHT_ARROW));
        }
    }

    /// Key down immediately followed by key up.
    pub fn send_key(&mut self, event: KeyEvent) {
        let personality = self.hid.personality();
        for report in [personality.key_report(event), personality.release_report()] {
            if let Err(e) = self
                .hid
                .report(REPORT_ID_KEY_IN, ReportType::Input, &report, &mut self.gatt)
            {
                warn!("key report not sent: {:?}", e);
            }
        }
    }

    fn send_mouse(&mut self, buttons: u8) {
        let report = BootMouseReport::buttons(buttons).to_bytes();
        if let Err(e) = self
            .hid
            .report(REPORT_ID_MOUSE_IN, ReportType::Input, &report, &mut self.gatt)
        {
            warn!("mouse report not sent: {:?}", e);
        }
    }

    fn handle_uart(&mut self, data: &[u8]) {
        for &byte in data {
            if let Some(line) = self.parser.push(byte) {
                self.handle_line(&line);
            }
        }
    }

    fn handle_line(&mut self, line: &[u8]) {
        match Command::parse(line) {
            Ok(Some(Command::Nop)) => {}
            Ok(Some(Command::Version)) => {
                self.uart.write(CRLF);
                self.uart.write(FIRMWARE_DATE.as_bytes());
                self.uart.write(CRLF);
            }
            Ok(Some(cmd)) => {
                self.uart.write(line);
                self.uart.write(CRLF);
                if let Some(event) = cmd.key_event() {
                    self.send_key(event);
                }
                self.uart.write(REPLY_OK);
            }
            Ok(None) => debug!("ignored line of {} bytes", line.len()),
            Err(e) => {
                debug!("bad command: {:?}", e);
                self.uart.write(REPLY_ERROR);
            }
        }
    }

    pub fn hid(&self) -> &HidService<'p> {
        &self.hid
    }

    pub fn gatt(&self) -> &G {
        &self.gatt
    }

    pub fn hci(&self) -> &H {
        &self.hci
    }

    pub fn uart(&self) -> &U {
        &self.uart
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn boot_mouse_enabled(&self) -> bool {
        self.boot_mouse_enabled
    }
}
