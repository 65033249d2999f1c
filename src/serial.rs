//! UARTE transport for the AT command channel.
//!
//! Receive DMAs into a buffer until the line goes idle, then hands the
//! chunk to the shared handoff buffer; the first chunk of a burst arms a
//! one-shot debounce, after which the application task parses everything
//! that arrived. Transmit goes through a pipe so
//! the application can write without awaiting.

use defmt::warn;
use embassy_nrf::peripherals::{TIMER1, UARTE0};
use embassy_nrf::uarte::{UarteRxWithIdle, UarteTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use hid_goc::config::{UART_RX_BUF_SIZE, UART_RX_DEBOUNCE_MS, UART_TX_BUF_SIZE};
use hid_goc::uart::UartTx;

use crate::AppMailbox;

static TX_PIPE: Pipe<CriticalSectionRawMutex, UART_TX_BUF_SIZE> = Pipe::new();
static RX_ARMED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Non-blocking writer handed to the application. Bytes that do not fit
/// in the pipe are dropped.
pub struct UartWriter;

impl UartTx for UartWriter {
    fn write(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            match TX_PIPE.try_write(bytes) {
                Ok(n) => bytes = &bytes[n..],
                Err(_) => {
                    warn!("uart tx full, {} bytes dropped", bytes.len());
                    return;
                }
            }
        }
    }
}

#[embassy_executor::task]
pub async fn uart_tx_task(mut tx: UarteTx<'static, UARTE0>) -> ! {
    let mut buf = [0u8; UART_TX_BUF_SIZE];
    loop {
        let n = TX_PIPE.read(&mut buf).await;
        if let Err(e) = tx.write(&buf[..n]).await {
            warn!("uart tx error: {:?}", e);
        }
    }
}

#[embassy_executor::task]
pub async fn uart_rx_task(
    mut rx: UarteRxWithIdle<'static, UARTE0, TIMER1>,
    mailbox: AppMailbox,
) -> ! {
    let mut buf = [0u8; UART_RX_BUF_SIZE];
    loop {
        match rx.read_until_idle(&mut buf).await {
            Ok(0) => {}
            Ok(n) => {
                if mailbox.uart_received(&buf[..n]) {
                    RX_ARMED.signal(());
                }
            }
            Err(e) => warn!("uart rx error: {:?}", e),
        }
    }
}

/// One-shot timer between the first byte of a burst and parsing.
#[embassy_executor::task]
pub async fn uart_debounce_task(mailbox: AppMailbox) -> ! {
    loop {
        RX_ARMED.wait().await;
        Timer::after(Duration::from_millis(UART_RX_DEBOUNCE_MS)).await;
        mailbox.uart_debounced();
    }
}
