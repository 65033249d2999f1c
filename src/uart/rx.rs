//! Receive handoff between the UART driver context and the app task.
//!
//! The driver appends each received chunk and starts the debounce timer
//! only when it is not already armed. When the timer fires the task takes
//! the whole buffer, which disarms it for the next chunk.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

use crate::config::UART_RX_BUF_SIZE;

pub type RxBuffer = Vec<u8, UART_RX_BUF_SIZE>;

pub struct RxHandoff<M: RawMutex> {
    buf: Mutex<M, RefCell<RxBuffer>>,
    armed: AtomicBool,
}

impl<M: RawMutex> Default for RxHandoff<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> RxHandoff<M> {
    pub const fn new() -> Self {
        Self {
            buf: Mutex::new(RefCell::new(Vec::new())),
            armed: AtomicBool::new(false),
        }
    }

    /// Append a received chunk. Returns `true` when the caller must start
    /// the one-shot debounce timer.
    pub fn on_receive(&self, data: &[u8]) -> bool {
        self.buf.lock(|buf| {
            let mut buf = buf.borrow_mut();
            let room = buf.capacity() - buf.len();
            if data.len() > room {
                debug!("uart rx overflow, {} bytes dropped", data.len() - room);
            }
            let _ = buf.extend_from_slice(&data[..data.len().min(room)]);
        });
        !self.armed.swap(true, Ordering::AcqRel)
    }

    /// Drain everything received since the last call.
    pub fn take(&self) -> RxBuffer {
        self.armed.store(false, Ordering::Release);
        self.buf.lock(|buf| core::mem::take(&mut *buf.borrow_mut()))
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn first_chunk_arms_timer() {
        let rx = RxHandoff::<NoopRawMutex>::new();
        assert!(rx.on_receive(b"AT#"));
        assert!(!rx.on_receive(b"MY\r"));
        assert!(rx.is_armed());
        assert_eq!(rx.take().as_slice(), b"AT#MY\r");
        assert!(!rx.is_armed());
        assert!(rx.on_receive(b"x"));
    }

    #[test]
    fn overflow_truncates() {
        let rx = RxHandoff::<NoopRawMutex>::new();
        rx.on_receive(&[b'a'; UART_RX_BUF_SIZE]);
        rx.on_receive(b"bc");
        let taken = rx.take();
        assert_eq!(taken.len(), UART_RX_BUF_SIZE);
        assert!(taken.iter().all(|&b| b == b'a'));
        assert!(rx.take().is_empty());
    }
}
