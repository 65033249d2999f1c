//! Event group the application task blocks on.

use core::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

bitflags! {
    /// Event sources that wake the application task.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EventFlags: u32 {
        /// A BLE stack message is queued.
        const STACK = 0x8000_0000;
        /// The application queue is not empty.
        const QUEUE = 0x4000_0000;
        /// The UART debounce timer fired.
        const UART_RX = 0x0000_0001;
    }
}

/// Set of pending event bits plus a wakeup for the one waiting task.
pub struct EventGroup<M: RawMutex> {
    bits: AtomicU32,
    wake: Signal<M, ()>,
}

impl<M: RawMutex> Default for EventGroup<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> EventGroup<M> {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            wake: Signal::new(),
        }
    }

    /// Set `flags` and wake the waiting task. Callable from any context.
    pub fn post(&self, flags: EventFlags) {
        self.bits.fetch_or(flags.bits(), Ordering::AcqRel);
        self.wake.signal(());
    }

    /// Clear and return the posted bits in `mask` without waiting.
    pub fn take(&self, mask: EventFlags) -> EventFlags {
        let prev = self.bits.fetch_and(!mask.bits(), Ordering::AcqRel);
        EventFlags::from_bits_truncate(prev) & mask
    }

    /// Wait until any bit in `mask` is posted, then clear and return them.
    pub async fn pend(&self, mask: EventFlags) -> EventFlags {
        loop {
            let ready = self.take(mask);
            if !ready.is_empty() {
                return ready;
            }
            self.wake.wait().await;
        }
    }

    pub fn pending(&self) -> EventFlags {
        EventFlags::from_bits_truncate(self.bits.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn pend_returns_posted_bits_and_clears_them() {
        let events = EventGroup::<NoopRawMutex>::new();
        events.post(EventFlags::QUEUE | EventFlags::UART_RX);
        let ready = block_on(events.pend(EventFlags::all()));
        assert_eq!(ready, EventFlags::QUEUE | EventFlags::UART_RX);
        assert!(events.pending().is_empty());
    }

    #[test]
    fn bits_outside_mask_stay_pending() {
        let events = EventGroup::<NoopRawMutex>::new();
        events.post(EventFlags::STACK | EventFlags::UART_RX);
        assert_eq!(block_on(events.pend(EventFlags::STACK)), EventFlags::STACK);
        assert_eq!(events.pending(), EventFlags::UART_RX);
    }
}
