//! GPIO button input with async debouncing.
//!
//! Five buttons (active-low with internal pull-up):
//!   - UP / DOWN / LEFT / RIGHT - arrow key press and release
//!   - SELECT - boot mouse button 1 click, when the host enabled it
//!
//! Each button is handled by an async task that waits for a GPIO edge,
//! debounces it, and posts its key bit to the application task.

use defmt::{info, warn};
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::{Duration, Timer};

use hid_goc::config::BUTTON_DEBOUNCE_MS;

use crate::AppMailbox;

/// Run a single button polling loop.
///
/// Waits for the pin to go low (pressed), debounces, posts the key bit,
/// then waits for release before repeating.
#[embassy_executor::task(pool_size = 5)]
pub async fn button_task(pin: AnyPin, key: u8, mailbox: AppMailbox) -> ! {
    let mut btn = Input::new(pin, Pull::Up);

    loop {
        // Wait for falling edge (button press, active-low).
        btn.wait_for_falling_edge().await;

        // Debounce: wait and re-check.
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        if btn.is_low() {
            info!("Button: {=u8:#x}", key);
            if mailbox.post_keys(key).is_err() {
                warn!("app queue full, key {=u8:#x} dropped", key);
            }

            // Wait for release to avoid repeat triggers.
            btn.wait_for_rising_edge().await;
            Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        }
    }
}
