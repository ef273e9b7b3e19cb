//! Control loop
//!
//! Samples the address button every control period and acts on pushes:
//! - long push enters addressing mode
//! - short push requests an indicator test

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use k1_core::bus::AddressTable;
use k1_core::input::{mode, sample_active_low, ButtonError, Buttons, PushKind};
use k1_hal_stm32f1::gpio::ButtonPin;

use crate::config::{button_timing, CONTROL_PERIOD_MS, ITEMS};

/// Index of the address button
const ADDRESS_BUTTON: usize = 0;

#[embassy_executor::task]
pub async fn control_task(button: ButtonPin<'static>, addresses: AddressTable<ITEMS>) {
    info!("Control task started");

    let pins = [button];
    let mut buttons = Buttons::new([mode::SHORT_PUSH | mode::LONG_PUSH], button_timing());
    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_PERIOD_MS as u64));
    let mut last = Instant::now();

    loop {
        ticker.next().await;

        let now = Instant::now();
        let elapsed_ms = (now - last).as_millis() as u32;
        last = now;

        match buttons.update(elapsed_ms, sample_active_low(&pins)) {
            Ok(()) => {}
            Err(ButtonError::Stalled) => {
                warn!("Control loop stalled for {} ms, sample dropped", elapsed_ms);
                continue;
            }
        }

        for event in buttons.events() {
            if event.button != ADDRESS_BUTTON {
                continue;
            }
            match event.kind {
                PushKind::Long => {
                    info!("Entering addressing mode");
                    for item in 0..addresses.len() {
                        if addresses.is_assigned(item) {
                            info!("Item {} currently at address {}", item, addresses.get(item));
                        } else {
                            info!("Item {} unassigned", item);
                        }
                    }
                }
                PushKind::Short => info!("Indicator test requested"),
            }
        }
    }
}
