use blinky_bsp as bsp;
use bsp::gpio::PinState;
use stm32ral::{gpio, syst};

/// Time the LED spends in each state
pub const BLINK_HALF_PERIOD_MS: u32 = 250;

pub struct App<'a> {
    pins: &'a bsp::gpio::Pins<'a, gpio::Instance>,
    delay: &'a bsp::delay::Delay<syst::Instance>,
}

impl<'a> App<'a> {
    pub fn new(
        pins: &'a bsp::gpio::Pins<'a, gpio::Instance>,
        delay: &'a bsp::delay::Delay<syst::Instance>,
    ) -> Self {
        App { pins, delay }
    }

    /// One full blink period
    pub fn poll(&self) {
        self.pins.led.set_state(PinState::High);
        self.delay.delay_ms(BLINK_HALF_PERIOD_MS);
        self.pins.led.set_state(PinState::Low);
        self.delay.delay_ms(BLINK_HALF_PERIOD_MS);
    }
}
