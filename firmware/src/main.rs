#![no_std]
#![no_main]

mod app;

use blinky_bsp as bsp;
use bsp::delay::Delay;
use bsp::gpio::{init_all_banks, Bank, Pins, GPIO};
use bsp::rcc::{ClockSource, CoreFrequency, RCC};
use cortex_m_rt::entry;
use panic_rtt_target as _;
use rtt_target::{rprintln, rtt_init_print};

#[cfg(feature = "turbo")]
const FREQUENCY: CoreFrequency = CoreFrequency::F216MHz;
#[cfg(not(feature = "turbo"))]
const FREQUENCY: CoreFrequency = CoreFrequency::F72MHz;

#[entry]
fn main() -> ! {
    rtt_init_print!();

    rprintln!("Starting blinky...");

    let rcc = RCC::new(stm32ral::rcc::RCC::take().unwrap());
    let clocks = rcc.setup(FREQUENCY);
    match clocks.source() {
        ClockSource::Pll => rprintln!("Core clock {} Hz from PLL", clocks.sysclk()),
        ClockSource::Hsi => rprintln!(
            "HSE or PLL did not start, running from HSI at {} Hz",
            clocks.sysclk()
        ),
    }

    init_all_banks(&rcc);

    let gpiod = GPIO::new(Bank::D, stm32ral::gpio::GPIOD::take().unwrap());
    let pins = Pins { led: gpiod.pin(6) };
    pins.setup();

    let delay = Delay::new(stm32ral::syst::SYST::take().unwrap(), &clocks);

    let app = app::App::new(&pins, &delay);
    loop {
        app.poll();
    }
}
