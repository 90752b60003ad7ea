use crate::rcc::Clocks;
use core::sync::atomic::{AtomicU32, Ordering};
use embedded_hal::blocking::delay::{DelayMs, DelayUs};

/// SysTick counts down through 24 bits and wraps
const SYST_COUNTER_MASK: u32 = 0x00ff_ffff;

/// Free-running core-clock counter used for busy waiting
pub trait SysTick {
    /// Clock from the processor clock, reload 0xFFFFFF, enable
    fn start(&self);
    /// Current counter value, counting down
    fn current(&self) -> u32;
}

impl<'t, T: SysTick> SysTick for &'t T {
    fn start(&self) {
        (**self).start()
    }

    fn current(&self) -> u32 {
        (**self).current()
    }
}

pub struct Delay<T> {
    systick: T,
    base_clock: AtomicU32,
}

impl<T: SysTick> Delay<T> {
    /// Start the counter and calibrate against the clocks actually in effect
    pub fn new(systick: T, clocks: &Clocks) -> Self {
        systick.start();

        let delay = Delay {
            systick,
            base_clock: AtomicU32::new(0),
        };
        delay.set_sysclk(clocks);
        delay
    }

    pub fn set_sysclk(&self, clocks: &Clocks) {
        self.base_clock.store(clocks.hclk(), Ordering::SeqCst);
    }

    /// Busy-wait for at least `ms` milliseconds
    pub fn delay_ms(&self, ms: u32) {
        if ms == 0 {
            return;
        }

        let base_clock = self.base_clock.load(Ordering::SeqCst);
        assert!(base_clock > 0);

        // The counter wraps several times per second at full speed, so the
        // remaining count lives in 64 bits and is drained by wrapped deltas.
        let mut ticks = u64::from(ms) * u64::from(base_clock) / 1_000;
        let mut last = self.get_current();
        while ticks > 0 {
            let now = self.get_current();
            let delta = last.wrapping_sub(now) & SYST_COUNTER_MASK;
            ticks = ticks.saturating_sub(u64::from(delta));
            last = now;
        }
    }

    pub fn delay_us(&self, us: u32) {
        assert!(us < 10_000);

        let base_clock = self.base_clock.load(Ordering::SeqCst);
        assert!(base_clock > 0);

        let ticks = (us as u64) * (base_clock as u64) / 1_000_000;
        self.delay_ticks(ticks as u32);
    }

    pub fn delay_ticks(&self, mut ticks: u32) {
        let mut last = self.get_current();
        loop {
            let now = self.get_current();
            let delta = last.wrapping_sub(now) & SYST_COUNTER_MASK;

            if delta >= ticks {
                break;
            } else {
                ticks -= delta;
                last = now;
            }
        }
    }

    #[inline(always)]
    pub fn get_current(&self) -> u32 {
        self.systick.current()
    }
}

impl<T: SysTick> DelayMs<u32> for Delay<T> {
    fn delay_ms(&mut self, ms: u32) {
        Delay::delay_ms(self, ms)
    }
}

impl<T: SysTick> DelayUs<u32> for Delay<T> {
    fn delay_us(&mut self, us: u32) {
        Delay::delay_us(self, us)
    }
}
