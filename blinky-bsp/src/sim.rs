//! Host-side models of the RCC, GPIO and SysTick register files.

use crate::delay::SysTick;
use crate::gpio::{Bank, PortReg, PortRegisters};
use crate::rcc::{PllConfig, PllSource, RccRegisters, SysClk};
use core::cell::{Cell, RefCell};
use stm32ral::gpio::{MODER::MODER0::RW as moder, PUPDR::PUPDR0::RW as pupdr};

/// Core clock ticks elapsed since reset, shared by every model
pub struct Timeline {
    ticks: Cell<u64>,
}

impl Timeline {
    pub fn new() -> Self {
        Timeline { ticks: Cell::new(0) }
    }

    pub fn now(&self) -> u64 {
        self.ticks.get()
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.set(self.ticks.get() + ticks);
    }
}

/// SysTick running from the core clock with reload 0xFFFFFF.
///
/// Each read of the current value costs `step` ticks, which stands in for one
/// pass through the busy-wait loop.
pub struct SimSysTick<'t> {
    timeline: &'t Timeline,
    step: u32,
    enabled: Cell<bool>,
    reads: Cell<u64>,
}

impl<'t> SimSysTick<'t> {
    pub fn new(timeline: &'t Timeline, step: u32) -> Self {
        assert!(step > 0 && step < 0x0100_0000);
        SimSysTick {
            timeline,
            step,
            enabled: Cell::new(false),
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads.get()
    }

    pub fn step(&self) -> u64 {
        u64::from(self.step)
    }
}

impl<'t> SysTick for SimSysTick<'t> {
    fn start(&self) {
        self.enabled.set(true);
    }

    fn current(&self) -> u32 {
        if self.enabled.get() {
            self.timeline.advance(u64::from(self.step));
        }
        self.reads.set(self.reads.get() + 1);
        0x00ff_ffff - (self.timeline.now() & 0x00ff_ffff) as u32
    }
}

/// One GPIO port with an external observer on every line.
pub struct SimPort<'t> {
    timeline: &'t Timeline,
    clock: Option<(&'t SimRcc, Bank)>,
    moder: Cell<u32>,
    otyper: Cell<u32>,
    ospeedr: Cell<u32>,
    pupdr: Cell<u32>,
    odr: Cell<u32>,
    driven: Cell<u32>,
    external: Cell<u32>,
    odr_log: RefCell<Vec<(u64, u32)>>,
}

impl<'t> SimPort<'t> {
    pub fn new(timeline: &'t Timeline) -> Self {
        SimPort {
            timeline,
            clock: None,
            moder: Cell::new(0),
            otyper: Cell::new(0),
            ospeedr: Cell::new(0),
            pupdr: Cell::new(0),
            odr: Cell::new(0),
            driven: Cell::new(0),
            external: Cell::new(0),
            odr_log: RefCell::new(Vec::new()),
        }
    }

    /// Gate the port on its AHB1ENR bit: while the bank is unclocked, writes
    /// are dropped and reads return 0
    pub fn clocked_by(mut self, rcc: &'t SimRcc, bank: Bank) -> Self {
        self.clock = Some((rcc, bank));
        self
    }

    fn clocked(&self) -> bool {
        match self.clock {
            Some((rcc, bank)) => (rcc.gpio_enabled() >> bank as u32) & 1 == 1,
            None => true,
        }
    }

    /// Drive line `n` from outside the chip
    pub fn drive(&self, n: u8, high: bool) {
        self.driven.set(self.driven.get() | 1 << n);
        if high {
            self.external.set(self.external.get() | 1 << n);
        } else {
            self.external.set(self.external.get() & !(1 << n));
        }
    }

    /// Timestamps and new levels of every change of output latch bit `n`
    pub fn edges(&self, n: u8) -> Vec<(u64, bool)> {
        let mut edges = Vec::new();
        let mut level = false;
        for &(at, odr) in self.odr_log.borrow().iter() {
            let bit = (odr >> n) & 1 == 1;
            if bit != level {
                edges.push((at, bit));
                level = bit;
            }
        }
        edges
    }

    fn set_odr(&self, value: u32) {
        let value = value & 0xffff;
        if value != self.odr.get() {
            self.odr_log.borrow_mut().push((self.timeline.now(), value));
        }
        self.odr.set(value);
    }

    fn idr(&self) -> u32 {
        let mut idr = 0;
        for n in 0..16 {
            let mode = (self.moder.get() >> (n * 2)) & 0b11;
            let pull = (self.pupdr.get() >> (n * 2)) & 0b11;
            let latch = (self.odr.get() >> n) & 1 == 1;
            let open_drain = (self.otyper.get() >> n) & 1 == 1;
            let outside = if (self.driven.get() >> n) & 1 == 1 {
                Some((self.external.get() >> n) & 1 == 1)
            } else {
                None
            };

            let level = match mode {
                moder::Output if !open_drain => latch,
                moder::Output if !latch => false,
                moder::Input | moder::Output => outside.unwrap_or(pull == pupdr::PullUp),
                _ => false,
            };
            if level {
                idr |= 1 << n;
            }
        }
        idr
    }
}

impl<'t> PortRegisters for SimPort<'t> {
    fn read(&self, reg: PortReg) -> u32 {
        if !self.clocked() {
            return 0;
        }
        match reg {
            PortReg::Moder => self.moder.get(),
            PortReg::Otyper => self.otyper.get(),
            PortReg::Ospeedr => self.ospeedr.get(),
            PortReg::Pupdr => self.pupdr.get(),
            PortReg::Idr => self.idr(),
            PortReg::Odr => self.odr.get(),
            PortReg::Bsrr => 0,
        }
    }

    fn write(&self, reg: PortReg, value: u32) {
        if !self.clocked() {
            return;
        }
        match reg {
            PortReg::Moder => self.moder.set(value),
            PortReg::Otyper => self.otyper.set(value & 0xffff),
            PortReg::Ospeedr => self.ospeedr.set(value),
            PortReg::Pupdr => self.pupdr.set(value),
            PortReg::Idr => {}
            PortReg::Odr => self.set_odr(value),
            PortReg::Bsrr => {
                // Set wins over reset
                let set = value & 0xffff;
                let reset = value >> 16;
                self.set_odr((self.odr.get() & !reset) | set);
            }
        }
    }
}

/// RCC and FLASH model. Ready flags follow their enable bits unless the
/// oscillator is marked absent.
pub struct SimRcc {
    hse_present: bool,
    pll_locks: bool,
    hsi_on: Cell<bool>,
    hse_on: Cell<bool>,
    hse_bypass: Cell<bool>,
    hse_polls: Cell<u32>,
    pll_on: Cell<bool>,
    pll: Cell<Option<PllConfig>>,
    sw: Cell<SysClk>,
    latency: Cell<u32>,
    hpre: Cell<u32>,
    gpio: Cell<u32>,
}

impl SimRcc {
    pub fn new() -> Self {
        SimRcc {
            hse_present: true,
            pll_locks: true,
            hsi_on: Cell::new(true),
            hse_on: Cell::new(false),
            hse_bypass: Cell::new(false),
            hse_polls: Cell::new(0),
            pll_on: Cell::new(false),
            pll: Cell::new(None),
            sw: Cell::new(SysClk::Hsi),
            latency: Cell::new(0),
            hpre: Cell::new(0),
            gpio: Cell::new(0),
        }
    }

    pub fn without_hse(mut self) -> Self {
        self.hse_present = false;
        self
    }

    pub fn without_pll_lock(mut self) -> Self {
        self.pll_locks = false;
        self
    }

    pub fn pll_config(&self) -> Option<PllConfig> {
        self.pll.get()
    }

    pub fn flash_latency(&self) -> u32 {
        self.latency.get()
    }

    pub fn hse_bypassed(&self) -> bool {
        self.hse_bypass.get()
    }

    pub fn hse_ready_polls(&self) -> u32 {
        self.hse_polls.get()
    }

    /// AHB1ENR GPIOxEN bits, bank A in bit 0
    pub fn gpio_enabled(&self) -> u32 {
        self.gpio.get()
    }

    pub fn force_ahb_prescaler(&self, hpre: u32) {
        self.hpre.set(hpre);
    }

    fn hse_running(&self) -> bool {
        self.hse_on.get() && self.hse_present
    }

    fn pll_running(&self) -> bool {
        let source_ready = match self.pll.get() {
            Some(PllConfig { source: PllSource::Hse, .. }) => self.hse_running(),
            Some(PllConfig { source: PllSource::Hsi, .. }) => self.hsi_on.get(),
            None => false,
        };
        self.pll_on.get() && self.pll_locks && source_ready
    }
}

impl RccRegisters for SimRcc {
    fn enable_hsi(&self) {
        self.hsi_on.set(true);
    }

    fn hsi_ready(&self) -> bool {
        self.hsi_on.get()
    }

    fn select_sysclk(&self, source: SysClk) {
        // The switch only happens once the new source is stable
        let ready = match source {
            SysClk::Hsi => self.hsi_on.get(),
            SysClk::Hse => self.hse_running(),
            SysClk::Pll => self.pll_running(),
        };
        if ready {
            self.sw.set(source);
        }
    }

    fn sysclk_status(&self) -> SysClk {
        self.sw.get()
    }

    fn disable_oscillators(&self) {
        self.hse_on.set(false);
        self.pll_on.set(false);
    }

    fn reset_peripheral_clocks(&self) {
        self.gpio.set(0);
    }

    fn enable_hse(&self) {
        self.hse_bypass.set(true);
        self.hse_on.set(true);
    }

    fn hse_ready(&self) -> bool {
        self.hse_polls.set(self.hse_polls.get() + 1);
        self.hse_running()
    }

    fn configure_pll(&self, config: &PllConfig) {
        self.pll.set(Some(*config));
    }

    fn enable_pll(&self) {
        self.pll_on.set(true);
    }

    fn pll_ready(&self) -> bool {
        self.pll_running()
    }

    fn set_flash_latency(&self, latency: u32) {
        self.latency.set(latency);
    }

    fn set_bus_prescalers_div1(&self) {
        self.hpre.set(0);
    }

    fn ahb_prescaler(&self) -> u32 {
        self.hpre.get()
    }

    fn enable_gpio(&self, bank: Bank) {
        self.gpio.set(self.gpio.get() | 1 << bank as u32);
    }
}
