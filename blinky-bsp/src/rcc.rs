use crate::gpio::Bank;

/// Frequency of the external clock fed to OSC_IN in bypass mode
pub const HSE_FREQUENCY: u32 = 12_000_000;

/// Frequency of the internal RC oscillator, used when HSE or the PLL fail
pub const HSI_FREQUENCY: u32 = 16_000_000;

/// Number of ready-flag polls before an oscillator is considered absent
pub const OSC_STARTUP_POLLS: u32 = 50_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SysClk {
    Hsi,
    Hse,
    Pll,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PllSource {
    Hsi,
    Hse,
}

/// PLLCFGR contents. `p` is the raw PLLP field (0b00 = /2, 0b01 = /4, ...).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PllConfig {
    pub source: PllSource,
    pub m: u32,
    pub n: u32,
    pub p: u32,
    pub q: u32,
}

/// Register operations the clock setup sequence needs from the RCC and FLASH
/// peripherals.
pub trait RccRegisters {
    fn enable_hsi(&self);
    fn hsi_ready(&self) -> bool;

    fn select_sysclk(&self, source: SysClk);
    fn sysclk_status(&self) -> SysClk;

    /// Turn off HSE, CSS, PLL, PLLI2S and PLLSAI
    fn disable_oscillators(&self);
    /// Return every peripheral clock-enable register to its reset value
    fn reset_peripheral_clocks(&self);

    /// Start HSE in bypass mode
    fn enable_hse(&self);
    fn hse_ready(&self) -> bool;

    fn configure_pll(&self, config: &PllConfig);
    fn enable_pll(&self);
    fn pll_ready(&self) -> bool;

    fn set_flash_latency(&self, latency: u32);
    /// Run HCLK, PCLK1 and PCLK2 undivided
    fn set_bus_prescalers_div1(&self);
    /// Raw HPRE field of CFGR
    fn ahb_prescaler(&self) -> u32;

    fn enable_gpio(&self, bank: Bank);
}

pub struct RCC<R> {
    rcc: R,
}

impl<R: RccRegisters> RCC<R> {
    pub fn new(rcc: R) -> Self {
        RCC { rcc }
    }

    /// Set up the device clock tree.
    ///
    /// If HSE or the PLL never report ready, the core is left running from
    /// HSI and the returned `Clocks` say so. This function never hangs on a
    /// missing external clock.
    pub fn setup(&self, frequency: CoreFrequency) -> Clocks {
        // Turn on HSI
        self.rcc.enable_hsi();
        // Wait for HSI to be ready
        while !self.rcc.hsi_ready() {}
        // Swap system clock to HSI
        self.rcc.select_sysclk(SysClk::Hsi);
        // Wait for system clock to be HSI
        while self.rcc.sysclk_status() != SysClk::Hsi {}

        // Disable everything
        self.rcc.disable_oscillators();
        self.rcc.reset_peripheral_clocks();

        // Configure HSE in bypass mode and start it
        self.rcc.enable_hse();
        if !self.wait_ready(R::hse_ready) {
            return self.fall_back_to_hsi();
        }

        // Configure PLL from HSE
        let pll = frequency.pll_config();
        self.rcc.configure_pll(&pll);

        // Turn on PLL
        self.rcc.enable_pll();
        if !self.wait_ready(R::pll_ready) {
            return self.fall_back_to_hsi();
        }

        // Adjust flash wait states
        self.rcc.set_flash_latency(frequency.flash_latency());

        // Swap system clock to PLL
        self.rcc.select_sysclk(SysClk::Pll);
        // Wait for system clock to be PLL
        while self.rcc.sysclk_status() != SysClk::Pll {}

        // Configure HCLK, PCLK1, PCLK2
        self.rcc.set_bus_prescalers_div1();

        self.clocks(frequency.sysclk(), ClockSource::Pll)
    }

    /// Enable the clock to one GPIO bank. Setting an already set enable bit
    /// has no effect.
    pub fn enable_gpio(&self, bank: Bank) {
        self.rcc.enable_gpio(bank);
    }

    #[cfg(test)]
    pub(crate) fn registers(&self) -> &R {
        &self.rcc
    }

    fn wait_ready(&self, ready: impl Fn(&R) -> bool) -> bool {
        (0..OSC_STARTUP_POLLS).any(|_| ready(&self.rcc))
    }

    fn fall_back_to_hsi(&self) -> Clocks {
        // SYSCLK is still on HSI here, so stopping HSE and the PLL is safe
        self.rcc.disable_oscillators();
        self.rcc.set_flash_latency(0);
        self.rcc.set_bus_prescalers_div1();
        self.clocks(HSI_FREQUENCY, ClockSource::Hsi)
    }

    fn clocks(&self, sysclk: u32, source: ClockSource) -> Clocks {
        let hclk = match self.rcc.ahb_prescaler() {
            0b1000 => sysclk / 2,
            0b1001 => sysclk / 4,
            0b1010 => sysclk / 8,
            0b1011 => sysclk / 16,
            0b1100 => sysclk / 64,
            0b1101 => sysclk / 128,
            0b1110 => sysclk / 256,
            0b1111 => sysclk / 512,
            _ => sysclk,
        };
        Clocks { sysclk, hclk, source }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CoreFrequency {
    F48MHz,
    F72MHz,
    F216MHz,
}

impl CoreFrequency {
    /// PLL parameters for a 12 MHz HSE: VCO input is 12 MHz / 6 = 2 MHz.
    pub const fn pll_config(self) -> PllConfig {
        let (n, p, q) = match self {
            CoreFrequency::F48MHz => (96, 0b01, 4),   // /4
            CoreFrequency::F72MHz => (144, 0b01, 6),  // /4
            CoreFrequency::F216MHz => (216, 0b00, 9), // /2
        };
        PllConfig {
            source: PllSource::Hse,
            m: 6,
            n,
            p,
            q,
        }
    }

    pub const fn flash_latency(self) -> u32 {
        match self {
            CoreFrequency::F48MHz => 0b0001,
            CoreFrequency::F72MHz => 0b0010,
            CoreFrequency::F216MHz => 0b0111,
        }
    }

    pub const fn sysclk(self) -> u32 {
        match self {
            CoreFrequency::F48MHz => 48_000_000,
            CoreFrequency::F72MHz => 72_000_000,
            CoreFrequency::F216MHz => 216_000_000,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClockSource {
    /// PLL driven from HSE, as requested
    Pll,
    /// HSE or PLL did not start; running from the internal oscillator
    Hsi,
}

/// Clock frequencies in effect after `RCC::setup`
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Clocks {
    sysclk: u32,
    hclk: u32,
    source: ClockSource,
}

impl Clocks {
    pub fn sysclk(&self) -> u32 {
        self.sysclk
    }

    pub fn hclk(&self) -> u32 {
        self.hclk
    }

    pub fn source(&self) -> ClockSource {
        self.source
    }
}
