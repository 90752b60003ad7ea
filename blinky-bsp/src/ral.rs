//! Register backends for the real peripherals, through `stm32ral`.

use crate::delay::SysTick;
use crate::gpio::{Bank, PortReg, PortRegisters};
use crate::rcc::{PllConfig, PllSource, RccRegisters, SysClk};
use stm32ral::{flash, gpio, rcc, syst};
use stm32ral::{modify_reg, read_reg, reset_reg, write_reg};

const SYST_CSR_ENABLE: u32 = 1 << 0;
const SYST_CSR_CLKSOURCE: u32 = 1 << 2;

impl PortRegisters for gpio::Instance {
    fn read(&self, reg: PortReg) -> u32 {
        match reg {
            PortReg::Moder => read_reg!(gpio, self, MODER),
            PortReg::Otyper => read_reg!(gpio, self, OTYPER),
            PortReg::Ospeedr => read_reg!(gpio, self, OSPEEDR),
            PortReg::Pupdr => read_reg!(gpio, self, PUPDR),
            PortReg::Idr => read_reg!(gpio, self, IDR),
            PortReg::Odr => read_reg!(gpio, self, ODR),
            PortReg::Bsrr => 0,
        }
    }

    fn write(&self, reg: PortReg, value: u32) {
        match reg {
            PortReg::Moder => write_reg!(gpio, self, MODER, value),
            PortReg::Otyper => write_reg!(gpio, self, OTYPER, value),
            PortReg::Ospeedr => write_reg!(gpio, self, OSPEEDR, value),
            PortReg::Pupdr => write_reg!(gpio, self, PUPDR, value),
            PortReg::Idr => {}
            PortReg::Odr => write_reg!(gpio, self, ODR, value),
            PortReg::Bsrr => write_reg!(gpio, self, BSRR, value),
        }
    }
}

impl RccRegisters for rcc::Instance {
    fn enable_hsi(&self) {
        modify_reg!(rcc, self, CR, HSION: On);
    }

    fn hsi_ready(&self) -> bool {
        read_reg!(rcc, self, CR, HSIRDY == Ready)
    }

    fn select_sysclk(&self, source: SysClk) {
        match source {
            SysClk::Hsi => modify_reg!(rcc, self, CFGR, SW: HSI),
            SysClk::Hse => modify_reg!(rcc, self, CFGR, SW: HSE),
            SysClk::Pll => modify_reg!(rcc, self, CFGR, SW: PLL),
        }
    }

    fn sysclk_status(&self) -> SysClk {
        if read_reg!(rcc, self, CFGR, SWS == PLL) {
            SysClk::Pll
        } else if read_reg!(rcc, self, CFGR, SWS == HSE) {
            SysClk::Hse
        } else {
            SysClk::Hsi
        }
    }

    fn disable_oscillators(&self) {
        modify_reg!(rcc, self, CR,
            HSEON: Off,
            CSSON: Off,
            PLLON: Off,
            PLLI2SON: Off,
            PLLSAION: Off
        );
    }

    fn reset_peripheral_clocks(&self) {
        reset_reg!(rcc, self, RCC, AHB1ENR);
        reset_reg!(rcc, self, RCC, AHB2ENR);
        reset_reg!(rcc, self, RCC, AHB3ENR);
        reset_reg!(rcc, self, RCC, APB1ENR);
        reset_reg!(rcc, self, RCC, APB2ENR);
    }

    fn enable_hse(&self) {
        modify_reg!(rcc, self, CR, HSEBYP: Bypassed);
        modify_reg!(rcc, self, CR, HSEON: On);
    }

    fn hse_ready(&self) -> bool {
        read_reg!(rcc, self, CR, HSERDY == Ready)
    }

    fn configure_pll(&self, config: &PllConfig) {
        match config.source {
            PllSource::Hse => modify_reg!(rcc, self, PLLCFGR, PLLSRC: HSE),
            PllSource::Hsi => modify_reg!(rcc, self, PLLCFGR, PLLSRC: HSI),
        }
        modify_reg!(rcc, self, PLLCFGR,
            PLLM: config.m,
            PLLN: config.n,
            PLLP: config.p,
            PLLQ: config.q
        );
    }

    fn enable_pll(&self) {
        modify_reg!(rcc, self, CR, PLLON: On);
    }

    fn pll_ready(&self) -> bool {
        read_reg!(rcc, self, CR, PLLRDY == Ready)
    }

    fn set_flash_latency(&self, latency: u32) {
        let flash = unsafe { &*flash::FLASH };
        modify_reg!(flash, flash, ACR, LATENCY: latency);
    }

    fn set_bus_prescalers_div1(&self) {
        modify_reg!(rcc, self, CFGR, PPRE1: Div1, PPRE2: Div1, HPRE: Div1);
    }

    fn ahb_prescaler(&self) -> u32 {
        read_reg!(rcc, self, CFGR, HPRE)
    }

    fn enable_gpio(&self, bank: Bank) {
        match bank {
            Bank::A => modify_reg!(rcc, self, AHB1ENR, GPIOAEN: Enabled),
            Bank::B => modify_reg!(rcc, self, AHB1ENR, GPIOBEN: Enabled),
            Bank::C => modify_reg!(rcc, self, AHB1ENR, GPIOCEN: Enabled),
            Bank::D => modify_reg!(rcc, self, AHB1ENR, GPIODEN: Enabled),
            Bank::E => modify_reg!(rcc, self, AHB1ENR, GPIOEEN: Enabled),
            Bank::F => modify_reg!(rcc, self, AHB1ENR, GPIOFEN: Enabled),
            Bank::G => modify_reg!(rcc, self, AHB1ENR, GPIOGEN: Enabled),
            Bank::H => modify_reg!(rcc, self, AHB1ENR, GPIOHEN: Enabled),
            Bank::I => modify_reg!(rcc, self, AHB1ENR, GPIOIEN: Enabled),
        }
    }
}

impl SysTick for syst::Instance {
    fn start(&self) {
        // Set clock source to processor clock
        modify_reg!(syst, self, CSR, |r| r | SYST_CSR_CLKSOURCE);

        // Set reload and current values
        write_reg!(syst, self, RVR, 0xffffff);
        write_reg!(syst, self, CVR, 0);

        // Enable the counter
        modify_reg!(syst, self, CSR, |r| r | SYST_CSR_ENABLE);
    }

    #[inline(always)]
    fn current(&self) -> u32 {
        read_reg!(syst, self, CVR)
    }
}
