use crate::rcc::{RccRegisters, RCC};
use core::convert::Infallible;
use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};
use stm32ral::gpio;

/// GPIO ports present on the STM32F723
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Bank {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
}

impl Bank {
    pub const ALL: [Bank; 9] = [
        Bank::A,
        Bank::B,
        Bank::C,
        Bank::D,
        Bank::E,
        Bank::F,
        Bank::G,
        Bank::H,
        Bank::I,
    ];
}

/// Enable clocking to every GPIO bank on the part.
///
/// Only clock-enable bits are touched, so calling this again leaves pin
/// configuration alone.
pub fn init_all_banks<R: RccRegisters>(rcc: &RCC<R>) {
    for &bank in Bank::ALL.iter() {
        rcc.enable_gpio(bank);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PortReg {
    Moder,
    Otyper,
    Ospeedr,
    Pupdr,
    Idr,
    Odr,
    Bsrr,
}

/// Register file of one GPIO port.
///
/// Reading a write-only register returns 0, writing a read-only one is
/// ignored.
pub trait PortRegisters {
    fn read(&self, reg: PortReg) -> u32;
    fn write(&self, reg: PortReg, value: u32);

    fn modify(&self, reg: PortReg, f: impl FnOnce(u32) -> u32) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }
}

impl<'r, T: PortRegisters> PortRegisters for &'r T {
    fn read(&self, reg: PortReg) -> u32 {
        (**self).read(reg)
    }

    fn write(&self, reg: PortReg, value: u32) {
        (**self).write(reg, value)
    }
}

pub struct GPIO<P> {
    bank: Bank,
    p: P,
}

impl<'a, P: PortRegisters> GPIO<P> {
    pub fn new(bank: Bank, p: P) -> Self {
        GPIO { bank, p }
    }

    pub fn bank(&self) -> Bank {
        self.bank
    }

    pub fn pin(&'a self, n: u8) -> Pin<'a, P> {
        assert!(n < 16);
        Pin { n, port: self }
    }

    pub fn set_high(&'a self, n: u8) -> &Self {
        assert!(n < 16);
        self.p.write(PortReg::Bsrr, 1 << n);
        self
    }

    pub fn set_low(&'a self, n: u8) -> &Self {
        assert!(n < 16);
        self.p.write(PortReg::Bsrr, 1 << (n + 16));
        self
    }

    pub fn toggle(&'a self, n: u8) -> &Self {
        assert!(n < 16);
        let pin = (self.p.read(PortReg::Odr) >> n) & 1;
        if pin == 1 {
            self.set_low(n)
        } else {
            self.set_high(n)
        }
    }

    /// Apply a complete pin configuration
    pub fn configure(&'a self, n: u8, mode: PinMode) -> &Self {
        match mode.mode {
            Mode::PushPullOutput | Mode::OpenDrainOutput => {
                let otype = if mode.mode == Mode::OpenDrainOutput {
                    gpio::OTYPER::OT0::RW::OpenDrain
                } else {
                    gpio::OTYPER::OT0::RW::PushPull
                };
                self.set_otype(n, otype)
                    .set_ospeed(n, mode.speed.bits())
                    .set_pull_floating(n)
                    .set_mode_output(n)
            }
            Mode::InputFloating => self.set_pull_floating(n).set_mode_input(n),
            Mode::InputPullUp => self.set_pull_up(n).set_mode_input(n),
            Mode::InputPullDown => self.set_pull_down(n).set_mode_input(n),
            Mode::Analog => self.set_pull_floating(n).set_mode_analog(n),
        }
    }

    pub fn set_mode(&'a self, n: u8, mode: u32) -> &Self {
        assert!(n < 16);
        let offset = n * 2;
        let mask = 0b11 << offset;
        let val = (mode << offset) & mask;
        self.p.modify(PortReg::Moder, |r| (r & !mask) | val);
        self
    }

    pub fn set_mode_input(&'a self, n: u8) -> &Self {
        self.set_mode(n, gpio::MODER::MODER0::RW::Input)
    }

    pub fn set_mode_output(&'a self, n: u8) -> &Self {
        self.set_mode(n, gpio::MODER::MODER0::RW::Output)
    }

    pub fn set_mode_analog(&'a self, n: u8) -> &Self {
        self.set_mode(n, gpio::MODER::MODER0::RW::Analog)
    }

    pub fn set_otype(&'a self, n: u8, otype: u32) -> &Self {
        assert!(n < 16);
        let offset = n;
        let mask = 0b1 << offset;
        let val = (otype << offset) & mask;
        self.p.modify(PortReg::Otyper, |r| (r & !mask) | val);
        self
    }

    pub fn set_otype_opendrain(&'a self, n: u8) -> &Self {
        self.set_otype(n, gpio::OTYPER::OT0::RW::OpenDrain)
    }

    pub fn set_otype_pushpull(&'a self, n: u8) -> &Self {
        self.set_otype(n, gpio::OTYPER::OT0::RW::PushPull)
    }

    pub fn set_ospeed(&'a self, n: u8, ospeed: u32) -> &Self {
        assert!(n < 16);
        let offset = n * 2;
        let mask = 0b11 << offset;
        let val = (ospeed << offset) & mask;
        self.p.modify(PortReg::Ospeedr, |r| (r & !mask) | val);
        self
    }

    pub fn set_ospeed_low(&'a self, n: u8) -> &Self {
        self.set_ospeed(n, gpio::OSPEEDR::OSPEEDR0::RW::LowSpeed)
    }

    pub fn set_ospeed_medium(&'a self, n: u8) -> &Self {
        self.set_ospeed(n, gpio::OSPEEDR::OSPEEDR0::RW::MediumSpeed)
    }

    pub fn set_ospeed_high(&'a self, n: u8) -> &Self {
        self.set_ospeed(n, gpio::OSPEEDR::OSPEEDR0::RW::HighSpeed)
    }

    pub fn set_ospeed_veryhigh(&'a self, n: u8) -> &Self {
        self.set_ospeed(n, gpio::OSPEEDR::OSPEEDR0::RW::VeryHighSpeed)
    }

    pub fn set_pull(&'a self, n: u8, pull: u32) -> &Self {
        assert!(n < 16);
        let offset = n * 2;
        let mask = 0b11 << offset;
        let val = (pull << offset) & mask;
        self.p.modify(PortReg::Pupdr, |r| (r & !mask) | val);
        self
    }

    pub fn set_pull_floating(&'a self, n: u8) -> &Self {
        self.set_pull(n, gpio::PUPDR::PUPDR0::RW::Floating)
    }

    pub fn set_pull_up(&'a self, n: u8) -> &Self {
        self.set_pull(n, gpio::PUPDR::PUPDR0::RW::PullUp)
    }

    pub fn set_pull_down(&'a self, n: u8) -> &Self {
        self.set_pull(n, gpio::PUPDR::PUPDR0::RW::PullDown)
    }

    pub fn get_idr(&'a self) -> u32 {
        self.p.read(PortReg::Idr)
    }

    pub fn get_pin_idr(&'a self, n: u8) -> u32 {
        (self.get_idr() & (1 << n)) >> n
    }

    pub fn get_pin_odr(&'a self, n: u8) -> u32 {
        (self.p.read(PortReg::Odr) & (1 << n)) >> n
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    PushPullOutput,
    OpenDrainOutput,
    InputFloating,
    InputPullUp,
    InputPullDown,
    Analog,
}

/// Output drive speed class. Ignored for inputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Speed {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Speed {
    fn bits(self) -> u32 {
        match self {
            Speed::Low => gpio::OSPEEDR::OSPEEDR0::RW::LowSpeed,
            Speed::Medium => gpio::OSPEEDR::OSPEEDR0::RW::MediumSpeed,
            Speed::High => gpio::OSPEEDR::OSPEEDR0::RW::HighSpeed,
            Speed::VeryHigh => gpio::OSPEEDR::OSPEEDR0::RW::VeryHighSpeed,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinMode {
    pub mode: Mode,
    pub speed: Speed,
}

impl PinMode {
    pub const fn push_pull(speed: Speed) -> Self {
        PinMode { mode: Mode::PushPullOutput, speed }
    }

    pub const fn open_drain(speed: Speed) -> Self {
        PinMode { mode: Mode::OpenDrainOutput, speed }
    }

    pub const fn input(mode: Mode) -> Self {
        PinMode { mode, speed: Speed::Low }
    }

    pub const fn analog() -> Self {
        PinMode { mode: Mode::Analog, speed: Speed::Low }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum PinState {
    Low = 0,
    High = 1,
}

pub struct Pin<'a, P> {
    n: u8,
    port: &'a GPIO<P>,
}

impl<'a, P> Clone for Pin<'a, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, P> Copy for Pin<'a, P> {}

impl<'a, P: PortRegisters> Pin<'a, P> {
    pub fn bank(&self) -> Bank {
        self.port.bank
    }

    pub fn index(&self) -> u8 {
        self.n
    }

    pub fn configure(&self, mode: PinMode) -> &Self {
        self.port.configure(self.n, mode);
        self
    }

    pub fn set_high(&self) -> &Self {
        self.port.set_high(self.n);
        self
    }

    pub fn set_low(&self) -> &Self {
        self.port.set_low(self.n);
        self
    }

    pub fn set_state(&self, state: PinState) {
        match state {
            PinState::Low => self.set_low(),
            PinState::High => self.set_high(),
        };
    }

    pub fn get_state(&self) -> PinState {
        match self.port.get_pin_idr(self.n) {
            0 => PinState::Low,
            1 => PinState::High,
            _ => unreachable!(),
        }
    }

    pub fn is_high(&self) -> bool {
        match self.get_state() {
            PinState::High => true,
            PinState::Low => false,
        }
    }

    pub fn is_low(&self) -> bool {
        match self.get_state() {
            PinState::Low => true,
            PinState::High => false,
        }
    }

    pub fn toggle(&'a self) -> &Self {
        self.port.toggle(self.n);
        self
    }

    pub fn set_mode_input(&'a self) -> &Self {
        self.port.set_mode_input(self.n);
        self
    }

    pub fn set_mode_output(&'a self) -> &Self {
        self.port.set_mode_output(self.n);
        self
    }

    pub fn set_mode_analog(&'a self) -> &Self {
        self.port.set_mode_analog(self.n);
        self
    }

    pub fn set_otype_opendrain(&'a self) -> &Self {
        self.port.set_otype_opendrain(self.n);
        self
    }

    pub fn set_otype_pushpull(&'a self) -> &Self {
        self.port.set_otype_pushpull(self.n);
        self
    }

    pub fn set_ospeed_low(&'a self) -> &Self {
        self.port.set_ospeed_low(self.n);
        self
    }

    pub fn set_ospeed_medium(&'a self) -> &Self {
        self.port.set_ospeed_medium(self.n);
        self
    }

    pub fn set_ospeed_high(&'a self) -> &Self {
        self.port.set_ospeed_high(self.n);
        self
    }

    pub fn set_ospeed_veryhigh(&'a self) -> &Self {
        self.port.set_ospeed_veryhigh(self.n);
        self
    }

    pub fn set_pull_floating(&'a self) -> &Self {
        self.port.set_pull_floating(self.n);
        self
    }

    pub fn set_pull_up(&'a self) -> &Self {
        self.port.set_pull_up(self.n);
        self
    }

    pub fn set_pull_down(&'a self) -> &Self {
        self.port.set_pull_down(self.n);
        self
    }
}

impl<'a, P: PortRegisters> OutputPin for Pin<'a, P> {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.port.set_low(self.n);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.port.set_high(self.n);
        Ok(())
    }
}

impl<'a, P: PortRegisters> StatefulOutputPin for Pin<'a, P> {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(self.port.get_pin_odr(self.n) == 1)
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(self.port.get_pin_odr(self.n) == 0)
    }
}

impl<'a, P: PortRegisters> ToggleableOutputPin for Pin<'a, P> {
    type Error = Infallible;

    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.port.toggle(self.n);
        Ok(())
    }
}

impl<'a, P: PortRegisters> InputPin for Pin<'a, P> {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.port.get_pin_idr(self.n) == 1)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.port.get_pin_idr(self.n) == 0)
    }
}

pub struct Pins<'a, P> {
    /// PD6, drives the LED (active high)
    pub led: Pin<'a, P>,
}

impl<'a, P: PortRegisters> Pins<'a, P> {
    /// Configure I/O pins
    pub fn setup(&self) {
        // Push-pull output to LED, starts off.
        self.led
            .set_low()
            .configure(PinMode::push_pull(Speed::Low));
    }
}
