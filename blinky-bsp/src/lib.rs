#![cfg_attr(not(test), no_std)]

pub use cortex_m;
pub use embedded_hal;
pub use stm32ral;

pub mod delay;
pub mod gpio;
pub mod ral;
pub mod rcc;

#[cfg(test)]
mod sim;
