/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
/*!
A platform agnostic Rust driver for the IDT [8T49N24x], based on the
[`embedded-hal`] traits.

## The Device

The IDT (now Renesas) [8T49N24x] is a four output frequency synthesizer. A
single fractional-N PLL with a 3.0 - 4.0 GHz VCO feeds one two-stage integer
output divider (Q0) and three integer + fractional output dividers (Q1 - Q3).

The device has an I²C interface with 16-bit register addresses.

## Usage

Initialize I²C bus and a microsecond delay provider (differs between
`embedded_hal` implementations), then instantiate the device:

```ignore
# extern crate stm32f103xx_hal as hal;
# extern crate idt8t49n24x;
use idt8t49n24x::{Config, Idt8t49n24x, Output};

# fn main() {
let config = Config::default().with_crystal(25_000_000);
let mut clock = Idt8t49n24x::new(i2c, delay, config);
clock.init(None)?;
# }
```

A full register image exported from the vendor's configuration tool can be
written before the driver takes over:

```ignore
clock.init(Some(&SETTINGS))?;
```

And set frequency on one of the outputs:

```ignore
clock.set_rate(Output::Q2, 125_000_000)?;
```

When the reference comes from an upstream clock, forward its rate changes:

```ignore
use idt8t49n24x::RateChange;

clock.on_reference_change(RateChange::Post { old_rate, new_rate });
```

[8T49N24x]: https://www.renesas.com/us/en/products/clocks-timing/jitter-attenuators-frequency-translation/8t49n241-frequency-translator-universal-frequency-clock-synthesizer
[`embedded-hal`]: https://github.com/rust-embedded/embedded-hal
*/
#![deny(warnings)]
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate bitflags;

use core::fmt;

pub mod bus;
pub mod config;
pub mod device;
pub mod divider;
mod output;
pub mod rate;
pub mod registers;
pub mod shadow;

#[cfg(test)]
mod testing;

pub use crate::config::{Config, ReferenceSource};
pub use crate::device::Idt8t49n24x;
pub use crate::divider::{DividerError, Dividers, Reference};
pub use crate::rate::{Notify, RateChange};
pub use crate::registers::{Output, NUM_CONFIG_REGISTERS};

#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// The bus transaction failed on every attempt.
    Communication(E),
    /// Requested frequency is outside the supported output range.
    InvalidParameter,
    /// Output index outside 0 - 3.
    InvalidOutput(u8),
    /// `init` has not completed, the register shadow is not valid yet.
    Uninitialized,
    /// Neither a crystal nor an input clock frequency is known.
    NoReference,
    /// No even output divider puts the VCO in range.
    NoDivider,
    /// The VCO / PFD ratio does not fit the DSM_INT field.
    FeedbackOutOfRange,
    /// The output divider does not fit the N field.
    OutputDividerOutOfRange,
    /// Dividers were requested without a frequency on the computed output.
    NoFrequency,
    /// Divider math for this output has not been derived.
    NotImplemented(Output),
}

impl<E> Error<E> {
    /// True for errors reported before any register was touched because
    /// the request itself can not be satisfied.
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            Error::InvalidParameter
            | Error::InvalidOutput(_)
            | Error::NoDivider
            | Error::FeedbackOutOfRange
            | Error::OutputDividerOutOfRange
            | Error::NoFrequency => true,
            _ => false,
        }
    }
}

impl<E> From<DividerError> for Error<E> {
    fn from(e: DividerError) -> Self {
        match e {
            DividerError::NoDivider => Error::NoDivider,
            DividerError::FeedbackOutOfRange => Error::FeedbackOutOfRange,
            DividerError::OutputDividerOutOfRange => Error::OutputDividerOutOfRange,
            DividerError::NoFrequency => Error::NoFrequency,
            DividerError::NotImplemented(output) => Error::NotImplemented(output),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Communication(e) => write!(f, "Communication Error: {:?}", e),
            Error::InvalidParameter => write!(f, "Invalid Parameter"),
            Error::InvalidOutput(ix) => write!(f, "Invalid Output: {}", ix),
            Error::Uninitialized => write!(f, "Device Not Initialized"),
            Error::NoReference => write!(f, "No Reference Frequency"),
            Error::NoDivider => write!(f, "No Output Divider In Range"),
            Error::FeedbackOutOfRange => write!(f, "Feedback Divider Out Of Range"),
            Error::OutputDividerOutOfRange => write!(f, "Output Divider Out Of Range"),
            Error::NoFrequency => write!(f, "No Frequency Requested"),
            Error::NotImplemented(output) => write!(f, "Not Implemented For {:?}", output),
        }
    }
}
