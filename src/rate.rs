/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Frequency requests and reference rate changes

use core::fmt;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::{error, info, warn};

use crate::config::ReferenceSource;
use crate::device::Idt8t49n24x;
use crate::divider::{self, Reference};
use crate::registers::Output;
use crate::Error;

/// Upstream reference clock notification, rates in Hz.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RateChange {
    Pre { old_rate: u32, new_rate: u32 },
    Post { old_rate: u32, new_rate: u32 },
    Abort { old_rate: u32, new_rate: u32 },
}

/// Answer to a [`RateChange`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Notify {
    /// Change acknowledged.
    Ok,
    /// Change rejected, the outputs can not follow it.
    Stop,
    /// Notification does not concern this device.
    Done,
}

impl<I2C, D, E> Idt8t49n24x<I2C, D>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
    D: DelayUs<u32>,
{
    /// Sets `output` to `freq` Hz, or turns it off when `freq` is 0.
    ///
    /// The request is only recorded once dividers for it are found; a
    /// failure while writing them leaves it recorded with the chip
    /// partially updated.
    pub fn set_rate(&mut self, output: Output, freq: u32) -> Result<(), Error<E>> {
        self.ensure_initialized()?;

        if freq == 0 {
            self.frequencies[output.ix()] = 0;
            return self.enable_output(output, false);
        }

        if freq < self.min_freq || freq > self.max_freq {
            error!("requested frequency ({} Hz) is out of range", freq);
            return Err(Error::InvalidParameter);
        }

        let reference = self.reference().ok_or_else(|| {
            error!("set_rate: no input frequency; can't continue");
            Error::NoReference
        })?;

        let mut requested = self.frequencies;
        requested[output.ix()] = freq;
        let divs = divider::calculate(reference, &requested)?;
        info!(
            "{:?} {} Hz: integer div {}, frac div {}",
            output, freq, divs.n_int[1], divs.n_frac[1]
        );

        self.frequencies = requested;
        self.apply(&divs)
    }

    /// Last frequency requested for `output`. Does not touch the chip.
    pub fn rate(&self, output: Output) -> u32 {
        self.frequencies[output.ix()]
    }

    /// Closest rate to `freq` the device can produce.
    pub fn round_rate(&self, freq: u32) -> u32 {
        if freq == 0 {
            return 0;
        }
        let clamped = freq.max(self.min_freq).min(self.max_freq);
        match self.reference() {
            Some(reference) => divider::achievable_rate(reference, clamped)
                .map(|rate| rate as u32)
                .unwrap_or(clamped),
            None => clamped,
        }
    }

    /// Handles a change of the upstream reference clock.
    pub fn on_reference_change(&mut self, change: RateChange) -> Notify
    where
        E: fmt::Debug,
    {
        match self.source {
            Some(ReferenceSource::InputClock(_)) => {}
            _ => return Notify::Done,
        }

        match change {
            RateChange::Pre { old_rate, new_rate } => {
                info!("reference rate change {} -> {} Hz pending", old_rate, new_rate);
                if self.frequencies.iter().all(|&f| f == 0) {
                    return Notify::Ok;
                }
                let candidate = Reference {
                    freq: new_rate,
                    doubler: self.doubler,
                };
                if new_rate == 0 {
                    warn!("reference rate change to 0 Hz rejected");
                    return Notify::Stop;
                }
                match divider::calculate(candidate, &self.frequencies) {
                    Ok(_) => Notify::Ok,
                    Err(e) => {
                        warn!("reference rate change to {} Hz rejected: {:?}", new_rate, e);
                        Notify::Stop
                    }
                }
            }
            RateChange::Post { new_rate, .. } => {
                self.source = Some(ReferenceSource::InputClock(new_rate));
                info!("reference rate now {} Hz, reprogramming outputs", new_rate);
                if let Err(e) = self.reprogram() {
                    error!("reprogramming after reference change failed: {}", e);
                }
                Notify::Ok
            }
            RateChange::Abort { .. } => Notify::Ok,
        }
    }

    /// Recomputes and rewrites dividers for every configured output.
    fn reprogram(&mut self) -> Result<(), Error<E>> {
        self.ensure_initialized()?;
        if self.frequencies.iter().all(|&f| f == 0) {
            return Ok(());
        }
        let reference = self.reference().ok_or(Error::NoReference)?;
        let divs = divider::calculate(reference, &self.frequencies)?;
        self.apply(&divs)
    }
}
