/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Attach-time configuration

use crate::registers::ADDRESS;

/// Lowest supported output frequency, Hz
pub const MIN_FREQ: u32 = 1_000_000;

/// Highest supported output frequency, Hz
pub const MAX_FREQ: u32 = 300_000_000;

/// Where the PLL reference comes from. The two are mutually exclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    /// Crystal oscillator; the doubler setting is read from the chip.
    Crystal(u32),
    /// Upstream clock; the doubler is assumed enabled and rate changes are
    /// forwarded through [`crate::Idt8t49n24x::on_reference_change`].
    InputClock(u32),
}

impl ReferenceSource {
    pub fn freq(&self) -> u32 {
        match *self {
            ReferenceSource::Crystal(freq) | ReferenceSource::InputClock(freq) => freq,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// 7-bit I²C address
    pub address: u8,
    pub reference: Option<ReferenceSource>,
    /// Output range. Bounds outside [`MIN_FREQ`] - [`MAX_FREQ`] are not
    /// honoured, see [`Config::frequency_range`].
    pub min_freq: u32,
    pub max_freq: u32,
    /// Seed of the retry backoff jitter. Boards with several chips, or that
    /// have an entropy source at boot, should set one.
    pub backoff_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: ADDRESS,
            reference: None,
            min_freq: MIN_FREQ,
            max_freq: MAX_FREQ,
            backoff_seed: u64::from(ADDRESS),
        }
    }
}

impl Config {
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_crystal(mut self, freq: u32) -> Self {
        self.reference = Some(ReferenceSource::Crystal(freq));
        self
    }

    pub fn with_input_clock(mut self, freq: u32) -> Self {
        self.reference = Some(ReferenceSource::InputClock(freq));
        self
    }

    /// Narrows the output range; it can not be widened past what the
    /// device supports.
    pub fn with_frequency_range(mut self, min_freq: u32, max_freq: u32) -> Self {
        self.min_freq = min_freq.max(MIN_FREQ);
        self.max_freq = max_freq.min(MAX_FREQ);
        self
    }

    pub fn with_backoff_seed(mut self, seed: u64) -> Self {
        self.backoff_seed = seed;
        self
    }

    /// Effective output range, clamped to [`MIN_FREQ`] - [`MAX_FREQ`].
    pub fn frequency_range(&self) -> (u32, u32) {
        (self.min_freq.max(MIN_FREQ), self.max_freq.min(MAX_FREQ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.address, 0x7c);
        assert_eq!(config.reference, None);
        assert_eq!((config.min_freq, config.max_freq), (1_000_000, 300_000_000));
        assert_eq!(config.backoff_seed, 0x7c);
    }

    #[test]
    fn range_can_only_narrow() {
        let wide = Config::default().with_frequency_range(1_000, 1_000_000_000);
        assert_eq!(wide.frequency_range(), (1_000_000, 300_000_000));

        let narrow = Config::default().with_frequency_range(10_000_000, 200_000_000);
        assert_eq!(narrow.frequency_range(), (10_000_000, 200_000_000));

        let mut raw = Config::default();
        raw.min_freq = 5_000;
        assert_eq!(raw.frequency_range(), (1_000_000, 300_000_000));
    }

    #[test]
    fn last_reference_wins() {
        let config = Config::default()
            .with_crystal(25_000_000)
            .with_input_clock(40_000_000);
        assert_eq!(config.reference, Some(ReferenceSource::InputClock(40_000_000)));
        assert_eq!(config.reference.map(|r| r.freq()), Some(40_000_000));
    }
}
