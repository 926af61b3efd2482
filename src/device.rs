/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Device handle

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::{error, info};

use crate::bus::RegisterBus;
use crate::config::{Config, ReferenceSource};
use crate::divider::Reference;
use crate::registers::{field_value, Register, DBL_DIS_MASK, NUM_CONFIG_REGISTERS};
use crate::shadow::Shadow;
use crate::Error;

/// 8T49N24x driver
///
/// Every mutating call takes `&mut self`; sharing one device between
/// contexts needs a lock around the whole handle.
pub struct Idt8t49n24x<I2C, D> {
    pub(crate) bus: RegisterBus<I2C, D>,
    pub(crate) shadow: Shadow,
    pub(crate) initialized: bool,
    pub(crate) source: Option<ReferenceSource>,
    pub(crate) doubler: bool,
    /// Requested frequency per output, 0 when off
    pub(crate) frequencies: [u32; 4],
    pub(crate) min_freq: u32,
    pub(crate) max_freq: u32,
}

impl<I2C, D, E> Idt8t49n24x<I2C, D>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
    D: DelayUs<u32>,
{
    /// Creates a new driver from a I2C peripheral. Nothing is sent to the
    /// chip until [`init`](Self::init).
    pub fn new(i2c: I2C, delay: D, config: Config) -> Self {
        let (min_freq, max_freq) = config.frequency_range();
        Idt8t49n24x {
            bus: RegisterBus::new(i2c, delay, config.address, config.backoff_seed),
            shadow: Shadow::default(),
            initialized: false,
            source: config.reference,
            doubler: true,
            frequencies: [0; 4],
            min_freq,
            max_freq,
        }
    }

    /// Optionally writes a full register image, then reads back the
    /// registers the driver read-modify-writes. The device must not be
    /// used if this fails.
    pub fn init(&mut self, settings: Option<&[u8; NUM_CONFIG_REGISTERS]>) -> Result<(), Error<E>> {
        self.initialized = false;

        if let Some(settings) = settings {
            info!("writing full settings image ({} registers)", settings.len());
            self.bus.bulk_write(0, settings).map_err(|e| {
                error!("error writing all settings to chip");
                e
            })?;
        }

        self.shadow = Shadow::load(&mut self.bus)?;

        if let Some(ReferenceSource::Crystal(freq)) = self.source {
            let dbl_dis = self.bus.read(Register::DoublerDisable.addr())?;
            self.doubler = field_value(dbl_dis, DBL_DIS_MASK) == 0;
            info!("xtal {} Hz, doubler enabled: {}", freq, self.doubler);
        } else {
            self.doubler = true;
        }

        self.initialized = true;
        Ok(())
    }

    /// Destroys the driver, returning the bus and delay.
    pub fn release(self) -> (I2C, D) {
        self.bus.release()
    }

    /// Current PLL reference, `None` if no source is configured or the
    /// upstream clock reports 0 Hz.
    pub fn reference(&self) -> Option<Reference> {
        match self.source {
            Some(source) if source.freq() != 0 => Some(Reference {
                freq: source.freq(),
                doubler: self.doubler,
            }),
            _ => None,
        }
    }

    pub fn frequencies(&self) -> &[u32; 4] {
        &self.frequencies
    }

    pub fn frequency_range(&self) -> (u32, u32) {
        (self.min_freq, self.max_freq)
    }

    /// Reads the full register image, e.g. for diagnostics.
    pub fn read_settings(&mut self, buffer: &mut [u8; NUM_CONFIG_REGISTERS]) -> Result<(), Error<E>> {
        self.bus.read_block(0, buffer)
    }

    pub(crate) fn ensure_initialized(&self) -> Result<(), Error<E>> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::Uninitialized)
        }
    }

    #[cfg(test)]
    pub(crate) fn chip(&mut self) -> &mut I2C {
        self.bus.i2c()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::{BusFault, FakeChip, RecordingDelay};

    pub(crate) fn attached(config: Config) -> Idt8t49n24x<FakeChip, RecordingDelay> {
        let mut clock = Idt8t49n24x::new(FakeChip::new(), RecordingDelay::default(), config);
        clock.init(None).unwrap();
        clock.chip().clear_log();
        clock
    }

    #[test]
    fn init_reads_doubler_for_crystal() {
        let mut chip = FakeChip::new();
        chip.regs[0x6c] = 0x01;
        let config = Config::default().with_crystal(25_000_000);
        let mut clock = Idt8t49n24x::new(chip, RecordingDelay::default(), config);
        clock.init(None).unwrap();
        assert_eq!(
            clock.reference(),
            Some(Reference {
                freq: 25_000_000,
                doubler: false
            })
        );
        assert!(clock.chip().reads.contains(&0x6c));
    }

    #[test]
    fn init_skips_doubler_for_input_clock() {
        let mut chip = FakeChip::new();
        chip.regs[0x6c] = 0x01;
        let config = Config::default().with_input_clock(40_000_000);
        let mut clock = Idt8t49n24x::new(chip, RecordingDelay::default(), config);
        clock.init(None).unwrap();
        assert_eq!(clock.reference().map(|r| r.doubler), Some(true));
        assert!(!clock.chip().reads.contains(&0x6c));
    }

    #[test]
    fn init_writes_settings_before_reading() {
        let mut settings = [0u8; NUM_CONFIG_REGISTERS];
        for (ix, byte) in settings.iter_mut().enumerate() {
            *byte = (ix * 7) as u8;
        }
        let config = Config::default().with_crystal(25_000_000);
        let mut clock = Idt8t49n24x::new(FakeChip::new(), RecordingDelay::default(), config);
        clock.init(Some(&settings)).unwrap();

        let chip = clock.chip();
        assert_eq!(chip.frames.len(), (NUM_CONFIG_REGISTERS + 31) / 32);
        assert_eq!(&chip.regs[..NUM_CONFIG_REGISTERS], &settings[..]);
        assert_eq!(clock.shadow.output_enable, settings[0x39]);
        assert_eq!(clock.shadow.nfrac_27_24[2], settings[0x5f]);
    }

    #[test]
    fn init_failure_leaves_device_unusable() {
        let mut chip = FakeChip::new();
        chip.fail_reads = 1;
        let config = Config::default().with_crystal(25_000_000);
        let mut clock = Idt8t49n24x::new(chip, RecordingDelay::default(), config);
        assert_eq!(clock.init(None), Err(Error::Communication(BusFault)));
        assert_eq!(
            clock.enable_output(crate::Output::Q2, true),
            Err(Error::Uninitialized)
        );
        assert!(clock.chip().frames.is_empty());
    }

    #[test]
    fn no_reference_without_source() {
        let clock = attached(Config::default());
        assert_eq!(clock.reference(), None);
        assert_eq!(clock.frequency_range(), (1_000_000, 300_000_000));
    }

    #[test]
    fn read_settings_dumps_register_file() {
        let mut clock = attached(Config::default());
        clock.chip().regs[0x316] = 0xee;
        clock.chip().regs[0x26] = 0x46;
        let mut buffer = [0u8; NUM_CONFIG_REGISTERS];
        clock.read_settings(&mut buffer).unwrap();
        assert_eq!(buffer[0x316], 0xee);
        assert_eq!(buffer[0x26], 0x46);
    }

    #[test]
    fn release_returns_bus() {
        let clock = attached(Config::default());
        let (chip, _delay) = clock.release();
        assert!(chip.frames.is_empty());
    }
}
