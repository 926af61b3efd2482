/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! In-memory copies of the registers that are read-modify-written.
//!
//! Each byte here must equal what the chip holds: it is seeded by
//! [`Shadow::load`] and updated after every successful write of that
//! register.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::debug;

use crate::bus::RegisterBus;
use crate::registers::{DividerRegisters, Output, OutputRegisters, Register};
use crate::Error;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Shadow {
    pub dsm_int_8: u8,
    pub dsmfrac_20_16: u8,
    pub output_enable: u8,
    pub output_disable: u8,
    pub ns1_q0: u8,
    /// Q1 - Q3, see [`crate::registers::FractionalRegisters::slot`].
    pub n_17_16: [u8; 3],
    pub nfrac_27_24: [u8; 3],
}

impl Shadow {
    /// Reads every tracked register. Returns the first read error; the
    /// caller must not use the device after a failed load.
    pub fn load<I2C, D, E>(bus: &mut RegisterBus<I2C, D>) -> Result<Self, Error<E>>
    where
        I2C: WriteRead<Error = E> + Write<Error = E>,
        D: DelayUs<u32>,
    {
        let mut shadow = Shadow {
            dsm_int_8: bus.read(Register::DsmInt8.addr())?,
            dsmfrac_20_16: bus.read(Register::DsmFrac20_16.addr())?,
            output_enable: bus.read(Register::OutputEnable.addr())?,
            output_disable: bus.read(Register::OutputDisable.addr())?,
            ns1_q0: 0,
            n_17_16: [0; 3],
            nfrac_27_24: [0; 3],
        };

        for output in Output::ALL.iter() {
            match output.registers().divider {
                DividerRegisters::TwoStage(regs) => {
                    shadow.ns1_q0 = bus.read(regs.ns1)?;
                }
                DividerRegisters::Fractional(regs) => {
                    shadow.n_17_16[regs.slot] = bus.read(regs.n_17_16)?;
                    shadow.nfrac_27_24[regs.slot] = bus.read(regs.nfrac_27_24)?;
                }
            }
        }

        debug!("register shadow loaded: {:02x?}", shadow);
        Ok(shadow)
    }
}

/// Register addresses and masks for output `ix`.
pub fn get_offsets<E>(ix: u8) -> Result<&'static OutputRegisters, Error<E>> {
    Output::from_index(ix)
        .map(|output| output.registers())
        .ok_or(Error::InvalidOutput(ix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{OutputDisableBits, OutputEnableBits};
    use crate::testing::{BusFault, FakeChip, RecordingDelay};

    #[test]
    fn load_reads_every_shared_register() {
        let mut chip = FakeChip::new();
        chip.regs[0x25] = 0xa1;
        chip.regs[0x28] = 0xe3;
        chip.regs[0x39] = 0x35;
        chip.regs[0x6f] = 0xca;
        chip.regs[0x3f] = 0x7d;
        chip.regs[0x42] = 0x11;
        chip.regs[0x45] = 0x22;
        chip.regs[0x48] = 0x33;
        chip.regs[0x57] = 0x44;
        chip.regs[0x5b] = 0x55;
        chip.regs[0x5f] = 0x66;

        let mut bus = RegisterBus::new(chip, RecordingDelay::default(), 0x7c, 1);
        let shadow = Shadow::load(&mut bus).unwrap();
        assert_eq!(
            shadow,
            Shadow {
                dsm_int_8: 0xa1,
                dsmfrac_20_16: 0xe3,
                output_enable: 0x35,
                output_disable: 0xca,
                ns1_q0: 0x7d,
                n_17_16: [0x11, 0x22, 0x33],
                nfrac_27_24: [0x44, 0x55, 0x66],
            }
        );
        assert!(bus.i2c().frames.is_empty());
    }

    #[test]
    fn load_fails_on_first_read_error() {
        let mut chip = FakeChip::new();
        chip.fail_reads = 1;
        let mut bus = RegisterBus::new(chip, RecordingDelay::default(), 0x7c, 1);
        assert_eq!(Shadow::load(&mut bus), Err(Error::Communication(BusFault)));
    }

    #[test]
    fn offsets_by_index() {
        let q2 = get_offsets::<()>(2).unwrap();
        assert_eq!(q2.enable, OutputEnableBits::OUTEN2);
        assert_eq!(q2.disable, OutputDisableBits::Q2_DIS);
        match get_offsets::<()>(0).unwrap().divider {
            DividerRegisters::TwoStage(_) => {}
            _ => panic!("Q0 is the two-stage output"),
        }
        assert_eq!(get_offsets::<()>(4), Err(Error::InvalidOutput(4)));
    }
}
