/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Writing dividers and output enables to the chip
//!
//! A failed write aborts the sequence with nothing rolled back; the chip
//! keeps whatever was written until the next successful `apply`.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::debug;

use crate::device::Idt8t49n24x;
use crate::divider::Dividers;
use crate::registers::{
    DividerRegisters, FractionalRegisters, Output, OutputRegisters, Register, TwoStageRegisters,
    DSMFRAC_20_16_MASK, DSM_INT_8_MASK,
};
use crate::shadow::get_offsets;
use crate::Error;

impl<I2C, D, E> Idt8t49n24x<I2C, D>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
    D: DelayUs<u32>,
{
    /// Enables or disables one output. Bits of the other outputs are taken
    /// from the shadow and written back unchanged.
    pub fn enable_output(&mut self, output: Output, enable: bool) -> Result<(), Error<E>> {
        self.ensure_initialized()?;
        let offsets = get_offsets::<E>(output.ix() as u8)?;
        self.write_enable(output.ix(), offsets, enable)
    }

    /// Writes `divs` and sets every output's enable state from the
    /// requested frequencies.
    pub(crate) fn apply(&mut self, divs: &Dividers) -> Result<(), Error<E>> {
        self.ensure_initialized()?;

        self.write_feedback(divs)?;

        for ix in 0..Output::ALL.len() {
            let offsets = get_offsets::<E>(ix as u8)?;
            let enabled = self.frequencies[ix] != 0;
            match offsets.divider {
                DividerRegisters::TwoStage(ref regs) => self.write_two_stage(regs, divs)?,
                DividerRegisters::Fractional(ref regs) if enabled => {
                    self.write_fractional(regs, divs)?
                }
                DividerRegisters::Fractional(_) => {}
            }
            self.write_enable(ix, offsets, enabled)?;
        }

        Ok(())
    }

    fn write_enable(
        &mut self,
        ix: usize,
        offsets: &OutputRegisters,
        enable: bool,
    ) -> Result<(), Error<E>> {
        let mut outen = self.shadow.output_enable & !offsets.enable.bits();
        let mut qdis = self.shadow.output_disable & !offsets.disable.bits();
        if enable {
            outen |= offsets.enable.bits();
        } else {
            qdis |= offsets.disable.bits();
        }
        debug!(
            "Q{} enable: {}, OUTEN 0x{:02x} -> 0x{:02x}, Q_DIS 0x{:02x} -> 0x{:02x}",
            ix, enable, self.shadow.output_enable, outen, self.shadow.output_disable, qdis
        );

        self.bus.write(Register::OutputEnable.addr(), outen)?;
        self.shadow.output_enable = outen;
        self.bus.write(Register::OutputDisable.addr(), qdis)?;
        self.shadow.output_disable = qdis;

        Ok(())
    }

    fn write_feedback(&mut self, divs: &Dividers) -> Result<(), Error<E>> {
        self.shadow.dsm_int_8 = self.bus.masked_write(
            Register::DsmInt8.addr(),
            (divs.dsm_int >> 8) as u8,
            self.shadow.dsm_int_8,
            DSM_INT_8_MASK,
        )?;
        self.bus.write(Register::DsmInt7_0.addr(), divs.dsm_int as u8)?;

        self.shadow.dsmfrac_20_16 = self.bus.masked_write(
            Register::DsmFrac20_16.addr(),
            (divs.dsm_frac >> 16) as u8,
            self.shadow.dsmfrac_20_16,
            DSMFRAC_20_16_MASK,
        )?;
        self.bus.write(Register::DsmFrac15_8.addr(), (divs.dsm_frac >> 8) as u8)?;
        self.bus.write(Register::DsmFrac7_0.addr(), divs.dsm_frac as u8)
    }

    fn write_two_stage(&mut self, regs: &TwoStageRegisters, divs: &Dividers) -> Result<(), Error<E>> {
        self.shadow.ns1_q0 =
            self.bus
                .masked_write(regs.ns1, divs.ns1_q0, self.shadow.ns1_q0, regs.ns1_mask)?;
        self.bus.write(regs.ns2_15_8, (divs.ns2_q0 >> 8) as u8)?;
        self.bus.write(regs.ns2_7_0, divs.ns2_q0 as u8)
    }

    fn write_fractional(
        &mut self,
        regs: &FractionalRegisters,
        divs: &Dividers,
    ) -> Result<(), Error<E>> {
        let slot = regs.slot;
        let n = divs.n_int[slot];
        let nfrac = divs.n_frac[slot];
        debug!("Q{} N {}, NFRAC {}", slot + 1, n, nfrac);

        self.shadow.n_17_16[slot] = self.bus.masked_write(
            regs.n_17_16,
            (n >> 16) as u8,
            self.shadow.n_17_16[slot],
            regs.n_17_16_mask,
        )?;
        self.bus.write(regs.n_15_8, (n >> 8) as u8)?;
        self.bus.write(regs.n_7_0, n as u8)?;

        self.shadow.nfrac_27_24[slot] = self.bus.masked_write(
            regs.nfrac_27_24,
            (nfrac >> 24) as u8,
            self.shadow.nfrac_27_24[slot],
            regs.nfrac_27_24_mask,
        )?;
        self.bus.write(regs.nfrac_23_16, (nfrac >> 16) as u8)?;
        self.bus.write(regs.nfrac_15_8, (nfrac >> 8) as u8)?;
        self.bus.write(regs.nfrac_7_0, nfrac as u8)
    }
}
