/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! 8T49N24x register map
//!
//! Several logical fields share a physical byte with unrelated bits (for
//! example DSM_INT[8] lives in bit 0 of 0x25). Those bytes are only ever
//! written through [`crate::bus::RegisterBus::masked_write`] against a
//! shadow copy, see [`crate::shadow`].

/// A full settings image covers offsets `0..=0x316`.
pub const NUM_CONFIG_REGISTERS: usize = 0x317;

/// Largest bulk transfer the transport accepts in one transaction.
pub const WRITE_BLOCK_SIZE: usize = 32;

/// Default 7-bit I²C address.
pub const ADDRESS: u8 = 0x7c;

pub const DSM_INT_8_MASK: u8 = 0x01;
pub const DSMFRAC_20_16_MASK: u8 = 0x1f;
pub const DBL_DIS_MASK: u8 = 0x01;

/// Registers that are not specific to one output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Register {
    DsmInt8 = 0x25,
    DsmInt7_0 = 0x26,
    DsmFrac20_16 = 0x28,
    DsmFrac15_8 = 0x29,
    DsmFrac7_0 = 0x2a,
    OutputEnable = 0x39,
    DoublerDisable = 0x6c,
    OutputDisable = 0x6f,
}

impl Register {
    pub fn addr(&self) -> u16 {
        *self as u16
    }
}

bitflags! {
    pub struct OutputEnableBits: u8 {
        const OUTEN0 = 0b0000_0001;
        const OUTEN1 = 0b0000_0010;
        const OUTEN2 = 0b0000_0100;
        const OUTEN3 = 0b0000_1000;
    }
}

bitflags! {
    pub struct OutputDisableBits: u8 {
        const Q0_DIS = 0b0000_0001;
        const Q1_DIS = 0b0000_0010;
        const Q2_DIS = 0b0000_0100;
        const Q3_DIS = 0b0000_1000;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Output {
    Q0 = 0,
    Q1,
    Q2,
    Q3,
}

impl Output {
    pub const ALL: [Output; 4] = [Output::Q0, Output::Q1, Output::Q2, Output::Q3];

    pub fn from_index(ix: u8) -> Option<Output> {
        match ix {
            0 => Some(Output::Q0),
            1 => Some(Output::Q1),
            2 => Some(Output::Q2),
            3 => Some(Output::Q3),
            _ => None,
        }
    }

    pub fn ix(&self) -> usize {
        *self as usize
    }

    pub fn registers(&self) -> &'static OutputRegisters {
        &OUTPUT_REGISTERS[self.ix()]
    }
}

/// Q0: NS1 is the first stage (/4, /5, /6), NS2 the 16-bit second stage
/// which divides by twice the stored value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TwoStageRegisters {
    pub ns1: u16,
    pub ns1_mask: u8,
    pub ns2_15_8: u16,
    pub ns2_7_0: u16,
}

/// Q1 - Q3: 18-bit integer N plus 28-bit NFRAC.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FractionalRegisters {
    /// Index into the Q1 - Q3 arrays of [`crate::shadow::Shadow`] and
    /// [`crate::divider::Dividers`].
    pub slot: usize,
    pub n_17_16: u16,
    pub n_17_16_mask: u8,
    pub n_15_8: u16,
    pub n_7_0: u16,
    pub nfrac_27_24: u16,
    pub nfrac_27_24_mask: u8,
    pub nfrac_23_16: u16,
    pub nfrac_15_8: u16,
    pub nfrac_7_0: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DividerRegisters {
    TwoStage(TwoStageRegisters),
    Fractional(FractionalRegisters),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OutputRegisters {
    pub enable: OutputEnableBits,
    pub disable: OutputDisableBits,
    pub divider: DividerRegisters,
}

const fn fractional(slot: usize, n: u16, nfrac: u16) -> DividerRegisters {
    DividerRegisters::Fractional(FractionalRegisters {
        slot,
        n_17_16: n,
        n_17_16_mask: 0x03,
        n_15_8: n + 1,
        n_7_0: n + 2,
        nfrac_27_24: nfrac,
        nfrac_27_24_mask: 0x0f,
        nfrac_23_16: nfrac + 1,
        nfrac_15_8: nfrac + 2,
        nfrac_7_0: nfrac + 3,
    })
}

static OUTPUT_REGISTERS: [OutputRegisters; 4] = [
    OutputRegisters {
        enable: OutputEnableBits::OUTEN0,
        disable: OutputDisableBits::Q0_DIS,
        divider: DividerRegisters::TwoStage(TwoStageRegisters {
            ns1: 0x3f,
            ns1_mask: 0x03,
            ns2_15_8: 0x40,
            ns2_7_0: 0x41,
        }),
    },
    OutputRegisters {
        enable: OutputEnableBits::OUTEN1,
        disable: OutputDisableBits::Q1_DIS,
        divider: fractional(0, 0x42, 0x57),
    },
    OutputRegisters {
        enable: OutputEnableBits::OUTEN2,
        disable: OutputDisableBits::Q2_DIS,
        divider: fractional(1, 0x45, 0x5b),
    },
    OutputRegisters {
        enable: OutputEnableBits::OUTEN3,
        disable: OutputDisableBits::Q3_DIS,
        divider: fractional(2, 0x48, 0x5f),
    },
];

/// Bit position of the lowest set bit in `mask`.
#[inline]
pub fn field_shift(mask: u8) -> u32 {
    mask.trailing_zeros()
}

/// Place `value` into the bits selected by `mask`, keeping every other bit
/// of `original`.
#[inline]
pub fn merge_field(value: u8, original: u8, mask: u8) -> u8 {
    ((u32::from(value) << field_shift(mask)) as u8 & mask) | (original & !mask)
}

/// Extract the field selected by `mask` from `byte`.
#[inline]
pub fn field_value(byte: u8, mask: u8) -> u8 {
    ((u32::from(byte & mask)) >> field_shift(mask)) as u8
}
