/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Divider calculations
//!
//! f VCO = f PFD × (DSM_INT + DSM_FRAC / 2^21)
//! f OUT = f VCO / (2 × N)
//!
//! where f PFD is the reference, optionally doubled. Only Q2 has derived
//! math so far; the other outputs report [`DividerError::NotImplemented`].

use log::{debug, error};

use crate::registers::Output;

/// Lowest VCO frequency the PLL locks at, Hz
pub const VCO_MIN: u64 = 2_999_997_000;

/// Highest VCO frequency the PLL locks at, Hz
pub const VCO_MAX: u64 = 4_000_004_000;

/// Output dividers that keep the VCO at or just below this give the best
/// jitter, Hz
pub const VCO_OPT: u64 = 3_500_000_000;

pub const MIN_INT_DIVIDER: u64 = 6;

/// Fractional resolution of DSM_FRAC
pub const DSM_FRAC_BITS: u32 = 21;

/// DSM_INT is a 9-bit field.
pub const DSM_INT_MAX: u64 = 0x1ff;

/// N_Qx is an 18-bit field.
pub const N_INT_MAX: u64 = 0x3_ffff;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DividerError {
    NotImplemented(Output),
    NoFrequency,
    NoDivider,
    FeedbackOutOfRange,
    OutputDividerOutOfRange,
}

/// PLL reference input
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reference {
    pub freq: u32,
    pub doubler: bool,
}

impl Reference {
    /// Phase Frequency Detector' frequency
    pub fn pfd(&self) -> u64 {
        u64::from(self.freq) * if self.doubler { 2 } else { 1 }
    }
}

/// Register field values for one frequency-set transaction.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Dividers {
    pub dsm_int: u16,
    pub dsm_frac: u32,
    pub ns1_q0: u8,
    pub ns2_q0: u16,
    /// Q1 - Q3, see [`crate::registers::FractionalRegisters::slot`]. The
    /// stored integer is half the actual divider.
    pub n_int: [u32; 3],
    pub n_frac: [u32; 3],
}

/// Even output divider and the VCO frequency it implies.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VcoDivider {
    pub divider: u64,
    pub vco: u64,
}

/// Finds the even output divider for `freq`.
///
/// Any VCO at or below [`VCO_OPT`] is preferred over one above it, and
/// within either group the highest VCO wins. Candidates are walked from
/// the first even divider that can reach [`VCO_MIN`] upwards.
pub fn find_vco_divider(freq: u32) -> Result<VcoDivider, DividerError> {
    let freq = u64::from(freq);
    if freq == 0 {
        return Err(DividerError::NoDivider);
    }

    let min_div = ((VCO_MIN + freq - 1) / freq + 1) / 2 * 2;
    let min_div = min_div.max(MIN_INT_DIVIDER);
    let max_div = VCO_MAX / (freq * 2) * 2;

    let mut best: Option<VcoDivider> = None;
    let mut is_lower_vco = false;
    for divider in (min_div..=max_div).step_by(2) {
        let vco = freq * divider;
        if vco < VCO_MIN || vco > VCO_MAX {
            continue;
        }
        let best_vco = best.map_or(0, |b| b.vco);
        if vco <= VCO_OPT {
            if vco > best_vco || !is_lower_vco {
                is_lower_vco = true;
                best = Some(VcoDivider { divider, vco });
            }
        } else if !is_lower_vco && vco > best_vco {
            best = Some(VcoDivider { divider, vco });
        }
    }

    best.ok_or(DividerError::NoDivider)
}

/// DSM_INT and DSM_FRAC for `vco / pfd`.
///
/// DSM_FRAC = round((vco mod pfd) × 2^21 / pfd); a fraction that rounds up
/// to 2^21 carries into DSM_INT.
pub fn feedback(vco: u64, pfd: u64) -> Result<(u16, u32), DividerError> {
    if pfd == 0 {
        return Err(DividerError::FeedbackOutOfRange);
    }

    let mut dsm_int = vco / pfd;
    let rem = vco % pfd;
    let mut dsm_frac = ((rem << DSM_FRAC_BITS) + pfd / 2) / pfd;
    if dsm_frac == 1 << DSM_FRAC_BITS {
        dsm_int += 1;
        dsm_frac = 0;
    }

    if dsm_int > DSM_INT_MAX {
        return Err(DividerError::FeedbackOutOfRange);
    }
    Ok((dsm_int as u16, dsm_frac as u32))
}

/// VCO frequency the feedback fields produce, rounded to the nearest Hz.
pub fn vco_frequency(dsm_int: u16, dsm_frac: u32, pfd: u64) -> u64 {
    let frac = (u64::from(dsm_frac) * pfd + (1 << (DSM_FRAC_BITS - 1))) >> DSM_FRAC_BITS;
    u64::from(dsm_int) * pfd + frac
}

/// Computes all dividers for the requested per-output `frequencies`.
pub fn calculate(reference: Reference, frequencies: &[u32; 4]) -> Result<Dividers, DividerError> {
    for &output in [Output::Q0, Output::Q1, Output::Q3].iter() {
        if frequencies[output.ix()] != 0 {
            error!("{:?} divider calculation not implemented", output);
            return Err(DividerError::NotImplemented(output));
        }
    }

    let freq = frequencies[Output::Q2.ix()];
    if freq == 0 {
        error!("Q2 frequency not specified");
        return Err(DividerError::NoFrequency);
    }

    let VcoDivider { divider, vco } = find_vco_divider(freq).map_err(|e| {
        error!("no integer divider in range for {} Hz", freq);
        e
    })?;

    let pfd = reference.pfd();
    let (dsm_int, dsm_frac) = feedback(vco, pfd).map_err(|e| {
        error!("vco {} Hz can not be reached from pfd {} Hz", vco, pfd);
        e
    })?;

    let n_int = divider / 2;
    if n_int > N_INT_MAX {
        error!("output divider {} does not fit N_Q2", divider);
        return Err(DividerError::OutputDividerOutOfRange);
    }

    let mut dividers = Dividers {
        dsm_int,
        dsm_frac,
        ..Dividers::default()
    };
    // The chip doubles the stored value.
    dividers.n_int[1] = n_int as u32;
    dividers.n_frac[1] = 0;

    debug!(
        "Q2 {} Hz: div {}, vco {} Hz, pfd {} Hz, dsm_int {}, dsm_frac {}",
        freq, divider, vco, pfd, dsm_int, dsm_frac
    );
    Ok(dividers)
}

/// Closest rate Q2 can actually produce for a `freq` request.
pub fn achievable_rate(reference: Reference, freq: u32) -> Result<u64, DividerError> {
    let VcoDivider { divider, vco } = find_vco_divider(freq)?;
    let pfd = reference.pfd();
    let (dsm_int, dsm_frac) = feedback(vco, pfd)?;
    let actual = vco_frequency(dsm_int, dsm_frac, pfd);
    Ok((actual + divider / 2) / divider)
}
