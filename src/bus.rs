/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Register access over I²C
//!
//! Every transaction is a 16-bit big-endian register address followed by
//! data bytes. Writes are retried with a short randomized backoff, reads
//! are not.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::{debug, error, trace, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::registers::{merge_field, WRITE_BLOCK_SIZE};
use crate::Error;

/// Attempts per transaction, including the first one.
pub const MAX_ATTEMPTS: usize = 5;

const BACKOFF_MIN_US: u32 = 100;
const BACKOFF_MAX_US: u32 = 200;

/// Size of the 16-bit register address space.
const REGISTER_SPACE: usize = 0x1_0000;

pub struct RegisterBus<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    rng: SmallRng,
}

impl<I2C, D, E> RegisterBus<I2C, D>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
    D: DelayUs<u32>,
{
    pub fn new(i2c: I2C, delay: D, address: u8, seed: u64) -> Self {
        RegisterBus {
            i2c,
            delay,
            address,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    pub fn read(&mut self, reg: u16) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &reg.to_be_bytes(), &mut buffer)
            .map_err(Error::Communication)?;
        trace!("I2C<-0x{:04x} : [hex] {:02x}", reg, buffer[0]);
        Ok(buffer[0])
    }

    /// Fills `buffer` from consecutive registers starting at `reg`.
    pub fn read_block(&mut self, reg: u16, buffer: &mut [u8]) -> Result<(), Error<E>> {
        check_span::<E>(reg, buffer.len())?;
        let mut offset = reg;
        for block in buffer.chunks_mut(WRITE_BLOCK_SIZE) {
            self.i2c
                .write_read(self.address, &offset.to_be_bytes(), block)
                .map_err(Error::Communication)?;
            trace!("I2C<-0x{:04x} : [hex] {:02x?}", offset, block);
            offset = offset.wrapping_add(block.len() as u16);
        }
        Ok(())
    }

    pub fn write(&mut self, reg: u16, value: u8) -> Result<(), Error<E>> {
        debug!("I2C->0x{:04x} : [hex] {:02x}", reg, value);
        let [hi, lo] = reg.to_be_bytes();
        let address = self.address;
        self.with_retry(reg, |i2c| i2c.write(address, &[hi, lo, value]))
    }

    /// Writes `values` to consecutive registers starting at `reg`, in
    /// blocks of [`WRITE_BLOCK_SIZE`]. Each block is retried on its own;
    /// the first block that keeps failing aborts the rest.
    pub fn bulk_write(&mut self, reg: u16, values: &[u8]) -> Result<(), Error<E>> {
        check_span::<E>(reg, values.len())?;
        let mut offset = reg;
        let mut frame = [0u8; WRITE_BLOCK_SIZE + 2];
        for block in values.chunks(WRITE_BLOCK_SIZE) {
            debug!(
                "I2C->0x{:04x} : [{} bytes] {:02x?}",
                offset,
                block.len(),
                block
            );
            let len = block.len() + 2;
            frame[..2].copy_from_slice(&offset.to_be_bytes());
            frame[2..len].copy_from_slice(block);
            let address = self.address;
            let frame = &frame[..len];
            self.with_retry(offset, |i2c| i2c.write(address, frame))?;
            offset = offset.wrapping_add(block.len() as u16);
        }
        Ok(())
    }

    /// Writes `value` into the field selected by `mask`, taking every other
    /// bit from `shadow`. Returns the byte written so the caller can keep
    /// its shadow in sync.
    pub fn masked_write(
        &mut self,
        reg: u16,
        value: u8,
        shadow: u8,
        mask: u8,
    ) -> Result<u8, Error<E>> {
        let merged = merge_field(value, shadow, mask);
        self.write(reg, merged)?;
        Ok(merged)
    }

    fn with_retry<F>(&mut self, reg: u16, mut transfer: F) -> Result<(), Error<E>>
    where
        F: FnMut(&mut I2C) -> Result<(), E>,
    {
        let mut attempt = 1;
        loop {
            match transfer(&mut self.i2c) {
                Ok(()) => return Ok(()),
                Err(_) if attempt < MAX_ATTEMPTS => {
                    warn!(
                        "I2C->0x{:04x} : attempt {}/{} failed, retrying",
                        reg, attempt, MAX_ATTEMPTS
                    );
                    self.backoff();
                    attempt += 1;
                }
                Err(e) => return Err(Error::Communication(e)),
            }
        }
    }

    fn backoff(&mut self) {
        let us = self.rng.gen_range(BACKOFF_MIN_US..=BACKOFF_MAX_US);
        self.delay.delay_us(us);
    }

    #[cfg(test)]
    pub(crate) fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    #[cfg(test)]
    pub(crate) fn delay(&mut self) -> &mut D {
        &mut self.delay
    }
}

/// A block transfer must end at or before the last register.
fn check_span<E>(reg: u16, len: usize) -> Result<(), Error<E>> {
    if usize::from(reg) + len > REGISTER_SPACE {
        error!("{} bytes at 0x{:04x} run past the register space", len, reg);
        return Err(Error::InvalidParameter);
    }
    Ok(())
}
