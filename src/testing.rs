/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Simulated 8T49N24x register file for unit tests.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Write, WriteRead};

use crate::registers::ADDRESS;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BusFault;

pub struct FakeChip {
    pub regs: Vec<u8>,
    /// Every write frame that was accepted, address bytes included.
    pub frames: Vec<Vec<u8>>,
    /// Register address of every read transaction.
    pub reads: Vec<u16>,
    pub write_attempts: usize,
    /// Reject the next N write attempts.
    pub fail_writes: usize,
    /// Reject every write once this many frames have been accepted.
    pub fail_after: Option<usize>,
    /// Reject the next N read attempts.
    pub fail_reads: usize,
}

impl FakeChip {
    pub fn new() -> Self {
        FakeChip {
            regs: vec![0; 0x1_0000],
            frames: Vec::new(),
            reads: Vec::new(),
            write_attempts: 0,
            fail_writes: 0,
            fail_after: None,
            fail_reads: 0,
        }
    }

    /// Accepted single register writes, in order.
    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.frames
            .iter()
            .filter(|f| f.len() == 3)
            .map(|f| (u16::from_be_bytes([f[0], f[1]]), f[2]))
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.frames.clear();
        self.reads.clear();
        self.write_attempts = 0;
    }
}

impl Write for FakeChip {
    type Error = BusFault;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusFault> {
        assert_eq!(address, ADDRESS);
        self.write_attempts += 1;
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(BusFault);
        }
        if let Some(n) = self.fail_after {
            if self.frames.len() >= n {
                return Err(BusFault);
            }
        }
        let reg = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]));
        self.regs[reg..reg + bytes.len() - 2].copy_from_slice(&bytes[2..]);
        self.frames.push(bytes.to_vec());
        Ok(())
    }
}

impl WriteRead for FakeChip {
    type Error = BusFault;

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), BusFault> {
        assert_eq!(address, ADDRESS);
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(BusFault);
        }
        let reg = u16::from_be_bytes([bytes[0], bytes[1]]);
        self.reads.push(reg);
        let reg = usize::from(reg);
        buffer.copy_from_slice(&self.regs[reg..reg + buffer.len()]);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDelay {
    pub waits: Vec<u32>,
}

impl DelayUs<u32> for RecordingDelay {
    fn delay_us(&mut self, us: u32) {
        self.waits.push(us);
    }
}
