//! TCA0 register block (single-slope, 16-bit mode)

use core::ptr;

use mbport_hal::{TimerRegister, TimerRegisters};

use crate::claim;

const BASE: usize = 0x0A00;

const CTRLA: usize = 0x00;
const CTRLB: usize = 0x01;
const CTRLC: usize = 0x02;
const INTCTRL: usize = 0x0A;
const INTFLAGS: usize = 0x0B;
const CNTL: usize = 0x20;
const CNTH: usize = 0x21;
const PERL: usize = 0x26;
const PERH: usize = 0x27;

/// Owned TCA0 register block
#[derive(Debug)]
pub struct Tca0 {
    _private: (),
}

impl Tca0 {
    /// Claim TCA0
    ///
    /// Returns `None` if it was already taken.
    pub fn take() -> Option<Self> {
        if claim::claim(claim::TCA0) {
            Some(Self { _private: () })
        } else {
            None
        }
    }

    fn offset(reg: TimerRegister) -> usize {
        match reg {
            TimerRegister::CtrlA => CTRLA,
            TimerRegister::CtrlB => CTRLB,
            TimerRegister::CtrlC => CTRLC,
            TimerRegister::IntCtrl => INTCTRL,
            TimerRegister::IntFlags => INTFLAGS,
        }
    }

    fn read_reg(&self, offset: usize) -> u8 {
        // SAFETY: offset lies inside the TCA0 block, which this handle owns
        unsafe { ptr::read_volatile((BASE + offset) as *const u8) }
    }

    fn write_reg(&mut self, offset: usize, value: u8) {
        // SAFETY: as in read_reg
        unsafe { ptr::write_volatile((BASE + offset) as *mut u8, value) }
    }

    // 16-bit registers go through the shared TEMP register: low byte first
    // on both read and write.
    fn write_wide(&mut self, low: usize, high: usize, value: u16) {
        let [l, h] = value.to_le_bytes();
        self.write_reg(low, l);
        self.write_reg(high, h);
    }

    fn read_wide(&self, low: usize, high: usize) -> u16 {
        let l = self.read_reg(low);
        let h = self.read_reg(high);
        u16::from_le_bytes([l, h])
    }
}

impl TimerRegisters for Tca0 {
    fn read(&self, reg: TimerRegister) -> u8 {
        self.read_reg(Self::offset(reg))
    }

    fn write(&mut self, reg: TimerRegister, value: u8) {
        self.write_reg(Self::offset(reg), value);
    }

    fn write_period(&mut self, period: u16) {
        self.write_wide(PERL, PERH, period);
    }

    fn read_period(&self) -> u16 {
        self.read_wide(PERL, PERH)
    }

    fn write_count(&mut self, count: u16) {
        self.write_wide(CNTL, CNTH, count);
    }

    fn read_count(&self) -> u16 {
        self.read_wide(CNTL, CNTH)
    }
}
