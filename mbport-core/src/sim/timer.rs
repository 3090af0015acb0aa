//! Simulated 16-bit timer
//!
//! Counts prescaled clocks from zero to PER and sets the overflow flag on
//! the wrap back to zero, so one period is `PER + 1` counts.

use mbport_hal::timer::{ctrla, intctrl, intflags};
use mbport_hal::{TimerRegister, TimerRegisters};

/// Simulated timer peripheral
#[derive(Debug, Clone)]
pub struct SimTimer {
    ctrla: u8,
    ctrlb: u8,
    ctrlc: u8,
    intctrl: u8,
    intflags: u8,
    count: u16,
    period: u16,
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTimer {
    /// Peripheral in its reset state
    pub fn new() -> Self {
        Self {
            ctrla: 0,
            ctrlb: 0,
            ctrlc: 0,
            intctrl: 0,
            intflags: 0,
            count: 0,
            period: 0xFFFF,
        }
    }

    /// Counter enable bit
    pub fn is_running(&self) -> bool {
        self.ctrla & ctrla::ENABLE != 0
    }

    /// Overflow interrupt requested
    pub fn overflow_pending(&self) -> bool {
        self.intflags & intflags::OVF != 0 && self.intctrl & intctrl::OVF != 0
    }

    /// Let `counts` prescaled clocks elapse
    pub fn advance(&mut self, counts: u32) {
        if !self.is_running() {
            return;
        }

        let mut count = self.count as u64;
        let mut remaining = counts as u64;
        let top = self.period as u64;

        // Counter above TOP runs on to 0xFFFF before wrapping
        if count > top {
            let to_wrap = 0x1_0000 - count;
            if remaining < to_wrap {
                self.count = (count + remaining) as u16;
                return;
            }
            remaining -= to_wrap;
            count = 0;
            self.intflags |= intflags::OVF;
        }

        let to_overflow = top - count + 1;
        if remaining >= to_overflow {
            self.intflags |= intflags::OVF;
            count = (remaining - to_overflow) % (top + 1);
        } else {
            count += remaining;
        }
        self.count = count as u16;
    }
}

impl TimerRegisters for SimTimer {
    fn read(&self, reg: TimerRegister) -> u8 {
        match reg {
            TimerRegister::CtrlA => self.ctrla,
            TimerRegister::CtrlB => self.ctrlb,
            TimerRegister::CtrlC => self.ctrlc,
            TimerRegister::IntCtrl => self.intctrl,
            TimerRegister::IntFlags => self.intflags,
        }
    }

    fn write(&mut self, reg: TimerRegister, value: u8) {
        match reg {
            TimerRegister::CtrlA => self.ctrla = value,
            TimerRegister::CtrlB => self.ctrlb = value,
            TimerRegister::CtrlC => self.ctrlc = value,
            TimerRegister::IntCtrl => self.intctrl = value,
            TimerRegister::IntFlags => self.intflags &= !value,
        }
    }

    fn write_period(&mut self, period: u16) {
        self.period = period;
    }

    fn read_period(&self) -> u16 {
        self.period
    }

    fn write_count(&mut self, count: u16) {
        self.count = count;
    }

    fn read_count(&self) -> u16 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(period: u16) -> SimTimer {
        let mut timer = SimTimer::new();
        timer.write_period(period);
        timer.write(TimerRegister::CtrlA, ctrla::ENABLE);
        timer
    }

    #[test]
    fn test_stopped_timer_does_not_count() {
        let mut timer = SimTimer::new();
        timer.advance(10);
        assert_eq!(timer.read_count(), 0);
    }

    #[test]
    fn test_overflow_after_period_plus_one() {
        let mut timer = running(9);
        timer.advance(9);
        assert_eq!(timer.read_count(), 9);
        assert_eq!(timer.read(TimerRegister::IntFlags), 0);

        timer.advance(1);
        assert_eq!(timer.read_count(), 0);
        assert_eq!(timer.read(TimerRegister::IntFlags), intflags::OVF);
    }

    #[test]
    fn test_multiple_wraps() {
        let mut timer = running(9);
        timer.advance(25);
        assert_eq!(timer.read_count(), 5);
        assert_ne!(timer.read(TimerRegister::IntFlags) & intflags::OVF, 0);
    }

    #[test]
    fn test_count_above_top_wraps_at_max() {
        let mut timer = running(9);
        timer.write_count(0xFFFE);
        timer.advance(1);
        assert_eq!(timer.read_count(), 0xFFFF);
        timer.advance(1);
        assert_eq!(timer.read_count(), 0);
        assert_ne!(timer.read(TimerRegister::IntFlags) & intflags::OVF, 0);
    }

    #[test]
    fn test_flag_needs_mask_to_be_pending() {
        let mut timer = running(0);
        timer.advance(1);
        assert!(!timer.overflow_pending());
        timer.write(TimerRegister::IntCtrl, intctrl::OVF);
        assert!(timer.overflow_pending());
        timer.write(TimerRegister::IntFlags, intflags::OVF);
        assert!(!timer.overflow_pending());
    }
}
