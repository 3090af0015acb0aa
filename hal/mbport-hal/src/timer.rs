//! 16-bit timer/counter register abstractions
//!
//! Models a timer in the style of the tinyAVR TCA in single (16-bit) mode:
//! the counter runs from zero up to the period value and raises the
//! overflow flag on the clock after it reaches it, so one overflow takes
//! `PER + 1` prescaled clocks.

/// CTRLA: clock select and enable
pub mod ctrla {
    /// Counter enable
    pub const ENABLE: u8 = 1 << 0;
    /// Clock select field mask
    pub const CLKSEL_MASK: u8 = 0b111 << 1;
}

/// INTCTRL: interrupt enables
pub mod intctrl {
    /// Overflow interrupt enable
    pub const OVF: u8 = 1 << 0;
}

/// INTFLAGS: interrupt flags, write one to clear
pub mod intflags {
    /// Overflow flag
    pub const OVF: u8 = 1 << 0;
    /// All flags, used to acknowledge everything at once
    pub const ALL: u8 = 0xFF;
}

/// 8-bit timer registers addressable through [`TimerRegisters`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerRegister {
    CtrlA,
    CtrlB,
    CtrlC,
    IntCtrl,
    IntFlags,
}

/// Timer register file
pub trait TimerRegisters {
    /// Read an 8-bit register
    fn read(&self, reg: TimerRegister) -> u8;

    /// Write an 8-bit register
    fn write(&mut self, reg: TimerRegister, value: u8);

    /// Write the 16-bit period (TOP) value
    fn write_period(&mut self, period: u16);

    /// Read the 16-bit period value
    fn read_period(&self) -> u16;

    /// Write the 16-bit counter
    fn write_count(&mut self, count: u16);

    /// Read the 16-bit counter
    fn read_count(&self) -> u16;

    /// Read-modify-write a register
    fn modify<F>(&mut self, reg: TimerRegister, f: F)
    where
        F: FnOnce(u8) -> u8,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }
}

/// Timer input clock prescaler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimerPrescaler {
    Div1,
    Div2,
    Div4,
    Div8,
    Div16,
    Div64,
    Div256,
    Div1024,
}

impl TimerPrescaler {
    /// Division factor applied to the peripheral clock
    pub const fn divisor(self) -> u32 {
        match self {
            TimerPrescaler::Div1 => 1,
            TimerPrescaler::Div2 => 2,
            TimerPrescaler::Div4 => 4,
            TimerPrescaler::Div8 => 8,
            TimerPrescaler::Div16 => 16,
            TimerPrescaler::Div64 => 64,
            TimerPrescaler::Div256 => 256,
            TimerPrescaler::Div1024 => 1024,
        }
    }

    /// CTRLA clock select bits (already shifted into position)
    pub const fn clksel(self) -> u8 {
        let code = match self {
            TimerPrescaler::Div1 => 0,
            TimerPrescaler::Div2 => 1,
            TimerPrescaler::Div4 => 2,
            TimerPrescaler::Div8 => 3,
            TimerPrescaler::Div16 => 4,
            TimerPrescaler::Div64 => 5,
            TimerPrescaler::Div256 => 6,
            TimerPrescaler::Div1024 => 7,
        };
        code << 1
    }

    /// Look up a prescaler by its division factor
    pub const fn from_divisor(divisor: u32) -> Option<Self> {
        match divisor {
            1 => Some(TimerPrescaler::Div1),
            2 => Some(TimerPrescaler::Div2),
            4 => Some(TimerPrescaler::Div4),
            8 => Some(TimerPrescaler::Div8),
            16 => Some(TimerPrescaler::Div16),
            64 => Some(TimerPrescaler::Div64),
            256 => Some(TimerPrescaler::Div256),
            1024 => Some(TimerPrescaler::Div1024),
            _ => None,
        }
    }
}
