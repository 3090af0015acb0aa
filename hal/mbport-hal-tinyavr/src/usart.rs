//! USART0/USART1 register block
//!
//! Layout from the tinyAVR 1-series datasheet. The 16-bit BAUD register is
//! written low byte first and read low byte first, as the temporary
//! register in front of it requires.

use core::ptr;

use mbport_hal::{UsartRegister, UsartRegisters};

use crate::claim;

const RXDATAL: usize = 0x00;
const TXDATAL: usize = 0x02;
const STATUS: usize = 0x04;
const CTRLA: usize = 0x05;
const CTRLB: usize = 0x06;
const CTRLC: usize = 0x07;
const BAUDL: usize = 0x08;
const BAUDH: usize = 0x09;

/// USART peripheral instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsartInstance {
    Usart0,
    Usart1,
}

impl UsartInstance {
    /// Base address of the register block
    pub const fn base(self) -> usize {
        match self {
            Self::Usart0 => 0x0800,
            Self::Usart1 => 0x0820,
        }
    }

    /// Port number the protocol engine uses for this instance
    pub const fn number(self) -> u8 {
        match self {
            Self::Usart0 => 0,
            Self::Usart1 => 1,
        }
    }

    /// Instance for a port number
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            0 => Some(Self::Usart0),
            1 => Some(Self::Usart1),
            _ => None,
        }
    }

    const fn claim_mask(self) -> u8 {
        match self {
            Self::Usart0 => claim::USART0,
            Self::Usart1 => claim::USART1,
        }
    }
}

/// Owned USART register block
#[derive(Debug)]
pub struct Usart {
    instance: UsartInstance,
}

impl Usart {
    /// Claim a USART instance
    ///
    /// Returns `None` if the instance was already taken.
    pub fn take(instance: UsartInstance) -> Option<Self> {
        if claim::claim(instance.claim_mask()) {
            Some(Self { instance })
        } else {
            None
        }
    }

    fn reg(&self, offset: usize) -> *mut u8 {
        (self.instance.base() + offset) as *mut u8
    }

    fn offset(reg: UsartRegister) -> usize {
        match reg {
            UsartRegister::CtrlA => CTRLA,
            UsartRegister::CtrlB => CTRLB,
            UsartRegister::CtrlC => CTRLC,
            UsartRegister::Status => STATUS,
        }
    }

    fn read_reg(&self, offset: usize) -> u8 {
        // SAFETY: offset lies inside this instance's register block, which
        // this handle owns
        unsafe { ptr::read_volatile(self.reg(offset)) }
    }

    fn write_reg(&mut self, offset: usize, value: u8) {
        // SAFETY: as in read_reg
        unsafe { ptr::write_volatile(self.reg(offset), value) }
    }
}

impl UsartRegisters for Usart {
    fn instance(&self) -> u8 {
        self.instance.number()
    }

    fn read(&self, reg: UsartRegister) -> u8 {
        self.read_reg(Self::offset(reg))
    }

    fn write(&mut self, reg: UsartRegister, value: u8) {
        self.write_reg(Self::offset(reg), value);
    }

    fn write_baud(&mut self, divisor: u16) {
        let [low, high] = divisor.to_le_bytes();
        self.write_reg(BAUDL, low);
        self.write_reg(BAUDH, high);
    }

    fn read_baud(&self) -> u16 {
        let low = self.read_reg(BAUDL);
        let high = self.read_reg(BAUDH);
        u16::from_le_bytes([low, high])
    }

    fn write_tx_data(&mut self, byte: u8) {
        self.write_reg(TXDATAL, byte);
    }

    fn read_rx_data(&mut self) -> u8 {
        self.read_reg(RXDATAL)
    }
}
