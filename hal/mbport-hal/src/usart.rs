//! USART register abstractions
//!
//! The register model follows the tinyAVR 0/1/2-series USART: three 8-bit
//! control registers, a status register with write-one-to-clear flags, a
//! 16-bit baud register and separate transmit/receive data registers.
//! Bit positions are provided as constants so that implementations (real or
//! simulated) agree on the layout.

/// Control register A: interrupt enables
pub mod ctrla {
    /// Receive complete interrupt enable
    pub const RXCIE: u8 = 1 << 7;
    /// Transmit complete interrupt enable
    pub const TXCIE: u8 = 1 << 6;
    /// Data register empty interrupt enable
    pub const DREIE: u8 = 1 << 5;
}

/// Control register B: receiver/transmitter enables
pub mod ctrlb {
    /// Receiver enable
    pub const RXEN: u8 = 1 << 7;
    /// Transmitter enable
    pub const TXEN: u8 = 1 << 6;
}

/// Control register C: frame format
pub mod ctrlc {
    /// Parity mode field mask
    pub const PMODE_MASK: u8 = 0b11 << 4;
    pub const PMODE_DISABLED: u8 = 0b00 << 4;
    pub const PMODE_EVEN: u8 = 0b10 << 4;
    pub const PMODE_ODD: u8 = 0b11 << 4;

    /// Character size field mask
    pub const CHSIZE_MASK: u8 = 0b111;
    pub const CHSIZE_7BIT: u8 = 0x02;
    pub const CHSIZE_8BIT: u8 = 0x03;
}

/// Status register flags
///
/// `TXCIF` is cleared by writing a one to it. `RXCIF` is cleared by reading
/// the receive data register and `DREIF` by writing the transmit data register.
pub mod status {
    /// Receive complete
    pub const RXCIF: u8 = 1 << 7;
    /// Transmit complete
    pub const TXCIF: u8 = 1 << 6;
    /// Data register empty
    pub const DREIF: u8 = 1 << 5;
}

/// 8-bit USART registers addressable through [`UsartRegisters`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsartRegister {
    CtrlA,
    CtrlB,
    CtrlC,
    Status,
}

/// USART register file
///
/// Implementations perform plain volatile accesses; no method waits on a
/// flag. Read-modify-write sequences built from [`read`](Self::read) and
/// [`write`](Self::write) are not atomic, which is why every mutating method
/// takes `&mut self`: exclusive access is the caller's synchronization.
pub trait UsartRegisters {
    /// Instance number of the bound peripheral (0 for USART0, ...)
    fn instance(&self) -> u8;

    /// Read an 8-bit register
    fn read(&self, reg: UsartRegister) -> u8;

    /// Write an 8-bit register
    fn write(&mut self, reg: UsartRegister, value: u8);

    /// Write the 16-bit baud divisor
    fn write_baud(&mut self, divisor: u16);

    /// Read back the 16-bit baud divisor
    fn read_baud(&self) -> u16;

    /// Load one byte into the transmit data register
    fn write_tx_data(&mut self, byte: u8);

    /// Take one byte from the receive data register
    fn read_rx_data(&mut self) -> u8;

    /// Read-modify-write a register
    fn modify<F>(&mut self, reg: UsartRegister, f: F)
    where
        F: FnOnce(u8) -> u8,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Set bits in a register
    fn set_bits(&mut self, reg: UsartRegister, mask: u8) {
        self.modify(reg, |v| v | mask);
    }

    /// Clear bits in a register
    fn clear_bits(&mut self, reg: UsartRegister, mask: u8) {
        self.modify(reg, |v| v & !mask);
    }
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataBits {
    Seven,
    Eight,
}

impl DataBits {
    /// CTRLC character size encoding
    pub const fn chsize(self) -> u8 {
        match self {
            DataBits::Seven => ctrlc::CHSIZE_7BIT,
            DataBits::Eight => ctrlc::CHSIZE_8BIT,
        }
    }

    /// Number of bits as an integer
    pub const fn bits(self) -> u8 {
        match self {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    /// The rejected bit count
    type Error = u8;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(other),
        }
    }
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl Parity {
    /// CTRLC parity mode encoding
    pub const fn pmode(self) -> u8 {
        match self {
            Parity::None => ctrlc::PMODE_DISABLED,
            Parity::Even => ctrlc::PMODE_EVEN,
            Parity::Odd => ctrlc::PMODE_ODD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_bits_from_u8() {
        assert_eq!(DataBits::try_from(7), Ok(DataBits::Seven));
        assert_eq!(DataBits::try_from(8), Ok(DataBits::Eight));
        assert_eq!(DataBits::try_from(9), Err(9));
        assert_eq!(DataBits::try_from(0), Err(0));
    }

    #[test]
    fn test_frame_format_fields_do_not_overlap() {
        for parity in [Parity::None, Parity::Even, Parity::Odd] {
            assert_eq!(parity.pmode() & !ctrlc::PMODE_MASK, 0);
        }
        for bits in [DataBits::Seven, DataBits::Eight] {
            assert_eq!(bits.chsize() & !ctrlc::CHSIZE_MASK, 0);
        }
    }
}
