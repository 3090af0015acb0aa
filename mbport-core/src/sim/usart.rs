//! Simulated USART
//!
//! Models the parts of the tinyAVR USART the port layer relies on: the
//! double-buffered transmitter (data register + shift register), the
//! single-byte receive register with overwrite on overrun, the
//! write-one-to-clear transmit-complete flag and the receiver flush on
//! disable.

use heapless::Vec;
use mbport_hal::usart::{ctrla, ctrlb, status};
use mbport_hal::{UsartRegister, UsartRegisters};

/// Bytes kept in the simulated wire log
pub const SIM_WIRE_CAPACITY: usize = 64;

/// Simulated USART peripheral
#[derive(Debug, Clone)]
pub struct SimUsart {
    instance: u8,
    ctrla: u8,
    ctrlb: u8,
    ctrlc: u8,
    status: u8,
    baud: u16,
    baud_writes: usize,
    rx_data: u8,
    tx_buffer: Option<u8>,
    tx_shift: Option<u8>,
    sent: Vec<u8, SIM_WIRE_CAPACITY>,
    overruns: usize,
}

impl SimUsart {
    /// Peripheral in its reset state
    pub fn new(instance: u8) -> Self {
        Self {
            instance,
            ctrla: 0,
            ctrlb: 0,
            ctrlc: 0,
            status: status::DREIF,
            baud: 0,
            baud_writes: 0,
            rx_data: 0,
            tx_buffer: None,
            tx_shift: None,
            sent: Vec::new(),
            overruns: 0,
        }
    }

    /// A byte arrives on the line
    ///
    /// Returns `false` when the receiver is disabled and the byte is lost.
    /// An unread byte is overwritten.
    pub fn receive(&mut self, byte: u8) -> bool {
        if !self.receiver_enabled() {
            return false;
        }
        if self.status & status::RXCIF != 0 {
            self.overruns += 1;
        }
        self.rx_data = byte;
        self.status |= status::RXCIF;
        true
    }

    /// The byte in the shift register finishes leaving the wire
    ///
    /// A buffered byte moves into the shift register; otherwise the
    /// transmit-complete flag is raised.
    pub fn shift_out(&mut self) -> Option<u8> {
        let byte = self.tx_shift.take()?;
        let _ = self.sent.push(byte);

        match self.tx_buffer.take() {
            Some(next) => {
                self.tx_shift = Some(next);
                self.status |= status::DREIF;
            }
            None => self.status |= status::TXCIF,
        }
        Some(byte)
    }

    /// Bytes that have left the wire
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Number of received bytes overwritten before being read
    pub fn overruns(&self) -> usize {
        self.overruns
    }

    /// Number of writes to the baud register
    pub fn baud_writes(&self) -> usize {
        self.baud_writes
    }

    /// Receiver enable bit
    pub fn receiver_enabled(&self) -> bool {
        self.ctrlb & ctrlb::RXEN != 0
    }

    /// Transmitter enable bit
    pub fn transmitter_enabled(&self) -> bool {
        self.ctrlb & ctrlb::TXEN != 0
    }

    /// Receive complete interrupt requested
    pub fn rxc_pending(&self) -> bool {
        self.status & status::RXCIF != 0 && self.ctrla & ctrla::RXCIE != 0
    }

    /// Data register empty interrupt requested
    pub fn dre_pending(&self) -> bool {
        self.status & status::DREIF != 0 && self.ctrla & ctrla::DREIE != 0
    }

    /// Transmit complete interrupt requested
    pub fn txc_pending(&self) -> bool {
        self.status & status::TXCIF != 0 && self.ctrla & ctrla::TXCIE != 0
    }
}

impl UsartRegisters for SimUsart {
    fn instance(&self) -> u8 {
        self.instance
    }

    fn read(&self, reg: UsartRegister) -> u8 {
        match reg {
            UsartRegister::CtrlA => self.ctrla,
            UsartRegister::CtrlB => self.ctrlb,
            UsartRegister::CtrlC => self.ctrlc,
            UsartRegister::Status => self.status,
        }
    }

    fn write(&mut self, reg: UsartRegister, value: u8) {
        match reg {
            UsartRegister::CtrlA => self.ctrla = value,
            UsartRegister::CtrlB => {
                if value & ctrlb::RXEN == 0 {
                    // Disabling the receiver flushes the receive buffer
                    self.status &= !status::RXCIF;
                }
                self.ctrlb = value;
            }
            UsartRegister::CtrlC => self.ctrlc = value,
            UsartRegister::Status => self.status &= !(value & status::TXCIF),
        }
    }

    fn write_baud(&mut self, divisor: u16) {
        self.baud = divisor;
        self.baud_writes += 1;
    }

    fn read_baud(&self) -> u16 {
        self.baud
    }

    fn write_tx_data(&mut self, byte: u8) {
        if !self.transmitter_enabled() {
            return;
        }

        if self.tx_shift.is_none() {
            self.tx_shift = Some(byte);
        } else {
            // Overwrites a full buffer, as writing to a busy register does
            self.tx_buffer = Some(byte);
            self.status &= !status::DREIF;
        }
    }

    fn read_rx_data(&mut self) -> u8 {
        self.status &= !status::RXCIF;
        self.rx_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> SimUsart {
        let mut usart = SimUsart::new(0);
        usart.write(UsartRegister::CtrlB, ctrlb::RXEN | ctrlb::TXEN);
        usart
    }

    #[test]
    fn test_transmitter_double_buffer() {
        let mut usart = enabled();

        usart.write_tx_data(1);
        // Moved straight into the shift register
        assert_ne!(usart.read(UsartRegister::Status) & status::DREIF, 0);

        usart.write_tx_data(2);
        assert_eq!(usart.read(UsartRegister::Status) & status::DREIF, 0);

        assert_eq!(usart.shift_out(), Some(1));
        assert_ne!(usart.read(UsartRegister::Status) & status::DREIF, 0);
        assert_eq!(usart.read(UsartRegister::Status) & status::TXCIF, 0);

        assert_eq!(usart.shift_out(), Some(2));
        assert_ne!(usart.read(UsartRegister::Status) & status::TXCIF, 0);
        assert_eq!(usart.shift_out(), None);
        assert_eq!(usart.sent(), &[1, 2]);
    }

    #[test]
    fn test_txcif_write_one_to_clear() {
        let mut usart = enabled();
        usart.write_tx_data(1);
        usart.shift_out();

        usart.write(UsartRegister::Status, status::RXCIF | status::DREIF);
        assert_ne!(usart.read(UsartRegister::Status) & status::TXCIF, 0);

        usart.write(UsartRegister::Status, status::TXCIF);
        assert_eq!(usart.read(UsartRegister::Status) & status::TXCIF, 0);
        assert_ne!(usart.read(UsartRegister::Status) & status::DREIF, 0);
    }

    #[test]
    fn test_receive_overrun_and_flush() {
        let mut usart = enabled();
        usart.receive(1);
        usart.receive(2);
        assert_eq!(usart.overruns(), 1);
        assert_eq!(usart.read_rx_data(), 2);

        usart.receive(3);
        usart.write(UsartRegister::CtrlB, ctrlb::TXEN);
        assert_eq!(usart.read(UsartRegister::Status) & status::RXCIF, 0);
        assert!(!usart.receive(4));
    }

    #[test]
    fn test_writes_ignored_with_transmitter_off() {
        let mut usart = SimUsart::new(0);
        usart.write_tx_data(9);
        assert_eq!(usart.shift_out(), None);
        assert!(usart.sent().is_empty());
    }
}
