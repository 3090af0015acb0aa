//! Interrupt-driven serial transport
//!
//! Byte-granular transmit/receive over one USART. Direction gating is done
//! entirely through the interrupt masks: the transmitter enable bit is set
//! once and left alone so that no in-flight bit is ever cut off.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use mbport_hal::usart::{ctrla, ctrlb, ctrlc, status};
use mbport_hal::{DataBits, Parity, UsartRegister, UsartRegisters};

/// Receiver oversampling factor in normal asynchronous mode
pub const BAUD_OVERSAMPLING: u32 = 16;

/// Errors reported by [`SerialTransport::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// Requested port number is not the bound USART instance
    UnknownPort(u8),
    /// Baud rate is zero or yields a divisor outside the 16-bit register
    InvalidBaudRate(u32),
    /// Only 7 and 8 data bits are supported
    UnsupportedDataBits(u8),
    /// Baud reference clock does not fit in 32 bits
    ClockOutOfRange,
    /// Transceiver direction pin could not be driven
    Direction,
}

/// Compute the baud register value for a rate and baud reference clock
///
/// `divisor = clock_hz / (baud_rate * 16) - 1`
pub const fn baud_divisor(baud_rate: u32, clock_hz: u32) -> Result<u16, SerialError> {
    if baud_rate == 0 {
        return Err(SerialError::InvalidBaudRate(baud_rate));
    }

    let quotient = clock_hz as u64 / (baud_rate as u64 * BAUD_OVERSAMPLING as u64);
    if quotient == 0 || quotient - 1 > u16::MAX as u64 {
        return Err(SerialError::InvalidBaudRate(baud_rate));
    }

    Ok((quotient - 1) as u16)
}

/// Placeholder for transports without a transceiver direction line
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirection;

impl ErrorType for NoDirection {
    type Error = Infallible;
}

impl OutputPin for NoDirection {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Serial transport over a USART register file
///
/// An optional direction pin drives an RS-485 transceiver: high while
/// transmitting, low while listening. The pin is released only once the
/// transmit-complete interrupt reports that the last byte left the wire.
pub struct SerialTransport<U, D = NoDirection> {
    usart: U,
    direction: Option<D>,
    /// Reference clock the baud divisor is derived from
    baud_clock_hz: u32,
    /// A byte was loaded and its transmit-complete has not been seen yet
    tx_started: bool,
}

impl<U: UsartRegisters> SerialTransport<U, NoDirection> {
    /// Create a transport without direction control
    pub fn new(usart: U, baud_clock_hz: u32) -> Self {
        Self {
            usart,
            direction: None,
            baud_clock_hz,
            tx_started: false,
        }
    }
}

impl<U: UsartRegisters, D: OutputPin> SerialTransport<U, D> {
    /// Create a transport that drives a transceiver direction pin
    pub fn with_direction(usart: U, baud_clock_hz: u32, pin: D) -> Self {
        Self {
            usart,
            direction: Some(pin),
            baud_clock_hz,
            tx_started: false,
        }
    }

    /// Initialize from the raw values the protocol engine passes
    ///
    /// Validates everything before the first register write, so a rejected
    /// configuration leaves the peripheral untouched.
    pub fn init(
        &mut self,
        port: u8,
        baud_rate: u32,
        data_bits: u8,
        parity: Parity,
    ) -> Result<(), SerialError> {
        if port != self.usart.instance() {
            #[cfg(feature = "defmt")]
            defmt::warn!("serial port {} is not bound (usart{})", port, self.usart.instance());
            return Err(SerialError::UnknownPort(port));
        }

        let data_bits =
            DataBits::try_from(data_bits).map_err(SerialError::UnsupportedDataBits)?;
        self.configure(baud_rate, data_bits, parity)
    }

    /// Program baud rate and frame format, then disable both directions
    ///
    /// The direction pin is driven to receive before any register write, so
    /// a failing pin leaves the peripheral untouched.
    pub fn configure(
        &mut self,
        baud_rate: u32,
        data_bits: DataBits,
        parity: Parity,
    ) -> Result<(), SerialError> {
        let divisor = baud_divisor(baud_rate, self.baud_clock_hz)?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "usart{}: {} bps, divisor {}, {} data bits, parity {}",
            self.usart.instance(),
            baud_rate,
            divisor,
            data_bits.bits(),
            parity
        );

        if let Some(pin) = self.direction.as_mut() {
            pin.set_low().map_err(|_| SerialError::Direction)?;
        }
        self.tx_started = false;

        self.usart.write_baud(divisor);
        self.usart.modify(UsartRegister::CtrlC, |v| {
            (v & !(ctrlc::PMODE_MASK | ctrlc::CHSIZE_MASK)) | parity.pmode() | data_bits.chsize()
        });

        self.set_enabled(false, false);
        Ok(())
    }

    /// Gate the receive and transmit directions
    ///
    /// Idempotent; the two directions are independent. Unmasking the
    /// data-register-empty interrupt with an empty transmit buffer makes the
    /// hardware raise it straight away.
    ///
    /// With a direction pin, disabling transmit after bytes were written
    /// leaves the line driven until transmit-complete; if nothing was
    /// written the line is released immediately.
    pub fn set_enabled(&mut self, rx_enable: bool, tx_enable: bool) {
        self.usart.set_bits(UsartRegister::CtrlB, ctrlb::TXEN);

        if rx_enable {
            self.usart.set_bits(UsartRegister::CtrlA, ctrla::RXCIE);
            self.usart.set_bits(UsartRegister::CtrlB, ctrlb::RXEN);
        } else {
            self.usart.clear_bits(UsartRegister::CtrlA, ctrla::RXCIE);
            self.usart.clear_bits(UsartRegister::CtrlB, ctrlb::RXEN);
        }

        // Runs inside engine callbacks: pin errors have nowhere to go
        if tx_enable {
            if let Some(pin) = self.direction.as_mut() {
                let _ = pin.set_high();
                self.usart.clear_bits(UsartRegister::CtrlA, ctrla::TXCIE);
            }
            self.usart.set_bits(UsartRegister::CtrlA, ctrla::DREIE);
        } else {
            self.usart.clear_bits(UsartRegister::CtrlA, ctrla::DREIE);
            if let Some(pin) = self.direction.as_mut() {
                if self.tx_started {
                    // Line is released from the transmit-complete interrupt
                    self.usart.set_bits(UsartRegister::CtrlA, ctrla::TXCIE);
                } else {
                    let _ = pin.set_low();
                    self.usart.clear_bits(UsartRegister::CtrlA, ctrla::TXCIE);
                }
            }
        }
    }

    /// Load one byte for transmission
    ///
    /// Only valid from the transmitter-empty callback, where the data
    /// register is known to be free. No readiness check is made.
    pub fn write_byte(&mut self, byte: u8) {
        if self.direction.is_some() {
            self.usart.write(UsartRegister::Status, status::TXCIF);
            self.tx_started = true;
        }
        self.usart.write_tx_data(byte);
    }

    /// Take the received byte
    ///
    /// Only valid from the byte-received callback.
    pub fn read_byte(&mut self) -> u8 {
        self.usart.read_rx_data()
    }

    /// Handle the transmit-complete interrupt
    ///
    /// Returns the transceiver to receive and masks the interrupt again.
    pub fn on_transmit_complete(&mut self) {
        self.usart.write(UsartRegister::Status, status::TXCIF);
        self.usart.clear_bits(UsartRegister::CtrlA, ctrla::TXCIE);
        self.tx_started = false;
        if let Some(pin) = self.direction.as_mut() {
            // Interrupt context: nowhere to report a pin error
            let _ = pin.set_low();
        }
    }

    /// The attached direction pin, if any
    pub fn direction_pin(&self) -> Option<&D> {
        self.direction.as_ref()
    }

    /// Underlying register file
    pub fn registers(&self) -> &U {
        &self.usart
    }

    /// Underlying register file (mutable)
    pub fn registers_mut(&mut self) -> &mut U {
        &mut self.usart
    }
}
