//! Board constants and port construction
//!
//! `PORT_CONFIG` and `USART_INSTANCE` come from `port.toml` via the build
//! script. The assertions below reject at compile time any configuration
//! whose baud divisor or timer clock would not be representable.

use embedded_hal::digital::OutputPin;
use mbport_core::{
    FrameCallbacks, ModbusPort, NoDirection, SerialError, SerialTransport, TimeoutTimer, TimerClock,
    TimerError,
};

use crate::tca::Tca0;
use crate::usart::{Usart, UsartInstance};

include!(concat!(env!("OUT_DIR"), "/board_config.rs"));

const _: () = assert!(PORT_CONFIG.baud_divisor().is_ok(), "baud rate unreachable");

/// USART baud reference clock for this board
pub const BAUD_REFERENCE_HZ: u32 = match PORT_CONFIG.baud_reference_hz() {
    Ok(hz) => hz,
    Err(_) => panic!("baud reference clock out of range"),
};
const _: () = assert!(PORT_CONFIG.node_address_valid(), "node address out of range");

/// Timeout timer clock for this board
pub const TIMER_CLOCK: TimerClock = match PORT_CONFIG.timer_clock() {
    Ok(clock) => clock,
    Err(_) => panic!("timer clock has no counts per 50us tick"),
};

/// Port over this board's USART and TCA0
pub type BoardPort<C, D = NoDirection> = ModbusPort<Usart, Tca0, C, D>;

/// Board bring-up failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoardError {
    /// USART instance already claimed
    UsartTaken(UsartInstance),
    /// TCA0 already claimed
    TimerTaken,
    /// Serial setup rejected the line settings
    Serial(SerialError),
    /// Timer setup rejected the inter-frame timeout
    Timer(TimerError),
}

impl From<SerialError> for BoardError {
    fn from(e: SerialError) -> Self {
        BoardError::Serial(e)
    }
}

impl From<TimerError> for BoardError {
    fn from(e: TimerError) -> Self {
        BoardError::Timer(e)
    }
}

/// Claim the peripherals and build the port
///
/// The returned port is initialized: serial configured from `PORT_CONFIG`
/// with both directions off, and the timer loaded with the t3.5 timeout.
pub fn build_port<C: FrameCallbacks>(engine: C) -> Result<BoardPort<C>, BoardError> {
    let usart = Usart::take(USART_INSTANCE).ok_or(BoardError::UsartTaken(USART_INSTANCE))?;
    let serial = SerialTransport::new(usart, BAUD_REFERENCE_HZ);
    finish(serial, engine)
}

/// Like [`build_port`], with an RS-485 driver-enable pin
pub fn build_port_with_direction<C, D>(engine: C, pin: D) -> Result<BoardPort<C, D>, BoardError>
where
    C: FrameCallbacks,
    D: OutputPin,
{
    let usart = Usart::take(USART_INSTANCE).ok_or(BoardError::UsartTaken(USART_INSTANCE))?;
    let serial = SerialTransport::with_direction(usart, BAUD_REFERENCE_HZ, pin);
    finish(serial, engine)
}

fn finish<C, D>(serial: SerialTransport<Usart, D>, engine: C) -> Result<BoardPort<C, D>, BoardError>
where
    C: FrameCallbacks,
    D: OutputPin,
{
    let tca = Tca0::take().ok_or(BoardError::TimerTaken)?;
    let timer = TimeoutTimer::new(tca, TIMER_CLOCK);
    let mut port = ModbusPort::new(serial, timer, engine);

    port.serial_init(
        USART_INSTANCE.number(),
        PORT_CONFIG.baud_rate,
        PORT_CONFIG.data_bits.bits(),
        PORT_CONFIG.parity,
    )?;
    port.timers_init(PORT_CONFIG.rtu_t35_ticks())?;

    #[cfg(feature = "defmt")]
    defmt::info!(
        "mbport: node {} at {} baud, t3.5 = {} ticks",
        PORT_CONFIG.node_address,
        PORT_CONFIG.baud_rate,
        PORT_CONFIG.rtu_t35_ticks()
    );

    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_board_timer_clock() {
        // 16 MHz / 6 / 16 = 166.67 kHz, 8 counts per 50µs
        assert_eq!(PORT_CONFIG.timer_prescaler.divisor(), 16);
        assert_eq!(TIMER_CLOCK.counts_per_tick(), 8);
    }

    #[test]
    fn test_reference_board_baud_divisor() {
        // 64 * 16 MHz / 6 / (16 * 19200) - 1
        assert_eq!(BAUD_REFERENCE_HZ, 170_666_666);
        assert_eq!(PORT_CONFIG.baud_divisor(), Ok(554));
    }

    #[test]
    fn test_t35_timeout_fits_timer() {
        assert!(TIMER_CLOCK.period_for(PORT_CONFIG.rtu_t35_ticks()).is_ok());
    }
}
