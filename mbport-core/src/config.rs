//! Build-time port configuration
//!
//! Everything here is fixed for the life of the firmware: baud rate, frame
//! format, node address and the clock tree the baud divisor and timer
//! conversion are derived from. Boards produce a `const PortConfig` (see
//! `mbport-hal-tinyavr`'s build script) and feed it to the transport and
//! timer constructors.

use mbport_hal::{DataBits, Parity, TimerPrescaler};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::serial::{baud_divisor, SerialError};
use crate::timer::{TimerClock, TimerError};

/// Baud rates above this use the fixed RTU timeouts
pub const RTU_FIXED_TIMEOUT_BAUD: u32 = 19_200;

/// Fixed t3.5 above 19200 baud, in 50µs ticks (1.75ms)
pub const RTU_T35_FIXED_TICKS: u16 = 35;

/// Fixed t1.5 above 19200 baud, in 50µs ticks (750µs)
pub const RTU_T15_FIXED_TICKS: u16 = 15;

/// Lowest valid Modbus slave address
pub const MIN_NODE_ADDRESS: u8 = 1;

/// Highest valid Modbus slave address
pub const MAX_NODE_ADDRESS: u8 = 247;

/// Port configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortConfig {
    /// Modbus slave address handed to the protocol engine
    pub node_address: u8,
    /// Line speed in bits per second
    pub baud_rate: u32,
    /// Data bits per character
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// CPU oscillator frequency in Hz
    pub cpu_hz: u32,
    /// Main clock prescaler between oscillator and peripherals
    pub main_clock_prescaler: u32,
    /// Timeout timer prescaler
    pub timer_prescaler: TimerPrescaler,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            node_address: 1,
            baud_rate: 19_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            cpu_hz: 16_000_000,
            main_clock_prescaler: 6,
            timer_prescaler: TimerPrescaler::Div16,
        }
    }
}

impl PortConfig {
    /// Peripheral clock after the main prescaler
    pub const fn peripheral_hz(&self) -> u32 {
        if self.main_clock_prescaler == 0 {
            return 0;
        }
        self.cpu_hz / self.main_clock_prescaler
    }

    /// Baud reference clock
    ///
    /// The USART baud register carries 6 fractional bits, so the divisor is
    /// computed against 64 times the peripheral clock.
    pub const fn baud_reference_hz(&self) -> Result<u32, SerialError> {
        if self.main_clock_prescaler == 0 {
            return Err(SerialError::ClockOutOfRange);
        }
        let hz = 64 * self.cpu_hz as u64 / self.main_clock_prescaler as u64;
        if hz > u32::MAX as u64 {
            return Err(SerialError::ClockOutOfRange);
        }
        Ok(hz as u32)
    }

    /// Baud register value for this configuration
    pub const fn baud_divisor(&self) -> Result<u16, SerialError> {
        match self.baud_reference_hz() {
            Ok(hz) => baud_divisor(self.baud_rate, hz),
            Err(e) => Err(e),
        }
    }

    /// Timer clock for this configuration
    pub const fn timer_clock(&self) -> Result<TimerClock, TimerError> {
        TimerClock::new(self.cpu_hz, self.main_clock_prescaler, self.timer_prescaler)
    }

    /// Whether the node address is a valid slave address
    pub const fn node_address_valid(&self) -> bool {
        self.node_address >= MIN_NODE_ADDRESS && self.node_address <= MAX_NODE_ADDRESS
    }

    /// Inter-frame timeout for this baud rate
    pub const fn rtu_t35_ticks(&self) -> u16 {
        rtu_t35_ticks(self.baud_rate)
    }

    /// Inter-character timeout for this baud rate
    pub const fn rtu_t15_ticks(&self) -> u16 {
        rtu_t15_ticks(self.baud_rate)
    }
}

/// Inter-frame (3.5 character) timeout in 50µs ticks
///
/// One RTU character is 11 bits. Above 19200 baud the timeout is fixed at
/// 1750µs; below it is `3.5 * 11 / baud` seconds, i.e. `770000 / baud`
/// ticks.
pub const fn rtu_t35_ticks(baud_rate: u32) -> u16 {
    if baud_rate > RTU_FIXED_TIMEOUT_BAUD {
        return RTU_T35_FIXED_TICKS;
    }
    char_time_ticks(7 * 220_000, 2 * baud_rate as u64)
}

/// Inter-character (1.5 character) timeout in 50µs ticks
pub const fn rtu_t15_ticks(baud_rate: u32) -> u16 {
    if baud_rate > RTU_FIXED_TIMEOUT_BAUD {
        return RTU_T15_FIXED_TICKS;
    }
    char_time_ticks(3 * 220_000, 2 * baud_rate as u64)
}

const fn char_time_ticks(numerator: u64, denominator: u64) -> u16 {
    if denominator == 0 {
        return u16::MAX;
    }
    let ticks = numerator / denominator;
    if ticks > u16::MAX as u64 {
        u16::MAX
    } else {
        ticks as u16
    }
}
