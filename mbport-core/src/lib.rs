//! Board-agnostic Modbus RTU port layer
//!
//! Turns a USART and a 16-bit timer into the primitives a Modbus RTU
//! protocol engine runs on, and turns their interrupts back into engine
//! callbacks:
//!
//! - [`serial::SerialTransport`] - byte-wise, interrupt-driven transmit and
//!   receive with half-duplex gating through the interrupt masks
//! - [`timer::TimeoutTimer`] - single-shot timeout in 50µs ticks
//! - [`port::ModbusPort`] - both peripherals plus the engine's
//!   [`callbacks::FrameCallbacks`], with per-vector interrupt entry points
//! - [`cell::PortCell`] - `static` home for the port shared with interrupt
//!   handlers
//! - [`config::PortConfig`] - build-time baud, frame and clock settings
//!
//! Frame assembly, CRC and function codes belong to the engine.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod callbacks;
pub mod cell;
pub mod config;
pub mod port;
pub mod serial;
pub mod timer;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use callbacks::{FrameCallbacks, PortAccess};
pub use cell::{PortCell, PortCellError};
pub use config::PortConfig;
pub use port::{Interrupt, ModbusPort, PortPeripherals};
pub use serial::{NoDirection, SerialError, SerialTransport};
pub use timer::{TimeoutTimer, TimerClock, TimerError, TimerState};

pub use mbport_hal::{DataBits, Parity, TimerPrescaler};
