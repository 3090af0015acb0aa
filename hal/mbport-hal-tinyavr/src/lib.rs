//! tinyAVR 0/1/2-series backend for mbport
//!
//! Memory-mapped implementations of [`mbport_hal::UsartRegisters`] and
//! [`mbport_hal::TimerRegisters`] for the USART and TCA0 peripherals, plus
//! the board constants generated from `port.toml`.
//!
//! Peripherals are claimed once through [`Usart::take`] and [`Tca0::take`].
//! Interrupt vectors forward to the port stored in an
//! [`mbport_core::PortCell`]:
//!
//! ```ignore
//! static PORT: PortCell<BoardPort<Engine>> = PortCell::new();
//!
//! #[avr_device::interrupt(attiny1624)]
//! fn USART0_RXC() {
//!     PORT.dispatch(Interrupt::UsartReceiveComplete);
//! }
//!
//! #[avr_device::interrupt(attiny1624)]
//! fn TCA0_OVF() {
//!     PORT.dispatch(Interrupt::TimerOverflow);
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod tca;
pub mod usart;

mod claim;

pub use board::{
    build_port, build_port_with_direction, BoardError, BoardPort, BAUD_REFERENCE_HZ, PORT_CONFIG,
    TIMER_CLOCK, USART_INSTANCE,
};
pub use tca::Tca0;
pub use usart::{Usart, UsartInstance};
