//! mbport Hardware Abstraction Layer
//!
//! This crate defines the register-level traits that a chip-specific HAL
//! implements so the board-agnostic transport and timer in `mbport-core`
//! can drive it. The traits model the peripheral register file directly
//! rather than a high-level driver API: the port layer's correctness depends
//! on exactly which bits are flipped and in which order.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Modbus RTU engine (external)           │
//! └─────────────────────────────────────────┘
//!                     │  ▲ callbacks
//!                     ▼  │
//! ┌─────────────────────────────────────────┐
//! │  mbport-core (transport, timer, port)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  mbport-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ mbport-hal-   │       │ mbport-core   │
//! │   tinyavr     │       │   ::sim       │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`usart::UsartRegisters`] - USART control, status, baud and data registers
//! - [`timer::TimerRegisters`] - 16-bit counter with period and overflow interrupt

#![no_std]
#![deny(unsafe_code)]

pub mod timer;
pub mod usart;

// Re-export key traits at crate root for convenience
pub use timer::{TimerPrescaler, TimerRegister, TimerRegisters};
pub use usart::{DataBits, Parity, UsartRegister, UsartRegisters};
