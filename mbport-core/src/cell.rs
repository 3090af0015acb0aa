//! Interrupt-shared home for the port singleton
//!
//! The port is built on the main context, installed once before global
//! interrupts are enabled, and from then on reached only through
//! [`PortCell::with`], which runs inside a critical section. Main-context
//! calls therefore cannot interleave with an interrupt handler's
//! read-modify-write of the same control register.
//!
//! ```ignore
//! static PORT: PortCell<BoardPort<Engine>> = PortCell::new();
//!
//! #[avr_device::interrupt(attiny1624)]
//! fn USART0_RXC() {
//!     PORT.dispatch(Interrupt::UsartReceiveComplete);
//! }
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::digital::OutputPin;
use mbport_hal::{TimerRegisters, UsartRegisters};

use crate::callbacks::FrameCallbacks;
use crate::port::{Interrupt, ModbusPort};

/// Errors from [`PortCell`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortCellError {
    /// A port is already installed
    AlreadyInstalled,
}

/// Static slot holding the one port instance
pub struct PortCell<P> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Option<P>>>,
}

impl<P> Default for PortCell<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PortCell<P> {
    /// Create an empty cell (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install the port; only the first call succeeds
    pub fn install(&self, port: P) -> Result<(), PortCellError> {
        self.inner.lock(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_some() {
                return Err(PortCellError::AlreadyInstalled);
            }
            *slot = Some(port);
            Ok(())
        })
    }

    /// Whether a port has been installed
    pub fn is_installed(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().is_some())
    }

    /// Run `f` with exclusive access to the port
    ///
    /// Returns `None` when nothing is installed, or when called re-entrantly
    /// from inside another `with` (engine callbacks must use the
    /// `PortAccess` they are given instead).
    pub fn with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut P) -> R,
    {
        self.inner.lock(|cell| {
            let mut slot = cell.try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
    }
}

impl<U, T, C, D> PortCell<ModbusPort<U, T, C, D>>
where
    U: UsartRegisters,
    T: TimerRegisters,
    C: FrameCallbacks,
    D: OutputPin,
{
    /// Forward an interrupt to the installed port
    ///
    /// An interrupt that arrives before installation is dropped.
    pub fn dispatch(&self, irq: Interrupt) {
        self.with(|port| port.dispatch(irq));
    }
}
