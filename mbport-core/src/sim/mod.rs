//! Host-side peripheral simulator
//!
//! Register-accurate stand-ins for the USART, the timer and a GPIO
//! direction line, plus an interrupt controller loop for [`ModbusPort`].
//! Interrupts are level-triggered as on the real part: a source stays
//! pending while its flag and mask are both set.

mod timer;
mod usart;

pub use timer::SimTimer;
pub use usart::{SimUsart, SIM_WIRE_CAPACITY};

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use heapless::Vec;

use crate::callbacks::FrameCallbacks;
use crate::port::{Interrupt, ModbusPort};
use crate::serial::NoDirection;

/// Port over simulated peripherals
pub type SimPort<C, D = NoDirection> = ModbusPort<SimUsart, SimTimer, C, D>;

/// Simulated output pin
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    high: bool,
    transitions: usize,
}

impl SimPin {
    /// Pin starting low
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the pin is driven high
    pub fn is_set_high(&self) -> bool {
        self.high
    }

    /// Number of level changes so far
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    fn drive(&mut self, high: bool) {
        if self.high != high {
            self.transitions += 1;
        }
        self.high = high;
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

/// Vector priority order (lower vector number first)
const PRIORITY: [Interrupt; 4] = [
    Interrupt::TimerOverflow,
    Interrupt::UsartReceiveComplete,
    Interrupt::UsartDataRegisterEmpty,
    Interrupt::UsartTransmitComplete,
];

impl<C, D> ModbusPort<SimUsart, SimTimer, C, D>
where
    C: FrameCallbacks,
    D: OutputPin,
{
    /// Whether a source is currently requesting service
    pub fn is_pending(&self, irq: Interrupt) -> bool {
        let hw = self.peripherals();
        let usart = hw.serial().registers();
        match irq {
            Interrupt::UsartReceiveComplete => usart.rxc_pending(),
            Interrupt::UsartDataRegisterEmpty => usart.dre_pending(),
            Interrupt::UsartTransmitComplete => usart.txc_pending(),
            Interrupt::TimerOverflow => hw.timer().registers().overflow_pending(),
        }
    }

    /// All sources currently requesting service, in priority order
    pub fn pending_interrupts(&self) -> Vec<Interrupt, 4> {
        let mut pending = Vec::new();
        for irq in PRIORITY {
            if self.is_pending(irq) {
                let _ = pending.push(irq);
            }
        }
        pending
    }

    /// Run one pass of the interrupt controller
    ///
    /// Each source is checked once in priority order and serviced if it is
    /// pending at that moment, so a handler that raises another source (for
    /// instance by unmasking the transmitter) gets it serviced in the same
    /// pass. Returns the number of handlers run.
    pub fn service_interrupts(&mut self) -> usize {
        let mut serviced = 0;
        for irq in PRIORITY {
            if self.is_pending(irq) {
                self.dispatch(irq);
                serviced += 1;
            }
        }
        serviced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::PortAccess;
    use crate::serial::SerialTransport;
    use crate::timer::{TimeoutTimer, TimerClock};
    use mbport_hal::{Parity, TimerPrescaler};

    struct Idle;

    impl FrameCallbacks for Idle {
        fn on_byte_received(&mut self, port: &mut dyn PortAccess) {
            let _ = port.serial_get_byte();
        }

        fn on_transmitter_empty(&mut self, port: &mut dyn PortAccess) {
            port.serial_set_enabled(true, false);
        }

        fn on_timer_expired(&mut self, _port: &mut dyn PortAccess) {}
    }

    #[test]
    fn test_pending_in_priority_order() {
        let serial = SerialTransport::new(SimUsart::new(0), 1_843_200);
        let timer = TimeoutTimer::new(
            SimTimer::new(),
            TimerClock::from_counts(TimerPrescaler::Div16, 1),
        );
        let mut port: SimPort<Idle> = ModbusPort::new(serial, timer, Idle);
        port.serial_init(0, 9600, 8, Parity::None).unwrap();
        port.timers_init(1).unwrap();

        port.serial_set_enabled(true, true);
        port.timers_enable();
        port.peripherals_mut().serial_mut().registers_mut().receive(7);
        port.peripherals_mut().timer_mut().registers_mut().advance(1);

        assert_eq!(
            port.pending_interrupts().as_slice(),
            &[
                Interrupt::TimerOverflow,
                Interrupt::UsartReceiveComplete,
                Interrupt::UsartDataRegisterEmpty,
            ]
        );

        assert_eq!(port.service_interrupts(), 3);
        assert!(port.pending_interrupts().is_empty());
    }

    #[test]
    fn test_sim_pin_counts_transitions() {
        let mut pin = SimPin::new();
        pin.set_high().unwrap();
        pin.set_high().unwrap();
        pin.set_low().unwrap();
        assert_eq!(pin.transitions(), 2);
        assert!(!pin.is_set_high());
    }
}
