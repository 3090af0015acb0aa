//! Combined port: transport, timer and the engine they report to

use embedded_hal::digital::OutputPin;
use mbport_hal::{Parity, TimerRegisters, UsartRegisters};

use crate::callbacks::{FrameCallbacks, PortAccess};
use crate::serial::{NoDirection, SerialError, SerialTransport};
use crate::timer::{TimeoutTimer, TimerError};

/// Interrupt sources the port services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    /// USART receive complete
    UsartReceiveComplete,
    /// USART data register empty
    UsartDataRegisterEmpty,
    /// USART transmit complete (direction control only)
    UsartTransmitComplete,
    /// Timeout timer overflow
    TimerOverflow,
}

/// The two peripherals behind the port
pub struct PortPeripherals<U, T, D = NoDirection> {
    serial: SerialTransport<U, D>,
    timer: TimeoutTimer<T>,
}

impl<U, T, D> PortPeripherals<U, T, D> {
    /// Serial transport
    pub fn serial(&self) -> &SerialTransport<U, D> {
        &self.serial
    }

    /// Serial transport (mutable)
    pub fn serial_mut(&mut self) -> &mut SerialTransport<U, D> {
        &mut self.serial
    }

    /// Timeout timer
    pub fn timer(&self) -> &TimeoutTimer<T> {
        &self.timer
    }

    /// Timeout timer (mutable)
    pub fn timer_mut(&mut self) -> &mut TimeoutTimer<T> {
        &mut self.timer
    }
}

impl<U, T, D> PortAccess for PortPeripherals<U, T, D>
where
    U: UsartRegisters,
    T: TimerRegisters,
    D: OutputPin,
{
    fn serial_set_enabled(&mut self, rx_enable: bool, tx_enable: bool) {
        self.serial.set_enabled(rx_enable, tx_enable);
    }

    fn serial_put_byte(&mut self, byte: u8) {
        self.serial.write_byte(byte);
    }

    fn serial_get_byte(&mut self) -> u8 {
        self.serial.read_byte()
    }

    fn timers_enable(&mut self) {
        self.timer.enable();
    }

    fn timers_disable(&mut self) {
        self.timer.disable();
    }
}

/// Hardware port for one protocol engine instance
///
/// Interrupt handlers call [`dispatch`](Self::dispatch) (or the per-vector
/// shortcuts); each runs to completion and calls into the engine with a
/// `&mut dyn PortAccess` over the same peripherals.
pub struct ModbusPort<U, T, C, D = NoDirection> {
    hw: PortPeripherals<U, T, D>,
    engine: C,
}

impl<U, T, C, D> ModbusPort<U, T, C, D>
where
    U: UsartRegisters,
    T: TimerRegisters,
    C: FrameCallbacks,
    D: OutputPin,
{
    /// Bind the peripherals to an engine
    pub fn new(serial: SerialTransport<U, D>, timer: TimeoutTimer<T>, engine: C) -> Self {
        Self {
            hw: PortPeripherals { serial, timer },
            engine,
        }
    }

    /// One-time serial setup; both directions end up disabled
    pub fn serial_init(
        &mut self,
        port: u8,
        baud_rate: u32,
        data_bits: u8,
        parity: Parity,
    ) -> Result<(), SerialError> {
        self.hw.serial.init(port, baud_rate, data_bits, parity)
    }

    /// One-time timer setup with the timeout in 50µs ticks
    pub fn timers_init(&mut self, timeout_ticks: u16) -> Result<(), TimerError> {
        self.hw.timer.init(timeout_ticks)
    }

    /// Service one interrupt
    pub fn dispatch(&mut self, irq: Interrupt) {
        match irq {
            Interrupt::UsartReceiveComplete => self.on_usart_rxc(),
            Interrupt::UsartDataRegisterEmpty => self.on_usart_dre(),
            Interrupt::UsartTransmitComplete => self.on_usart_txc(),
            Interrupt::TimerOverflow => self.on_timer_overflow(),
        }
    }

    /// USART receive complete vector
    pub fn on_usart_rxc(&mut self) {
        self.engine.on_byte_received(&mut self.hw);
    }

    /// USART data register empty vector
    pub fn on_usart_dre(&mut self) {
        self.engine.on_transmitter_empty(&mut self.hw);
    }

    /// USART transmit complete vector
    pub fn on_usart_txc(&mut self) {
        self.hw.serial.on_transmit_complete();
    }

    /// Timer overflow vector
    pub fn on_timer_overflow(&mut self) {
        if self.hw.timer.on_overflow() {
            self.engine.on_timer_expired(&mut self.hw);
        }
    }

    /// Peripherals
    pub fn peripherals(&self) -> &PortPeripherals<U, T, D> {
        &self.hw
    }

    /// Peripherals (mutable)
    pub fn peripherals_mut(&mut self) -> &mut PortPeripherals<U, T, D> {
        &mut self.hw
    }

    /// The engine
    pub fn engine(&self) -> &C {
        &self.engine
    }

    /// The engine (mutable)
    pub fn engine_mut(&mut self) -> &mut C {
        &mut self.engine
    }
}

impl<U, T, C, D> PortAccess for ModbusPort<U, T, C, D>
where
    U: UsartRegisters,
    T: TimerRegisters,
    C: FrameCallbacks,
    D: OutputPin,
{
    fn serial_set_enabled(&mut self, rx_enable: bool, tx_enable: bool) {
        self.hw.serial_set_enabled(rx_enable, tx_enable);
    }

    fn serial_put_byte(&mut self, byte: u8) {
        self.hw.serial_put_byte(byte);
    }

    fn serial_get_byte(&mut self) -> u8 {
        self.hw.serial_get_byte()
    }

    fn timers_enable(&mut self) {
        self.hw.timers_enable();
    }

    fn timers_disable(&mut self) {
        self.hw.timers_disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimPin, SimPort, SimTimer, SimUsart};
    use crate::timer::TimerClock;
    use heapless::{Deque, Vec};
    use mbport_hal::usart::ctrla;
    use mbport_hal::{TimerPrescaler, UsartRegister};

    const BAUD_CLOCK_HZ: u32 = 64 * 16_000_000 / 6;
    const CLOCK: TimerClock = TimerClock::from_counts(TimerPrescaler::Div16, 8);

    /// Engine double that counts receive and expiry callbacks
    #[derive(Default)]
    struct CountingEngine {
        received: usize,
        expired: usize,
    }

    impl FrameCallbacks for CountingEngine {
        fn on_byte_received(&mut self, port: &mut dyn PortAccess) {
            let _ = port.serial_get_byte();
            self.received += 1;
        }

        fn on_transmitter_empty(&mut self, _port: &mut dyn PortAccess) {}

        fn on_timer_expired(&mut self, _port: &mut dyn PortAccess) {
            self.expired += 1;
        }
    }

    /// Engine double with nothing to send: every transmitter-empty turns
    /// the transmitter off again
    #[derive(Default)]
    struct QuietEngine {
        tx_empty: usize,
    }

    impl FrameCallbacks for QuietEngine {
        fn on_byte_received(&mut self, port: &mut dyn PortAccess) {
            let _ = port.serial_get_byte();
        }

        fn on_transmitter_empty(&mut self, port: &mut dyn PortAccess) {
            self.tx_empty += 1;
            port.serial_set_enabled(true, false);
        }

        fn on_timer_expired(&mut self, _port: &mut dyn PortAccess) {}
    }

    /// Engine double that echoes a frame back after t3.5 of silence
    #[derive(Default)]
    struct EchoEngine {
        frame: Vec<u8, 32>,
        tx: Deque<u8, 32>,
        frames: usize,
    }

    impl FrameCallbacks for EchoEngine {
        fn on_byte_received(&mut self, port: &mut dyn PortAccess) {
            let byte = port.serial_get_byte();
            let _ = self.frame.push(byte);
            port.timers_enable();
        }

        fn on_transmitter_empty(&mut self, port: &mut dyn PortAccess) {
            match self.tx.pop_front() {
                Some(byte) => port.serial_put_byte(byte),
                None => port.serial_set_enabled(true, false),
            }
        }

        fn on_timer_expired(&mut self, port: &mut dyn PortAccess) {
            port.timers_disable();
            for &byte in self.frame.iter() {
                let _ = self.tx.push_back(byte);
            }
            self.frame.clear();
            self.frames += 1;
            port.serial_set_enabled(false, true);
        }
    }

    fn port<C: FrameCallbacks>(engine: C) -> SimPort<C> {
        let serial = SerialTransport::new(SimUsart::new(0), BAUD_CLOCK_HZ);
        let timer = TimeoutTimer::new(SimTimer::new(), CLOCK);
        let mut port = ModbusPort::new(serial, timer, engine);
        port.serial_init(0, 19200, 8, Parity::None).unwrap();
        port
    }

    fn advance_ticks<C: FrameCallbacks, D: OutputPin>(
        port: &mut ModbusPort<SimUsart, SimTimer, C, D>,
        ticks: u32,
    ) {
        let counts = ticks * CLOCK.counts_per_tick() as u32;
        port.peripherals_mut().timer_mut().registers_mut().advance(counts);
    }

    #[test]
    fn test_enable_transmit_fires_one_transmitter_empty() {
        let mut p = port(QuietEngine::default());
        p.serial_set_enabled(false, false);
        assert_eq!(p.service_interrupts(), 0);

        // Unmasking only raises the request; the handler runs once
        // interrupts are serviced
        p.serial_set_enabled(false, true);
        assert_eq!(p.engine().tx_empty, 0);
        assert_eq!(
            p.pending_interrupts().as_slice(),
            &[Interrupt::UsartDataRegisterEmpty]
        );

        assert_eq!(p.service_interrupts(), 1);
        assert_eq!(p.engine().tx_empty, 1);

        for _ in 0..10 {
            assert_eq!(p.service_interrupts(), 0);
        }
        assert_eq!(p.engine().tx_empty, 1);
    }

    #[test]
    fn test_direction_line_released_after_empty_transmit() {
        let serial = SerialTransport::with_direction(SimUsart::new(0), BAUD_CLOCK_HZ, SimPin::new());
        let timer = TimeoutTimer::new(SimTimer::new(), CLOCK);
        let mut p = ModbusPort::new(serial, timer, QuietEngine::default());
        p.serial_init(0, 19200, 8, Parity::None).unwrap();

        p.serial_set_enabled(false, true);
        for _ in 0..100 {
            p.service_interrupts();
            p.peripherals_mut().serial_mut().registers_mut().shift_out();
        }

        assert_eq!(p.engine().tx_empty, 1);
        assert!(p.peripherals().serial().registers().sent().is_empty());
        assert!(!p.peripherals().serial().direction_pin().unwrap().is_set_high());
    }

    #[test]
    fn test_full_enable_from_any_state() {
        let mut p = port(CountingEngine::default());
        for (rx, tx) in [(false, false), (true, false), (false, true), (true, true)] {
            p.serial_set_enabled(rx, tx);
            p.serial_set_enabled(false, false);
            p.serial_set_enabled(true, true);

            let usart = p.peripherals().serial().registers();
            let a = usart.read(UsartRegister::CtrlA);
            assert_eq!(a & (ctrla::RXCIE | ctrla::DREIE), ctrla::RXCIE | ctrla::DREIE);
            assert!(usart.receiver_enabled());
        }
    }

    #[test]
    fn test_received_byte_reaches_engine() {
        let mut p = port(CountingEngine::default());
        p.serial_set_enabled(true, false);

        p.peripherals_mut().serial_mut().registers_mut().receive(0x01);
        assert_eq!(p.service_interrupts(), 1);
        assert_eq!(p.engine().received, 1);

        // Receiver disabled: byte never arrives
        p.serial_set_enabled(false, false);
        assert!(!p.peripherals_mut().serial_mut().registers_mut().receive(0x02));
        assert_eq!(p.service_interrupts(), 0);
        assert_eq!(p.engine().received, 1);
    }

    #[test]
    fn test_zero_timeout_never_expires() {
        let mut p = port(CountingEngine::default());
        p.timers_init(0).unwrap();
        p.timers_enable();

        advance_ticks(&mut p, 100_000);
        p.service_interrupts();
        assert_eq!(p.engine().expired, 0);
    }

    #[test]
    fn test_t35_window_expires_once() {
        let mut p = port(CountingEngine::default());
        p.timers_init(35).unwrap();
        p.timers_enable();

        advance_ticks(&mut p, 34);
        p.service_interrupts();
        assert_eq!(p.engine().expired, 0);

        advance_ticks(&mut p, 1);
        p.service_interrupts();
        assert_eq!(p.engine().expired, 1);

        // Engine did not disarm; still only one expiry
        advance_ticks(&mut p, 200);
        p.service_interrupts();
        assert_eq!(p.engine().expired, 1);
    }

    #[test]
    fn test_disable_mid_window_cancels_expiry() {
        let mut p = port(CountingEngine::default());
        p.timers_init(20).unwrap();
        p.timers_enable();

        advance_ticks(&mut p, 19);
        p.timers_disable();
        advance_ticks(&mut p, 100);
        p.service_interrupts();
        assert_eq!(p.engine().expired, 0);
    }

    #[test]
    fn test_rearm_after_expiry_gives_new_window() {
        let mut p = port(CountingEngine::default());
        p.timers_init(10).unwrap();

        for round in 1..=3 {
            p.timers_enable();
            advance_ticks(&mut p, 10);
            p.service_interrupts();
            assert_eq!(p.engine().expired, round);
        }
    }

    #[test]
    fn test_echo_request_response() {
        let mut p = port(EchoEngine::default());
        p.timers_init(35).unwrap();
        p.serial_set_enabled(true, false);

        let request = [0x01, 0x04, 0x10, 0x00, 0x00, 0x04, 0xF4, 0xC9];
        for &byte in request.iter() {
            p.peripherals_mut().serial_mut().registers_mut().receive(byte);
            p.service_interrupts();
            // Inter-character gap well below t3.5
            advance_ticks(&mut p, 10);
            p.service_interrupts();
        }
        assert_eq!(p.engine().frames, 0);

        advance_ticks(&mut p, 35);
        p.service_interrupts();
        assert_eq!(p.engine().frames, 1);

        // Drain the transmitter
        for _ in 0..32 {
            p.service_interrupts();
            p.peripherals_mut().serial_mut().registers_mut().shift_out();
        }
        assert_eq!(p.peripherals().serial().registers().sent(), &request);

        // Back to listening with transmit masked
        let a = p.peripherals().serial().registers().read(UsartRegister::CtrlA);
        assert_eq!(a & ctrla::DREIE, 0);
        assert_ne!(a & ctrla::RXCIE, 0);
    }

    #[test]
    fn test_echo_with_direction_control() {
        let serial = SerialTransport::with_direction(SimUsart::new(0), BAUD_CLOCK_HZ, SimPin::new());
        let timer = TimeoutTimer::new(SimTimer::new(), CLOCK);
        let mut p = ModbusPort::new(serial, timer, EchoEngine::default());
        p.serial_init(0, 19200, 8, Parity::None).unwrap();
        p.timers_init(35).unwrap();
        p.serial_set_enabled(true, false);

        for &byte in [0x11, 0x22].iter() {
            p.peripherals_mut().serial_mut().registers_mut().receive(byte);
            p.service_interrupts();
        }
        advance_ticks(&mut p, 35);
        p.service_interrupts();

        let pin_high = |p: &ModbusPort<SimUsart, SimTimer, EchoEngine, SimPin>| {
            p.peripherals().serial().direction_pin().unwrap().is_set_high()
        };
        assert!(pin_high(&p));

        let mut released_early = false;
        for _ in 0..16 {
            p.service_interrupts();
            let sent = p.peripherals().serial().registers().sent().len();
            if sent < 2 && !pin_high(&p) {
                released_early = true;
            }
            p.peripherals_mut().serial_mut().registers_mut().shift_out();
        }

        assert!(!released_early);
        assert_eq!(p.peripherals().serial().registers().sent(), &[0x11, 0x22]);
        assert!(!pin_high(&p));
    }
}
