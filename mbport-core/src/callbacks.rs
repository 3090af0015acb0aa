//! Contract between the port layer and the protocol engine

/// Operations the protocol engine calls on the port
///
/// Implemented by [`ModbusPort`](crate::port::ModbusPort) for main-context
/// use, and handed to [`FrameCallbacks`] inside interrupt context so the
/// engine can move the byte or re-arm the timer synchronously.
pub trait PortAccess {
    /// Gate receive and transmit independently
    fn serial_set_enabled(&mut self, rx_enable: bool, tx_enable: bool);

    /// Load the next byte to send; only from `on_transmitter_empty`
    fn serial_put_byte(&mut self, byte: u8);

    /// Fetch the received byte; only from `on_byte_received`
    fn serial_get_byte(&mut self) -> u8;

    /// Arm the timeout timer, restarting the window
    fn timers_enable(&mut self);

    /// Disarm the timeout timer
    fn timers_disable(&mut self);
}

/// Callbacks into the protocol engine
///
/// Invoked from interrupt context. There is no queue behind them: a byte
/// that is not read before the next receive interrupt is overwritten, and
/// an empty transmit register that is neither filled nor masked keeps
/// interrupting.
pub trait FrameCallbacks {
    /// A byte is waiting in the receive data register
    fn on_byte_received(&mut self, port: &mut dyn PortAccess);

    /// The transmit data register can take another byte
    fn on_transmitter_empty(&mut self, port: &mut dyn PortAccess);

    /// The armed timeout window has elapsed
    fn on_timer_expired(&mut self, port: &mut dyn PortAccess);
}
