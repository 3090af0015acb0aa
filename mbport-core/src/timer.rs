//! Single-shot timeout timer with 50µs resolution
//!
//! Used by the protocol engine for the RTU inter-character (t1.5) and
//! inter-frame (t3.5) silence timeouts. The period is fixed at init; each
//! arm restarts the window from zero.

use mbport_hal::timer::{ctrla, intctrl, intflags};
use mbport_hal::{TimerPrescaler, TimerRegister, TimerRegisters};

/// Length of one timeout tick in microseconds
pub const TICK_US: u32 = 50;

/// Errors from timer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// Requested timeout does not fit the 16-bit period register
    PeriodOverflow,
    /// Clock configuration gives less than one count per 50µs tick
    InvalidClock,
}

/// Timer input clock: prescaler selection and counts per 50µs tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerClock {
    prescaler: TimerPrescaler,
    counts_per_tick: u16,
}

impl TimerClock {
    /// Derive the tick conversion from the clock tree
    ///
    /// `counts = cpu_hz / main_prescaler / timer_prescaler * 50µs`, truncated.
    /// Must be re-derived whenever the clock configuration changes, which is
    /// why it is computed here rather than written down by hand.
    pub const fn new(
        cpu_hz: u32,
        main_prescaler: u32,
        prescaler: TimerPrescaler,
    ) -> Result<Self, TimerError> {
        if main_prescaler == 0 {
            return Err(TimerError::InvalidClock);
        }

        let counts = (cpu_hz as u64 * TICK_US as u64)
            / (main_prescaler as u64 * prescaler.divisor() as u64 * 1_000_000);

        if counts == 0 {
            return Err(TimerError::InvalidClock);
        }
        if counts > u16::MAX as u64 {
            return Err(TimerError::PeriodOverflow);
        }

        Ok(Self {
            prescaler,
            counts_per_tick: counts as u16,
        })
    }

    /// Use an explicit counts-per-tick value
    pub const fn from_counts(prescaler: TimerPrescaler, counts_per_tick: u16) -> Self {
        Self {
            prescaler,
            counts_per_tick,
        }
    }

    /// Prescaler selection
    pub const fn prescaler(&self) -> TimerPrescaler {
        self.prescaler
    }

    /// Timer counts per 50µs tick
    pub const fn counts_per_tick(&self) -> u16 {
        self.counts_per_tick
    }

    /// Hardware period for a timeout, in prescaled counts
    ///
    /// The period register holds `period - 1`, so up to 65536 counts fit.
    pub const fn period_for(&self, timeout_ticks: u16) -> Result<u32, TimerError> {
        let period = timeout_ticks as u32 * self.counts_per_tick as u32;
        if period > u16::MAX as u32 + 1 {
            return Err(TimerError::PeriodOverflow);
        }
        Ok(period)
    }
}

/// Software view of the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerState {
    /// `init` has not run yet
    Uninitialized,
    /// Stopped, or running with no timeout requested
    Disabled,
    /// Window open, overflow interrupt unmasked
    Armed,
    /// Expiry delivered; counter free-running with the interrupt masked
    Expired,
}

/// Timeout timer over a timer register file
pub struct TimeoutTimer<T> {
    regs: T,
    clock: TimerClock,
    /// Window length in prescaled counts, 0 = no timeout
    period: u32,
    state: TimerState,
}

impl<T: TimerRegisters> TimeoutTimer<T> {
    /// Create a timer; call [`init`](Self::init) before arming it
    pub fn new(regs: T, clock: TimerClock) -> Self {
        Self {
            regs,
            clock,
            period: 0,
            state: TimerState::Uninitialized,
        }
    }

    /// Set the timeout in 50µs ticks and leave the timer disabled
    ///
    /// A zero timeout is accepted: the counter will run when enabled but
    /// never signal.
    pub fn init(&mut self, timeout_ticks: u16) -> Result<(), TimerError> {
        let period = self.clock.period_for(timeout_ticks)?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "timer: {} ticks x {} counts = period {}",
            timeout_ticks,
            self.clock.counts_per_tick(),
            period
        );

        self.period = period;
        self.regs.write(TimerRegister::CtrlA, 0x00);
        self.regs.write(TimerRegister::CtrlB, 0x00);
        self.regs.write(TimerRegister::CtrlC, 0x00);
        self.state = TimerState::Disabled;
        self.disable();
        Ok(())
    }

    /// Arm the timer, restarting the window from zero
    pub fn enable(&mut self) {
        if self.period > 0 {
            self.regs.write_period((self.period - 1) as u16);
            self.regs.write_count(0);
            self.regs.write(TimerRegister::IntFlags, intflags::OVF);
            self.regs
                .modify(TimerRegister::IntCtrl, |v| v | intctrl::OVF);
        }

        let clksel = self.clock.prescaler().clksel();
        self.regs.modify(TimerRegister::CtrlA, |v| {
            (v & !ctrla::CLKSEL_MASK) | clksel | ctrla::ENABLE
        });

        if self.state != TimerState::Uninitialized {
            self.state = if self.period > 0 {
                TimerState::Armed
            } else {
                TimerState::Disabled
            };
        }
    }

    /// Stop the counter and drop anything pending
    pub fn disable(&mut self) {
        self.regs.write(TimerRegister::CtrlA, 0x00);
        self.regs.write(TimerRegister::IntCtrl, 0x00);
        self.regs.write(TimerRegister::IntFlags, intflags::ALL);

        if self.state != TimerState::Uninitialized {
            self.state = TimerState::Disabled;
        }
    }

    /// Acknowledge an overflow interrupt
    ///
    /// Clears the flag and masks the interrupt so a window signals at most
    /// once. Returns `true` when the expiry should be delivered.
    pub fn on_overflow(&mut self) -> bool {
        self.regs.write(TimerRegister::IntFlags, intflags::OVF);
        self.regs
            .modify(TimerRegister::IntCtrl, |v| v & !intctrl::OVF);

        if self.state == TimerState::Armed {
            self.state = TimerState::Expired;
            true
        } else {
            false
        }
    }

    /// Current software state
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Configured window in prescaled counts
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Clock configuration
    pub fn clock(&self) -> TimerClock {
        self.clock
    }

    /// Underlying register file
    pub fn registers(&self) -> &T {
        &self.regs
    }

    /// Underlying register file (mutable)
    pub fn registers_mut(&mut self) -> &mut T {
        &mut self.regs
    }
}
