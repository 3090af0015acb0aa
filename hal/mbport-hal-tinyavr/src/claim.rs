//! One-shot ownership of peripheral instances

use core::cell::Cell;

use critical_section::Mutex;

pub(crate) const USART0: u8 = 1 << 0;
pub(crate) const USART1: u8 = 1 << 1;
pub(crate) const TCA0: u8 = 1 << 2;

static CLAIMED: Mutex<Cell<u8>> = Mutex::new(Cell::new(0));

/// Mark a peripheral as taken; `false` if it already was
pub(crate) fn claim(mask: u8) -> bool {
    critical_section::with(|cs| {
        let claimed = CLAIMED.borrow(cs);
        let current = claimed.get();
        if current & mask != 0 {
            return false;
        }
        claimed.set(current | mask);
        true
    })
}
