// Kernel Utilities
//
// Interrupt-safe critical sections. Every code path that locks a driver
// global (console writer, serial port) wraps the locked region in
// `without_interrupts`, so a trap arriving mid-write can never spin on a
// lock its own CPU already holds.

use crate::arch;

#[inline(always)]
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let enabled = arch::interrupts_enabled();

    arch::disable_interrupts();

    let result = f();

    // Restore rather than unconditionally re-enable: the caller may
    // already be running with interrupts off (e.g. inside a trap).
    if enabled {
        arch::enable_interrupts();
    }

    result
}
