// Programmable Interval Timer (Channel 0)
//
// One-shot programming of the PIT so the timer line fires periodically.
// The chip divides a fixed 1,193,182 Hz oscillator by a 16-bit countdown
// value; choosing the divisor chooses the tick rate. After programming,
// the timer IRQ line is unmasked so ticks actually reach the CPU once
// interrupts are enabled.
//
// The divisor computation is a pure function so the clamping rules can be
// checked without touching hardware.

use crate::arch::ports::outb;
use crate::interrupts::{pic, TIMER_IRQ};
use crate::log_info;

const LOG_ORIGIN: &str = "pit";

pub const BASE_FREQUENCY_HZ: u32 = 1_193_182;

// Boot-time tick rate; the log timestamp math assumes it too.
pub const BOOT_TICK_HZ: u32 = 100;

const PIT_CHANNEL0_DATA: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;

// Channel 0, lobyte/hibyte access, mode 2 (rate generator).
const PIT_RATE_GENERATOR: u8 = 0x34;

pub fn divisor_for(frequency_hz: u32) -> u16 {
    let freq = frequency_hz.max(1);
    let divisor = BASE_FREQUENCY_HZ / freq;
    divisor.clamp(1, 65_535) as u16
}

pub fn init(frequency_hz: u32) {
    let divisor = divisor_for(frequency_hz);

    unsafe {
        outb(PIT_COMMAND, PIT_RATE_GENERATOR);
        outb(PIT_CHANNEL0_DATA, (divisor & 0xFF) as u8);
        outb(PIT_CHANNEL0_DATA, (divisor >> 8) as u8);
    }

    pic::unmask(TIMER_IRQ);

    log_info!(
        LOG_ORIGIN,
        "Timer programmed for {} Hz (divisor {})",
        frequency_hz,
        divisor
    );
}
