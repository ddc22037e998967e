// Interrupt Subsystem Orchestration
//
// Acts as the top-level coordination module for the kernel trap system.
// This module ties together gate-table setup, controller remapping, and
// runtime interrupt control behind a simple, coherent API.
//
// Key responsibilities:
// - Initialize all trap-related state in the correct order
// - Expose a stable, high-level interface to the rest of the kernel
// - Centralize the vector and IRQ line assignments
//
// Initialization flow:
// - `init()` builds and loads the gate table first, so a fault taken
//   during the rest of boot already has somewhere to land
// - Then remaps the controllers away from the exception range, leaving
//   every line masked until its driver claims it
// - Resets the dispatcher counters and halt latch, making `init()` the
//   restart boundary the rest of the system can rely on
//
// Correctness and safety notes:
// - The gate table must be live before interrupts are enabled
// - Interrupts stay disabled during early boot until `kmain` has
//   unmasked the lines it wants
// - This module intentionally contains no `unsafe` code; all unsafe
//   hardware access is encapsulated in lower-level modules

pub mod handlers;
pub mod idt;
pub(crate) mod pic;
mod stubs;

#[cfg(test)]
mod tests;

use crate::log_info;

const LOG_ORIGIN: &str = "interrupt";

pub const TIMER_IRQ: u8 = 0;
pub const KEYBOARD_IRQ: u8 = 1;

pub const TIMER_VECTOR: u8 = pic::MASTER_VECTOR_OFFSET + TIMER_IRQ;
pub const KEYBOARD_VECTOR: u8 = pic::MASTER_VECTOR_OFFSET + KEYBOARD_IRQ;

pub fn init() {
    log_info!(LOG_ORIGIN, "Initializing trap system...");

    idt::init();
    pic::remap();
    handlers::reset();

    log_info!(LOG_ORIGIN, "Trap system initialized.");
}

pub fn enable() {
    crate::arch::enable_interrupts();
}

#[allow(dead_code)]
pub fn disable() {
    crate::arch::disable_interrupts();
}

pub fn get_ticks() -> u32 {
    handlers::get_ticks()
}
