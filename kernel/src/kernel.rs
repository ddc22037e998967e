// Kernel entry point and system initialization
//
// This file defines the main kernel entry point (`kmain`) and orchestrates
// the initialization sequence after control is transferred from the
// bootloader to the kernel.
//
// Key responsibilities:
// - Serve as the kernel entry point after boot
// - Initialize early I/O (VGA console, serial, logging)
// - Build and load the trap gate table, remap the interrupt controllers
// - Program the timer and unmask the interrupt lines the kernel serves
// - Enable interrupts and idle; from here on the machine is trap-driven
//
// Design and implementation:
// - Kernel is `no_std`, fully self-hosted; on the host the same crate
//   builds against the standard library for its test suite
// - Initialization follows a strict, explicit ordering
// - Interrupts are enabled only after handlers are installed
// - The trap dispatcher owns execution after `kmain` parks in the halt
//   loop: every subsequent action is a response to a vector
//
// Safety and correctness notes:
// - The gate table must be live before the first `sti`; a fault taken
//   earlier has nowhere to land and triple-faults
// - Unmasking is deliberate: only the timer and keyboard lines are
//   served, everything else stays masked at the controllers
// - Panic handler reports through the log layer and halts the CPU

#![cfg_attr(not(test), no_std)]

mod arch;
mod build_info;
mod interrupts;
mod log;
mod pit;
mod serial;
mod util;
mod vga;

const LOG_KERNEL_INIT: &str = "kernel:init";

#[no_mangle]
pub extern "C" fn kmain() -> ! {
    vga::init();
    serial::init();

    log::init();
    log::enable_vga_output();

    vga::display_boot_message();
    log_info!(LOG_KERNEL_INIT, "{}", build_info::BOOT_BANNER);

    interrupts::init();
    pit::init(pit::BOOT_TICK_HZ);

    interrupts::pic::unmask(interrupts::KEYBOARD_IRQ);
    log_info!(LOG_KERNEL_INIT, "Keyboard line unmasked (IRQ1)");

    log_info!(LOG_KERNEL_INIT, "Enabling interrupts...");
    interrupts::enable();

    log_info!(LOG_KERNEL_INIT, "Boot complete, idling in halt loop");
    loop {
        arch::halt();
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log_panic!("PANIC", "{}", info);
    arch::halt_forever()
}
