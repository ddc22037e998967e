// Architecture Primitives
//
// Low-level x86 protected-mode primitives used by the rest of the kernel.
// This module exposes a minimal and explicit interface to CPU instructions
// that cannot be expressed safely or portably in pure Rust.
//
// Key responsibilities:
// - Halt the CPU, once (idle) or permanently (terminal failure)
// - Enable, disable, and query the external interrupt flag
// - Name the segment selectors the boot GDT establishes
// - Provide single-byte port I/O (see `ports`)
//
// Design principles:
// - Privileged instructions are isolated behind target gates so the same
//   crate compiles as the kernel staticlib and as a host-testable rlib
// - All functions are small, `#[inline(always)]`, and zero-overhead
// - Unsafe inline assembly is tightly scoped and well-defined
// - Host builds degrade to safe no-op fallbacks; the recording bus in
//   `ports` substitutes for real devices
//
// Correctness and safety notes:
// - The selectors below are fixed by the GDT the boot loader installs
//   before the kernel entry point runs; nothing at this layer rebuilds it
// - `halt_forever` never returns: interrupts are disabled first, so no
//   further trap can lift the processor out of the halt

pub mod ports;

// Flat-model selectors established by the boot GDT.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
#[allow(dead_code)]
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;

#[inline(always)]
pub fn halt() {
    #[cfg(all(target_arch = "x86", target_os = "none"))]
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
    }

    #[cfg(not(all(target_arch = "x86", target_os = "none")))]
    core::hint::spin_loop();
}

// Terminal stop: no interrupt can wake the processor again.
#[allow(dead_code)]
pub fn halt_forever() -> ! {
    disable_interrupts();
    loop {
        halt();
    }
}

#[inline(always)]
pub fn enable_interrupts() {
    #[cfg(all(target_arch = "x86", target_os = "none"))]
    unsafe {
        core::arch::asm!("sti", options(nomem, nostack));
    }
}

#[inline(always)]
pub fn disable_interrupts() {
    #[cfg(all(target_arch = "x86", target_os = "none"))]
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack));
    }
}

#[cfg(all(target_arch = "x86", target_os = "none"))]
#[inline(always)]
pub fn eflags() -> u32 {
    let flags: u32;
    unsafe {
        core::arch::asm!("pushfd; pop {}", out(reg) flags, options(preserves_flags));
    }
    flags
}

// Host builds run with the interrupt flag conceptually clear.
#[cfg(not(all(target_arch = "x86", target_os = "none")))]
#[inline(always)]
pub fn eflags() -> u32 {
    0
}

// EFLAGS bit 9 is the external interrupt enable flag.
#[inline(always)]
pub fn interrupts_enabled() -> bool {
    eflags() & (1 << 9) != 0
}
