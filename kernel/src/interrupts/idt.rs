// Interrupt Descriptor Table (Gate Table)
//
// Defines the exact 8-byte protected-mode gate format the CPU consumes and
// owns the single static 256-entry table the processor is pointed at. Every
// vector that is wired gets one interrupt gate; everything else stays
// all-zero so an unprogrammed vector faults instead of jumping to garbage.
//
// Key responsibilities:
// - Define the hardware layout of gate descriptors and the table pointer
// - Zero the table, install one gate per trampoline, and load the table
// - Keep the table inspectable so its invariants can be checked
//
// Design principles:
// - Strict adherence to the i386 gate format using `#[repr(C, packed)]`,
//   pinned by compile-time size assertions
// - The table is written during `init` and read-only afterwards
// - No validation of selector or attribute bits: a malformed gate is a
//   caller bug the hardware answers with a fault, not a checked error
//
// Correctness and safety notes:
// - The table is 8-byte aligned; the load instruction takes the packed
//   {limit, base} record by address
// - Handler addresses must be linked into the kernel image before the
//   table is loaded; a stale address triple-faults on the next trap

use super::stubs;
use crate::arch::KERNEL_CODE_SELECTOR;
use crate::{log_debug, log_info};
use core::mem::size_of;

pub const IDT_SIZE: usize = 256;

// Present, DPL 0, 32-bit interrupt gate.
pub const GATE_TYPE_INTERRUPT: u8 = 0x8E;
const GATE_PRESENT: u8 = 0x80;

const LOG_ORIGIN: &str = "idt";

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    reserved: u8,
    type_attr: u8,
    offset_high: u16,
}

const _: () = assert!(size_of::<GateDescriptor>() == 8);

impl GateDescriptor {
    pub const MISSING: GateDescriptor = GateDescriptor {
        offset_low: 0,
        selector: 0,
        reserved: 0,
        type_attr: 0,
        offset_high: 0,
    };

    fn new(handler: u32, selector: u16, type_attr: u8) -> Self {
        GateDescriptor {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            reserved: 0,
            type_attr,
            offset_high: (handler >> 16) as u16,
        }
    }

    pub fn handler_address(&self) -> u32 {
        let low = self.offset_low;
        let high = self.offset_high;
        (high as u32) << 16 | low as u32
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn type_attr(&self) -> u8 {
        self.type_attr
    }

    pub fn is_present(&self) -> bool {
        self.type_attr & GATE_PRESENT != 0
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDescriptor {
    pub limit: u16,
    pub base: u32,
}

const _: () = assert!(size_of::<TableDescriptor>() == 6);

#[repr(C, align(8))]
struct Idt {
    entries: [GateDescriptor; IDT_SIZE],
}

const _: () = assert!(size_of::<Idt>() == IDT_SIZE * 8);

static mut IDT: Idt = Idt {
    entries: [GateDescriptor::MISSING; IDT_SIZE],
};

pub fn install(vector: u8, handler: u32, selector: u16, type_attr: u8) {
    unsafe {
        let entries = core::ptr::addr_of_mut!(IDT.entries) as *mut GateDescriptor;
        entries
            .add(vector as usize)
            .write(GateDescriptor::new(handler, selector, type_attr));
    }
}

#[allow(dead_code)]
pub fn entry(vector: u8) -> GateDescriptor {
    unsafe {
        let entries = core::ptr::addr_of!(IDT.entries) as *const GateDescriptor;
        entries.add(vector as usize).read()
    }
}

pub fn table_base() -> u32 {
    core::ptr::addr_of!(IDT) as usize as u32
}

fn clear_all() {
    unsafe {
        let entries = core::ptr::addr_of_mut!(IDT.entries) as *mut GateDescriptor;
        for index in 0..IDT_SIZE {
            entries.add(index).write(GateDescriptor::MISSING);
        }
    }
}

// Computes the {limit, base} record and makes the table active.
pub fn finalize() {
    let descriptor = TableDescriptor {
        limit: (size_of::<Idt>() - 1) as u16,
        base: table_base(),
    };

    unsafe {
        load_table(&descriptor);
    }
}

pub fn init() {
    clear_all();

    for &vector in stubs::VECTORS {
        install(
            vector,
            stubs::entry_address(vector),
            KERNEL_CODE_SELECTOR,
            GATE_TYPE_INTERRUPT,
        );
    }

    finalize();

    log_debug!(LOG_ORIGIN, "Gate table at {:#010X}", table_base());
    log_info!(
        LOG_ORIGIN,
        "Gate table loaded: {} entries, {} wired",
        IDT_SIZE,
        stubs::VECTORS.len()
    );
}

#[cfg(all(target_arch = "x86", target_os = "none"))]
#[inline]
unsafe fn load_table(descriptor: &TableDescriptor) {
    core::arch::asm!(
        "lidt [{}]",
        in(reg) descriptor,
        options(readonly, nostack, preserves_flags)
    );
}

#[cfg(all(target_arch = "x86", target_os = "none"))]
#[allow(dead_code)]
pub fn active_descriptor() -> TableDescriptor {
    let mut descriptor = TableDescriptor { limit: 0, base: 0 };
    unsafe {
        core::arch::asm!(
            "sidt [{}]",
            in(reg) &mut descriptor,
            options(nostack, preserves_flags)
        );
    }
    descriptor
}

#[cfg(not(all(target_arch = "x86", target_os = "none")))]
static LOADED: spin::Mutex<TableDescriptor> =
    spin::Mutex::new(TableDescriptor { limit: 0, base: 0 });

#[cfg(not(all(target_arch = "x86", target_os = "none")))]
unsafe fn load_table(descriptor: &TableDescriptor) {
    *LOADED.lock() = *descriptor;
}

#[cfg(not(all(target_arch = "x86", target_os = "none")))]
#[allow(dead_code)]
pub fn active_descriptor() -> TableDescriptor {
    *LOADED.lock()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_address_splits_into_sixteen_bit_halves() {
        let gate = GateDescriptor::new(0xDEADBEEF, KERNEL_CODE_SELECTOR, GATE_TYPE_INTERRUPT);

        let low = gate.offset_low;
        let high = gate.offset_high;
        assert_eq!(low, 0xBEEF);
        assert_eq!(high, 0xDEAD);
        assert_eq!(gate.handler_address(), 0xDEADBEEF);
    }

    #[test]
    fn new_gate_carries_selector_and_attributes() {
        let gate = GateDescriptor::new(0x1000, 0x08, GATE_TYPE_INTERRUPT);

        assert_eq!(gate.selector(), 0x08);
        assert_eq!(gate.type_attr(), 0x8E);
        assert!(gate.is_present());

        let reserved = gate.reserved;
        assert_eq!(reserved, 0);
    }

    #[test]
    fn missing_gate_is_all_zero_and_absent() {
        let gate = GateDescriptor::MISSING;

        assert!(!gate.is_present());
        assert_eq!(gate.handler_address(), 0);
        assert_eq!(gate.selector(), 0);
        assert_eq!(gate.type_attr(), 0);
    }

    #[test]
    fn table_limit_is_size_minus_one() {
        assert_eq!((size_of::<Idt>() - 1) as u16, 2047);
    }
}
