// Trap Entry Trampolines
//
// One tiny assembly entry point per wired vector. The CPU pushes the resume
// context (and, for a handful of exceptions, an error code) and jumps here;
// the trampoline's only job is to normalize the stack so every trap reaches
// the dispatcher with an identical snapshot shape:
//
// - vectors without a hardware error code push a zero in its place
// - every trampoline then pushes its vector number and jumps to the shared
//   tail, which saves the general-purpose registers and the data segment.
//   The tail switches to the kernel data segment before calling the
//   dispatcher with the stack top as the snapshot pointer
//
// The snapshot the tail builds must match `handlers::TrapFrame` byte for
// byte; the frame's layout assertions and the push order below are two
// views of the same contract. `pushad` stores eax, ecx, edx, ebx, esp,
// ebp, esi, edi from high addresses down, which is why the frame lists
// them in the reverse order.
//
// The trampolines are generated from the single table at the bottom of
// this file. Only the vector number and the error-code flavor vary; the
// writing-them-by-hand alternative is 34 copies of the same four lines.
//
// On non-kernel targets the assembly is compiled out and `entry_address`
// hands back a distinct placeholder per vector so gate-table construction
// stays fully checkable.

/* ---------------- Shared entry tail ---------------- */

#[cfg(all(target_arch = "x86", target_os = "none"))]
core::arch::global_asm!(
    ".global trap_entry_common",
    "trap_entry_common:",
    "    pushad",
    "    mov eax, ds",
    "    push eax",
    "    mov ax, {kernel_ds}",
    "    mov ds, ax",
    "    mov es, ax",
    "    mov fs, ax",
    "    mov gs, ax",
    "    push esp",
    "    call trap_dispatch",
    "    add esp, 4",
    "    pop eax",
    "    mov ds, ax",
    "    mov es, ax",
    "    mov fs, ax",
    "    mov gs, ax",
    "    popad",
    "    add esp, 8",
    "    iretd",
    kernel_ds = const crate::arch::KERNEL_DATA_SELECTOR,
);

/* ---------------- Per-vector trampolines ---------------- */

// `zero` rows synthesize the missing error code; `hardware` rows rely on
// the one the CPU pushed.
macro_rules! trap_trampolines {
    ($(($name:ident, $vector:literal, $kind:ident)),+ $(,)?) => {
        $(
            #[cfg(all(target_arch = "x86", target_os = "none"))]
            trap_trampolines!(@asm $name, $vector, $kind);
        )+

        #[cfg(all(target_arch = "x86", target_os = "none"))]
        extern "C" {
            $(fn $name();)+
        }

        pub const VECTORS: &[u8] = &[$($vector),+];

        #[cfg(all(target_arch = "x86", target_os = "none"))]
        pub fn entry_address(vector: u8) -> u32 {
            match vector {
                $($vector => $name as *const () as usize as u32,)+
                _ => 0,
            }
        }
    };

    (@asm $name:ident, $vector:literal, zero) => {
        core::arch::global_asm!(concat!(
            ".global ", stringify!($name), "\n",
            stringify!($name), ":\n",
            "    push 0\n",
            "    push ", stringify!($vector), "\n",
            "    jmp trap_entry_common\n",
        ));
    };

    (@asm $name:ident, $vector:literal, hardware) => {
        core::arch::global_asm!(concat!(
            ".global ", stringify!($name), "\n",
            stringify!($name), ":\n",
            "    push ", stringify!($vector), "\n",
            "    jmp trap_entry_common\n",
        ));
    };
}

trap_trampolines! {
    (trap_entry_0, 0, zero),
    (trap_entry_1, 1, zero),
    (trap_entry_2, 2, zero),
    (trap_entry_3, 3, zero),
    (trap_entry_4, 4, zero),
    (trap_entry_5, 5, zero),
    (trap_entry_6, 6, zero),
    (trap_entry_7, 7, zero),
    (trap_entry_8, 8, hardware),
    (trap_entry_9, 9, zero),
    (trap_entry_10, 10, hardware),
    (trap_entry_11, 11, hardware),
    (trap_entry_12, 12, hardware),
    (trap_entry_13, 13, hardware),
    (trap_entry_14, 14, hardware),
    (trap_entry_15, 15, zero),
    (trap_entry_16, 16, zero),
    (trap_entry_17, 17, hardware),
    (trap_entry_18, 18, zero),
    (trap_entry_19, 19, zero),
    (trap_entry_20, 20, zero),
    (trap_entry_21, 21, zero),
    (trap_entry_22, 22, zero),
    (trap_entry_23, 23, zero),
    (trap_entry_24, 24, zero),
    (trap_entry_25, 25, zero),
    (trap_entry_26, 26, zero),
    (trap_entry_27, 27, zero),
    (trap_entry_28, 28, zero),
    (trap_entry_29, 29, zero),
    (trap_entry_30, 30, zero),
    (trap_entry_31, 31, zero),
    (trap_entry_32, 32, zero),
    (trap_entry_33, 33, zero),
}

// Exceptions that push a hardware error code: Double Fault (8), Invalid
// TSS (10), Segment Not Present (11), Stack Segment Fault (12), General
// Protection Fault (13), Page Fault (14), Alignment Check (17). The
// trampoline table above must agree row for row.
#[allow(dead_code)]
pub const fn has_error_code(vector: u8) -> bool {
    matches!(vector, 8 | 10..=14 | 17)
}

// Placeholder addresses standing in for the linked trampoline symbols;
// distinct and nonzero so table invariants stay meaningful in tests.
#[cfg(not(all(target_arch = "x86", target_os = "none")))]
pub fn entry_address(vector: u8) -> u32 {
    0x0010_0000 + (vector as u32) * 0x40
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trampolines_cover_vectors_zero_through_thirty_three() {
        let expected: Vec<u8> = (0..=33).collect();
        assert_eq!(VECTORS, expected.as_slice());
    }

    #[test]
    fn error_code_vectors_match_the_hardware_set() {
        let with_code: Vec<u8> = (0..=33).filter(|v| has_error_code(*v)).collect();
        assert_eq!(with_code, vec![8, 10, 11, 12, 13, 14, 17]);
    }

    #[test]
    fn entry_addresses_are_distinct_and_nonzero() {
        let mut seen = Vec::new();
        for &vector in VECTORS {
            let address = entry_address(vector);
            assert_ne!(address, 0);
            assert!(!seen.contains(&address));
            seen.push(address);
        }
    }
}
