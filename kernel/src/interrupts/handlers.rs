// Trap Classification and Dispatch
//
// Centralizes the kernel's trap-time logic. Every wired vector funnels
// through the assembly trampolines into `trap_dispatch`, which classifies
// the trap and either resumes the interrupted context or halts the machine.
//
// Key structures:
// - `TrapFrame`: full register snapshot layout matching the trampoline's
//   push order, including the vector number and error code. The field
//   order is a contract with the assembly in `stubs.rs`; the layout
//   assertions below pin it.
// - `TrapOutcome`: the classifier's verdict. `Resume` returns to the
//   interrupted context through the trampoline tail; `Halt` never returns.
//
// Dispatch flow, in precedence order:
// - Timer (vector 32): advance the tick counter and acknowledge IRQ0;
//   every so often report the count on serial or redraw the corner spinner.
// - Keyboard (vector 33): drain one scancode from the controller, report
//   it on serial, acknowledge IRQ1.
// - CPU exception (vector < 32): report the symbolic name and error code
//   to both console and serial, then halt. No fault-recovery layer exists
//   above this one, so resuming on corrupted state is never an option.
// - Remaining controller lines (33 < vector < 48): report the IRQ number
//   and acknowledge.
// - Anything else: report as unknown; lines in the controller range are
//   still acknowledged, everything else halts.
//
// Fault reports start at a fixed console row so repeated faults overwrite
// in place instead of scrolling the boot log away.
//
// Correctness and safety notes:
// - Interrupt gates keep interrupts disabled for the whole dispatch, so on
//   hardware at most one instance ever runs. The counters are still
//   atomics: `get_ticks()` is read outside trap context, and the host test
//   harness calls the classifier directly.
// - `HALTED` latches the terminal state. On hardware it is set on the way
//   into the final halt loop; on the host it makes halt absorbing, so a
//   dispatch after a fatal trap has no observable effect.
// - The snapshot pointer handed to `trap_dispatch` is trusted to point at
//   a live `TrapFrame`; a stub/layout mismatch corrupts the diagnostics
//   before anything else.

use crate::arch::ports;
use crate::serial_print;
use crate::serial_println;
use crate::util::without_interrupts;
use crate::vga::{self, Color};
use core::fmt;
use core::mem::{offset_of, size_of};
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

const EXCEPTION_NAMES: [&str; 32] = [
    "Divide By Zero Error",
    "Debug",
    "Non Maskable Interrupt",
    "Breakpoint",
    "Overflow",
    "Bound Range Exceeded",
    "Invalid Opcode",
    "Device Not Available",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Invalid TSS",
    "Segment Not Present",
    "Stack Segment Fault",
    "General Protection Fault",
    "Page Fault",
    "Reserved",
    "x87 Floating Point",
    "Alignment Check",
    "Machine Check",
    "SIMD Floating Point",
    "Virtualization Exception",
    "Control Protection Exception",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Hypervisor Injection Exception",
    "VMM Communication Exception",
    "Security Exception",
    "Reserved",
];

// Keyboard controller output buffer. The byte must be drained even if
// nobody consumes it, or the controller stops raising IRQ1.
const KEYBOARD_DATA_PORT: u16 = 0x60;

// Console row for fault and unknown-vector reports.
const REPORT_ROW: usize = 5;

// One serial report per second at the 100 Hz boot tick rate.
const TICK_REPORT_INTERVAL: u32 = 100;
const SPINNER_REDRAW_INTERVAL: u32 = 20;

const SPINNER_GLYPHS: [u8; 4] = *b"-\\|/";

/* ---------------- Register snapshot ---------------- */

// Built by the trampoline tail in `stubs.rs`, lowest address first: the
// saved data segment, the eight `pushad` registers, the vector and error
// code pushed by the per-vector stub, and the resume context pushed by
// the processor. `esp` is `pushad`'s snapshot of the stack pointer, not
// the interrupted context's; `user_esp`/`ss` are only pushed by the
// processor on a privilege change and are garbage for same-ring traps.
#[repr(C)]
pub struct TrapFrame {
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub user_esp: u32,
    pub ss: u32,
}

const _: () = {
    assert!(size_of::<TrapFrame>() == 16 * size_of::<u32>());
    assert!(offset_of!(TrapFrame, ds) == 0);
    assert!(offset_of!(TrapFrame, vector) == 36);
    assert!(offset_of!(TrapFrame, error_code) == 40);
    assert!(offset_of!(TrapFrame, eip) == 44);
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    Resume,
    Halt,
}

/* ---------------- Dispatcher state ---------------- */

static TICKS: AtomicU32 = AtomicU32::new(0);
static SPINNER_INDEX: AtomicUsize = AtomicUsize::new(0);
static HALTED: AtomicBool = AtomicBool::new(false);

pub fn get_ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

#[allow(dead_code)]
pub fn is_halted() -> bool {
    HALTED.load(Ordering::Relaxed)
}

// Restart boundary: `interrupts::init()` brings the dispatcher back to
// its power-on state along with the table and controllers.
pub(super) fn reset() {
    TICKS.store(0, Ordering::Relaxed);
    SPINNER_INDEX.store(0, Ordering::Relaxed);
    HALTED.store(false, Ordering::Relaxed);
}

pub fn exception_name(vector: u32) -> &'static str {
    EXCEPTION_NAMES
        .get(vector as usize)
        .copied()
        .unwrap_or("Unknown Exception")
}

/* ---------------- Entry from assembly ---------------- */

// Called by the trampoline tail with the snapshot address.
#[no_mangle]
pub extern "C" fn trap_dispatch(frame: *const TrapFrame) {
    let frame = unsafe { &*frame };

    if dispatch_trap(frame) == TrapOutcome::Halt {
        #[cfg(all(target_arch = "x86", target_os = "none"))]
        crate::arch::halt_forever();
    }
}

/* ---------------- Classification ---------------- */

pub fn dispatch_trap(frame: &TrapFrame) -> TrapOutcome {
    // Absorbing state: once halted, nothing dispatches again.
    if HALTED.load(Ordering::Relaxed) {
        return TrapOutcome::Halt;
    }

    let outcome = classify(frame);
    if outcome == TrapOutcome::Halt {
        HALTED.store(true, Ordering::Relaxed);
    }
    outcome
}

fn classify(frame: &TrapFrame) -> TrapOutcome {
    let vector = frame.vector;

    if vector == u32::from(super::TIMER_VECTOR) {
        return handle_timer();
    }

    if vector == u32::from(super::KEYBOARD_VECTOR) {
        return handle_keyboard();
    }

    without_interrupts(|| {
        vga::WRITER.lock().set_position(REPORT_ROW, 0);
    });

    console_segment(Color::White, format_args!("Received Interrupt: {}", vector));
    serial_print!("Received Interrupt: {}", vector);

    if vector < 32 {
        let name = exception_name(vector);
        console_segment(Color::White, format_args!(" ({})", name));
        serial_print!(" ({})", name);

        console_segment(
            Color::White,
            format_args!("\nError Code: {:#010X}", frame.error_code),
        );
        serial_print!("\nError Code: {:#010X}", frame.error_code);

        console_segment(Color::LightRed, format_args!("\nSystem Halted!\n"));
        serial_print!("\nSystem Halted!\n");

        return TrapOutcome::Halt;
    }

    if vector > 33 && vector < 48 {
        let irq = (vector - 32) as u8;
        console_segment(Color::LightGreen, format_args!(" (IRQ {})\n", irq));
        serial_print!(" (IRQ {})\n", irq);

        super::pic::acknowledge(irq);
        return TrapOutcome::Resume;
    }

    console_segment(Color::White, format_args!(" (Unknown Interrupt Type)\n"));
    serial_print!(" (Unknown Interrupt Type)\n");

    // The timer and keyboard arms catch 32 and 33 long before this point,
    // but any line the controllers can deliver still gets acknowledged
    // here rather than left dead.
    if (32..48).contains(&vector) {
        super::pic::acknowledge((vector - 32) as u8);
        return TrapOutcome::Resume;
    }

    console_segment(
        Color::LightRed,
        format_args!("Unexpected interrupt vector. System Halted!\n"),
    );
    serial_print!("Unexpected interrupt vector. System Halted!\n");

    TrapOutcome::Halt
}

fn handle_timer() -> TrapOutcome {
    let tick = TICKS.fetch_add(1, Ordering::Relaxed).wrapping_add(1);

    if tick % TICK_REPORT_INTERVAL == 0 {
        serial_println!("Timer tick: {}", tick);
    }

    if tick % SPINNER_REDRAW_INTERVAL == 0 {
        advance_spinner();
    }

    super::pic::acknowledge(super::TIMER_IRQ);
    TrapOutcome::Resume
}

fn handle_keyboard() -> TrapOutcome {
    let scancode = unsafe { ports::inb(KEYBOARD_DATA_PORT) };
    serial_println!("Keyboard scancode (IRQ1): {:#04X}", scancode);

    super::pic::acknowledge(super::KEYBOARD_IRQ);
    TrapOutcome::Resume
}

/* ---------------- Console report helpers ---------------- */

// One activity glyph in the top-right corner. Cursor position and active
// colors are restored afterward, so the interrupted console output never
// notices the draw.
fn advance_spinner() {
    let index = SPINNER_INDEX.load(Ordering::Relaxed);
    let glyph = SPINNER_GLYPHS[index % SPINNER_GLYPHS.len()];

    without_interrupts(|| {
        let mut writer = vga::WRITER.lock();
        let (row, col) = writer.get_position();
        let (fg, bg) = writer.colors();

        writer.set_position(0, vga::VGA_WIDTH - 1);
        writer.set_color(Color::Yellow, Color::Black);
        writer.write_byte(glyph);

        writer.set_color(fg, bg);
        writer.set_position(row, col);
    });

    SPINNER_INDEX.store((index + 1) % SPINNER_GLYPHS.len(), Ordering::Relaxed);
}

// Formatted console write in an explicit color, leaving the writer's own
// color selection untouched.
fn console_segment(color: Color, args: fmt::Arguments) {
    use core::fmt::Write;

    without_interrupts(|| {
        let mut writer = vga::WRITER.lock();
        let (fg, bg) = writer.colors();

        writer.set_color(color, Color::Black);
        let _ = writer.write_fmt(args);
        writer.set_color(fg, bg);
    });
}
