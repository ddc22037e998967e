// Whole-subsystem tests: synthetic traps pushed through the public
// dispatch path, observed at the mock port bus, the shadow console, and
// the mock gate-load state. `interrupts::init()` is the restart boundary
// every test starts from.

use super::handlers::{self, dispatch_trap, TrapFrame, TrapOutcome};
use super::{idt, pic, stubs};
use crate::arch::ports::mock;
use crate::arch::KERNEL_CODE_SELECTOR;
use crate::vga::{self, Color};

const SERIAL_DATA: u16 = 0x3F8;
const KEYBOARD_DATA: u16 = 0x60;
const MASTER_COMMAND: u16 = 0x20;
const SLAVE_COMMAND: u16 = 0xA0;
const EOI: u8 = 0x20;

fn frame(vector: u32, error_code: u32) -> TrapFrame {
    TrapFrame {
        ds: 0x10,
        edi: 0,
        esi: 0,
        ebp: 0,
        esp: 0,
        ebx: 0,
        edx: 0,
        ecx: 0,
        eax: 0,
        vector,
        error_code,
        eip: 0x0010_0000,
        cs: 0x08,
        eflags: 0x202,
        user_esp: 0,
        ss: 0,
    }
}

fn serial_text(writes: &[(u16, u8)]) -> String {
    writes
        .iter()
        .filter(|(port, _)| *port == SERIAL_DATA)
        .map(|(_, value)| char::from(*value))
        .collect()
}

fn eoi_writes(writes: &[(u16, u8)]) -> Vec<(u16, u8)> {
    writes
        .iter()
        .copied()
        .filter(|(port, value)| {
            (*port == MASTER_COMMAND || *port == SLAVE_COMMAND) && *value == EOI
        })
        .collect()
}

fn reset_console() {
    let mut writer = vga::WRITER.lock();
    writer.set_color(Color::White, Color::Black);
    writer.clear_screen();
}

#[test]
fn init_leaves_every_entry_absent_or_fully_wired() {
    let _world = mock::exclusive();
    super::init();

    let mut wired = 0;
    for vector in 0u16..256 {
        let gate = idt::entry(vector as u8);
        if gate.is_present() {
            wired += 1;
            assert_eq!(gate.handler_address(), stubs::entry_address(vector as u8));
            assert_eq!(gate.selector(), KERNEL_CODE_SELECTOR);
            assert_eq!(gate.type_attr(), idt::GATE_TYPE_INTERRUPT);
        } else {
            assert_eq!(gate.handler_address(), 0);
            assert_eq!(gate.selector(), 0);
            assert_eq!(gate.type_attr(), 0);
        }
    }

    assert_eq!(wired, stubs::VECTORS.len());
}

#[test]
fn table_descriptor_round_trips_after_load() {
    let _world = mock::exclusive();
    super::init();

    let descriptor = idt::active_descriptor();
    let limit = descriptor.limit;
    let base = descriptor.base;
    assert_eq!(limit, 2047);
    assert_eq!(base, idt::table_base());
}

#[test]
fn tick_counter_advances_by_one_per_timer_trap() {
    let _world = mock::exclusive();
    super::init();

    assert_eq!(super::get_ticks(), 0);
    for expected in 1u32..=5 {
        assert_eq!(dispatch_trap(&frame(32, 0)), TrapOutcome::Resume);
        assert_eq!(super::get_ticks(), expected);
    }

    for _ in 5..2000 {
        dispatch_trap(&frame(32, 0));
    }
    assert_eq!(super::get_ticks(), 2000);
}

#[test]
fn timer_trap_preserves_cursor_and_colors() {
    let _world = mock::exclusive();
    super::init();
    reset_console();
    vga::WRITER.lock().set_position(3, 7);

    for _ in 0..40 {
        assert_eq!(dispatch_trap(&frame(32, 0)), TrapOutcome::Resume);
    }

    let writer = vga::WRITER.lock();
    assert_eq!(writer.get_position(), (3, 7));
    assert_eq!(writer.colors(), (Color::White, Color::Black));

    // Second redraw happened at tick 40: backslash in yellow, top right.
    let cell = writer.read_cell(0, vga::VGA_WIDTH - 1);
    assert_eq!(cell, 0x0E00 | u16::from(b'\\'));
}

#[test]
fn spinner_cycles_through_its_glyphs() {
    let _world = mock::exclusive();
    super::init();
    reset_console();

    let mut seen = Vec::new();
    for _ in 0..4 {
        for _ in 0..20 {
            dispatch_trap(&frame(32, 0));
        }
        let cell = vga::WRITER.lock().read_cell(0, vga::VGA_WIDTH - 1);
        assert_eq!(cell >> 8, 0x0E);
        seen.push((cell & 0xFF) as u8);
    }

    assert_eq!(seen.as_slice(), b"-\\|/");
}

#[test]
fn hundredth_tick_reports_on_serial() {
    let _world = mock::exclusive();
    super::init();

    let start = mock::bus().writes().len();
    for _ in 0..100 {
        dispatch_trap(&frame(32, 0));
    }

    let writes = mock::bus().writes().to_vec();
    assert!(serial_text(&writes[start..]).contains("Timer tick: 100\r\n"));
}

#[test]
fn keyboard_trap_drains_and_reports_the_scancode() {
    let _world = mock::exclusive();
    super::init();
    mock::bus().program_read(KEYBOARD_DATA, 0x1E);

    let start = mock::bus().writes().len();
    assert_eq!(dispatch_trap(&frame(33, 0)), TrapOutcome::Resume);

    let writes = mock::bus().writes().to_vec();
    assert!(serial_text(&writes[start..]).contains("Keyboard scancode (IRQ1): 0x1E\r\n"));

    // Master-line acknowledge goes to the master chip only.
    assert_eq!(eoi_writes(&writes[start..]), [(MASTER_COMMAND, EOI)]);
}

#[test]
fn divide_by_zero_reports_and_halts_for_good() {
    let _world = mock::exclusive();
    super::init();
    reset_console();

    let start = mock::bus().writes().len();
    assert_eq!(dispatch_trap(&frame(0, 0)), TrapOutcome::Halt);
    assert!(handlers::is_halted());

    let writes = mock::bus().writes().to_vec();
    let serial = serial_text(&writes[start..]);
    assert!(serial.contains("Received Interrupt: 0 (Divide By Zero Error)"));
    assert!(serial.contains("Error Code: 0x00000000"));
    assert!(serial.contains("System Halted!"));

    {
        let writer = vga::WRITER.lock();

        // The report lands on the fixed fault row.
        let mut row_text = String::new();
        for col in 0..vga::VGA_WIDTH {
            row_text.push(char::from((writer.read_cell(5, col) & 0xFF) as u8));
        }
        assert!(row_text.starts_with("Received Interrupt: 0 (Divide By Zero Error)"));

        // The halt line two rows below is light red.
        assert_eq!(writer.read_cell(7, 0), 0x0C00 | u16::from(b'S'));
    }

    // Halt is absorbing: no further dispatch is observable.
    let ticks_before = super::get_ticks();
    assert_eq!(dispatch_trap(&frame(32, 0)), TrapOutcome::Halt);
    assert_eq!(super::get_ticks(), ticks_before);
}

#[test]
fn recognized_irq_reports_in_green_and_resumes() {
    let _world = mock::exclusive();
    super::init();
    reset_console();

    let start = mock::bus().writes().len();
    assert_eq!(dispatch_trap(&frame(40, 0)), TrapOutcome::Resume);
    assert!(!handlers::is_halted());

    let writes = mock::bus().writes().to_vec();
    assert!(serial_text(&writes[start..]).contains("Received Interrupt: 40 (IRQ 8)"));

    // Slave-then-master acknowledge for a slave line.
    assert_eq!(
        eoi_writes(&writes[start..]),
        [(SLAVE_COMMAND, EOI), (MASTER_COMMAND, EOI)]
    );

    let writer = vga::WRITER.lock();
    assert_eq!(writer.read_cell(5, 0) >> 8, 0x0F);
    assert_eq!(writer.read_cell(5, 23) >> 8, 0x0A);
    assert_eq!(writer.read_cell(5, 23) & 0xFF, u16::from(b'('));
}

#[test]
fn unknown_vector_beyond_the_controllers_halts() {
    let _world = mock::exclusive();
    super::init();
    reset_console();

    let start = mock::bus().writes().len();
    assert_eq!(dispatch_trap(&frame(0x69, 0)), TrapOutcome::Halt);
    assert!(handlers::is_halted());

    let writes = mock::bus().writes().to_vec();
    let serial = serial_text(&writes[start..]);
    assert!(serial.contains("Received Interrupt: 105 (Unknown Interrupt Type)"));
    assert!(serial.contains("Unexpected interrupt vector. System Halted!"));

    // Nothing to acknowledge: the vector maps to no controller line.
    assert!(eoi_writes(&writes[start..]).is_empty());
}

#[test]
fn eoi_write_count_matches_line_classes() {
    let _world = mock::exclusive();

    let lines = [0u8, 3, 7, 1, 8, 12, 15, 9];
    for &irq in &lines {
        pic::acknowledge(irq);
    }

    let writes = mock::bus().writes().to_vec();
    let master_lines = lines.iter().filter(|&&n| n < 8).count();
    let slave_lines = lines.iter().filter(|&&n| n >= 8).count();
    assert_eq!(eoi_writes(&writes).len(), master_lines + 2 * slave_lines);
}

#[test]
fn unmasked_lines_are_exactly_the_claimed_ones() {
    let _world = mock::exclusive();
    super::init();
    assert_eq!(pic::read_masks(), (0xFF, 0xFF));

    crate::pit::init(100);
    pic::unmask(super::KEYBOARD_IRQ);
    assert_eq!(pic::read_masks(), (0xFC, 0xFF));

    assert_eq!(dispatch_trap(&frame(32, 0)), TrapOutcome::Resume);
    assert_eq!(dispatch_trap(&frame(33, 0)), TrapOutcome::Resume);

    // Dispatch never touches the mask registers; every unclaimed line
    // stays masked at the hardware boundary.
    assert_eq!(pic::read_masks(), (0xFC, 0xFF));
}
