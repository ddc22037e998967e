// 8259 Interrupt Controller Pair
//
// Reprograms the two cascaded controllers so hardware lines land on
// vectors 32-47 instead of the power-on mapping, which collides with the
// CPU exception range. The initialization word sequence is strictly
// ordered: after ICW1 both chips expect exactly ICW2, ICW3 and ICW4 on
// their data ports, in that order, and only then does a data-port write
// mean "interrupt mask" again. A settle write to an unused port follows
// each programming step; the controllers are older than the bus and need
// the breathing room on real hardware.
//
// Remap leaves every line masked. Callers unmask exactly the lines they
// serve (the timer module takes IRQ0, boot takes IRQ1), which keeps
// spurious lines silent instead of flooding the dispatcher.
//
// Acknowledgment is the classic two-step: lines 8-15 arrive through the
// slave chip, and both chips hold an in-service bit for them, so the
// end-of-interrupt command goes to the slave first and always to the
// master. Skipping the slave write leaves its line permanently
// in-service, which silently deafens lines of equal or lower priority.

use crate::arch::ports;
use crate::log_debug;

const LOG_ORIGIN: &str = "pic";

const MASTER_COMMAND: u16 = 0x20;
const MASTER_DATA: u16 = 0x21;
const SLAVE_COMMAND: u16 = 0xA0;
const SLAVE_DATA: u16 = 0xA1;

// ICW1 bits: start initialization, ICW4 present.
const ICW1_INIT: u8 = 0x10;
const ICW1_ICW4: u8 = 0x01;
// ICW4: 8086/88 mode.
const ICW4_8086: u8 = 0x01;

const EOI: u8 = 0x20;

pub const MASTER_VECTOR_OFFSET: u8 = 32;
pub const SLAVE_VECTOR_OFFSET: u8 = 40;

pub fn remap() {
    unsafe {
        // ICW1: begin initialization on both chips.
        ports::outb(MASTER_COMMAND, ICW1_INIT | ICW1_ICW4);
        ports::io_wait();
        ports::outb(SLAVE_COMMAND, ICW1_INIT | ICW1_ICW4);
        ports::io_wait();

        // ICW2: vector bases. IRQ0-7 -> 32-39, IRQ8-15 -> 40-47.
        ports::outb(MASTER_DATA, MASTER_VECTOR_OFFSET);
        ports::io_wait();
        ports::outb(SLAVE_DATA, SLAVE_VECTOR_OFFSET);
        ports::io_wait();

        // ICW3: cascade wiring. The slave hangs off master line 2.
        ports::outb(MASTER_DATA, 0x04);
        ports::io_wait();
        ports::outb(SLAVE_DATA, 0x02);
        ports::io_wait();

        // ICW4: 8086 mode.
        ports::outb(MASTER_DATA, ICW4_8086);
        ports::io_wait();
        ports::outb(SLAVE_DATA, ICW4_8086);
        ports::io_wait();
    }

    // Mask every line; callers unmask what they serve.
    write_masks(0xFF, 0xFF);

    log_debug!(
        LOG_ORIGIN,
        "Controllers remapped: IRQ0-15 -> vectors {}-{}, all lines masked",
        MASTER_VECTOR_OFFSET,
        SLAVE_VECTOR_OFFSET + 7
    );
}

// `irq` is a line number 0-15.
pub fn acknowledge(irq: u8) {
    unsafe {
        if irq >= 8 {
            ports::outb(SLAVE_COMMAND, EOI);
        }
        ports::outb(MASTER_COMMAND, EOI);
    }
}

pub fn unmask(irq: u8) {
    let (port, bit) = line(irq);
    unsafe {
        let value = ports::inb(port);
        ports::outb(port, value & !(1 << bit));
    }
}

#[allow(dead_code)]
pub fn mask(irq: u8) {
    let (port, bit) = line(irq);
    unsafe {
        let value = ports::inb(port);
        ports::outb(port, value | (1 << bit));
    }
}

#[allow(dead_code)]
pub fn read_masks() -> (u8, u8) {
    unsafe { (ports::inb(MASTER_DATA), ports::inb(SLAVE_DATA)) }
}

pub fn write_masks(master: u8, slave: u8) {
    unsafe {
        ports::outb(MASTER_DATA, master);
        ports::outb(SLAVE_DATA, slave);
    }
}

fn line(irq: u8) -> (u16, u8) {
    if irq < 8 {
        (MASTER_DATA, irq)
    } else {
        (SLAVE_DATA, irq - 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ports::mock;

    const CONTROLLER_PORTS: [u16; 5] = [
        MASTER_COMMAND,
        MASTER_DATA,
        SLAVE_COMMAND,
        SLAVE_DATA,
        0x80,
    ];

    #[test]
    fn remap_programs_both_chips_in_icw_order() {
        let _world = mock::exclusive();

        remap();

        let writes = mock::bus().writes().to_vec();
        let expected = [
            (MASTER_COMMAND, 0x11),
            (0x80, 0),
            (SLAVE_COMMAND, 0x11),
            (0x80, 0),
            (MASTER_DATA, 32),
            (0x80, 0),
            (SLAVE_DATA, 40),
            (0x80, 0),
            (MASTER_DATA, 0x04),
            (0x80, 0),
            (SLAVE_DATA, 0x02),
            (0x80, 0),
            (MASTER_DATA, 0x01),
            (0x80, 0),
            (SLAVE_DATA, 0x01),
            (0x80, 0),
            (MASTER_DATA, 0xFF),
            (SLAVE_DATA, 0xFF),
        ];
        assert_eq!(&writes[..expected.len()], &expected);

        // Whatever follows is log traffic on the serial ports, never the
        // controllers.
        for (port, _) in &writes[expected.len()..] {
            assert!(!CONTROLLER_PORTS.contains(port));
        }
    }

    #[test]
    fn remap_leaves_every_line_masked() {
        let _world = mock::exclusive();

        remap();

        assert_eq!(read_masks(), (0xFF, 0xFF));
    }

    #[test]
    fn unmask_and_mask_touch_one_bit() {
        let _world = mock::exclusive();
        remap();

        unmask(1);
        assert_eq!(read_masks(), (0xFD, 0xFF));

        unmask(8);
        assert_eq!(read_masks(), (0xFD, 0xFE));

        mask(1);
        assert_eq!(read_masks(), (0xFF, 0xFE));
    }

    #[test]
    fn write_masks_replaces_both_registers() {
        let _world = mock::exclusive();
        remap();

        write_masks(0x55, 0xAA);

        assert_eq!(read_masks(), (0x55, 0xAA));
    }

    #[test]
    fn master_line_acknowledge_hits_master_only() {
        let _world = mock::exclusive();

        acknowledge(1);

        assert_eq!(mock::bus().writes(), &[(MASTER_COMMAND, EOI)]);
    }

    #[test]
    fn slave_line_acknowledge_is_slave_then_master() {
        let _world = mock::exclusive();

        acknowledge(12);

        assert_eq!(
            mock::bus().writes(),
            &[(SLAVE_COMMAND, EOI), (MASTER_COMMAND, EOI)]
        );
    }
}
