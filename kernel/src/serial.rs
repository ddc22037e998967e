// Serial Port Driver (Kernel Diagnostic Channel)
//
// Minimal driver for the legacy COM1 UART (0x3F8), the kernel's ground-truth
// diagnostic sink. The trap dispatcher reports through this channel before
// taking any terminal action, so it has to work from the first instruction
// after boot: no heap, no interrupts, no device discovery.
//
// Key responsibilities:
// - Initialize COM1 in a known-good configuration
// - Provide byte- and string-level output primitives
// - Integrate with `fmt::Write` for formatted output
// - Expose kernel-wide `serial_print!` / `serial_println!` macros
//
// Implementation details:
// - UART is configured for 115200 baud (divisor = 1), 8N1, FIFO on
// - Transmit polls the line-status register before each byte; the wait is
//   bounded by the UART draining its FIFO, never by another CPU
// - Newlines are normalized to CRLF for terminal compatibility
//
// Concurrency and safety:
// - Global `SERIAL1` is protected by a spinlock
// - Interrupts are disabled during `_print` so trap-context output cannot
//   deadlock against an interrupted writer

use crate::arch::ports::{inb, outb};
use crate::util::without_interrupts;
use core::fmt;

const COM1: u16 = 0x3F8;

pub struct SerialPort {
    base: u16,
}

impl SerialPort {
    pub const fn new(base: u16) -> Self {
        SerialPort { base }
    }

    pub fn init(&self) {
        unsafe {
            outb(self.base + 1, 0x00); // interrupts off
            outb(self.base + 3, 0x80); // DLAB on
            outb(self.base + 0, 0x01); // divisor low: 115200 baud
            outb(self.base + 1, 0x00); // divisor high
            outb(self.base + 3, 0x03); // 8N1, DLAB off
            outb(self.base + 2, 0xC7); // FIFO on, cleared, 14-byte threshold
            outb(self.base + 4, 0x0B); // DTR + RTS + OUT2
        }
    }

    fn is_transmit_empty(&self) -> bool {
        unsafe { inb(self.base + 5) & 0x20 != 0 }
    }

    pub fn write_byte(&self, byte: u8) {
        while !self.is_transmit_empty() {
            core::hint::spin_loop();
        }

        unsafe {
            outb(self.base, byte);
        }
    }

    pub fn write_str(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        SerialPort::write_str(self, s);
        Ok(())
    }
}

pub static SERIAL1: spin::Mutex<SerialPort> = spin::Mutex::new(SerialPort::new(COM1));

pub fn init() {
    SERIAL1.lock().init();
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;

    without_interrupts(|| {
        let _ = SERIAL1.lock().write_fmt(args);
    });
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => ($crate::serial::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ports::mock;

    fn data_bytes(writes: &[(u16, u8)]) -> Vec<u8> {
        writes
            .iter()
            .filter(|(port, _)| *port == COM1)
            .map(|(_, value)| *value)
            .collect()
    }

    #[test]
    fn init_programs_the_documented_registers() {
        let _world = mock::exclusive();

        init();

        let writes: Vec<_> = mock::bus().writes().to_vec();
        assert_eq!(
            writes,
            vec![
                (COM1 + 1, 0x00),
                (COM1 + 3, 0x80),
                (COM1 + 0, 0x01),
                (COM1 + 1, 0x00),
                (COM1 + 3, 0x03),
                (COM1 + 2, 0xC7),
                (COM1 + 4, 0x0B),
            ]
        );
    }

    #[test]
    fn newline_is_framed_as_crlf() {
        let _world = mock::exclusive();

        SERIAL1.lock().write_str("ab\nc");

        let writes: Vec<_> = mock::bus().writes().to_vec();
        assert_eq!(data_bytes(&writes), b"ab\r\nc");
    }

    #[test]
    fn formatted_output_reaches_the_wire() {
        let _world = mock::exclusive();

        crate::serial_println!("tick {}", 42);

        let writes: Vec<_> = mock::bus().writes().to_vec();
        assert_eq!(data_bytes(&writes), b"tick 42\r\n");
    }
}
