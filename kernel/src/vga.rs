// VGA Text Mode Console
//
// Minimal 80x25 text-mode output for boot, trap reporting, and panic-time
// diagnostics. The trap dispatcher depends on the cursor interface being
// stateless and exact: it saves the position, draws one cell, and restores
// the position, and nothing else on screen may move.
//
// Key responsibilities:
// - Write characters directly to the VGA text buffer (0xB8000)
// - Provide basic text rendering with colors, scrolling, and clearing
// - Expose cursor get/set so callers can draw without disturbing output
//
// Design principles:
// - No dynamic allocation and minimal dependencies
// - Direct hardware buffer access using volatile reads and writes
// - Cursor state lives in the writer, not in hardware registers
//
// Concurrency and safety:
// - Global writer is protected by a spinlock
// - Interrupts are disabled for the duration of every locked write, so a
//   trap handler can take the same lock without deadlocking its own CPU
//
// On non-kernel targets the hardware aperture is replaced by an in-memory
// shadow buffer of identical shape, which is what the test suite inspects.

use crate::util::without_interrupts;
use core::fmt;
use core::ptr;
use spin::Mutex;

pub const VGA_WIDTH: usize = 80;
pub const VGA_HEIGHT: usize = 25;

#[cfg(all(target_arch = "x86", target_os = "none"))]
#[inline]
fn buffer_ptr() -> *mut u16 {
    0xB8000 as *mut u16
}

#[cfg(not(all(target_arch = "x86", target_os = "none")))]
mod shadow {
    use core::cell::UnsafeCell;

    pub struct Shadow(pub UnsafeCell<[u16; super::VGA_WIDTH * super::VGA_HEIGHT]>);

    // Access is serialized by the writer lock (or the test world guard).
    unsafe impl Sync for Shadow {}

    pub static BUFFER: Shadow =
        Shadow(UnsafeCell::new([0; super::VGA_WIDTH * super::VGA_HEIGHT]));
}

#[cfg(not(all(target_arch = "x86", target_os = "none")))]
#[inline]
fn buffer_ptr() -> *mut u16 {
    shadow::BUFFER.0.get() as *mut u16
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

#[inline]
fn make_color(fg: Color, bg: Color) -> u8 {
    (bg as u8) << 4 | (fg as u8)
}

#[inline]
fn make_vga_entry(c: u8, color: u8) -> u16 {
    (color as u16) << 8 | c as u16
}

pub struct VgaWriter {
    row: usize,
    col: usize,
    fg_color: Color,
    bg_color: Color,
}

impl VgaWriter {
    pub const fn new() -> Self {
        VgaWriter {
            row: 0,
            col: 0,
            fg_color: Color::White,
            bg_color: Color::Black,
        }
    }

    pub fn set_color(&mut self, fg: Color, bg: Color) {
        self.fg_color = fg;
        self.bg_color = bg;
    }

    pub fn colors(&self) -> (Color, Color) {
        (self.fg_color, self.bg_color)
    }

    pub fn clear_screen(&mut self) {
        let color = make_color(self.fg_color, self.bg_color);
        let blank = make_vga_entry(b' ', color);

        unsafe {
            for i in 0..(VGA_WIDTH * VGA_HEIGHT) {
                ptr::write_volatile(buffer_ptr().add(i), blank);
            }
        }

        self.row = 0;
        self.col = 0;
    }

    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            b'\r' => self.col = 0,
            byte => {
                if self.col >= VGA_WIDTH {
                    self.new_line();
                }

                let color = make_color(self.fg_color, self.bg_color);
                let offset = self.row * VGA_WIDTH + self.col;
                let entry = make_vga_entry(byte, color);

                unsafe {
                    ptr::write_volatile(buffer_ptr().add(offset), entry);
                }

                self.col += 1;
            }
        }
    }

    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            match byte {
                0x20..=0x7e | b'\n' | b'\r' => self.write_byte(byte),
                _ => self.write_byte(0xfe),
            }
        }
    }

    pub fn get_position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    // Column VGA_WIDTH is representable: the next write wraps, exactly as
    // if the cursor had advanced there by printing.
    pub fn set_position(&mut self, row: usize, col: usize) {
        self.row = row.min(VGA_HEIGHT - 1);
        self.col = col.min(VGA_WIDTH);
    }

    #[allow(dead_code)]
    pub fn read_cell(&self, row: usize, col: usize) -> u16 {
        let offset = (row % VGA_HEIGHT) * VGA_WIDTH + (col % VGA_WIDTH);
        unsafe { ptr::read_volatile(buffer_ptr().add(offset)) }
    }

    fn new_line(&mut self) {
        self.col = 0;
        self.row += 1;

        if self.row >= VGA_HEIGHT {
            self.scroll();
            self.row = VGA_HEIGHT - 1;
        }
    }

    fn scroll(&mut self) {
        let color = make_color(self.fg_color, self.bg_color);
        let blank = make_vga_entry(b' ', color);

        unsafe {
            for row in 1..VGA_HEIGHT {
                for col in 0..VGA_WIDTH {
                    let src = row * VGA_WIDTH + col;
                    let dst = (row - 1) * VGA_WIDTH + col;
                    let entry = ptr::read_volatile(buffer_ptr().add(src));
                    ptr::write_volatile(buffer_ptr().add(dst), entry);
                }
            }

            for col in 0..VGA_WIDTH {
                let offset = (VGA_HEIGHT - 1) * VGA_WIDTH + col;
                ptr::write_volatile(buffer_ptr().add(offset), blank);
            }
        }
    }
}

impl fmt::Write for VgaWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}

pub static WRITER: Mutex<VgaWriter> = Mutex::new(VgaWriter::new());

pub fn init() {
    without_interrupts(|| {
        WRITER.lock().clear_screen();
    });
}

pub fn display_boot_message() {
    without_interrupts(|| {
        let mut writer = WRITER.lock();
        writer.set_color(Color::LightCyan, Color::Black);
        writer.write_string(crate::build_info::BOOT_BANNER);
        writer.write_string("\n");
        writer.set_color(Color::DarkGray, Color::Black);
        writer.write_string(
            "================================================================\n\n",
        );
        writer.set_color(Color::White, Color::Black);
    });
}

// One-off write in an explicit color pair, restoring the active colors.
#[allow(dead_code)]
pub fn write_colored(s: &str, fg: Color, bg: Color) {
    without_interrupts(|| {
        let mut writer = WRITER.lock();
        let (old_fg, old_bg) = writer.colors();
        writer.set_color(fg, bg);
        writer.write_string(s);
        writer.set_color(old_fg, old_bg);
    });
}

#[allow(dead_code)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;

    without_interrupts(|| {
        let _ = WRITER.lock().write_fmt(args);
    });
}

#[macro_export]
macro_rules! vga_print {
    ($($arg:tt)*) => ($crate::vga::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! vga_println {
    () => ($crate::vga_print!("\n"));
    ($($arg:tt)*) => ($crate::vga_print!("{}\n", format_args!($($arg)*)));
}
