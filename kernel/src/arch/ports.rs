// Port I/O Primitives
//
// Single-byte access to the x86 I/O address space. Every device this kernel
// programs (interrupt controllers, interval timer, UART, keyboard controller)
// is reached through these two instructions, so this is the only module that
// issues `in`/`out` directly.
//
// On any target other than the bare-metal kernel the instructions are not
// available, and reads/writes are routed to a recording bus instead. The bus
// keeps an ordered log of every write and answers reads from per-port
// programmed values, falling back to the last value written to that port and
// finally to 0xFF. That default is deliberate: an untouched interrupt
// controller reads back as fully masked, and an idle UART reports its
// transmitter empty, which is exactly the reset state the drivers expect.

#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    #[cfg(all(target_arch = "x86", target_os = "none"))]
    core::arch::asm!("out dx, al", in("dx") port, in("al") value);

    #[cfg(not(all(target_arch = "x86", target_os = "none")))]
    mock::write(port, value);
}

#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    #[cfg(all(target_arch = "x86", target_os = "none"))]
    {
        let value: u8;
        core::arch::asm!("in al, dx", out("al") value, in("dx") port);
        value
    }

    #[cfg(not(all(target_arch = "x86", target_os = "none")))]
    mock::read(port)
}

// Write to an unused port; gives slow devices one bus cycle to settle
// between programming steps.
#[inline]
pub unsafe fn io_wait() {
    outb(0x80, 0);
}

/* ---------------- Recording bus (host builds) ---------------- */

#[cfg(not(all(target_arch = "x86", target_os = "none")))]
#[allow(dead_code)]
pub mod mock {
    use spin::Mutex;

    const WRITE_LOG_CAPACITY: usize = 16384;
    const PORT_SPACE: usize = 1 << 16;

    pub struct MockBus {
        writes: [(u16, u8); WRITE_LOG_CAPACITY],
        write_count: usize,
        latched: [u8; PORT_SPACE],
        latch_valid: [bool; PORT_SPACE],
        programmed: [u8; PORT_SPACE],
        programmed_valid: [bool; PORT_SPACE],
    }

    impl MockBus {
        const fn new() -> Self {
            MockBus {
                writes: [(0, 0); WRITE_LOG_CAPACITY],
                write_count: 0,
                latched: [0; PORT_SPACE],
                latch_valid: [false; PORT_SPACE],
                programmed: [0; PORT_SPACE],
                programmed_valid: [false; PORT_SPACE],
            }
        }

        fn record(&mut self, port: u16, value: u8) {
            if self.write_count < WRITE_LOG_CAPACITY {
                self.writes[self.write_count] = (port, value);
                self.write_count += 1;
            }
            self.latched[port as usize] = value;
            self.latch_valid[port as usize] = true;
        }

        fn answer(&self, port: u16) -> u8 {
            if self.programmed_valid[port as usize] {
                self.programmed[port as usize]
            } else if self.latch_valid[port as usize] {
                self.latched[port as usize]
            } else {
                0xFF
            }
        }

        // Ordered log of every write since the last clear.
        pub fn writes(&self) -> &[(u16, u8)] {
            &self.writes[..self.write_count]
        }

        // Pin the value reads of `port` return, overriding any latched write.
        pub fn program_read(&mut self, port: u16, value: u8) {
            self.programmed[port as usize] = value;
            self.programmed_valid[port as usize] = true;
        }

        pub fn clear(&mut self) {
            self.write_count = 0;
            self.latch_valid = [false; PORT_SPACE];
            self.programmed_valid = [false; PORT_SPACE];
        }
    }

    static BUS: Mutex<MockBus> = Mutex::new(MockBus::new());

    pub(super) fn write(port: u16, value: u8) {
        BUS.lock().record(port, value);
    }

    pub(super) fn read(port: u16) -> u8 {
        BUS.lock().answer(port)
    }

    // Inspect or program the bus. Drop the guard before driving any code
    // that performs port I/O, or that code will spin on the bus lock.
    pub fn bus() -> spin::MutexGuard<'static, MockBus> {
        BUS.lock()
    }

    static WORLD: Mutex<()> = Mutex::new(());

    // Serializes tests that touch shared kernel state and hands them a
    // freshly cleared bus.
    pub fn exclusive() -> spin::MutexGuard<'static, ()> {
        let world = WORLD.lock();
        BUS.lock().clear();
        world
    }
}
