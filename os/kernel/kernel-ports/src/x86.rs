use crate::PortIo;

/// The real I/O port bus.
///
/// Zero-sized; every call compiles down to a single `in`/`out`.
#[derive(Debug)]
pub struct X86Ports {
    _private: (),
}

impl X86Ports {
    /// Obtain access to the port bus.
    ///
    /// # Safety
    /// You must uphold **all** of the following for every access made through
    /// the returned value:
    /// - **Privilege:** Execute at CPL0 **or** have I/O permission (IOPL) for
    ///   the port. Otherwise the CPU raises `#GP`.
    /// - **Correct port:** Writing the wrong value to the wrong device can
    ///   disable the PIC or reprogram timers.
    /// - **Concurrency:** Multi-step device protocols (PIC initialization
    ///   words, PIT divisor bytes) must not be interleaved with other users of
    ///   the same device; run them with interrupts disabled.
    /// - **Ordering:** `in`/`out` are ordered with each other but are not a
    ///   general memory fence.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PortIo for X86Ports {
    #[inline]
    fn read_port8(&mut self, port: u16) -> u8 {
        let v: u8;
        unsafe {
            core::arch::asm!("in al, dx", in("dx") port, out("al") v, options(nomem, nostack, preserves_flags));
        }
        v
    }

    #[inline]
    fn read_port16(&mut self, port: u16) -> u16 {
        let v: u16;
        unsafe {
            core::arch::asm!("in ax, dx", in("dx") port, out("ax") v, options(nomem, nostack, preserves_flags));
        }
        v
    }

    #[inline]
    fn write_port8(&mut self, port: u16, value: u8) {
        unsafe {
            core::arch::asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
        }
    }

    #[inline]
    fn write_port16(&mut self, port: u16, value: u16) {
        unsafe {
            core::arch::asm!("out dx, ax", in("dx") port, in("ax") value, options(nomem, nostack, preserves_flags));
        }
    }
}
