//! # QEMU Debug Console Output
//!
//! Diagnostics for the kernel core: everything the kernel reports (boot
//! progress, exception names, page-fault decodes, the final panic message)
//! goes out through QEMU's debug console, I/O port `0x402`.
//!
//! ## Output path
//! ```text
//! log::info!(..)            qemu_trace!(..)
//!     ↓                         ↓
//! QemuLogger (log::Log)  →  qemu_fmt::qemu_write
//!                               ↓
//!                     DebugConsole<X86Ports> (fmt::Write)
//!                               ↓
//!                         out 0x402, al
//! ```
//!
//! ## Components
//! * [`QemuLogger`]: `log::Log` implementation, format
//!   `"[LEVEL] target: message\n"`.
//! * [`qemu_trace!`]: raw formatted output, bypassing level filtering.
//! * [`DebugConsole`]: a `fmt::Write` sink over any [`PortIo`] bus, so the
//!   byte stream can be checked against a recording bus in tests.
//!
//! ## Feature `enabled` (default)
//! Without it, or when not building for `x86`, [`qemu_trace!`] compiles to a
//! no-op and the logger discards records.
//!
//! ## Host side
//! ```bash
//! qemu-system-i386 -kernel kernel.bin -debugcon stdio
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

use core::fmt::{self, Write};
use kernel_ports::PortIo;

pub use logger::QemuLogger;

/// The port number for QEMU's debug console.
pub const QEMU_DEBUG_PORT: u16 = 0x402;

/// `fmt::Write` adapter that emits every byte to the debug console port.
pub struct DebugConsole<P: PortIo> {
    ports: P,
}

impl<P: PortIo> DebugConsole<P> {
    pub const fn new(ports: P) -> Self {
        Self { ports }
    }

    /// Print `text` verbatim.
    pub fn print(&mut self, text: &str) {
        for b in text.bytes() {
            self.ports.write_port8(QEMU_DEBUG_PORT, b);
        }
    }

    pub fn into_inner(self) -> P {
        self.ports
    }
}

impl<P: PortIo> Write for DebugConsole<P> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.print(s);
        Ok(())
    }
}

#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline]
    #[cfg(all(feature = "enabled", target_arch = "x86"))]
    pub fn qemu_write(args: fmt::Arguments) {
        // SAFETY: the kernel runs at CPL0; 0x402 is write-only and side-effect free.
        let mut sink = super::DebugConsole::new(unsafe { kernel_ports::X86Ports::new() });
        // Best-effort debug output.
        let _ = fmt::write(&mut sink, args);
    }

    #[doc(hidden)]
    #[inline]
    #[cfg(not(all(feature = "enabled", target_arch = "x86")))]
    pub fn qemu_write(_: fmt::Arguments) {}
}

#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_ports::{PortAccess, RecordingPorts};

    #[test]
    fn console_writes_each_byte_to_debug_port() {
        let mut console = DebugConsole::new(RecordingPorts::new());
        write!(console, "ok {}", 7).unwrap();
        let bus = console.into_inner();
        assert_eq!(
            bus.log(),
            &[
                PortAccess::Write8(0x402, b'o'),
                PortAccess::Write8(0x402, b'k'),
                PortAccess::Write8(0x402, b' '),
                PortAccess::Write8(0x402, b'7'),
            ]
        );
    }
}
