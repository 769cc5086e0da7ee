//! # x86 I/O Port Access
//!
//! The legacy I/O port space (`0x0000..=0xFFFF`) is how the kernel talks to
//! the interrupt controllers, the interval timer and the QEMU debug console.
//! This crate exposes it as a capability, [`PortIo`], so that the code which
//! programs those devices can be exercised against a fake bus on the host.
//!
//! ## Ports used by the kernel core
//! ```text
//! 0x0020-0x0021   PIC #1 (master) command / data
//! 0x0040, 0x0043  PIT channel 0 data, mode/command
//! 0x00A0-0x00A1   PIC #2 (slave) command / data
//! 0x0402          QEMU debug console
//! ```
//!
//! ## Implementations
//! * [`X86Ports`]: executes `in`/`out` (only on `target_arch = "x86"` with
//!   the `asm` feature).
//! * [`RecordingPorts`]: remembers every access in order and replays
//!   scripted reads (feature `recording`).
//!
//! ## Safety model
//! Port writes can wedge the machine (remapping the PIC, reprogramming
//! timers). The trait methods are safe to call; the unsafety lives in
//! constructing a real port bus, see [`X86Ports::new`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(any(test, feature = "recording"))]
extern crate alloc;

#[cfg(any(test, feature = "recording"))]
mod recording;
#[cfg(all(target_arch = "x86", feature = "asm"))]
mod x86;

#[cfg(any(test, feature = "recording"))]
pub use recording::{PortAccess, RecordingPorts};
#[cfg(all(target_arch = "x86", feature = "asm"))]
pub use x86::X86Ports;

/// Byte and word access to the I/O port space.
///
/// No operation can fail; what a device does with the value is the caller's
/// concern.
pub trait PortIo {
    /// Read one byte (`in al, dx`).
    fn read_port8(&mut self, port: u16) -> u8;

    /// Read one word (`in ax, dx`).
    fn read_port16(&mut self, port: u16) -> u16;

    /// Write one byte (`out dx, al`).
    fn write_port8(&mut self, port: u16, value: u8);

    /// Write one word (`out dx, ax`).
    fn write_port16(&mut self, port: u16, value: u16);
}

impl<P: PortIo + ?Sized> PortIo for &mut P {
    #[inline]
    fn read_port8(&mut self, port: u16) -> u8 {
        (**self).read_port8(port)
    }

    #[inline]
    fn read_port16(&mut self, port: u16) -> u16 {
        (**self).read_port16(port)
    }

    #[inline]
    fn write_port8(&mut self, port: u16, value: u8) {
        (**self).write_port8(port, value);
    }

    #[inline]
    fn write_port16(&mut self, port: u16, value: u16) {
        (**self).write_port16(port, value);
    }
}
