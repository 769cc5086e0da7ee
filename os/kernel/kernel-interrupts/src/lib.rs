//! # Interrupt Dispatch
//!
//! Everything between the CPU raising a vector and a kernel handler running:
//!
//! ```text
//!  CPU ──► IDT gate (vector n) ──► entry stub n ──► common stub (pusha, ds)
//!                                                        │
//!                                                        ▼
//!                                           dispatch(&mut TrapFrame)
//!                                ┌───────────────────────┼───────────────────────┐
//!                          0‒31 exceptions          32‒47 IRQs              48‒255
//!                     handler or report+panic   EOI first, then handler   handler if any
//! ```
//!
//! ## Components
//! * [`Idt`]: the 256-gate table, [`Idt::install_vector`] and `lidt`.
//! * [`ChainedPics`]: 8259A remap and end-of-interrupt.
//! * [`Pit`]: the 8253/8254 interval timer and its tick counter.
//! * [`InterruptRegistry`]: vector → handler, silently overwritten.
//! * [`dispatch`]: the routing rules above.
//! * [`exception_message`]: names of the 32 CPU exception vectors.
//!
//! Port I/O goes through [`kernel_ports::PortIo`], so remap and EOI
//! sequences are checked against a recording bus on the host.
//!
//! ## Entry stubs
//! On `x86` with the `asm` feature the crate also carries the 256 entry
//! stubs and the common stub. The common stub calls the `kernel_trap_entry`
//! symbol, which the kernel binary provides.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod dispatch;
mod exceptions;
mod idt;
mod pic;
mod pit;
mod registry;
mod trap_frame;

#[cfg(all(feature = "asm", target_arch = "x86"))]
pub mod x86;

pub use dispatch::{Dispatch, UnhandledException, dispatch};
pub use exceptions::{EXCEPTION_MESSAGES, exception_message};
pub use idt::{GateAttributes, Idt, IdtEntry, IdtPointer};
pub use pic::ChainedPics;
pub use pit::{Pit, PitCommand, PitError, Ticks};
pub use registry::{InterruptHandler, InterruptRegistry};
pub use trap_frame::TrapFrame;

/// Number of gates in the IDT.
pub const IDT_ENTRIES: usize = 256;

/// Kernel code segment selector (first GDT entry after the null descriptor).
pub const KERNEL_CS: u16 = 0x08;

/// Kernel data segment selector, reloaded into `ds`/`es`/`fs`/`gs` on entry.
pub const KERNEL_DS: u16 = 0x10;

/// CPU exception vectors are `0..EXCEPTION_VECTORS`.
pub const EXCEPTION_VECTORS: u32 = 32;

/// The page-fault exception vector.
pub const PAGE_FAULT_VECTOR: u8 = 14;

/// Hardware interrupt lines behind the two PICs.
pub const IRQ_LINES: u8 = 16;

/// IRQ0 (timer) after the canonical remap.
pub const IRQ0: u8 = 32;

/// IRQ1 (keyboard) after the canonical remap.
pub const IRQ1: u8 = 33;
