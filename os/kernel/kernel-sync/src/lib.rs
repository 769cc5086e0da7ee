//! # Kernel synchronization primitives
//!
//! The kernel runs on a single CPU; the only concurrency is interrupt
//! preemption and cooperative process switches. Two tools cover that:
//!
//! * [`SpinLock`] for exclusive access to shared kernel state (heap, frame
//!   bitmap, handler registry), and
//! * [`IrqGuard`] to keep interrupt handlers out of a critical section, built
//!   on the [`InterruptControl`] capability so host tests can observe it.
//!
//! [`SyncOnceCell`] publishes the global kernel context once at boot.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;
mod sync_once_cell;

#[cfg(all(feature = "asm", target_arch = "x86"))]
pub use irq::X86Interrupts;
pub use irq::{InterruptControl, IrqGuard, IrqSpinLockGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
