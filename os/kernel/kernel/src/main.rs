//! # Kernel Entry Point
//!
//! The boot stage copies the image to [`PHYS_LOAD`](kernel_info::memory::PHYS_LOAD),
//! makes the first 4 MiB of physical memory visible at
//! [`KERNEL_VIRTUAL_BASE`](kernel_info::memory::KERNEL_VIRTUAL_BASE) and calls
//! `_start` with a pointer to a [`KernelBootInfo`](kernel_info::boot::KernelBootInfo).
//! From there:
//!
//! ```text
//! _start ─► kernel_entry ─► kernel_main
//!                             ├─ logger
//!                             ├─ PIC remap, IDT
//!                             ├─ paging (kernel directory, fault handler, CR3)
//!                             ├─ kernel heap ─► global allocator
//!                             ├─ process table, init
//!                             └─ PIT, sti, idle loop
//! ```
//!
//! Everything below only exists for the bare-metal target; host builds of
//! the workspace produce an empty binary.

#![cfg_attr(target_os = "none", no_std, no_main)]
#![allow(unsafe_code)]

#[cfg(target_os = "none")]
extern crate alloc;

#[cfg(target_os = "none")]
mod boot;
#[cfg(target_os = "none")]
mod context;
#[cfg(target_os = "none")]
mod logging;
#[cfg(target_os = "none")]
mod memory;
#[cfg(target_os = "none")]
mod panic;
#[cfg(target_os = "none")]
mod scheduler;
#[cfg(target_os = "none")]
mod trap;

#[cfg(not(target_os = "none"))]
fn main() {}
