//! # Virtual Memory Support
//!
//! Two-level IA-32 paging structures (no PAE) for the kernel core.
//!
//! ## What you get
//! - [`PageTableEntry`] / [`PageDirectoryEntry`] bitfields.
//! - A 4 KiB-aligned [`PageTable`] and [`PageDirectory`], the latter exposing
//!   its slots as tagged [`TableSlot`]s (empty, owned, shared with the kernel).
//! - An [`AddressSpace`] handle naming a directory by its physical frame.
//! - The [`PhysMapper`] and [`Mmu`] capabilities through which paging code
//!   touches physical memory and the CPU.
//! - [`PageFault`] decoding of the `#PF` error code.
//!
//! ## IA-32 Virtual Address → Physical Address Walk
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | Directory | Table | Offset |
//! ```
//!
//! CR3 holds the physical base of the page directory (1024 PDEs). Each
//! present PDE points at a page table (1024 PTEs); each present PTE maps one
//! 4 KiB frame. Both levels are exactly one frame in size.
//!
//! ## Kernel half
//!
//! Directory slots from 768 (`0xC000_0000`) upward map the kernel. Cloned
//! address spaces point those slots at the *same* tables as the kernel
//! directory; see [`TableSlot::SharedKernel`].
//!
//! ## Testing
//!
//! With the `arena` feature, [`arena::FrameArena`] simulates physical RAM in
//! host memory and [`arena::RecordingMmu`] records CR3 loads, `invlpg`s and
//! interrupt-flag changes.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod address_space;
mod entry;
mod fault;
mod table;

#[cfg(any(test, feature = "arena"))]
extern crate alloc;

#[cfg(any(test, feature = "arena"))]
pub mod arena;
#[cfg(all(feature = "asm", target_arch = "x86"))]
mod x86;

pub use crate::address_space::AddressSpace;
pub use crate::entry::{PageDirectoryEntry, PageTableEntry};
pub use crate::fault::{PageFault, PageFaultError};
pub use crate::table::{PageDirectory, PageTable, TableSlot};
#[cfg(all(feature = "asm", target_arch = "x86"))]
pub use crate::x86::X86Mmu;

use kernel_memory_addresses::{
    PAGE_SIZE, PhysicalAddress, PhysicalPage, VirtualAddress, VirtualPage,
};
use kernel_sync::InterruptControl;

/// Re-export constants as info module.
pub use kernel_info::memory as info;

/// Bytes in one frame, as a `usize`.
pub const FRAME_BYTES: usize = PAGE_SIZE as usize;

/// Converts physical addresses to *temporarily* usable references in the
/// current virtual address space.
///
/// Typical patterns:
/// - **Kernel**: the low physical region holding page structures is mapped
///   at `KERNEL_VIRTUAL_BASE + pa`.
/// - **Tests**: physical addresses index into a host-memory arena.
///
/// Frames outside the structure region are only reachable through the
/// temporary window, see [`PhysMapper::window`].
pub trait PhysMapper {
    /// Convert a *physical* address to a usable mutable reference.
    ///
    /// # Safety
    /// - `pa` must be mapped as writable in the current address space.
    /// - Lifetime `'a` is purely borrow-checked; the mapping must remain
    ///   valid for `'a`, and no other reference may alias it.
    /// - Type `T` must match the bytes at `pa`.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;

    /// The bytes seen through the temporary window once its PTE has been
    /// pointed at `frame` and the stale TLB entry invalidated.
    ///
    /// # Safety
    /// The window PTE must currently reference `frame`, and the caller must
    /// be the window's only user.
    unsafe fn window<'a>(&self, window: VirtualPage, frame: PhysicalPage)
    -> &'a mut [u8; FRAME_BYTES];

    /// `len` bytes of physical memory starting at `pa`.
    ///
    /// # Safety
    /// As for [`phys_to_mut`](Self::phys_to_mut), for the whole range.
    unsafe fn phys_bytes<'a>(&self, pa: PhysicalAddress, len: usize) -> &'a mut [u8] {
        let first: &mut u8 = unsafe { self.phys_to_mut(pa) };
        unsafe { core::slice::from_raw_parts_mut(core::ptr::from_mut(first), len) }
    }

    /// Borrow the [`PageTable`] stored in `frame`.
    ///
    /// # Safety
    /// `frame` must hold a page table reachable through this mapper.
    #[inline]
    unsafe fn table_mut<'a>(&self, frame: PhysicalPage) -> &'a mut PageTable {
        unsafe { self.phys_to_mut(frame.base()) }
    }

    /// Borrow the [`PageDirectory`] stored in `frame`.
    ///
    /// # Safety
    /// `frame` must hold a page directory reachable through this mapper.
    #[inline]
    unsafe fn directory_mut<'a>(&self, frame: PhysicalPage) -> &'a mut PageDirectory {
        unsafe { self.phys_to_mut(frame.base()) }
    }
}

impl<M: PhysMapper + ?Sized> PhysMapper for &M {
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { (**self).phys_to_mut(pa) }
    }

    #[inline]
    unsafe fn window<'a>(
        &self,
        window: VirtualPage,
        frame: PhysicalPage,
    ) -> &'a mut [u8; FRAME_BYTES] {
        unsafe { (**self).window(window, frame) }
    }
}

/// The CPU's paging controls.
///
/// Also an [`InterruptControl`], since directory switches and window use
/// must run with interrupts masked.
pub trait Mmu: InterruptControl {
    /// Load `directory` into CR3 and make sure CR0.PG is set.
    ///
    /// # Safety
    /// The directory must map the currently executing code and stack.
    unsafe fn load_directory(&self, directory: PhysicalPage);

    /// Drop any cached translation of `page` (`invlpg`).
    fn invalidate_page(&self, page: VirtualPage);

    /// The linear address of the most recent page fault (CR2).
    fn fault_address(&self) -> VirtualAddress;
}

impl<U: Mmu + ?Sized> Mmu for &U {
    #[inline]
    unsafe fn load_directory(&self, directory: PhysicalPage) {
        unsafe { (**self).load_directory(directory) }
    }

    #[inline]
    fn invalidate_page(&self, page: VirtualPage) {
        (**self).invalidate_page(page);
    }

    #[inline]
    fn fault_address(&self) -> VirtualAddress {
        (**self).fault_address()
    }
}
