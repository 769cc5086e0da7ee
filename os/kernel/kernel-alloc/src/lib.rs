//! # Kernel Memory Allocation and Paging
//!
//! Physical frame tracking, the paging subsystem and the kernel heap.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Kernel Heap ([`heap`])              │
//! │    • Size-ordered hole index                        │
//! │    • Tagged blocks, coalescing on free              │
//! │    • Grows and contracts through HeapBacking        │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ grow / shrink
//! ┌─────────────────▼───────────────────────────────────┐
//! │             Paging Subsystem ([`vmm`])              │
//! │    • Kernel directory bring-up                      │
//! │    • get_page, clone, directory switch              │
//! │    • Temporary window ([`window`])                  │
//! └───────┬─────────────────────────────────┬───────────┘
//!         │                                 │
//! ┌───────▼───────────────────┐ ┌───────────▼───────────┐
//! │ Frame bitmap              │ │ Bootstrap allocator   │
//! │ ([`frame_alloc`])         │ │ ([`bootstrap`])       │
//! │ one bit per 4 KiB frame   │ │ bump pointer for page │
//! │                           │ │ structures            │
//! └───────────────────────────┘ └───────────────────────┘
//! ```
//!
//! ## Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │        User space               │
//! 0xBFFF_FFFF ├─────────────────────────────────┤ user stack top
//! 0xC000_0000 │ Low memory (boot, GDT, video)   │ KERNEL_VIRTUAL_BASE + pa
//! 0xC010_0000 │ Bootstrap region                │ page structures, bitmap
//! 0xC03F_F000 │ Temporary window                │
//! 0xC040_0000 │ Kernel heap (index, blocks)     │
//! 0xC100_0000 └─────────────────────────────────┘ heap ceiling
//! ```
//!
//! The bootstrap region is reachable at `KERNEL_VIRTUAL_BASE + pa` through
//! [`phys_mapper::OffsetPhysMapper`]; every other frame is reached through
//! the window.
//!
//! ## Testing
//!
//! All paging code is generic over [`kernel_vmem::PhysMapper`] and
//! [`kernel_vmem::Mmu`]. Tests run it against the host-memory arena from
//! `kernel-vmem`'s `arena` feature; the heap is tested against a plain
//! page-aligned buffer.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod bootstrap;
pub mod frame_alloc;
pub mod heap;
pub mod phys_mapper;
pub mod vmm;
pub mod window;

pub use bootstrap::{BootstrapAlloc, BootstrapError};
pub use frame_alloc::{BitmapFrameAlloc, FrameError};
pub use heap::{Heap, HeapBacking, HeapError, HeapRegion, LockedHeap};
pub use vmm::{PageSlot, PagingError, PagingState, Vmm, page_fault};
