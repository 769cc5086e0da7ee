//! # Kernel Configuration and Boot Interface
//!
//! Layout constants, runtime configuration and the boot handoff contract for
//! the 32-bit protected-mode kernel. Every other kernel crate takes its
//! addresses and sizes from here so that the linker script, the paging
//! bootstrap and the heap agree on one memory map.
//!
//! ## Modules
//!
//! ### Memory Layout ([`memory`])
//! * **Higher half**: the kernel runs at [`memory::KERNEL_VIRTUAL_BASE`]
//!   (`0xC000_0000`, page-directory slot 768) with physical = virtual − base.
//! * **Low memory window**: the first MiB (boot sector, GDT, kernel image,
//!   VGA text buffer) plus the bootstrap placement region are mapped
//!   identity-plus-offset before the heap exists.
//! * **Kernel heap**: a growable window above the kernel slot.
//!
//! ### Configuration ([`config`])
//! [`config::KernelConfig`] bundles the tunable values (RAM size, heap
//! sizes, PIC offsets, timer frequency, log level). Its `Default` is built
//! from the constants in [`memory`].
//!
//! ### Boot Information ([`boot`])
//! [`boot::KernelBootInfo`] is what the entry stub hands to `kernel_main`:
//! the virtual and physical bounds of the loaded kernel image.
//!
//! ## Virtual Address Space
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │          User Space             │
//! USER_STACK_TOP (0xBFFF_FFFF) ───────────────────┤
//! 0xC000_0000 ├─────────────────────────────────┤ slot 768
//!             │ low memory + kernel + bootstrap │
//! TEMP_WINDOW ├─────────────────────────────────┤ 0xC03F_F000
//! KHEAP_START ├─────────────────────────────────┤ 0xC040_0000
//!             │          Kernel Heap            │
//! KHEAP_MAX   ├─────────────────────────────────┤ 0xC100_0000
//!             │            unused               │
//! 0xFFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! ## Build Integration
//! ```rust
//! use kernel_info::memory::{KERNEL_VIRTUAL_BASE, PHYS_LOAD};
//!
//! println!("cargo:rustc-link-arg-bins=--defsym=KERNEL_VIRTUAL_BASE={KERNEL_VIRTUAL_BASE:#x}");
//! println!("cargo:rustc-link-arg-bins=--defsym=PHYS_LOAD={PHYS_LOAD:#x}");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod config;
pub mod memory;
