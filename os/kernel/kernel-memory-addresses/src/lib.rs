//! # Virtual and Physical Memory Address Types (IA-32)
//!
//! Strongly typed wrappers for 32-bit addresses and 4 KiB page numbers used
//! by the paging and allocation code.
//!
//! ## Overview
//!
//! Protected-mode paging without PAE translates a 32-bit virtual address in
//! two levels:
//!
//! ```text
//! | 31 ‒ 22   | 21 ‒ 12 | 11 ‒ 0 |
//! | directory |  table  | offset |
//! ```
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] / [`VirtualPage`] | Refer to page-table translated memory. |
//! | [`PhysicalAddress`] / [`PhysicalPage`] | Refer to physical RAM / MMIO. |
//!
//! A [`PhysicalPage`] is a *frame number* (`address / 4096`); that number is
//! what a page-table entry stores and what the frame bitmap indexes.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0xC040_1234);
//! let page = va.page();
//! assert_eq!(page.directory_index(), 769);
//! assert_eq!(page.table_index(), 1);
//! assert_eq!(va.offset(), 0x234);
//! assert_eq!(page.base().as_u32(), 0xC040_1000);
//! ```
//!
//! All types are `#[repr(transparent)]`, `Copy`, `Ord` and `Hash`.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;

/// Size of a page / frame in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

/// Number of entries in a page table or page directory.
pub const ENTRIES_PER_TABLE: u32 = 1024;

/// Round `x` down to a multiple of `a` (`a` must be a power of two).
#[inline]
#[must_use]
pub const fn align_down(x: u32, a: u32) -> u32 {
    x & !(a - 1)
}

/// Round `x` up to a multiple of `a` (`a` must be a power of two).
///
/// Returns `None` if the result does not fit in 32 bits.
#[inline]
#[must_use]
pub const fn align_up(x: u32, a: u32) -> Option<u32> {
    match x.checked_add(a - 1) {
        Some(v) => Some(v & !(a - 1)),
        None => None,
    }
}

/// Whether `x` is a multiple of `a` (`a` must be a power of two).
#[inline]
#[must_use]
pub const fn is_aligned(x: u32, a: u32) -> bool {
    x & (a - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_helpers() {
        assert_eq!(align_down(0x12345, PAGE_SIZE), 0x12000);
        assert_eq!(align_up(0x12345, PAGE_SIZE), Some(0x13000));
        assert_eq!(align_up(0x12000, PAGE_SIZE), Some(0x12000));
        assert_eq!(align_up(0xFFFF_F001, PAGE_SIZE), None);
        assert!(is_aligned(0xC000_0000, PAGE_SIZE));
        assert!(!is_aligned(0xC000_0004, PAGE_SIZE));
    }

    #[test]
    fn virtual_split_and_join() {
        let va = VirtualAddress::new(0xC03F_F123);
        let page = va.page();
        assert_eq!(page.directory_index(), 768);
        assert_eq!(page.table_index(), 1023);
        assert_eq!(page.join(va.offset()), va);
        assert_eq!(VirtualPage::from_indices(768, 1023), page);
    }

    #[test]
    fn physical_frames() {
        let pa = PhysicalAddress::new(0x000B_8042);
        let frame = pa.page();
        assert_eq!(frame.index(), 0xB8);
        assert_eq!(frame.base().as_u32(), 0xB_8000);
        assert_eq!(PhysicalPage::from_index(0xB8).join(0x42), pa);
    }
}
