use crate::{ENTRIES_PER_TABLE, PAGE_SHIFT, VirtualAddress};
use core::fmt;

/// A virtual page, identified by its page number (`address >> 12`).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage(u32);

impl VirtualPage {
    #[inline]
    #[must_use]
    pub const fn containing(addr: VirtualAddress) -> Self {
        Self(addr.as_u32() >> PAGE_SHIFT)
    }

    /// Rebuild a page from its directory slot and table entry indices.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_indices(directory: usize, table: usize) -> Self {
        debug_assert!(directory < ENTRIES_PER_TABLE as usize);
        debug_assert!(table < ENTRIES_PER_TABLE as usize);
        Self((directory as u32) * ENTRIES_PER_TABLE + table as u32)
    }

    #[inline]
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0
    }

    /// Page-directory slot: `(address / 4096) / 1024`.
    #[inline]
    #[must_use]
    pub const fn directory_index(self) -> usize {
        (self.0 / ENTRIES_PER_TABLE) as usize
    }

    /// Page-table entry: `(address / 4096) % 1024`.
    #[inline]
    #[must_use]
    pub const fn table_index(self) -> usize {
        (self.0 % ENTRIES_PER_TABLE) as usize
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        VirtualAddress::new(self.0 << PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn join(self, offset: u32) -> VirtualAddress {
        VirtualAddress::new((self.0 << PAGE_SHIFT) | offset)
    }

    /// The following page, or `None` at the top of the address space.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 + 1 < (1 << (32 - PAGE_SHIFT)) {
            Some(Self(self.0 + 1))
        } else {
            None
        }
    }
}

impl fmt::Debug for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Page({} [{}:{}])",
            self.base(),
            self.directory_index(),
            self.table_index()
        )
    }
}

impl fmt::Display for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base(), f)
    }
}
