use crate::{PAGE_SHIFT, PhysicalAddress};
use core::fmt;

/// A physical frame, identified by its frame number (`address >> 12`).
///
/// This is the value a page-table entry stores in its 20-bit frame field and
/// the bit index used by the frame bitmap.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage(u32);

impl PhysicalPage {
    #[inline]
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn containing(addr: PhysicalAddress) -> Self {
        Self(addr.as_u32() >> PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn join(self, offset: u32) -> PhysicalAddress {
        PhysicalAddress::new((self.0 << PAGE_SHIFT) | offset)
    }
}

impl fmt::Debug for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({:#x} @ {})", self.0, self.base())
    }
}

impl fmt::Display for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base(), f)
    }
}
