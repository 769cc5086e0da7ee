//! # Address Space
//!
//! A handle to one page directory, named by its physical frame. The handle
//! is `Copy`; the tables themselves live in physical memory and are reached
//! through a [`PhysMapper`].

use crate::{PageDirectory, PageTable, PageTableEntry, PhysMapper, TableSlot};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress, VirtualPage};
use kernel_registers::cr3::Cr3;

/// Handle to a single, concrete address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace {
    directory: PhysicalPage,
}

impl AddressSpace {
    #[inline]
    #[must_use]
    pub const fn from_directory(directory: PhysicalPage) -> Self {
        Self { directory }
    }

    /// Physical frame of the page directory.
    #[inline]
    #[must_use]
    pub const fn directory_frame(self) -> PhysicalPage {
        self.directory
    }

    /// The CR3 value that activates this space.
    #[inline]
    #[must_use]
    pub fn cr3(self) -> Cr3 {
        Cr3::from_directory_phys(self.directory.base())
    }

    /// Borrow the directory.
    ///
    /// # Safety
    /// See [`PhysMapper::directory_mut`].
    #[inline]
    pub unsafe fn directory<'a, M: PhysMapper>(self, mapper: &M) -> &'a mut PageDirectory {
        unsafe { mapper.directory_mut(self.directory) }
    }

    /// Borrow the table covering `page`, if there is one.
    ///
    /// # Safety
    /// See [`PhysMapper::table_mut`].
    pub unsafe fn table_for<'a, M: PhysMapper>(
        self,
        mapper: &M,
        page: VirtualPage,
    ) -> Option<&'a mut PageTable> {
        let dir = unsafe { self.directory(mapper) };
        dir.slot(page.directory_index())
            .table()
            .map(|t| unsafe { mapper.table_mut(t) })
    }

    /// The PTE for `page`, if its table exists.
    ///
    /// # Safety
    /// See [`PhysMapper::table_mut`].
    #[must_use]
    pub unsafe fn entry<M: PhysMapper>(self, mapper: &M, page: VirtualPage) -> Option<PageTableEntry> {
        unsafe { self.table_for(mapper, page) }.map(|t| t.entry(page.table_index()))
    }

    /// Translate `va` to a physical address if it is mapped.
    ///
    /// # Safety
    /// See [`PhysMapper::table_mut`].
    #[must_use]
    pub unsafe fn translate<M: PhysMapper>(
        self,
        mapper: &M,
        va: VirtualAddress,
    ) -> Option<PhysicalAddress> {
        let e = unsafe { self.entry(mapper, va.page()) }?;
        e.present().then(|| e.frame_page().join(va.offset()))
    }

    /// Slot `index` of the directory.
    ///
    /// # Safety
    /// See [`PhysMapper::directory_mut`].
    #[must_use]
    pub unsafe fn slot<M: PhysMapper>(self, mapper: &M, index: usize) -> TableSlot {
        unsafe { self.directory(mapper) }.slot(index)
    }
}
