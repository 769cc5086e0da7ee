use crate::entry::{PageDirectoryEntry, PageTableEntry};
use kernel_memory_addresses::{ENTRIES_PER_TABLE, PhysicalPage};

const ENTRIES: usize = ENTRIES_PER_TABLE as usize;

const _: () = assert!(size_of::<PageTable>() == 4096);
const _: () = assert!(size_of::<PageDirectory>() == 4096);

/// One frame of 1024 [`PageTableEntry`]s.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageTableEntry; ENTRIES],
}

impl PageTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [PageTableEntry::new(); ENTRIES],
        }
    }

    /// Clear every entry.
    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(PageTableEntry::new());
    }

    #[inline]
    #[must_use]
    pub const fn entry(&self, index: usize) -> PageTableEntry {
        self.entries[index]
    }

    #[inline]
    pub const fn entry_mut(&mut self, index: usize) -> &mut PageTableEntry {
        &mut self.entries[index]
    }

    /// `(index, entry)` for every present entry.
    pub fn present_entries(&self) -> impl Iterator<Item = (usize, PageTableEntry)> + '_ {
        self.entries
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, e)| e.present())
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

/// What a page-directory slot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSlot {
    /// No table; every address in the slot's 4 MiB is unmapped.
    Empty,
    /// A table private to this directory.
    Owned(PhysicalPage),
    /// The kernel directory's table for this slot, referenced not copied.
    SharedKernel(PhysicalPage),
}

impl TableSlot {
    /// The table frame, if any.
    #[inline]
    #[must_use]
    pub const fn table(self) -> Option<PhysicalPage> {
        match self {
            Self::Empty => None,
            Self::Owned(t) | Self::SharedKernel(t) => Some(t),
        }
    }
}

/// One frame of 1024 [`PageDirectoryEntry`]s; what CR3 points at.
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PageDirectoryEntry; ENTRIES],
}

impl PageDirectory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [PageDirectoryEntry::new(); ENTRIES],
        }
    }

    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(PageDirectoryEntry::new());
    }

    #[inline]
    #[must_use]
    pub const fn entry(&self, index: usize) -> PageDirectoryEntry {
        self.entries[index]
    }

    /// Decode slot `index`.
    #[must_use]
    pub const fn slot(&self, index: usize) -> TableSlot {
        let e = self.entries[index];
        if !e.present() {
            TableSlot::Empty
        } else if e.shared_kernel() {
            TableSlot::SharedKernel(e.table_page())
        } else {
            TableSlot::Owned(e.table_page())
        }
    }

    /// Point slot `index` at a table. Tables are always writable; `user`
    /// controls ring-3 reachability of the whole slot.
    pub const fn set_slot(&mut self, index: usize, slot: TableSlot, user: bool) {
        self.entries[index] = match slot {
            TableSlot::Empty => PageDirectoryEntry::new(),
            TableSlot::Owned(t) => PageDirectoryEntry::new()
                .with_present(true)
                .with_writable(true)
                .with_user(user)
                .with_table_frame(t.index()),
            TableSlot::SharedKernel(t) => PageDirectoryEntry::new()
                .with_present(true)
                .with_writable(true)
                .with_user(user)
                .with_shared_kernel(true)
                .with_table_frame(t.index()),
        };
    }

    /// `(index, slot)` for every non-empty slot.
    pub fn populated(&self) -> impl Iterator<Item = (usize, TableSlot)> + '_ {
        (0..ENTRIES)
            .map(|i| (i, self.slot(i)))
            .filter(|(_, s)| *s != TableSlot::Empty)
    }
}

impl Default for PageDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_round_trip_through_pdes() {
        let mut dir = PageDirectory::new();
        let t = PhysicalPage::from_index(0x123);
        dir.set_slot(1, TableSlot::Owned(t), true);
        dir.set_slot(768, TableSlot::SharedKernel(t), false);

        assert_eq!(dir.slot(0), TableSlot::Empty);
        assert_eq!(dir.slot(1), TableSlot::Owned(t));
        assert_eq!(dir.slot(768), TableSlot::SharedKernel(t));
        assert!(dir.entry(1).user());
        assert!(!dir.entry(768).user());
        assert_eq!(dir.populated().count(), 2);

        dir.set_slot(1, TableSlot::Empty, false);
        assert_eq!(dir.entry(1).into_bits(), 0);
    }

    #[test]
    fn present_entries_skips_holes() {
        let mut table = PageTable::new();
        *table.entry_mut(3) = PageTableEntry::mapping(PhysicalPage::from_index(7), true, false);
        *table.entry_mut(9) = PageTableEntry::new().with_frame(8);
        let present: Vec<_> = table.present_entries().collect();
        assert_eq!(present.len(), 1);
        assert_eq!(present[0].0, 3);
        assert_eq!(present[0].1.frame(), 7);
    }
}
