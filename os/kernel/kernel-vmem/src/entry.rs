use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalPage;

/// A single 32-bit page table entry: maps one 4 KiB page.
///
/// ### Bit layout
///
/// | Bits  | Name       | Meaning |
/// |-------|------------|---------|
/// | 0     | `P`        | Present |
/// | 1     | `RW`       | Writable if set |
/// | 2     | `US`       | User-mode accessible if set |
/// | 3–4   | reserved   | PWT/PCD, left clear |
/// | 5     | `A`        | Accessed (set by the CPU) |
/// | 6     | `D`        | Dirty (set by the CPU) |
/// | 7–8   | reserved   | PAT/G, left clear |
/// | 9–11  | unused     | Available to software |
/// | 12–31 | `frame`    | Physical frame number |
///
/// A frame number of `0` means "no frame": frame 0 is never handed out by
/// the frame allocator.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageTableEntry {
    pub present: bool,
    pub writable: bool,
    pub user: bool,
    #[bits(2)]
    __reserved0: u8,
    pub accessed: bool,
    pub dirty: bool,
    #[bits(2)]
    __reserved1: u8,
    #[bits(3)]
    pub unused: u8,
    /// Physical frame number (address >> 12).
    #[bits(20)]
    pub frame: u32,
}

impl PageTableEntry {
    /// Whether the entry references a frame at all.
    #[inline]
    #[must_use]
    pub const fn has_frame(self) -> bool {
        self.frame() != 0
    }

    #[inline]
    #[must_use]
    pub const fn frame_page(self) -> PhysicalPage {
        PhysicalPage::from_index(self.frame())
    }

    /// A present mapping of `page`.
    #[inline]
    #[must_use]
    pub const fn mapping(page: PhysicalPage, writable: bool, user: bool) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(writable)
            .with_user(user)
            .with_frame(page.index())
    }
}

/// A single 32-bit page directory entry: points at one page table.
///
/// Bit 9, available to software, tags tables that belong to the kernel
/// directory and are merely referenced from this one.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageDirectoryEntry {
    pub present: bool,
    pub writable: bool,
    pub user: bool,
    pub write_through: bool,
    pub cache_disabled: bool,
    pub accessed: bool,
    #[bits(1)]
    __reserved: u8,
    /// 4 MiB page; never set by this kernel.
    pub page_size: bool,
    pub global: bool,
    /// Table is owned by the kernel directory.
    pub shared_kernel: bool,
    #[bits(2)]
    __available: u8,
    /// Physical frame number of the page table.
    #[bits(20)]
    pub table_frame: u32,
}

impl PageDirectoryEntry {
    #[inline]
    #[must_use]
    pub const fn table_page(self) -> PhysicalPage {
        PhysicalPage::from_index(self.table_frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pte_layout_matches_hardware() {
        let e = PageTableEntry::mapping(PhysicalPage::from_index(0x12345), true, true);
        assert_eq!(e.into_bits(), 0x1234_5007);
        assert!(e.has_frame());

        let ro = PageTableEntry::mapping(PhysicalPage::from_index(1), false, false);
        assert_eq!(ro.into_bits(), 0x0000_1001);
    }

    #[test]
    fn accessed_and_dirty_bits() {
        let e = PageTableEntry::from_bits(0x0000_3061);
        assert!(e.present());
        assert!(e.accessed());
        assert!(e.dirty());
        assert_eq!(e.frame(), 3);
    }

    #[test]
    fn pde_shared_tag_is_bit_9() {
        let e = PageDirectoryEntry::new()
            .with_present(true)
            .with_writable(true)
            .with_shared_kernel(true)
            .with_table_frame(0x100);
        assert_eq!(e.into_bits(), 0x0010_0203);
        assert_eq!(e.table_page(), PhysicalPage::from_index(0x100));
    }
}
