//! # Temporary Mapping Window
//!
//! One kernel page whose PTE is repointed at arbitrary frames so their
//! contents can be read or written. Only one frame is visible at a time:
//! [`ScratchWindow::map`] borrows the window mutably, and the returned
//! [`MappedWindow`] unmaps it and flushes the TLB entry on drop.
//!
//! Interrupts stay masked while a frame is mapped.

use kernel_memory_addresses::{PhysicalPage, VirtualPage};
use kernel_sync::IrqGuard;
use kernel_vmem::{FRAME_BYTES, Mmu, PageTableEntry, PhysMapper};

/// Where the window lives: its virtual page and the table holding its PTE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSlot {
    page: VirtualPage,
    table: PhysicalPage,
}

impl WindowSlot {
    #[must_use]
    pub const fn page(&self) -> VirtualPage {
        self.page
    }

    #[must_use]
    pub const fn table(&self) -> PhysicalPage {
        self.table
    }
}

/// The window plus a bounce buffer for frame-to-frame copies.
pub struct ScratchWindow {
    slot: WindowSlot,
    buffer: [u8; FRAME_BYTES],
}

impl ScratchWindow {
    /// A window at `page`, whose PTE lives in `table`.
    ///
    /// The PTE is expected to be non-present.
    #[must_use]
    pub const fn new(page: VirtualPage, table: PhysicalPage) -> Self {
        Self {
            slot: WindowSlot { page, table },
            buffer: [0; FRAME_BYTES],
        }
    }

    #[must_use]
    pub const fn slot(&self) -> WindowSlot {
        self.slot
    }

    /// Map `frame` at the window until the guard is dropped.
    ///
    /// # Safety
    /// The window's table must be reachable through `mapper` and be part
    /// of the active address space; `frame` must not be otherwise borrowed.
    pub unsafe fn map<'w, M: PhysMapper, U: Mmu>(
        &'w mut self,
        mapper: &'w M,
        mmu: &'w U,
        frame: PhysicalPage,
    ) -> MappedWindow<'w, M, U> {
        unsafe { MappedWindow::new(&mut self.slot, mapper, mmu, frame) }
    }

    /// Copy the contents of frame `src` into frame `dst`, one frame at a
    /// time through the window.
    ///
    /// # Safety
    /// As for [`map`](Self::map), for both frames.
    pub unsafe fn copy_frame<M: PhysMapper, U: Mmu>(
        &mut self,
        mapper: &M,
        mmu: &U,
        src: PhysicalPage,
        dst: PhysicalPage,
    ) {
        let Self { slot, buffer } = self;
        let _irq = IrqGuard::new(mmu);
        {
            let mut view = unsafe { MappedWindow::new(&mut *slot, mapper, mmu, src) };
            buffer.copy_from_slice(view.bytes());
        }
        {
            let mut view = unsafe { MappedWindow::new(&mut *slot, mapper, mmu, dst) };
            view.bytes().copy_from_slice(buffer);
        }
    }
}

/// A frame visible through the window.
pub struct MappedWindow<'w, M: PhysMapper, U: Mmu> {
    slot: &'w mut WindowSlot,
    mapper: &'w M,
    mmu: &'w U,
    frame: PhysicalPage,
    _irq: IrqGuard<&'w U>,
}

impl<'w, M: PhysMapper, U: Mmu> MappedWindow<'w, M, U> {
    unsafe fn new(slot: &'w mut WindowSlot, mapper: &'w M, mmu: &'w U, frame: PhysicalPage) -> Self {
        let irq = IrqGuard::new(mmu);
        let table = unsafe { mapper.table_mut(slot.table) };
        *table.entry_mut(slot.page.table_index()) = PageTableEntry::mapping(frame, true, false);
        mmu.invalidate_page(slot.page);
        Self {
            slot,
            mapper,
            mmu,
            frame,
            _irq: irq,
        }
    }

    #[must_use]
    pub const fn frame(&self) -> PhysicalPage {
        self.frame
    }

    /// The mapped frame's bytes.
    pub fn bytes(&mut self) -> &mut [u8; FRAME_BYTES] {
        unsafe { self.mapper.window(self.slot.page, self.frame) }
    }
}

impl<M: PhysMapper, U: Mmu> Drop for MappedWindow<'_, M, U> {
    fn drop(&mut self) {
        let table = unsafe { self.mapper.table_mut(self.slot.table) };
        *table.entry_mut(self.slot.page.table_index()) = PageTableEntry::new();
        self.mmu.invalidate_page(self.slot.page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::VirtualAddress;
    use kernel_sync::InterruptControl;
    use kernel_vmem::arena::{FrameArena, MmuEvent, RecordingMmu};

    const TABLE: PhysicalPage = PhysicalPage::from_index(1);

    fn window() -> ScratchWindow {
        ScratchWindow::new(
            VirtualPage::containing(VirtualAddress::new(0xC03F_F000)),
            TABLE,
        )
    }

    #[test]
    fn mapping_is_torn_down_on_drop() {
        let ram = FrameArena::with_frames(8);
        let mmu = RecordingMmu::new(true);
        let mut w = window();
        let page = w.slot().page();
        {
            let mut view = unsafe { w.map(&ram, &mmu, PhysicalPage::from_index(5)) };
            view.bytes()[0] = 0x42;
            let pte = unsafe { ram.table_mut(TABLE) }.entry(1023);
            assert_eq!(pte, PageTableEntry::mapping(PhysicalPage::from_index(5), true, false));
            assert!(!mmu.interrupts_enabled());
        }
        assert!(mmu.interrupts_enabled());
        assert_eq!(unsafe { ram.table_mut(TABLE) }.entry(1023), PageTableEntry::new());
        assert_eq!(ram.frame(PhysicalPage::from_index(5))[0], 0x42);
        assert_eq!(
            mmu.events(),
            vec![
                MmuEvent::Invalidate {
                    page,
                    interrupts_enabled: false
                },
                MmuEvent::Invalidate {
                    page,
                    interrupts_enabled: false
                },
            ]
        );
    }

    #[test]
    fn copy_frame_is_byte_identical() {
        let ram = FrameArena::with_frames(8);
        let mmu = RecordingMmu::new(false);
        let src = PhysicalPage::from_index(3);
        let dst = PhysicalPage::from_index(4);
        ram.fill(src, 0x5A);
        let mut w = window();
        unsafe { w.copy_frame(&ram, &mmu, src, dst) };
        assert_eq!(ram.frame(src), ram.frame(dst));
        assert_eq!(mmu.events().len(), 4);
        assert!(!mmu.interrupts_enabled());
    }
}
