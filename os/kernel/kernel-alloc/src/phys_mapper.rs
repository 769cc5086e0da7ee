//! # Offset-based `PhysMapper` for the Higher-Half Kernel
//!
//! Once paging is on, physical memory below the end of the bootstrap region
//! is visible at `KERNEL_VIRTUAL_BASE + pa`. Page tables, directories and
//! the frame bitmap all live there, so this mapper reaches them by adding
//! the offset.
//!
//! Frames elsewhere in RAM have no permanent mapping. They are reached
//! through the temporary window page, whose virtual address *is* the view
//! once its PTE has been pointed at the frame.

use kernel_info::memory::{BOOTSTRAP_PHYS_END, KERNEL_VIRTUAL_BASE};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualPage};
use kernel_vmem::{FRAME_BYTES, PhysMapper};

/// [`PhysMapper`] for memory mapped at a fixed virtual offset.
#[derive(Debug, Clone, Copy)]
pub struct OffsetPhysMapper {
    offset: u32,
}

impl OffsetPhysMapper {
    /// The kernel's higher-half view of low physical memory.
    pub const KERNEL: Self = Self::new(KERNEL_VIRTUAL_BASE);

    #[must_use]
    pub const fn new(offset: u32) -> Self {
        Self { offset }
    }

    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }
}

impl PhysMapper for OffsetPhysMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        debug_assert!(
            pa.as_u32() < BOOTSTRAP_PHYS_END,
            "{pa} has no permanent kernel mapping"
        );
        let va = (self.offset + pa.as_u32()) as usize as *mut T;
        // SAFETY: Caller guarantees `pa` is mapped at the offset and unaliased.
        unsafe { &mut *va }
    }

    unsafe fn window<'a>(
        &self,
        window: VirtualPage,
        _frame: PhysicalPage,
    ) -> &'a mut [u8; FRAME_BYTES] {
        let va = window.base().as_u32() as usize as *mut [u8; FRAME_BYTES];
        // SAFETY: Caller guarantees the window PTE references the frame.
        unsafe { &mut *va }
    }
}
