//! Host-side stand-ins for physical memory and the MMU.

use crate::{FRAME_BYTES, Mmu, PhysMapper};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress, VirtualPage};
use kernel_sync::InterruptControl;

/// A 4 KiB-aligned raw frame.
#[derive(Clone)]
#[repr(C, align(4096))]
struct Frame([u8; FRAME_BYTES]);

/// Simulated physical RAM: physical address `pa` is byte `pa` of one
/// contiguous host allocation of whole frames.
///
/// The window is simulated by handing out the target frame directly.
pub struct FrameArena {
    frames: Vec<Frame>,
    base: *mut u8,
}

impl FrameArena {
    /// RAM of `frame_count` zeroed frames.
    #[must_use]
    pub fn with_frames(frame_count: usize) -> Self {
        let mut frames = vec![Frame([0; FRAME_BYTES]); frame_count];
        let base = frames.as_mut_ptr().cast::<u8>();
        Self { frames, base }
    }

    /// Size of the simulated RAM in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.frames.len() * FRAME_BYTES
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Contents of `frame`.
    #[must_use]
    pub fn frame(&self, frame: PhysicalPage) -> &[u8; FRAME_BYTES] {
        &self.frames[frame.index() as usize].0
    }

    /// Overwrite `frame` with `byte`.
    pub fn fill(&self, frame: PhysicalPage, byte: u8) {
        let bytes = unsafe { self.frame_ptr(frame) };
        unsafe { bytes.write_bytes(byte, FRAME_BYTES) };
    }

    unsafe fn frame_ptr(&self, frame: PhysicalPage) -> *mut u8 {
        let offset = frame.index() as usize * FRAME_BYTES;
        assert!(offset < self.len(), "frame {frame:?} outside the arena");
        unsafe { self.base.add(offset) }
    }
}

impl PhysMapper for FrameArena {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let offset = pa.as_u32() as usize;
        assert!(
            offset + size_of::<T>() <= self.len(),
            "{pa:?} outside the arena"
        );
        unsafe { &mut *self.base.add(offset).cast::<T>() }
    }

    unsafe fn window<'a>(
        &self,
        _window: VirtualPage,
        frame: PhysicalPage,
    ) -> &'a mut [u8; FRAME_BYTES] {
        unsafe { &mut *self.frame_ptr(frame).cast::<[u8; FRAME_BYTES]>() }
    }
}

/// One observed MMU operation, with the interrupt flag at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmuEvent {
    LoadDirectory {
        directory: PhysicalPage,
        interrupts_enabled: bool,
    },
    Invalidate {
        page: VirtualPage,
        interrupts_enabled: bool,
    },
}

/// A fake CPU that logs CR3 loads and `invlpg`s.
#[derive(Debug)]
pub struct RecordingMmu {
    events: RefCell<Vec<MmuEvent>>,
    interrupts: Cell<bool>,
    fault: Cell<VirtualAddress>,
}

impl RecordingMmu {
    #[must_use]
    pub fn new(interrupts_enabled: bool) -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            interrupts: Cell::new(interrupts_enabled),
            fault: Cell::new(VirtualAddress::new(0)),
        }
    }

    #[must_use]
    pub fn events(&self) -> Vec<MmuEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// The address the next [`Mmu::fault_address`] reports.
    pub fn set_fault_address(&self, va: VirtualAddress) {
        self.fault.set(va);
    }
}

impl InterruptControl for RecordingMmu {
    fn interrupts_enabled(&self) -> bool {
        self.interrupts.get()
    }

    fn disable_interrupts(&self) {
        self.interrupts.set(false);
    }

    fn enable_interrupts(&self) {
        self.interrupts.set(true);
    }
}

impl Mmu for RecordingMmu {
    unsafe fn load_directory(&self, directory: PhysicalPage) {
        self.events.borrow_mut().push(MmuEvent::LoadDirectory {
            directory,
            interrupts_enabled: self.interrupts.get(),
        });
    }

    fn invalidate_page(&self, page: VirtualPage) {
        self.events.borrow_mut().push(MmuEvent::Invalidate {
            page,
            interrupts_enabled: self.interrupts.get(),
        });
    }

    fn fault_address(&self) -> VirtualAddress {
        self.fault.get()
    }
}
