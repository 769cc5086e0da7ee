//! # Paging Subsystem
//!
//! [`Vmm`] owns the frame bitmap, the kernel page directory and the
//! temporary mapping window, and walks directories through a [`PhysMapper`].
//!
//! Paging comes up in three steps, each only valid in the state before it:
//!
//! ```text
//! Uninitialized ─bootstrap_directory─► BootIdentityMapped ─map_kernel─► KernelMapped ─activate─► Active
//! ```
//!
//! [`Vmm::setup_paging`] runs them in order and registers the page-fault
//! handler in between.
//!
//! Page tables and directories always come from the bootstrap allocator, so
//! they stay reachable at `KERNEL_VIRTUAL_BASE + pa`. Every other frame is
//! only touched through the [`ScratchWindow`].
//!
//! # Example
//! ```ignore
//! use kernel_alloc::{bootstrap::BootstrapAlloc, phys_mapper::OffsetPhysMapper, vmm::Vmm};
//! let mut vmm = Vmm::new(&OffsetPhysMapper::KERNEL, mmu, BootstrapAlloc::kernel(), config);
//! vmm.setup_paging(&boot_info, &registry, &page_fault_handler)?;
//! let child = vmm.clone_page_directory(vmm.kernel_directory().unwrap())?;
//! ```

use crate::bootstrap::{BootstrapAlloc, BootstrapError};
use crate::frame_alloc::{BitmapFrameAlloc, FrameError};
use crate::heap::{HeapBacking, HeapError};
use crate::window::ScratchWindow;
use kernel_info::boot::KernelBootInfo;
use kernel_info::config::KernelConfig;
use kernel_info::memory::{
    BOOTSTRAP_PHYS_END, BOOTSTRAP_PHYS_START, KERNEL_DIRECTORY_SLOT, KERNEL_VIRTUAL_BASE,
    LOW_MEMORY_END, TEMP_WINDOW,
};
use kernel_interrupts::{InterruptHandler, InterruptRegistry, PAGE_FAULT_VECTOR, TrapFrame};
use kernel_memory_addresses::{
    ENTRIES_PER_TABLE, PAGE_SIZE, PhysicalAddress, PhysicalPage, VirtualAddress, VirtualPage,
    align_down,
};
use kernel_sync::IrqGuard;
use kernel_vmem::{AddressSpace, Mmu, PageFault, PageTableEntry, PhysMapper, TableSlot};

/// Bytes mapped by one page table.
const TABLE_SPAN: u32 = PAGE_SIZE * ENTRIES_PER_TABLE;

/// Where paging bring-up stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PagingState {
    /// Nothing allocated; the boot directory is active.
    Uninitialized,
    /// Frame bitmap and an empty kernel directory exist.
    BootIdentityMapped,
    /// The kernel directory maps low memory, the kernel image, the bootstrap
    /// region and the initial heap.
    KernelMapped,
    /// The kernel directory is loaded and the fault handler registered.
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PagingError {
    #[error("paging is {actual:?}, operation needs {expected:?}")]
    WrongState {
        expected: PagingState,
        actual: PagingState,
    },
    #[error("inconsistent kernel image bounds: {0:?}")]
    BadBootInfo(KernelBootInfo),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error("no page table covers {0}")]
    NotMapped(VirtualAddress),
}

/// A located page-table entry: the table frame and the index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlot {
    table: PhysicalPage,
    index: usize,
}

impl PageSlot {
    #[must_use]
    pub const fn table(&self) -> PhysicalPage {
        self.table
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

struct Core<'m> {
    frames: BitmapFrameAlloc<'m>,
    kernel: AddressSpace,
    window: Option<ScratchWindow>,
}

/// The paging subsystem.
pub struct Vmm<'m, M: PhysMapper, U: Mmu> {
    mapper: &'m M,
    mmu: U,
    config: KernelConfig,
    bootstrap: BootstrapAlloc,
    state: PagingState,
    core: Option<Core<'m>>,
    current: Option<AddressSpace>,
}

/// Decode the page fault described by `frame` and the CPU's fault address.
pub fn page_fault<U: Mmu>(mmu: &U, frame: &TrapFrame) -> PageFault {
    PageFault::decode(frame.err_code, mmu.fault_address())
}

impl<'m, M: PhysMapper, U: Mmu> Vmm<'m, M, U> {
    pub const fn new(
        mapper: &'m M,
        mmu: U,
        bootstrap: BootstrapAlloc,
        config: KernelConfig,
    ) -> Self {
        Self {
            mapper,
            mmu,
            config,
            bootstrap,
            state: PagingState::Uninitialized,
            core: None,
            current: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> PagingState {
        self.state
    }

    #[must_use]
    pub const fn mmu(&self) -> &U {
        &self.mmu
    }

    #[must_use]
    pub const fn config(&self) -> &KernelConfig {
        &self.config
    }

    #[must_use]
    pub const fn bootstrap(&self) -> &BootstrapAlloc {
        &self.bootstrap
    }

    #[must_use]
    pub fn kernel_directory(&self) -> Option<AddressSpace> {
        self.core.as_ref().map(|c| c.kernel)
    }

    /// The directory last passed to [`switch_page_directory`](Self::switch_page_directory).
    #[must_use]
    pub const fn current_directory(&self) -> Option<AddressSpace> {
        self.current
    }

    #[must_use]
    pub fn frames(&self) -> Option<&BitmapFrameAlloc<'m>> {
        self.core.as_ref().map(|c| &c.frames)
    }

    fn require(&self, expected: PagingState) -> Result<(), PagingError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PagingError::WrongState {
                expected,
                actual: self.state,
            })
        }
    }

    fn require_at_least(&self, expected: PagingState) -> Result<(), PagingError> {
        if self.state >= expected {
            Ok(())
        } else {
            Err(PagingError::WrongState {
                expected,
                actual: self.state,
            })
        }
    }

    fn core_mut(&mut self) -> Result<&mut Core<'m>, PagingError> {
        let actual = self.state;
        self.core.as_mut().ok_or(PagingError::WrongState {
            expected: PagingState::BootIdentityMapped,
            actual,
        })
    }

    fn kernel(&self) -> Result<AddressSpace, PagingError> {
        self.kernel_directory().ok_or(PagingError::WrongState {
            expected: PagingState::BootIdentityMapped,
            actual: self.state,
        })
    }

    /// A zeroed, page-aligned frame from the bootstrap region.
    fn structure_frame(&mut self) -> Result<PhysicalPage, PagingError> {
        let placement = self.bootstrap.dumb_kcalloc(self.mapper, PAGE_SIZE, true)?;
        Ok(placement.phys.page())
    }

    /// Set up paging: bitmap, kernel directory, kernel mappings, fault
    /// handler at vector 14, directory switch.
    ///
    /// # Errors
    /// Paging was already set up, the boot bounds are inconsistent, or the
    /// bootstrap region or physical memory ran out.
    pub fn setup_paging(
        &mut self,
        boot: &KernelBootInfo,
        registry: &InterruptRegistry,
        fault_handler: InterruptHandler,
    ) -> Result<(), PagingError> {
        self.bootstrap_directory()?;
        self.map_kernel(boot)?;
        registry.register(PAGE_FAULT_VECTOR, fault_handler);
        self.activate()?;
        log::info!(
            "paging active: {} of {} frames in use",
            self.frames().map_or(0, |f| f.used_frames()),
            self.config.frame_count()
        );
        Ok(())
    }

    /// Allocate the frame bitmap and an empty kernel directory.
    ///
    /// # Errors
    /// Not [`PagingState::Uninitialized`], or the bootstrap region is full.
    pub fn bootstrap_directory(&mut self) -> Result<AddressSpace, PagingError> {
        self.require(PagingState::Uninitialized)?;

        let frame_count = self.config.frame_count();
        let words = BitmapFrameAlloc::words_for(frame_count);
        #[allow(clippy::cast_possible_truncation)]
        let bytes = (words * size_of::<u32>()) as u32;
        let bitmap = self.bootstrap.dumb_kcalloc(self.mapper, bytes, false)?;
        let first: &'m mut u32 = unsafe { self.mapper.phys_to_mut(bitmap.phys) };
        let storage = unsafe { core::slice::from_raw_parts_mut(core::ptr::from_mut(first), words) };
        let frames = BitmapFrameAlloc::new(storage, frame_count);

        let kernel = AddressSpace::from_directory(self.structure_frame()?);
        self.core = Some(Core {
            frames,
            kernel,
            window: None,
        });
        self.state = PagingState::BootIdentityMapped;
        log::debug!(
            "frame bitmap for {frame_count} frames at {}, kernel directory at {}",
            bitmap.virt,
            kernel.directory_frame()
        );
        Ok(kernel)
    }

    /// Fill the kernel directory.
    ///
    /// Maps low memory (boot sector, GDT, video memory), the kernel image
    /// and the bootstrap region at `KERNEL_VIRTUAL_BASE + pa`, prepares the
    /// window PTE, creates page tables for the whole heap window and maps
    /// the initial heap with fresh frames.
    ///
    /// # Errors
    /// Not [`PagingState::BootIdentityMapped`], bad boot bounds, or memory
    /// ran out.
    pub fn map_kernel(&mut self, boot: &KernelBootInfo) -> Result<(), PagingError> {
        self.require(PagingState::BootIdentityMapped)?;
        if !boot.is_consistent()
            || boot.kernel_virtual_start.wrapping_sub(boot.kernel_physical_start)
                != KERNEL_VIRTUAL_BASE
        {
            return Err(PagingError::BadBootInfo(*boot));
        }
        let kernel = self.kernel()?;

        self.map_offset_range(kernel, 0, LOW_MEMORY_END)?;
        self.map_offset_range(
            kernel,
            align_down(boot.kernel_physical_start, PAGE_SIZE),
            boot.kernel_physical_end,
        )?;
        self.map_offset_range(kernel, BOOTSTRAP_PHYS_START, BOOTSTRAP_PHYS_END)?;

        let window_page = VirtualPage::containing(VirtualAddress::new(TEMP_WINDOW));
        let window = self
            .get_page(window_page.base(), true, kernel)?
            .ok_or(PagingError::NotMapped(window_page.base()))?;
        *self.entry_mut(window)? = PageTableEntry::new();
        self.core_mut()?.window = Some(ScratchWindow::new(window_page, window.table()));

        // Tables for the whole heap window, so every clone shares heap growth.
        let heap = self.config.heap;
        let mut va = align_down(heap.start, TABLE_SPAN);
        while va < heap.max {
            self.get_page(VirtualAddress::new(va), true, kernel)?;
            let Some(next) = va.checked_add(TABLE_SPAN) else {
                break;
            };
            va = next;
        }
        self.grow_heap(
            VirtualAddress::new(heap.start),
            VirtualAddress::new(heap.start + heap.initial_size),
        )?;

        self.state = PagingState::KernelMapped;
        Ok(())
    }

    /// Load the kernel directory.
    ///
    /// # Errors
    /// Not [`PagingState::KernelMapped`].
    pub fn activate(&mut self) -> Result<(), PagingError> {
        self.require(PagingState::KernelMapped)?;
        let kernel = self.kernel()?;
        self.load(kernel);
        self.state = PagingState::Active;
        Ok(())
    }

    /// Make `dir` the active address space.
    ///
    /// # Errors
    /// The kernel directory is not complete yet.
    pub fn switch_page_directory(&mut self, dir: AddressSpace) -> Result<(), PagingError> {
        self.require_at_least(PagingState::KernelMapped)?;
        self.load(dir);
        Ok(())
    }

    fn load(&mut self, dir: AddressSpace) {
        {
            let _irq = IrqGuard::new(&self.mmu);
            // SAFETY: every directory built here shares the kernel slots.
            unsafe { self.mmu.load_directory(dir.directory_frame()) };
        }
        self.current = Some(dir);
        log::trace!("switched to directory {}", dir.directory_frame());
    }

    /// The PTE slot for `va` in `dir`, creating its page table if asked.
    ///
    /// New tables are user-accessible below the kernel slot and
    /// kernel-only from it on.
    ///
    /// # Errors
    /// Paging has no bootstrap state yet, or the bootstrap region is full.
    pub fn get_page(
        &mut self,
        va: VirtualAddress,
        create: bool,
        dir: AddressSpace,
    ) -> Result<Option<PageSlot>, PagingError> {
        self.require_at_least(PagingState::BootIdentityMapped)?;
        let page = va.page();
        let slot = page.directory_index();
        if let Some(table) = unsafe { dir.slot(self.mapper, slot) }.table() {
            return Ok(Some(PageSlot {
                table,
                index: page.table_index(),
            }));
        }
        if !create {
            return Ok(None);
        }
        let table = self.structure_frame()?;
        unsafe { dir.directory(self.mapper) }.set_slot(
            slot,
            TableSlot::Owned(table),
            slot < KERNEL_DIRECTORY_SLOT,
        );
        Ok(Some(PageSlot {
            table,
            index: page.table_index(),
        }))
    }

    /// Current value of the entry at `slot`.
    #[must_use]
    pub fn entry(&self, slot: PageSlot) -> PageTableEntry {
        unsafe { self.mapper.table_mut(slot.table) }.entry(slot.index)
    }

    /// Mutable access to the entry at `slot`.
    ///
    /// # Errors
    /// Paging has no bootstrap state yet.
    pub fn entry_mut(&mut self, slot: PageSlot) -> Result<&mut PageTableEntry, PagingError> {
        self.require_at_least(PagingState::BootIdentityMapped)?;
        Ok(unsafe { self.mapper.table_mut(slot.table) }.entry_mut(slot.index))
    }

    /// Back the page at `slot` with a fresh frame unless it has one.
    ///
    /// # Errors
    /// [`FrameError::OutOfFrames`] when physical memory is exhausted.
    pub fn allocate_frame(
        &mut self,
        slot: PageSlot,
        kernel_mode: bool,
        writable: bool,
    ) -> Result<(), PagingError> {
        let mapper = self.mapper;
        let entry = unsafe { mapper.table_mut(slot.table) }.entry_mut(slot.index);
        self.core_mut()?
            .frames
            .allocate_frame(entry, kernel_mode, writable)?;
        Ok(())
    }

    /// Release the frame behind `slot`; flags are left as they are.
    ///
    /// # Errors
    /// Paging has no bootstrap state yet.
    pub fn free_frame(&mut self, slot: PageSlot) -> Result<(), PagingError> {
        let mapper = self.mapper;
        let entry = unsafe { mapper.table_mut(slot.table) }.entry_mut(slot.index);
        self.core_mut()?.frames.free_frame(entry);
        Ok(())
    }

    /// Translate `va` through `dir`.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress, dir: AddressSpace) -> Option<PhysicalAddress> {
        unsafe { dir.translate(self.mapper, va) }
    }

    /// Map physical `[start, end)` at `KERNEL_VIRTUAL_BASE + pa`,
    /// claiming the frames. Pages already present are skipped.
    fn map_offset_range(
        &mut self,
        dir: AddressSpace,
        start: u32,
        end: u32,
    ) -> Result<(), PagingError> {
        let mut pa = align_down(start, PAGE_SIZE);
        while pa < end {
            let va = VirtualAddress::new(KERNEL_VIRTUAL_BASE + pa);
            let slot = self
                .get_page(va, true, dir)?
                .ok_or(PagingError::NotMapped(va))?;
            if !self.entry(slot).present() {
                let mapper = self.mapper;
                let entry = unsafe { mapper.table_mut(slot.table) }.entry_mut(slot.index);
                self.core_mut()?.frames.claim_frame(
                    entry,
                    PhysicalPage::from_index(pa / PAGE_SIZE),
                    true,
                    true,
                )?;
            }
            pa += PAGE_SIZE;
        }
        log::trace!("mapped {start:#x}..{end:#x} at {:#x}", KERNEL_VIRTUAL_BASE + start);
        Ok(())
    }

    /// Map `[from, to)` in the kernel directory with fresh kernel frames.
    ///
    /// # Errors
    /// Physical memory or the bootstrap region ran out.
    pub fn grow_heap(&mut self, from: VirtualAddress, to: VirtualAddress) -> Result<(), PagingError> {
        let kernel = self.kernel()?;
        let mut page = from.page();
        while page.base().as_u32() < to.as_u32() {
            let slot = self
                .get_page(page.base(), true, kernel)?
                .ok_or(PagingError::NotMapped(page.base()))?;
            self.allocate_frame(slot, true, true)?;
            let Some(next) = page.next() else { break };
            page = next;
        }
        Ok(())
    }

    /// Unmap `[from, to)` in the kernel directory, releasing the frames.
    ///
    /// # Errors
    /// Paging has no bootstrap state yet.
    pub fn shrink_heap(&mut self, from: VirtualAddress, to: VirtualAddress) -> Result<(), PagingError> {
        let kernel = self.kernel()?;
        let mut page = from.page();
        while page.base().as_u32() < to.as_u32() {
            if let Some(slot) = self.get_page(page.base(), false, kernel)? {
                self.free_frame(slot)?;
                self.entry_mut(slot)?.set_present(false);
                self.mmu.invalidate_page(page);
            }
            let Some(next) = page.next() else { break };
            page = next;
        }
        Ok(())
    }

    /// A new directory sharing every kernel table with `src` and holding a
    /// private copy of everything else.
    ///
    /// # Errors
    /// Paging is not active yet, or memory ran out part way; frames copied
    /// so far are not reclaimed.
    pub fn clone_page_directory(&mut self, src: AddressSpace) -> Result<AddressSpace, PagingError> {
        self.require(PagingState::Active)?;
        let kernel = self.kernel()?;
        let mapper = self.mapper;
        let dst = AddressSpace::from_directory(self.structure_frame()?);

        for i in 0..ENTRIES_PER_TABLE as usize {
            let Some(table) = unsafe { src.slot(mapper, i) }.table() else {
                continue;
            };
            let user = unsafe { src.directory(mapper) }.entry(i).user();
            let slot = if unsafe { kernel.slot(mapper, i) }.table() == Some(table) {
                TableSlot::SharedKernel(table)
            } else {
                TableSlot::Owned(self.clone_table(table)?)
            };
            unsafe { dst.directory(mapper) }.set_slot(i, slot, user);
        }

        log::debug!(
            "cloned directory {} into {}",
            src.directory_frame(),
            dst.directory_frame()
        );
        Ok(dst)
    }

    /// Copy a private page table: fresh user-writable frames with the same
    /// contents.
    fn clone_table(&mut self, src: PhysicalPage) -> Result<PhysicalPage, PagingError> {
        let dst = self.structure_frame()?;
        let mapper = self.mapper;
        let actual = self.state;
        let core = self.core.as_mut().ok_or(PagingError::WrongState {
            expected: PagingState::Active,
            actual,
        })?;
        let window = core.window.as_mut().ok_or(PagingError::WrongState {
            expected: PagingState::KernelMapped,
            actual,
        })?;

        for j in 0..ENTRIES_PER_TABLE as usize {
            let source = unsafe { mapper.table_mut(src) }.entry(j);
            if !source.present() || !source.has_frame() {
                continue;
            }
            let entry = unsafe { mapper.table_mut(dst) }.entry_mut(j);
            core.frames.allocate_frame(entry, false, true)?;
            let copy = entry.frame_page();
            // SAFETY: the window's table is shared by every directory.
            unsafe { window.copy_frame(mapper, &self.mmu, source.frame_page(), copy) };
        }
        Ok(dst)
    }
}

impl<M: PhysMapper, U: Mmu> HeapBacking for Vmm<'_, M, U> {
    fn grow(&mut self, from: usize, to: usize) -> Result<(), HeapError> {
        let exhausted = HeapError::BackingExhausted {
            start: from,
            end: to,
        };
        let (Ok(from), Ok(to)) = (u32::try_from(from), u32::try_from(to)) else {
            return Err(exhausted);
        };
        self.grow_heap(VirtualAddress::new(from), VirtualAddress::new(to))
            .map_err(|e| {
                log::error!("heap growth to {to:#x} failed: {e}");
                exhausted
            })
    }

    fn shrink(&mut self, from: usize, to: usize) {
        let (Ok(from), Ok(to)) = (u32::try_from(from), u32::try_from(to)) else {
            return;
        };
        if let Err(e) = self.shrink_heap(VirtualAddress::new(from), VirtualAddress::new(to)) {
            log::warn!("heap shrink {from:#x}..{to:#x} failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_sync::InterruptControl;
    use kernel_vmem::arena::{FrameArena, MmuEvent, RecordingMmu};

    const RAM_FRAMES: usize = 1024;
    const USER_VA: u32 = 0x0804_8000;

    type TestVmm<'m> = Vmm<'m, FrameArena, &'m RecordingMmu>;

    fn config() -> KernelConfig {
        KernelConfig {
            total_ram: 4 * 1024 * 1024,
            ..KernelConfig::default()
        }
    }

    fn boot() -> KernelBootInfo {
        KernelBootInfo {
            kernel_virtual_start: 0xC001_0000,
            kernel_virtual_end: 0xC002_0000,
            kernel_physical_start: 0x1_0000,
            kernel_physical_end: 0x2_0000,
        }
    }

    fn fresh<'m>(ram: &'m FrameArena, mmu: &'m RecordingMmu) -> TestVmm<'m> {
        Vmm::new(ram, mmu, BootstrapAlloc::kernel(), config())
    }

    fn active<'m>(ram: &'m FrameArena, mmu: &'m RecordingMmu) -> TestVmm<'m> {
        let mut vmm = fresh(ram, mmu);
        vmm.bootstrap_directory().unwrap();
        vmm.map_kernel(&boot()).unwrap();
        vmm.activate().unwrap();
        vmm
    }

    fn ignore(_: &mut TrapFrame) {}

    #[test]
    fn setup_steps_only_run_in_order() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let mut vmm = fresh(&ram, &mmu);
        assert_eq!(vmm.state(), PagingState::Uninitialized);

        assert_eq!(
            vmm.map_kernel(&boot()),
            Err(PagingError::WrongState {
                expected: PagingState::BootIdentityMapped,
                actual: PagingState::Uninitialized,
            })
        );
        assert!(vmm.activate().is_err());

        vmm.bootstrap_directory().unwrap();
        assert_eq!(vmm.state(), PagingState::BootIdentityMapped);
        assert!(vmm.bootstrap_directory().is_err());

        vmm.map_kernel(&boot()).unwrap();
        assert_eq!(vmm.state(), PagingState::KernelMapped);
        vmm.activate().unwrap();
        assert_eq!(vmm.state(), PagingState::Active);
        assert_eq!(vmm.current_directory(), vmm.kernel_directory());
    }

    #[test]
    fn clone_needs_active_paging() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let mut vmm = fresh(&ram, &mmu);
        let kernel = vmm.bootstrap_directory().unwrap();
        assert!(matches!(
            vmm.clone_page_directory(kernel),
            Err(PagingError::WrongState { .. })
        ));
    }

    #[test]
    fn inconsistent_boot_info_is_rejected() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let mut vmm = fresh(&ram, &mmu);
        vmm.bootstrap_directory().unwrap();
        let bad = KernelBootInfo {
            kernel_physical_start: 0x2_0000,
            kernel_physical_end: 0x3_0000,
            ..boot()
        };
        assert_eq!(vmm.map_kernel(&bad), Err(PagingError::BadBootInfo(bad)));
        assert_eq!(vmm.state(), PagingState::BootIdentityMapped);
    }

    #[test]
    fn setup_registers_fault_handler_and_switches_with_interrupts_masked() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let registry = InterruptRegistry::new();
        let mut vmm = fresh(&ram, &mmu);

        vmm.setup_paging(&boot(), &registry, &ignore).unwrap();

        assert!(registry.is_registered(PAGE_FAULT_VECTOR));
        let kernel = vmm.kernel_directory().unwrap();
        let loads: Vec<_> = mmu
            .events()
            .into_iter()
            .filter(|e| matches!(e, MmuEvent::LoadDirectory { .. }))
            .collect();
        assert_eq!(
            loads,
            [MmuEvent::LoadDirectory {
                directory: kernel.directory_frame(),
                interrupts_enabled: false,
            }]
        );
        assert!(mmu.interrupts_enabled());
    }

    #[test]
    fn kernel_directory_maps_low_memory_bootstrap_and_initial_heap() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let mut vmm = active(&ram, &mmu);
        let kernel = vmm.kernel_directory().unwrap();

        assert_eq!(
            vmm.translate(VirtualAddress::new(0xC00B_8000), kernel),
            Some(PhysicalAddress::new(0xB_8000))
        );
        assert_eq!(
            vmm.translate(VirtualAddress::new(0xC010_0123), kernel),
            Some(PhysicalAddress::new(0x10_0123))
        );

        let heap = vmm.config().heap;
        let first = vmm.translate(VirtualAddress::new(heap.start), kernel).unwrap();
        assert!(first.as_u32() >= BOOTSTRAP_PHYS_END);
        let past_initial = VirtualAddress::new(heap.start + heap.initial_size);
        assert_eq!(vmm.translate(past_initial, kernel), None);
        // Tables already exist up to the heap ceiling.
        assert!(
            vmm.get_page(VirtualAddress::new(heap.max - PAGE_SIZE), false, kernel)
                .unwrap()
                .is_some()
        );

        assert_eq!(vmm.translate(VirtualAddress::new(TEMP_WINDOW), kernel), None);
    }

    #[test]
    fn get_page_creates_a_table_once() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let mut vmm = active(&ram, &mmu);
        let kernel = vmm.kernel_directory().unwrap();
        let va = VirtualAddress::new(USER_VA);

        assert_eq!(vmm.get_page(va, false, kernel).unwrap(), None);
        let a = vmm.get_page(va, true, kernel).unwrap().unwrap();
        let b = vmm.get_page(va, true, kernel).unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.index(), va.page().table_index());

        let pde = unsafe { kernel.directory(&ram) }.entry(va.page().directory_index());
        assert!(pde.present());
        assert!(pde.user());
    }

    #[test]
    fn frame_stays_until_freed() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let mut vmm = active(&ram, &mmu);
        let kernel = vmm.kernel_directory().unwrap();
        let slot = vmm
            .get_page(VirtualAddress::new(USER_VA), true, kernel)
            .unwrap()
            .unwrap();

        vmm.allocate_frame(slot, false, true).unwrap();
        let entry = vmm.entry(slot);
        assert!(entry.present() && entry.user() && entry.writable());
        // Low memory, bootstrap region and the initial heap come first.
        assert_eq!(entry.frame_page().index(), 768);

        vmm.allocate_frame(slot, true, false).unwrap();
        assert_eq!(vmm.entry(slot), entry);
        assert!(vmm.frames().unwrap().is_used(entry.frame_page()));

        vmm.free_frame(slot).unwrap();
        assert!(!vmm.entry(slot).has_frame());
        assert!(vmm.entry(slot).present());
        assert!(!vmm.frames().unwrap().is_used(entry.frame_page()));
    }

    #[test]
    fn sixteen_megabytes_allocate_above_every_boot_mapping() {
        let ram = FrameArena::with_frames(4096);
        let mmu = RecordingMmu::new(true);
        let mut vmm = Vmm::new(&ram, &mmu, BootstrapAlloc::kernel(), KernelConfig::default());
        vmm.bootstrap_directory().unwrap();
        assert_eq!(vmm.frames().unwrap().frame_count(), 4096);
        assert_eq!(BitmapFrameAlloc::words_for(4096), 128);

        vmm.map_kernel(&boot()).unwrap();
        vmm.activate().unwrap();
        let kernel = vmm.kernel_directory().unwrap();
        let heap = vmm.config().heap;
        let last_heap_page = VirtualAddress::new(heap.start + heap.initial_size - PAGE_SIZE);
        let highest = vmm.translate(last_heap_page, kernel).unwrap();

        let slot = vmm
            .get_page(VirtualAddress::new(USER_VA), true, kernel)
            .unwrap()
            .unwrap();
        vmm.allocate_frame(slot, false, true).unwrap();
        let fresh = vmm.entry(slot).frame_page().base();
        assert!(fresh.as_u32() > highest.as_u32());
        assert!(fresh.as_u32() >= BOOTSTRAP_PHYS_END);
    }

    #[test]
    fn clone_shares_kernel_tables_and_copies_private_pages() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let mut vmm = active(&ram, &mmu);
        let kernel = vmm.kernel_directory().unwrap();

        let parent = vmm.clone_page_directory(kernel).unwrap();
        let va = VirtualAddress::new(USER_VA);
        let slot = vmm.get_page(va, true, parent).unwrap().unwrap();
        vmm.allocate_frame(slot, false, true).unwrap();
        let original = vmm.entry(slot).frame_page();
        ram.fill(original, 0x5A);
        mmu.clear();

        let child = vmm.clone_page_directory(parent).unwrap();

        for i in [KERNEL_DIRECTORY_SLOT, KERNEL_DIRECTORY_SLOT + 1] {
            let kernel_slot = unsafe { kernel.slot(&ram, i) };
            let child_slot = unsafe { child.slot(&ram, i) };
            assert_eq!(child_slot.table(), kernel_slot.table());
        }
        assert!(matches!(
            unsafe { child.slot(&ram, KERNEL_DIRECTORY_SLOT) },
            TableSlot::SharedKernel(_)
        ));

        let dir = va.page().directory_index();
        let TableSlot::Owned(copy_table) = (unsafe { child.slot(&ram, dir) }) else {
            panic!("private table not copied");
        };
        assert_ne!(Some(copy_table), unsafe { parent.slot(&ram, dir) }.table());

        let copy = vmm.translate(va, child).unwrap().page();
        assert_ne!(copy, original);
        assert!(ram.frame(copy).iter().all(|&b| b == 0x5A));

        let window = VirtualPage::containing(VirtualAddress::new(TEMP_WINDOW));
        let events = mmu.events();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| matches!(
            e,
            MmuEvent::Invalidate { page, interrupts_enabled: false } if *page == window
        )));
        assert_eq!(vmm.translate(VirtualAddress::new(TEMP_WINDOW), kernel), None);
        assert!(mmu.interrupts_enabled());
    }

    #[test]
    fn heap_backing_maps_and_unmaps_pages() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let mut vmm = active(&ram, &mmu);
        let kernel = vmm.kernel_directory().unwrap();
        let from = 0xC050_0000_u32;
        let to = from + 2 * PAGE_SIZE;

        vmm.grow(from as usize, to as usize).unwrap();
        let a = vmm.translate(VirtualAddress::new(from), kernel).unwrap();
        let b = vmm.translate(VirtualAddress::new(from + PAGE_SIZE), kernel).unwrap();
        assert_ne!(a.page(), b.page());
        mmu.clear();

        vmm.shrink(from as usize, to as usize);
        assert_eq!(vmm.translate(VirtualAddress::new(from), kernel), None);
        assert_eq!(mmu.events().len(), 2);
        assert!(!vmm.frames().unwrap().is_used(a.page()));
        assert!(!vmm.frames().unwrap().is_used(b.page()));
    }

    #[test]
    fn heap_growth_fails_when_frames_run_out() {
        let ram = FrameArena::with_frames(RAM_FRAMES);
        let mmu = RecordingMmu::new(true);
        let mut vmm = active(&ram, &mmu);
        let from = 0xC050_0000_usize;
        // 256 frames are left; ask for more.
        let to = from + 300 * PAGE_SIZE as usize;
        assert_eq!(
            vmm.grow(from, to),
            Err(HeapError::BackingExhausted {
                start: from,
                end: to
            })
        );
    }

    #[test]
    fn page_fault_reads_error_code_and_fault_address() {
        let mmu = RecordingMmu::new(false);
        mmu.set_fault_address(VirtualAddress::new(0xDEAD_B000));
        let mut frame = TrapFrame::for_vector(PAGE_FAULT_VECTOR);
        frame.err_code = 0b110;

        let pf = page_fault(&mmu, &frame);
        assert_eq!(pf.address, VirtualAddress::new(0xDEAD_B000));
        assert!(pf.error.write() && pf.error.user() && !pf.error.present());
    }
}
