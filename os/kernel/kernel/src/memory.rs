//! Paging and kernel heap bring-up.

use crate::context::{ALLOCATOR, KERNEL, Kernel, MAPPER};
use crate::trap;
use kernel_alloc::{BootstrapAlloc, Heap, HeapBacking, HeapError, HeapRegion, PagingError, Vmm};
use kernel_info::boot::KernelBootInfo;
use kernel_info::config::KernelConfig;
use kernel_vmem::X86Mmu;

/// Why memory bring-up stopped.
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum MemoryInitError {
    #[error(transparent)]
    Paging(#[from] PagingError),
    #[error(transparent)]
    Heap(#[from] HeapError),
}

/// Feeds heap growth from the kernel's paging subsystem.
///
/// The paging lock is only tried: an allocation made while it is held (the
/// paging code itself never allocates) fails instead of deadlocking.
pub struct KernelHeapBacking;

impl HeapBacking for KernelHeapBacking {
    fn grow(&mut self, from: usize, to: usize) -> Result<(), HeapError> {
        let exhausted = HeapError::BackingExhausted {
            start: from,
            end: to,
        };
        let kernel = KERNEL.get().ok_or(exhausted)?;
        let mut vmm = kernel.vmm.try_lock().ok_or(exhausted)?;
        vmm.as_mut().ok_or(exhausted)?.grow(from, to)
    }

    fn shrink(&mut self, from: usize, to: usize) {
        let Some(kernel) = KERNEL.get() else {
            return;
        };
        match kernel.vmm.try_lock() {
            Some(mut vmm) => {
                if let Some(vmm) = vmm.as_mut() {
                    vmm.shrink(from, to);
                }
            }
            None => log::warn!("heap pages {from:#x}..{to:#x} kept: paging is busy"),
        }
    }
}

/// Build the kernel directory, switch to it, then hand the initial heap to
/// the global allocator.
pub fn init(
    kernel: &'static Kernel,
    boot: &KernelBootInfo,
    config: KernelConfig,
) -> Result<(), MemoryInitError> {
    // SAFETY: runs at CPL0.
    let mmu = unsafe { X86Mmu::new() };
    let mut vmm = Vmm::new(&MAPPER, mmu, BootstrapAlloc::kernel(), config);
    vmm.setup_paging(boot, &kernel.registry, &trap::page_fault)?;
    if let Some(frames) = vmm.frames() {
        log::info!(
            "paging active: {} of {} frames in use",
            frames.used_frames(),
            frames.frame_count()
        );
    }
    *kernel.vmm.lock() = Some(vmm);

    // SAFETY: setup_paging mapped the initial heap window, and nothing else
    // lives there.
    let heap = unsafe { Heap::create(HeapRegion::from(config.heap), KernelHeapBacking) }?;
    if ALLOCATOR.init(heap).is_some() {
        log::warn!("kernel heap replaced");
    }
    log::info!(
        "kernel heap at {:#010x}, {} KiB",
        config.heap.start,
        config.heap.initial_size / 1024
    );
    Ok(())
}
