//! Kernel-wide state, published once during boot so trap handlers can reach it.

use crate::memory::KernelHeapBacking;
use kernel_alloc::phys_mapper::OffsetPhysMapper;
use kernel_alloc::{LockedHeap, Vmm};
use kernel_info::config::KernelConfig;
use kernel_interrupts::{ChainedPics, Idt, InterruptRegistry, Ticks, x86};
use kernel_process::ProcessTable;
use kernel_sync::{SpinLock, SyncOnceCell};
use kernel_vmem::X86Mmu;

/// The paging subsystem as the kernel runs it.
pub type KernelVmm = Vmm<'static, OffsetPhysMapper, X86Mmu>;

pub static MAPPER: OffsetPhysMapper = OffsetPhysMapper::KERNEL;

pub static KERNEL: SyncOnceCell<Kernel> = SyncOnceCell::new();

#[global_allocator]
pub static ALLOCATOR: LockedHeap<KernelHeapBacking> = LockedHeap::empty();

pub struct Kernel {
    pub registry: InterruptRegistry,
    pub pics: ChainedPics,
    pub idt: Idt,
    /// `None` until paging is set up.
    pub vmm: SpinLock<Option<KernelVmm>>,
    pub processes: SpinLock<ProcessTable>,
    pub ticks: Ticks,
}

impl Kernel {
    pub fn new(config: &KernelConfig) -> Self {
        let mut idt = Idt::new();
        x86::install_all(&mut idt);
        Self {
            registry: InterruptRegistry::new(),
            pics: ChainedPics::new(config.pic_master_offset, config.pic_slave_offset),
            idt,
            vmm: SpinLock::new(None),
            processes: SpinLock::new(ProcessTable::new()),
            ticks: Ticks::new(),
        }
    }
}
