use crate::Mmu;
use kernel_memory_addresses::{PhysicalPage, VirtualAddress, VirtualPage};
use kernel_registers::cr0::Cr0;
use kernel_registers::cr2::Cr2;
use kernel_registers::cr3::Cr3;
use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use kernel_sync::{InterruptControl, X86Interrupts};

/// The local CPU's MMU: CR0/CR2/CR3 and `invlpg`.
#[derive(Debug, Clone, Copy)]
pub struct X86Mmu {
    irq: X86Interrupts,
}

impl X86Mmu {
    /// # Safety
    /// Must only be used at CPL0.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self {
            irq: unsafe { X86Interrupts::new() },
        }
    }
}

impl InterruptControl for X86Mmu {
    #[inline]
    fn interrupts_enabled(&self) -> bool {
        self.irq.interrupts_enabled()
    }

    #[inline]
    fn disable_interrupts(&self) {
        self.irq.disable_interrupts();
    }

    #[inline]
    fn enable_interrupts(&self) {
        self.irq.enable_interrupts();
    }
}

impl Mmu for X86Mmu {
    unsafe fn load_directory(&self, directory: PhysicalPage) {
        unsafe {
            Cr3::from_directory_phys(directory.base()).store_unsafe();
            let cr0 = Cr0::load_unsafe();
            if !cr0.pg_paging() {
                cr0.with_pg_paging(true).store_unsafe();
            }
        }
    }

    #[inline]
    fn invalidate_page(&self, page: VirtualPage) {
        let va = page.base().as_u32();
        unsafe {
            core::arch::asm!("invlpg [{}]", in(reg) va, options(nostack, preserves_flags));
        }
    }

    #[inline]
    fn fault_address(&self) -> VirtualAddress {
        unsafe { Cr2::load_unsafe() }.fault_address()
    }
}
