//! # Bootstrap Placement Allocator
//!
//! A bump pointer over the bootstrap region, used before the heap exists and
//! for every page table and directory afterwards. Nothing is ever freed.
//!
//! The region is mapped at `KERNEL_VIRTUAL_BASE + pa`, so each placement
//! knows both its virtual and physical address.

use kernel_info::memory::{
    BOOTSTRAP_PHYS_END, BOOTSTRAP_PHYS_START, kernel_phys_to_virt, kernel_virt_to_phys,
};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, VirtualAddress, align_up};
use kernel_vmem::PhysMapper;

/// Non-page allocations are rounded to this.
const WORD: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BootstrapError {
    #[error("bootstrap region exhausted: {requested} bytes requested, {remaining} left")]
    Exhausted { requested: u32, remaining: u32 },
    #[error("break {0} is outside the bootstrap region")]
    BreakOutOfRange(VirtualAddress),
}

/// Where a placement landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub virt: VirtualAddress,
    pub phys: PhysicalAddress,
}

#[derive(Debug)]
pub struct BootstrapAlloc {
    start: u32,
    brk: u32,
    limit: u32,
}

impl BootstrapAlloc {
    /// Bump allocator over the virtual range `[start, limit)`.
    #[must_use]
    pub const fn new(start: VirtualAddress, limit: VirtualAddress) -> Self {
        Self {
            start: start.as_u32(),
            brk: start.as_u32(),
            limit: limit.as_u32(),
        }
    }

    /// The kernel's bootstrap region.
    #[must_use]
    pub const fn kernel() -> Self {
        Self::new(
            VirtualAddress::new(kernel_phys_to_virt(BOOTSTRAP_PHYS_START)),
            VirtualAddress::new(kernel_phys_to_virt(BOOTSTRAP_PHYS_END)),
        )
    }

    /// Current break.
    #[must_use]
    pub const fn brk(&self) -> VirtualAddress {
        VirtualAddress::new(self.brk)
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.limit - self.brk
    }

    /// Move the break to `addr`.
    ///
    /// # Errors
    /// [`BootstrapError::BreakOutOfRange`] outside `[start, limit]`.
    pub fn kbrk(&mut self, addr: VirtualAddress) -> Result<(), BootstrapError> {
        if addr.as_u32() < self.start || addr.as_u32() > self.limit {
            return Err(BootstrapError::BreakOutOfRange(addr));
        }
        self.brk = addr.as_u32();
        Ok(())
    }

    /// Advance the break by `increment` bytes; returns the old break.
    ///
    /// # Errors
    /// [`BootstrapError::Exhausted`] if the region cannot hold it.
    pub fn ksbrk(&mut self, increment: u32) -> Result<VirtualAddress, BootstrapError> {
        let old = self.brk;
        let new = old
            .checked_add(increment)
            .filter(|&n| n <= self.limit)
            .ok_or(BootstrapError::Exhausted {
                requested: increment,
                remaining: self.remaining(),
            })?;
        self.kbrk(VirtualAddress::new(new))?;
        Ok(VirtualAddress::new(old))
    }

    /// Place `size` bytes, page aligned if asked, word aligned otherwise.
    ///
    /// # Errors
    /// [`BootstrapError::Exhausted`] if the region cannot hold it.
    pub fn dumb_kmalloc(&mut self, size: u32, page_align: bool) -> Result<Placement, BootstrapError> {
        let align = if page_align { PAGE_SIZE } else { WORD };
        let exhausted = BootstrapError::Exhausted {
            requested: size,
            remaining: self.remaining(),
        };
        let aligned = align_up(self.brk, align).ok_or(exhausted)?;
        if aligned > self.limit {
            return Err(exhausted);
        }
        let size = align_up(size, WORD).ok_or(exhausted)?;

        let saved = self.brk;
        self.brk = aligned;
        let virt = self.ksbrk(size).map_err(|e| {
            self.brk = saved;
            e
        })?;
        Ok(Placement {
            virt,
            phys: PhysicalAddress::new(kernel_virt_to_phys(virt.as_u32())),
        })
    }

    /// Like [`dumb_kmalloc`](Self::dumb_kmalloc), zero-filled.
    ///
    /// # Errors
    /// [`BootstrapError::Exhausted`] if the region cannot hold it.
    pub fn dumb_kcalloc<M: PhysMapper>(
        &mut self,
        mapper: &M,
        size: u32,
        page_align: bool,
    ) -> Result<Placement, BootstrapError> {
        let placement = self.dumb_kmalloc(size, page_align)?;
        unsafe { mapper.phys_bytes(placement.phys, size as usize) }.fill(0);
        Ok(placement)
    }
}
