//! # Memory Layout

use kernel_memory_addresses::PAGE_SIZE;

/// Size of one physical frame / virtual page.
pub const FRAME_SIZE: u32 = PAGE_SIZE;

/// Amount of physical memory the frame bitmap covers, in MiB.
pub const TOTAL_RAM_SIZE_MB: u32 = 16;

/// Amount of physical memory the frame bitmap covers, in bytes.
pub const TOTAL_RAM_SIZE: u32 = TOTAL_RAM_SIZE_MB * 1024 * 1024;

/// Where the kernel executes (VMA); matches the linker script.
///
/// Physical addresses inside the kernel window are `virtual - KERNEL_VIRTUAL_BASE`.
pub const KERNEL_VIRTUAL_BASE: u32 = 0xC000_0000;

/// Page-directory slot that maps the start of the higher half.
pub const KERNEL_DIRECTORY_SLOT: usize = (KERNEL_VIRTUAL_BASE >> 22) as usize;

/// Where the boot sector places the kernel image in *physical* memory (LMA).
pub const PHYS_LOAD: u32 = 0x0000_1000;

/// Physical address of the VGA text buffer.
pub const VIDEO_MEMORY: u32 = 0x000B_8000;

/// End of the legacy low-memory region (boot sector, GDT, VGA, BIOS).
///
/// Everything below is mapped identity-plus-offset during paging setup.
pub const LOW_MEMORY_END: u32 = 0x0010_0000;

/// Start of the bootstrap placement region (physical).
///
/// Page tables and directories are carved from here before the heap exists.
pub const BOOTSTRAP_PHYS_START: u32 = 0x0010_0000;

/// End of the bootstrap placement region (physical, exclusive).
pub const BOOTSTRAP_PHYS_END: u32 = 0x0020_0000;

/// The single scratch page used to reach frames outside the active address space.
///
/// Lives in the last entry of the kernel slot so every cloned directory shares it.
pub const TEMP_WINDOW: u32 = KERNEL_VIRTUAL_BASE + 0x003F_F000;

/// Start of the kernel heap window.
pub const KHEAP_START: u32 = 0xC040_0000;

/// Initial mapped size of the kernel heap.
pub const KHEAP_INITIAL_SIZE: u32 = 0x0010_0000;

/// The heap never contracts below this many bytes.
pub const KHEAP_MIN_SIZE: u32 = 0x0007_0000;

/// Exclusive ceiling the heap may grow to.
pub const KHEAP_MAX: u32 = 0xC100_0000;

/// Number of holes the heap index can track.
pub const KHEAP_INDEX_CAPACITY: u32 = 0x2000;

/// Initial user stack and frame pointer of a new process.
pub const USER_STACK_TOP: u32 = 0xBFFF_FFFF;

/// The size of the boot kernel stack.
pub const KERNEL_STACK_SIZE: usize = 16 * 1024;

const _: () = {
    assert!(KERNEL_VIRTUAL_BASE.is_multiple_of(4 * 1024 * 1024));
    assert!(KERNEL_DIRECTORY_SLOT == 768);
    assert!(PHYS_LOAD.is_multiple_of(PAGE_SIZE));
    assert!(BOOTSTRAP_PHYS_START.is_multiple_of(PAGE_SIZE));
    assert!(BOOTSTRAP_PHYS_END.is_multiple_of(PAGE_SIZE));
    assert!(BOOTSTRAP_PHYS_END > BOOTSTRAP_PHYS_START);
    assert!(BOOTSTRAP_PHYS_START >= LOW_MEMORY_END);
    assert!(TEMP_WINDOW > KERNEL_VIRTUAL_BASE + BOOTSTRAP_PHYS_END);
    assert!(TEMP_WINDOW < KHEAP_START);
    assert!(KHEAP_START.is_multiple_of(PAGE_SIZE));
    assert!(KHEAP_INITIAL_SIZE.is_multiple_of(PAGE_SIZE));
    assert!(KHEAP_MIN_SIZE <= KHEAP_INITIAL_SIZE);
    assert!(KHEAP_START + KHEAP_INITIAL_SIZE <= KHEAP_MAX);
    assert!(USER_STACK_TOP < KERNEL_VIRTUAL_BASE);
    assert!(KERNEL_STACK_SIZE.is_multiple_of(4096));
};

/// Translate a kernel-window virtual address to its physical address.
#[inline]
#[must_use]
pub const fn kernel_virt_to_phys(va: u32) -> u32 {
    va - KERNEL_VIRTUAL_BASE
}

/// Translate a physical address to its kernel-window virtual address.
#[inline]
#[must_use]
pub const fn kernel_phys_to_virt(pa: u32) -> u32 {
    pa + KERNEL_VIRTUAL_BASE
}
