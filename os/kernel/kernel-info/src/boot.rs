//! # Kernel Boot Information

/// Kernel entry function pointer, called by the boot stub with interrupts disabled.
pub type KernelEntryFn = extern "C" fn(*const KernelBootInfo) -> !;

/// Bounds of the loaded kernel image as seen by the boot stub.
///
/// The linker provides the virtual bounds; the physical ones are where the
/// boot sector copied the image. Both ranges are half-open.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelBootInfo {
    pub kernel_virtual_start: u32,
    pub kernel_virtual_end: u32,
    pub kernel_physical_start: u32,
    pub kernel_physical_end: u32,
}

impl KernelBootInfo {
    /// Size of the kernel image in bytes.
    #[must_use]
    pub const fn image_size(&self) -> u32 {
        self.kernel_physical_end - self.kernel_physical_start
    }

    /// Whether the virtual and physical ranges describe the same number of bytes.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.kernel_virtual_end >= self.kernel_virtual_start
            && self.kernel_physical_end >= self.kernel_physical_start
            && self.kernel_virtual_end - self.kernel_virtual_start
                == self.kernel_physical_end - self.kernel_physical_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_bounds() {
        let bi = KernelBootInfo {
            kernel_virtual_start: 0xC000_1000,
            kernel_virtual_end: 0xC000_2000,
            kernel_physical_start: 0x1000,
            kernel_physical_end: 0x2000,
        };
        assert!(bi.is_consistent());
        assert_eq!(bi.image_size(), 0x1000);

        let skewed = KernelBootInfo {
            kernel_virtual_end: 0xC000_3000,
            ..bi
        };
        assert!(!skewed.is_consistent());
    }
}
