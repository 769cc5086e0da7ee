use bitfield_struct::bitfield;
use core::fmt;
use kernel_memory_addresses::VirtualAddress;

/// Page-fault error code layout (IA-32).
///
/// Each bit describes the condition that caused the page fault.
/// Reference: Intel SDM Vol. 3A, §4.7 “Page-Fault Exceptions”.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageFaultError {
    /// 0 = non-present page.
    /// 1 = protection violation (page present but access disallowed).
    pub present: bool, // bit 0

    /// 0 = read.
    /// 1 = write access.
    pub write: bool, // bit 1

    /// 0 = supervisor.
    /// 1 = user mode (CPL 3).
    pub user: bool, // bit 2

    /// 1 = caused by a reserved bit set in a paging structure.
    pub reserved_bit: bool, // bit 3

    /// 1 = instruction fetch.
    pub instruction_fetch: bool, // bit 4

    #[bits(27)]
    __: u32,
}

/// A decoded page fault: the error code plus the CR2 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFault {
    pub address: VirtualAddress,
    pub error: PageFaultError,
}

impl PageFault {
    #[must_use]
    pub const fn decode(error_code: u32, address: VirtualAddress) -> Self {
        Self {
            address,
            error: PageFaultError::from_bits(error_code),
        }
    }
}

impl fmt::Display for PageFault {
    /// `Page fault! ( not-present write user-mode ) at 0xdeadb000`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = self.error;
        f.write_str("Page fault! ( ")?;
        f.write_str(if e.present() { "protection " } else { "not-present " })?;
        f.write_str(if e.write() { "write " } else { "read " })?;
        f.write_str(if e.user() { "user-mode " } else { "kernel-mode " })?;
        if e.reserved_bit() {
            f.write_str("reserved ")?;
        }
        if e.instruction_fetch() {
            f.write_str("instruction-fetch ")?;
        }
        write!(f, ") at {:#x}", self.address.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_for_user_write_to_missing_page() {
        let pf = PageFault::decode(0b110, VirtualAddress::new(0xDEAD_B000));
        assert!(!pf.error.present());
        assert_eq!(
            pf.to_string(),
            "Page fault! ( not-present write user-mode ) at 0xdeadb000"
        );
    }

    #[test]
    fn report_for_kernel_read_protection_with_reserved_bit() {
        let pf = PageFault::decode(0b1001, VirtualAddress::new(0x10));
        assert_eq!(
            pf.to_string(),
            "Page fault! ( protection read kernel-mode reserved ) at 0x10"
        );
    }
}
