//! # IA-32 Interrupt Descriptor Table
//!
//! ```ignore
//! idt.install_vector(14, stub_address(14));
//! // ... all 256 gates ...
//! unsafe { IDT.load() };
//! ```
//!
//! Every gate is a present, ring-0, 32-bit interrupt gate in the kernel code
//! segment (flags byte `0x8E`). Interrupt gates clear IF on entry, so
//! handlers never nest.

use crate::{IDT_ENTRIES, KERNEL_CS};
use bitfield_struct::bitfield;

const _: () = assert!(size_of::<IdtEntry>() == 8);
const _: () = assert!(size_of::<IdtPointer>() == 6);

/// The type/attribute byte of a gate: `| P | DPL(2) | S(0) | Type(4) |`.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct GateAttributes {
    /// **Type**: 0xE = 32-bit interrupt gate, 0xF = 32-bit trap gate.
    #[bits(4)]
    pub typ: u8,

    /// **S**: must be `0` for interrupt/trap gates.
    pub storage: bool,

    /// **DPL**: lowest ring allowed to raise the vector with `int n`.
    #[bits(2)]
    pub dpl: u8,

    /// **P**: the gate is valid.
    pub present: bool,
}

impl GateAttributes {
    /// Present, DPL 0, 32-bit interrupt gate (`0x8E`).
    #[inline]
    #[must_use]
    pub const fn kernel_interrupt_gate() -> Self {
        Self::new().with_typ(0xE).with_dpl(0).with_present(true)
    }
}

/// One 8-byte gate descriptor.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IdtEntry {
    offset_lo: u16,
    selector: u16,
    zero: u8,
    attributes: u8,
    offset_hi: u16,
}

impl IdtEntry {
    /// A zeroed, non-present entry.
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        zero: 0,
        attributes: 0,
        offset_hi: 0,
    };

    /// A kernel interrupt gate to `handler`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn interrupt_gate(handler: u32) -> Self {
        Self {
            offset_lo: (handler & 0xFFFF) as u16,
            selector: KERNEL_CS,
            zero: 0,
            attributes: GateAttributes::kernel_interrupt_gate().into_bits(),
            offset_hi: (handler >> 16) as u16,
        }
    }

    /// The handler address.
    #[must_use]
    pub const fn handler(&self) -> u32 {
        ((self.offset_hi as u32) << 16) | self.offset_lo as u32
    }

    #[must_use]
    pub const fn selector(&self) -> u16 {
        self.selector
    }

    #[must_use]
    pub const fn attributes(&self) -> GateAttributes {
        GateAttributes::from_bits(self.attributes)
    }
}

/// Operand format used by `lidt` (limit + base).
#[repr(C, packed)]
#[derive(Copy, Clone, Debug)]
pub struct IdtPointer {
    pub limit: u16,
    pub base: u32,
}

/// A 256-entry **Interrupt Descriptor Table**.
#[repr(C, align(8))]
pub struct Idt {
    entries: [IdtEntry; IDT_ENTRIES],
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}

impl Idt {
    /// A table with every gate non-present.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; IDT_ENTRIES],
        }
    }

    /// Point gate `vector` at `handler_address`.
    pub const fn install_vector(&mut self, vector: u8, handler_address: u32) {
        self.entries[vector as usize] = IdtEntry::interrupt_gate(handler_address);
    }

    #[must_use]
    pub const fn entry(&self, vector: u8) -> &IdtEntry {
        &self.entries[vector as usize]
    }

    /// Whether every gate has been installed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.attributes().present())
    }

    /// The `lidt` operand describing this table.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pointer(&self) -> IdtPointer {
        IdtPointer {
            limit: (size_of::<Self>() - 1) as u16,
            base: core::ptr::from_ref(self) as usize as u32,
        }
    }

    /// Load this IDT into the CPU’s **IDTR** using `lidt`.
    ///
    /// # Safety
    /// - Must be called at **CPL0**.
    /// - All present entries must reference valid handler code.
    #[cfg(all(feature = "asm", target_arch = "x86"))]
    #[inline]
    pub unsafe fn load(&'static self) {
        let idtr = self.pointer();
        unsafe {
            core::arch::asm!("lidt [{}]", in(reg) &raw const idtr, options(nostack, preserves_flags, readonly));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_encoding() {
        let mut idt = Idt::new();
        idt.install_vector(33, 0xC010_2345);
        let e = idt.entry(33);
        assert_eq!(e.handler(), 0xC010_2345);
        assert_eq!(e.selector(), 0x08);
        assert_eq!(e.attributes().into_bits(), 0x8E);
        assert!(!idt.entry(34).attributes().present());
    }

    #[test]
    fn descriptor_limit_covers_256_gates() {
        let idt = Idt::new();
        let p = idt.pointer();
        let limit = p.limit;
        assert_eq!(limit, 256 * 8 - 1);
    }

    #[test]
    fn complete_after_all_vectors() {
        let mut idt = Idt::new();
        for v in 0..=255u8 {
            assert!(!idt.is_complete());
            idt.install_vector(v, 0x1000 + u32::from(v) * 16);
        }
        assert!(idt.is_complete());
    }
}
