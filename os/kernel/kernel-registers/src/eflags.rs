#[cfg(all(feature = "asm", target_arch = "x86"))]
use crate::LoadRegister;
use bitfield_struct::bitfield;

/// Architectural EFLAGS model (IA-32).
#[bitfield(u32, order = Lsb)]
pub struct Eflags {
    /// Carry Flag
    pub cf_carry: bool, // 0

    /// Always 1.
    #[bits(default = true)]
    _always1: bool, // 1

    /// Parity Flag
    pub pf_parity: bool, // 2

    #[bits(default = false)]
    _rsvd3: bool, // 3

    /// Adjust Flag
    pub af_adjust: bool, // 4

    #[bits(default = false)]
    _rsvd5: bool, // 5

    /// Zero Flag
    pub zf_zero: bool, // 6

    /// Sign Flag
    pub sf_sign: bool, // 7

    /// Trap Flag
    pub tf_trap: bool, // 8

    /// Interrupt Enable Flag
    pub if_interrupt_enable: bool, // 9

    /// Direction Flag
    pub df_direction: bool, // 10

    /// Overflow Flag
    pub of_overflow: bool, // 11

    /// I/O Privilege Level
    #[bits(2)]
    pub iopl: u8, // 12–13

    /// Nested Task
    pub nt_nested: bool, // 14

    #[bits(default = false)]
    _rsvd15: bool, // 15

    /// Resume Flag
    pub rf_resume: bool, // 16

    /// Virtual 8086 mode
    pub vm_virtual_8086: bool, // 17

    /// Alignment Check
    pub ac_alignment_check: bool, // 18

    /// Virtual Interrupt Flag
    pub vif_virtual_interrupt: bool, // 19

    /// Virtual Interrupt Pending
    pub vip_virtual_interrupt_pending: bool, // 20

    /// ID Flag: allows toggling CPUID.
    pub id_cpuid: bool, // 21

    #[bits(10, default = 0)]
    _rsvd22_31: u16,
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl LoadRegister for Eflags {
    fn load() -> Self {
        let r: u32;
        unsafe { core::arch::asm!("pushfd; pop {}", out(reg) r, options(nomem, preserves_flags)) }
        Self::from_bits(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_flag_is_bit_9() {
        let fl = Eflags::from_bits(0x0000_0202);
        assert!(fl.if_interrupt_enable());
        assert_eq!(Eflags::new().into_bits(), 0x0000_0002);
    }
}
