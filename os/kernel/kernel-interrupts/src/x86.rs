//! Entry stubs for all 256 vectors.
//!
//! Stub `n` lives at `isr_stubs + 16 * n`. It pushes a zero error code
//! unless the CPU already pushed one, pushes `n`, and jumps to the common
//! stub, which builds a [`TrapFrame`](crate::TrapFrame) and calls
//! `kernel_trap_entry(frame: *mut TrapFrame)`.

use crate::{IDT_ENTRIES, Idt, KERNEL_DS};

const STUB_SIZE: u32 = 16;

core::arch::global_asm!(
    ".section .text",
    ".balign 16",
    ".global isr_stubs",
    "isr_stubs:",
    ".set vector, 0",
    ".rept 256",
    ".balign 16",
    // Vectors for which the CPU pushes an error code.
    ".if (vector == 8) || ((vector >= 10) && (vector <= 14)) || (vector == 17) || (vector == 21) || (vector == 29) || (vector == 30)",
    ".else",
    // push 0
    ".byte 0x6A, 0x00",
    ".endif",
    // push imm32 vector
    ".byte 0x68",
    ".long vector",
    "jmp isr_common",
    ".set vector, vector + 1",
    ".endr",
    "",
    "isr_common:",
    "pusha",
    "xor eax, eax",
    "mov ax, ds",
    "push eax",
    "mov ax, {kernel_ds}",
    "mov ds, ax",
    "mov es, ax",
    "mov fs, ax",
    "mov gs, ax",
    "cld",
    "push esp",
    "call kernel_trap_entry",
    "add esp, 4",
    "pop eax",
    "mov ds, ax",
    "mov es, ax",
    "mov fs, ax",
    "mov gs, ax",
    "popa",
    // int_no, err_code
    "add esp, 8",
    "iretd",
    kernel_ds = const KERNEL_DS,
);

unsafe extern "C" {
    static isr_stubs: u8;
}

/// Address of the entry stub for `vector`.
#[must_use]
pub fn stub_address(vector: u8) -> u32 {
    let base = (&raw const isr_stubs) as u32;
    base + u32::from(vector) * STUB_SIZE
}

/// Point every gate of `idt` at its entry stub.
pub fn install_all(idt: &mut Idt) {
    for vector in 0..IDT_ENTRIES {
        #[allow(clippy::cast_possible_truncation)]
        let vector = vector as u8;
        idt.install_vector(vector, stub_address(vector));
    }
    debug_assert!(idt.is_complete());
}
