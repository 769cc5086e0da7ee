//! # Typed IA-32 Control Registers
//!
//! Bitfield models of the registers the paging and interrupt code touch:
//! `CR0` (paging enable), `CR2` (page-fault linear address), `CR3` (page
//! directory base) and `EFLAGS` (interrupt flag).
//!
//! Loading and storing is implemented only when the `asm` feature is enabled
//! and the crate is built for `target_arch = "x86"`; the models themselves are
//! plain values and are usable (and tested) anywhere.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr0")]
pub mod cr0;

#[cfg(feature = "cr2")]
pub mod cr2;

#[cfg(feature = "cr3")]
pub mod cr3;

#[cfg(feature = "eflags")]
pub mod eflags;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn store_unsafe(self);
}

pub trait LoadRegister {
    /// # Safety
    /// It is generally safe to load this register even from user mode.
    fn load() -> Self;
}

impl<T> LoadRegisterUnsafe for T
where
    T: LoadRegister,
{
    #[inline]
    unsafe fn load_unsafe() -> Self {
        <Self as LoadRegister>::load()
    }
}
