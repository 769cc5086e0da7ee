use crate::{SpinLock, SpinLockGuard};
use core::ops::{Deref, DerefMut};

/// Control over the local CPU's maskable-interrupt flag.
///
/// Implementations must make `disable_interrupts` take effect before it
/// returns (on x86: `cli`).
pub trait InterruptControl {
    /// Whether maskable interrupts are currently enabled (`EFLAGS.IF`).
    fn interrupts_enabled(&self) -> bool;

    /// Mask interrupts (`cli`).
    fn disable_interrupts(&self);

    /// Unmask interrupts (`sti`).
    fn enable_interrupts(&self);
}

impl<C: InterruptControl + ?Sized> InterruptControl for &C {
    #[inline]
    fn interrupts_enabled(&self) -> bool {
        (**self).interrupts_enabled()
    }

    #[inline]
    fn disable_interrupts(&self) {
        (**self).disable_interrupts();
    }

    #[inline]
    fn enable_interrupts(&self) {
        (**self).enable_interrupts();
    }
}

/// The local CPU's interrupt flag, driven by `cli`/`sti`/`pushfd`.
///
/// # Platform / Privilege
///
/// Requires `x86` and a privileged context permitting `cli/sti`.
#[cfg(all(feature = "asm", target_arch = "x86"))]
#[derive(Debug, Clone, Copy)]
pub struct X86Interrupts {
    _private: (),
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl X86Interrupts {
    /// # Safety
    /// Must only be used where `cli`/`sti` are permitted (CPL0). Misuse can
    /// hang the system.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
use kernel_registers::{LoadRegister, eflags::Eflags};

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl InterruptControl for X86Interrupts {
    #[inline]
    fn interrupts_enabled(&self) -> bool {
        Eflags::load().if_interrupt_enable()
    }

    #[inline]
    fn disable_interrupts(&self) {
        unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
    }

    #[inline]
    fn enable_interrupts(&self) {
        unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
    }
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// `IrqGuard::new()` snapshots the interrupt flag. If interrupts were enabled,
/// it disables them. On drop, it re-enables them **only** if they were
/// previously enabled, so guards nest.
///
/// # Examples
///
/// ```ignore
/// let ints = unsafe { X86Interrupts::new() };
/// {
///     let _g = IrqGuard::new(&ints); // interrupts disabled here if previously enabled
///     // critical section
/// }
/// // IF restored to prior state
/// ```
#[must_use = "interrupts are restored as soon as the guard is dropped"]
pub struct IrqGuard<C: InterruptControl> {
    ctl: C,
    /// Whether interrupts were enabled (IF=1) when the guard was created.
    were_enabled: bool,
}

impl<C: InterruptControl> IrqGuard<C> {
    #[inline]
    pub fn new(ctl: C) -> Self {
        let enabled = ctl.interrupts_enabled();
        if enabled {
            ctl.disable_interrupts();
        }
        Self {
            ctl,
            were_enabled: enabled,
        }
    }

    /// Whether this guard will re-enable interrupts when dropped.
    #[inline]
    #[must_use]
    pub const fn restores(&self) -> bool {
        self.were_enabled
    }
}

impl<C: InterruptControl> Drop for IrqGuard<C> {
    fn drop(&mut self) {
        if self.were_enabled {
            self.ctl.enable_interrupts();
        }
    }
}

/// A [`SpinLock`] guard that also keeps interrupts disabled while held.
///
/// Prevents an interrupt handler from preempting the critical section and
/// spinning forever on the same lock. The lock is released before interrupts
/// are restored.
pub struct IrqSpinLockGuard<'a, T, C: InterruptControl> {
    guard: SpinLockGuard<'a, T>,
    _irq: IrqGuard<C>,
}

impl<T> SpinLock<T> {
    /// Acquire the lock with interrupts disabled for the guard's lifetime.
    #[inline]
    pub fn lock_irq<C: InterruptControl>(&self, ctl: C) -> IrqSpinLockGuard<'_, T, C> {
        let irq = IrqGuard::new(ctl);
        let guard = self.lock();
        IrqSpinLockGuard { guard, _irq: irq }
    }
}

impl<T, C: InterruptControl> Deref for IrqSpinLockGuard<'_, T, C> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T, C: InterruptControl> DerefMut for IrqSpinLockGuard<'_, T, C> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
