use kernel_sync::{InterruptControl, IrqGuard, SpinLock};
use std::cell::{Cell, RefCell};

#[derive(Default)]
struct FakeCpu {
    enabled: Cell<bool>,
    events: RefCell<Vec<&'static str>>,
}

impl FakeCpu {
    fn with_interrupts(enabled: bool) -> Self {
        let cpu = Self::default();
        cpu.enabled.set(enabled);
        cpu
    }
}

impl InterruptControl for FakeCpu {
    fn interrupts_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn disable_interrupts(&self) {
        self.enabled.set(false);
        self.events.borrow_mut().push("cli");
    }

    fn enable_interrupts(&self) {
        self.enabled.set(true);
        self.events.borrow_mut().push("sti");
    }
}

#[test]
fn guard_disables_and_restores() {
    let cpu = FakeCpu::with_interrupts(true);
    {
        let g = IrqGuard::new(&cpu);
        assert!(g.restores());
        assert!(!cpu.interrupts_enabled());
    }
    assert!(cpu.interrupts_enabled());
    assert_eq!(*cpu.events.borrow(), vec!["cli", "sti"]);
}

#[test]
fn guard_leaves_disabled_state_alone() {
    let cpu = FakeCpu::with_interrupts(false);
    {
        let _g = IrqGuard::new(&cpu);
    }
    assert!(!cpu.interrupts_enabled());
    assert!(cpu.events.borrow().is_empty());
}

#[test]
fn nested_guards_only_outermost_restores() {
    let cpu = FakeCpu::with_interrupts(true);
    {
        let _outer = IrqGuard::new(&cpu);
        {
            let inner = IrqGuard::new(&cpu);
            assert!(!inner.restores());
        }
        assert!(!cpu.interrupts_enabled());
    }
    assert!(cpu.interrupts_enabled());
}

#[test]
fn lock_irq_holds_both() {
    let cpu = FakeCpu::with_interrupts(true);
    let lock = SpinLock::new(5_u32);
    {
        let mut g = lock.lock_irq(&cpu);
        *g += 1;
        assert!(!cpu.interrupts_enabled());
        assert!(lock.try_lock().is_none());
    }
    assert!(cpu.interrupts_enabled());
    assert_eq!(*lock.lock(), 6);
}
