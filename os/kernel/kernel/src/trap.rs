//! Trap entry and the kernel's own handlers.

use crate::context::KERNEL;
use kernel_interrupts::{Dispatch, TrapFrame, dispatch};
use kernel_ports::X86Ports;
use kernel_vmem::X86Mmu;

/// Called by the common entry stub for every vector.
#[unsafe(no_mangle)]
extern "C" fn kernel_trap_entry(frame: *mut TrapFrame) {
    // SAFETY: the stub passes the frame it just built on the stack.
    let frame = unsafe { &mut *frame };
    let Some(kernel) = KERNEL.get() else {
        panic!("trap {} before the kernel context exists", frame.int_no);
    };
    let mut ports = unsafe { X86Ports::new() };
    match dispatch(&kernel.registry, &kernel.pics, &mut ports, frame) {
        Dispatch::Unhandled(e) => panic!("{e}"),
        Dispatch::Handled | Dispatch::Acknowledged | Dispatch::Ignored => {}
    }
}

/// Vector 14. Faults are never resolved: report and stop.
pub fn page_fault(frame: &mut TrapFrame) {
    // SAFETY: trap handlers run at CPL0.
    let mmu = unsafe { X86Mmu::new() };
    let fault = kernel_alloc::page_fault(&mmu, frame);
    log::error!("eip {:#010x}, error code {:#x}", frame.eip, frame.err_code);
    panic!("{fault}");
}

/// IRQ0.
pub fn timer_tick(_frame: &mut TrapFrame) {
    if let Some(kernel) = KERNEL.get() {
        kernel.ticks.tick();
    }
}
