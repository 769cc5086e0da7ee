//! Cooperative switching between the processes in the ready queue.
//!
//! [`yield_now`] pushes the callee-saved registers, records
//! `(esp, ebp, resume label)` as the running process's [`SavedContext`] and
//! asks the process table for the next one. It then loads that context and
//! jumps to its resume label, which pops the other process's registers and
//! returns into its own `yield_now` call.

use crate::context::{KERNEL, Kernel};
use core::arch::naked_asm;
use kernel_process::{ContextState, ProcessError, SavedContext, Switch};
use kernel_sync::{IrqGuard, X86Interrupts};

/// Create init from the kernel directory and make it the running process.
///
/// # Errors
/// Paging is not set up or the directory could not be cloned.
pub fn init(kernel: &Kernel) -> Result<(), ProcessError> {
    // SAFETY: runs at CPL0.
    let ints = unsafe { X86Interrupts::new() };
    let pid = {
        let mut vmm = kernel.vmm.lock();
        let vmm = vmm.as_mut().ok_or(ProcessError::PagingNotReady)?;
        kernel.processes.lock().init_process_table(vmm, ints)?
    };
    // The ready queue allocates; the paging lock must be free by now.
    kernel.processes.lock().launch_init()?;
    log::info!("process {pid} is running");
    Ok(())
}

/// Give the CPU to the next ready process.
pub fn yield_now() {
    // SAFETY: runs at CPL0.
    let _irq = IrqGuard::new(unsafe { X86Interrupts::new() });
    unsafe { switch_trampoline() };
}

#[unsafe(naked)]
unsafe extern "C" fn switch_trampoline() {
    naked_asm!(
        "push ebp",
        "push ebx",
        "push esi",
        "push edi",
        "mov eax, esp",
        // SavedContext { esp, ebp, eip } on the stack
        "lea ecx, [3f]",
        "push ecx",
        "push ebp",
        "push eax",
        "push esp",
        "call {schedule}",
        "add esp, 4",
        "pop eax",
        "pop edx",
        "pop ecx",
        "mov esp, eax",
        "mov ebp, edx",
        "jmp ecx",
        "3:",
        "pop edi",
        "pop esi",
        "pop ebx",
        "pop ebp",
        "ret",
        schedule = sym schedule,
    );
}

/// Swap `ctx` for the next process's context. Leaves it alone when there
/// is nothing to switch to.
extern "C" fn schedule(ctx: *mut SavedContext) {
    // SAFETY: the trampoline passes a context on its own stack.
    let ctx = unsafe { &mut *ctx };
    let Some(kernel) = KERNEL.get() else {
        return;
    };
    let Some(mut vmm) = kernel.vmm.try_lock() else {
        return;
    };
    let Some(vmm) = vmm.as_mut() else {
        return;
    };
    let Some(mut processes) = kernel.processes.try_lock() else {
        return;
    };
    match processes.context_switch(vmm, ContextState::Running, *ctx) {
        Ok(Switch::Jump(next)) => *ctx = next,
        Ok(Switch::Resume) => {}
        Err(e) => log::warn!("no context switch: {e}"),
    }
}
