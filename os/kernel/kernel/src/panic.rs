use core::panic::PanicInfo;
use kernel_qemu::qemu_trace;
use kernel_sync::{InterruptControl, X86Interrupts};

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    // SAFETY: the kernel runs at CPL0.
    unsafe { X86Interrupts::new() }.disable_interrupts();
    qemu_trace!(
        "*** System panic: {} ***\nHalting the CPU...\n",
        info.message()
    );
    if let Some(location) = info.location() {
        qemu_trace!("  at {}:{}\n", location.file(), location.line());
    }
    loop {
        unsafe { core::arch::asm!("hlt", options(nomem, nostack, preserves_flags)) };
    }
}
