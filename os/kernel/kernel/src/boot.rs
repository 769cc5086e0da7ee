use crate::context::{KERNEL, Kernel};
use crate::{logging, memory, scheduler, trap};
use core::arch::naked_asm;
use kernel_info::boot::KernelBootInfo;
use kernel_info::config::KernelConfig;
use kernel_info::memory::KERNEL_STACK_SIZE;
use kernel_interrupts::{IRQ0, Pit};
use kernel_ports::X86Ports;
use kernel_qemu::qemu_trace;
use kernel_sync::InterruptControl;
use kernel_sync::X86Interrupts;

/// 16-byte aligned stack
#[repr(align(16))]
struct Aligned<const N: usize>([u8; N]);

#[unsafe(link_section = ".bss.boot")]
#[unsafe(no_mangle)]
static mut BOOT_STACK: Aligned<KERNEL_STACK_SIZE> = Aligned([0; KERNEL_STACK_SIZE]);

/// The kernel entry point.
///
/// # ABI
/// cdecl: the boot stage pushes the `boot_info` pointer and calls in with
/// interrupts disabled.
///
/// # Naked function & Stack
/// The boot stage's stack lives in low memory that paging setup does not
/// keep, so this switches to [`BOOT_STACK`] before any Rust code runs.
#[unsafe(no_mangle)]
#[unsafe(naked)]
#[unsafe(link_section = ".text._start")]
pub extern "C" fn _start(_boot_info: *const KernelBootInfo) -> ! {
    naked_asm!(
        "cli",
        // boot_info, before the stack goes away
        "mov eax, [esp + 4]",
        "lea esp, [{stack_sym} + {stack_size}]",
        "and esp, -16",
        "xor ebp, ebp",
        // keep the call site 16-byte aligned: 12 bytes of padding + the argument
        "sub esp, 12",
        "push eax",
        "call {rust_entry}",
        "2:",
        "hlt",
        "jmp 2b",
        stack_sym = sym BOOT_STACK,
        stack_size = const KERNEL_STACK_SIZE,
        rust_entry = sym kernel_entry,
    );
}

/// Kernel entry running on the boot stack.
#[unsafe(no_mangle)]
extern "C" fn kernel_entry(boot_info: *const KernelBootInfo) -> ! {
    #[cfg(feature = "qemu")]
    qemu_trace!("Kernel reporting to QEMU!\n");

    // SAFETY: the boot stage hands over a valid, readable record.
    let bi = unsafe { *boot_info };
    kernel_main(&bi)
}

fn kernel_main(bi: &KernelBootInfo) -> ! {
    let config = KernelConfig::default();
    logging::init(config.log_level);
    log::info!(
        "kernel image {:#010x}..{:#010x} (physical {:#010x}..{:#010x})",
        bi.kernel_virtual_start,
        bi.kernel_virtual_end,
        bi.kernel_physical_start,
        bi.kernel_physical_end
    );

    let kernel = KERNEL.get_or_init(|| Kernel::new(&config));
    let mut ports = unsafe { X86Ports::new() };
    kernel.pics.remap(&mut ports);
    // SAFETY: the IDT lives in a static and every stub is installed.
    unsafe { kernel.idt.load() };

    if let Err(e) = memory::init(kernel, bi, config) {
        panic!("{e}");
    }

    if let Err(e) = scheduler::init(kernel) {
        panic!("{e}");
    }

    kernel.registry.register(IRQ0, &trap::timer_tick);
    match Pit::init_timer(&mut ports, config.timer_frequency_hz) {
        Ok(divisor) => log::info!(
            "timer at {} Hz (divisor {divisor})",
            config.timer_frequency_hz
        ),
        Err(e) => log::warn!("timer not started: {e}"),
    }

    let ints = unsafe { X86Interrupts::new() };
    ints.enable_interrupts();
    log::info!("entering idle loop");

    loop {
        scheduler::yield_now();
        unsafe { core::arch::asm!("hlt", options(nomem, nostack, preserves_flags)) };
    }
}
