use kernel_alloc::{BootstrapAlloc, Vmm};
use kernel_info::boot::KernelBootInfo;
use kernel_info::config::KernelConfig;
use kernel_info::memory::KERNEL_DIRECTORY_SLOT;
use kernel_interrupts::{InterruptRegistry, TrapFrame};
use kernel_process::{AddressSpaces, ContextState, ProcessTable, SavedContext, Switch};
use kernel_sync::InterruptControl;
use kernel_vmem::TableSlot;
use kernel_vmem::arena::{FrameArena, MmuEvent, RecordingMmu};

fn ignore(_: &mut TrapFrame) {}

fn boot() -> KernelBootInfo {
    KernelBootInfo {
        kernel_virtual_start: 0xC001_0000,
        kernel_virtual_end: 0xC002_0000,
        kernel_physical_start: 0x1_0000,
        kernel_physical_end: 0x2_0000,
    }
}

fn config() -> KernelConfig {
    KernelConfig {
        total_ram: 4 * 1024 * 1024,
        ..KernelConfig::default()
    }
}

#[test]
fn init_runs_in_a_clone_of_the_kernel_directory() {
    let ram = FrameArena::with_frames(1024);
    let mmu = RecordingMmu::new(true);
    let registry = InterruptRegistry::new();
    let mut vmm = Vmm::new(&ram, &mmu, BootstrapAlloc::kernel(), config());
    vmm.setup_paging(&boot(), &registry, &ignore).unwrap();
    let kernel = vmm.kernel_space().unwrap();

    let mut table = ProcessTable::new();
    assert_eq!(table.init_process_table(&mut vmm, &mmu), Ok(1));
    assert!(mmu.interrupts_enabled());
    table.launch_init().unwrap();

    let init = *table.current().unwrap();
    assert_ne!(init.page_directory, kernel);
    let shared = unsafe { init.page_directory.slot(&ram, KERNEL_DIRECTORY_SLOT) };
    assert_eq!(
        shared,
        TableSlot::SharedKernel(
            unsafe { kernel.slot(&ram, KERNEL_DIRECTORY_SLOT) }
                .table()
                .unwrap()
        )
    );

    mmu.clear();
    let here = SavedContext {
        esp: 0xC000_8000,
        ebp: 0xC000_8000,
        eip: 0xC001_2345,
    };
    let out = table
        .context_switch(&mut vmm, ContextState::Running, here)
        .unwrap();
    assert_eq!(out, Switch::Jump(here));
    assert_eq!(
        mmu.events(),
        [MmuEvent::LoadDirectory {
            directory: init.page_directory.directory_frame(),
            interrupts_enabled: false,
        }]
    );
    assert_eq!(vmm.current_directory(), Some(init.page_directory));
}
