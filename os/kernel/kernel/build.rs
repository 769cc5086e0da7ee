use kernel_info::memory;
use std::{env, path::PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let ld = manifest_dir.join("kernel.ld");

    let kernel_base = memory::KERNEL_VIRTUAL_BASE;
    let phys_load = memory::PHYS_LOAD;
    assert_eq!(
        kernel_base & ((1u32 << 22) - 1),
        0,
        "KERNEL_VIRTUAL_BASE must be 4 MiB aligned (got {kernel_base:#x})"
    );
    assert_eq!(
        phys_load & 0xfff,
        0,
        "PHYS_LOAD must be 4 KiB aligned (got {phys_load:#x})"
    );
    assert!(
        phys_load < memory::LOW_MEMORY_END,
        "the kernel image must load below 1 MiB (got {phys_load:#x})"
    );

    println!("cargo:rerun-if-changed={}", ld.display());
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (clippy, docs) skip the bare-metal link setup.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("none") {
        return;
    }

    println!("cargo:rustc-link-arg-bins=-T{}", ld.display());
    println!("cargo:rustc-link-arg-bins=--defsym=KERNEL_VIRTUAL_BASE={kernel_base:#x}");
    println!("cargo:rustc-link-arg-bins=--defsym=PHYS_LOAD={phys_load:#x}");
}
