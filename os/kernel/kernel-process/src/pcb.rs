use kernel_vmem::AddressSpace;

/// Process identifier. The first process gets 1.
pub type Pid = u32;

/// Registers saved at a switch point.
///
/// The field order is relied upon by the switch trampoline.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedContext {
    pub esp: u32,
    pub ebp: u32,
    pub eip: u32,
}

/// How the code at a switch point was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Reached normally; the caller wants to give up the CPU.
    Running,
    /// Reached by a restore after a switch; nothing left to do.
    JustSwitched,
}

/// Process control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pcb {
    pub pid: Pid,
    pub esp: u32,
    pub ebp: u32,
    pub eip: u32,
    pub page_directory: AddressSpace,
}

impl Pcb {
    #[must_use]
    pub const fn new(pid: Pid, context: SavedContext, page_directory: AddressSpace) -> Self {
        Self {
            pid,
            esp: context.esp,
            ebp: context.ebp,
            eip: context.eip,
            page_directory,
        }
    }

    #[must_use]
    pub const fn context(&self) -> SavedContext {
        SavedContext {
            esp: self.esp,
            ebp: self.ebp,
            eip: self.eip,
        }
    }

    pub const fn save(&mut self, context: SavedContext) {
        self.esp = context.esp;
        self.ebp = context.ebp;
        self.eip = context.eip;
    }
}
