use crate::pcb::{ContextState, Pcb, Pid, SavedContext};
use crate::spaces::AddressSpaces;
use alloc::collections::VecDeque;
use kernel_alloc::PagingError;
use kernel_info::memory::USER_STACK_TOP;
use kernel_sync::{InterruptControl, IrqGuard};
use kernel_vmem::AddressSpace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    #[error("process table is not initialized")]
    NotInitialized,
    #[error("process table is already initialized")]
    AlreadyInitialized,
    #[error("init has already been launched")]
    AlreadyLaunched,
    #[error("no process is running")]
    NoCurrentProcess,
    #[error("paging has no kernel directory yet")]
    PagingNotReady,
    #[error(transparent)]
    Paging(#[from] PagingError),
    #[error("{0} is not implemented")]
    Unsupported(&'static str),
}

/// Outcome of [`ProcessTable::context_switch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// Carry on where the switch point was reached.
    Resume,
    /// Restore these registers and jump to `eip`. The next directory is
    /// already active.
    Jump(SavedContext),
}

/// The init process and a circular ready queue whose front is the running
/// process.
#[derive(Debug)]
pub struct ProcessTable {
    init: Option<Pcb>,
    ready: VecDeque<Pcb>,
    next_pid: Pid,
    initialized: bool,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            init: None,
            ready: VecDeque::new(),
            next_pid: 1,
            initialized: false,
        }
    }

    const fn allocate_pid(&mut self) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    /// Create the init process in a clone of the kernel directory, with its
    /// stack at the top of user space.
    ///
    /// Runs with interrupts masked.
    ///
    /// # Errors
    /// Already initialized, paging not set up, or cloning failed.
    pub fn init_process_table<S: AddressSpaces, C: InterruptControl>(
        &mut self,
        spaces: &mut S,
        ctl: C,
    ) -> Result<Pid, ProcessError> {
        if self.initialized {
            return Err(ProcessError::AlreadyInitialized);
        }
        let _irq = IrqGuard::new(ctl);
        let kernel = spaces.kernel_space().ok_or(ProcessError::PagingNotReady)?;
        let directory = spaces.clone_space(kernel)?;
        let pid = self.allocate_pid();
        let context = SavedContext {
            esp: USER_STACK_TOP,
            ebp: USER_STACK_TOP,
            eip: 0,
        };
        self.init = Some(Pcb::new(pid, context, directory));
        self.initialized = true;
        log::info!("init process {pid} in directory {}", directory.directory_frame());
        Ok(pid)
    }

    /// Put init on the ready queue; it becomes the running process.
    ///
    /// # Errors
    /// The table is not initialized, or init was already launched.
    pub fn launch_init(&mut self) -> Result<(), ProcessError> {
        let Some(init) = self.init.take() else {
            return Err(if self.initialized {
                ProcessError::AlreadyLaunched
            } else {
                ProcessError::NotInitialized
            });
        };
        self.ready.push_back(init);
        Ok(())
    }

    /// Create a process in a clone of `parent` and queue it behind the
    /// running one.
    ///
    /// # Errors
    /// The table is not initialized, or cloning failed.
    pub fn spawn<S: AddressSpaces>(
        &mut self,
        spaces: &mut S,
        parent: AddressSpace,
        context: SavedContext,
    ) -> Result<Pid, ProcessError> {
        if !self.initialized {
            return Err(ProcessError::NotInitialized);
        }
        let directory = spaces.clone_space(parent)?;
        let pid = self.allocate_pid();
        self.ready.push_back(Pcb::new(pid, context, directory));
        log::debug!("spawned process {pid}");
        Ok(pid)
    }

    /// Cooperative round-robin switch.
    ///
    /// With [`ContextState::Running`] the registers in `current` are saved
    /// into the running process, the queue rotates by one, and the next
    /// process's directory is activated. Its saved registers come back as
    /// [`Switch::Jump`]. With [`ContextState::JustSwitched`] nothing changes.
    ///
    /// # Errors
    /// No process is running, or the directory switch failed.
    pub fn context_switch<S: AddressSpaces>(
        &mut self,
        spaces: &mut S,
        state: ContextState,
        current: SavedContext,
    ) -> Result<Switch, ProcessError> {
        if state == ContextState::JustSwitched {
            return Ok(Switch::Resume);
        }
        let running = self.ready.front_mut().ok_or(ProcessError::NoCurrentProcess)?;
        running.save(current);
        self.ready.rotate_left(1);
        let next = *self.ready.front().ok_or(ProcessError::NoCurrentProcess)?;
        spaces.switch_space(next.page_directory)?;
        log::trace!("switched to process {}", next.pid);
        Ok(Switch::Jump(next.context()))
    }

    /// The running process.
    #[must_use]
    pub fn current(&self) -> Option<&Pcb> {
        self.ready.front()
    }

    /// Pid of the running process.
    ///
    /// # Errors
    /// No process is running.
    pub fn getpid(&self) -> Result<Pid, ProcessError> {
        self.current()
            .map(|p| p.pid)
            .ok_or(ProcessError::NoCurrentProcess)
    }

    /// Pids in queue order, running process first.
    pub fn ready_pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.ready.iter().map(|p| p.pid)
    }

    /// Duplicate the running process: 0 in the child, the child's pid in
    /// the parent.
    ///
    /// # Errors
    /// Always [`ProcessError::Unsupported`].
    pub fn fork(&mut self) -> Result<Pid, ProcessError> {
        log::warn!("fork called by {:?}", self.current().map(|p| p.pid));
        Err(ProcessError::Unsupported("fork"))
    }

    /// Replace the running program with `program`, passing `args`.
    ///
    /// # Errors
    /// Always [`ProcessError::Unsupported`].
    pub fn execv(&mut self, program: &str, args: &[&str]) -> Result<(), ProcessError> {
        log::warn!("execv {program} with {} args", args.len());
        Err(ProcessError::Unsupported("execv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use kernel_memory_addresses::PhysicalPage;

    #[derive(Default)]
    struct FakeSpaces {
        kernel: Option<AddressSpace>,
        next: u32,
        switches: Vec<AddressSpace>,
    }

    impl FakeSpaces {
        fn ready() -> Self {
            Self {
                kernel: Some(AddressSpace::from_directory(PhysicalPage::from_index(1))),
                next: 100,
                switches: Vec::new(),
            }
        }
    }

    impl AddressSpaces for FakeSpaces {
        fn kernel_space(&self) -> Option<AddressSpace> {
            self.kernel
        }

        fn clone_space(&mut self, _src: AddressSpace) -> Result<AddressSpace, PagingError> {
            self.next += 1;
            Ok(AddressSpace::from_directory(PhysicalPage::from_index(self.next)))
        }

        fn switch_space(&mut self, space: AddressSpace) -> Result<(), PagingError> {
            self.switches.push(space);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeInts {
        enabled: Cell<bool>,
        disabled_calls: Cell<u32>,
    }

    impl InterruptControl for FakeInts {
        fn interrupts_enabled(&self) -> bool {
            self.enabled.get()
        }

        fn disable_interrupts(&self) {
            self.enabled.set(false);
            self.disabled_calls.set(self.disabled_calls.get() + 1);
        }

        fn enable_interrupts(&self) {
            self.enabled.set(true);
        }
    }

    fn launched(spaces: &mut FakeSpaces) -> ProcessTable {
        let mut table = ProcessTable::new();
        table
            .init_process_table(spaces, &FakeInts::default())
            .unwrap();
        table.launch_init().unwrap();
        table
    }

    #[test]
    fn init_is_pid_one_at_the_top_of_user_space() {
        let mut spaces = FakeSpaces::ready();
        let ints = FakeInts::default();
        ints.enabled.set(true);
        let mut table = ProcessTable::new();

        assert_eq!(table.init_process_table(&mut spaces, &ints), Ok(1));
        assert_eq!(ints.disabled_calls.get(), 1);
        assert!(ints.enabled.get());

        table.launch_init().unwrap();
        let init = table.current().unwrap();
        assert_eq!(init.pid, 1);
        assert_eq!(init.esp, 0xBFFF_FFFF);
        assert_eq!(init.ebp, 0xBFFF_FFFF);
        assert_eq!(init.eip, 0);
        assert_ne!(Some(init.page_directory), spaces.kernel);
        assert_eq!(table.getpid(), Ok(1));
    }

    #[test]
    fn init_needs_paging() {
        let mut spaces = FakeSpaces::default();
        let mut table = ProcessTable::new();
        assert_eq!(
            table.init_process_table(&mut spaces, &FakeInts::default()),
            Err(ProcessError::PagingNotReady)
        );
        assert_eq!(table.launch_init(), Err(ProcessError::NotInitialized));
    }

    #[test]
    fn init_happens_once() {
        let mut spaces = FakeSpaces::ready();
        let mut table = launched(&mut spaces);
        assert_eq!(
            table.init_process_table(&mut spaces, &FakeInts::default()),
            Err(ProcessError::AlreadyInitialized)
        );
        assert_eq!(table.launch_init(), Err(ProcessError::AlreadyLaunched));
    }

    #[test]
    fn getpid_without_a_process_fails() {
        let table = ProcessTable::new();
        assert_eq!(table.getpid(), Err(ProcessError::NoCurrentProcess));
    }

    #[test]
    fn switch_rotates_and_saves_registers() {
        let mut spaces = FakeSpaces::ready();
        let mut table = launched(&mut spaces);
        let init_dir = table.current().unwrap().page_directory;
        let child_ctx = SavedContext {
            esp: 0xBFFF_F000,
            ebp: 0xBFFF_F000,
            eip: 0x0804_8000,
        };
        let child = table.spawn(&mut spaces, init_dir, child_ctx).unwrap();
        assert_eq!(child, 2);
        assert_eq!(table.ready_pids().collect::<Vec<_>>(), [1, 2]);

        let at_switch = SavedContext {
            esp: 0xBFFF_FF00,
            ebp: 0xBFFF_FF10,
            eip: 0x0804_8123,
        };
        let out = table
            .context_switch(&mut spaces, ContextState::Running, at_switch)
            .unwrap();
        assert_eq!(out, Switch::Jump(child_ctx));
        assert_eq!(table.getpid(), Ok(2));
        let child_dir = table.current().unwrap().page_directory;
        assert_eq!(spaces.switches, [child_dir]);

        let out = table
            .context_switch(&mut spaces, ContextState::Running, child_ctx)
            .unwrap();
        assert_eq!(out, Switch::Jump(at_switch));
        assert_eq!(spaces.switches, [child_dir, init_dir]);
        assert_eq!(table.ready_pids().collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn just_switched_resumes_without_touching_the_queue() {
        let mut spaces = FakeSpaces::ready();
        let mut table = launched(&mut spaces);
        let before = *table.current().unwrap();

        let out = table
            .context_switch(&mut spaces, ContextState::JustSwitched, SavedContext::default())
            .unwrap();
        assert_eq!(out, Switch::Resume);
        assert_eq!(*table.current().unwrap(), before);
        assert!(spaces.switches.is_empty());
    }

    #[test]
    fn switch_without_processes_fails() {
        let mut spaces = FakeSpaces::ready();
        let mut table = ProcessTable::new();
        assert_eq!(
            table.context_switch(&mut spaces, ContextState::Running, SavedContext::default()),
            Err(ProcessError::NoCurrentProcess)
        );
    }

    #[test]
    fn fork_and_execv_are_stubs() {
        let mut spaces = FakeSpaces::ready();
        let mut table = launched(&mut spaces);
        assert_eq!(table.fork(), Err(ProcessError::Unsupported("fork")));
        assert_eq!(
            table.execv("/bin/init", &["init"]),
            Err(ProcessError::Unsupported("execv"))
        );
    }
}
