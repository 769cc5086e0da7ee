use kernel_alloc::{PagingError, Vmm};
use kernel_vmem::{AddressSpace, Mmu, PhysMapper};

/// What the process table needs from the paging subsystem.
pub trait AddressSpaces {
    /// The kernel directory, once paging is set up.
    fn kernel_space(&self) -> Option<AddressSpace>;

    /// A copy of `src` sharing its kernel half.
    ///
    /// # Errors
    /// Paging is not active or memory ran out.
    fn clone_space(&mut self, src: AddressSpace) -> Result<AddressSpace, PagingError>;

    /// Make `space` the active address space.
    ///
    /// # Errors
    /// Paging is not set up.
    fn switch_space(&mut self, space: AddressSpace) -> Result<(), PagingError>;
}

impl<M: PhysMapper, U: Mmu> AddressSpaces for Vmm<'_, M, U> {
    fn kernel_space(&self) -> Option<AddressSpace> {
        self.kernel_directory()
    }

    fn clone_space(&mut self, src: AddressSpace) -> Result<AddressSpace, PagingError> {
        self.clone_page_directory(src)
    }

    fn switch_space(&mut self, space: AddressSpace) -> Result<(), PagingError> {
        self.switch_page_directory(space)
    }
}

impl<S: AddressSpaces + ?Sized> AddressSpaces for &mut S {
    fn kernel_space(&self) -> Option<AddressSpace> {
        (**self).kernel_space()
    }

    fn clone_space(&mut self, src: AddressSpace) -> Result<AddressSpace, PagingError> {
        (**self).clone_space(src)
    }

    fn switch_space(&mut self, space: AddressSpace) -> Result<(), PagingError> {
        (**self).switch_space(space)
    }
}
