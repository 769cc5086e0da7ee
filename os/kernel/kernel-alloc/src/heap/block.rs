//! Block boundary tags.
//!
//! Every block, hole or allocation, is framed by a [`Header`] at its start
//! and a [`Footer`] at its end. Both carry [`HEAP_MAGIC`]; the footer points
//! back at its header so a block's left neighbour can be found from the
//! bytes just below it.

/// Sentinel in every header and footer.
pub const HEAP_MAGIC: u32 = 0x1238_90AB;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub is_hole: bool,
    /// Whole block size, header and footer included.
    pub size: usize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub magic: u32,
    /// Address of this block's header.
    pub header: usize,
}

pub const HEADER_SIZE: usize = size_of::<Header>();
pub const FOOTER_SIZE: usize = size_of::<Footer>();

/// Bytes a block spends on tags.
pub const OVERHEAD: usize = HEADER_SIZE + FOOTER_SIZE;

/// Block sizes and addresses are multiples of this.
pub const BLOCK_ALIGN: usize = align_of::<Header>();

const _: () = {
    assert!(align_of::<Footer>() == BLOCK_ALIGN);
    assert!(HEADER_SIZE.is_multiple_of(BLOCK_ALIGN));
    assert!(FOOTER_SIZE.is_multiple_of(BLOCK_ALIGN));
};

/// Raw access to the tags of the block at a given address.
///
/// All accessors require the address to lie inside a heap region whose
/// memory is mapped and owned by the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block(pub usize);

impl Block {
    #[inline]
    #[must_use]
    pub const fn address(self) -> usize {
        self.0
    }

    /// # Safety
    /// `self` must address a readable, `BLOCK_ALIGN`-aligned header slot.
    #[inline]
    pub unsafe fn header(self) -> Header {
        unsafe { (self.0 as *const Header).read() }
    }

    /// # Safety
    /// As for [`header`](Self::header); the slot must be writable.
    #[inline]
    pub unsafe fn header_mut<'a>(self) -> &'a mut Header {
        unsafe { &mut *(self.0 as *mut Header) }
    }

    /// The footer at the end of a block of `size` bytes.
    ///
    /// # Safety
    /// The footer slot must be readable, writable and aligned.
    #[inline]
    pub unsafe fn footer_mut<'a>(self, size: usize) -> &'a mut Footer {
        unsafe { &mut *((self.0 + size - FOOTER_SIZE) as *mut Footer) }
    }

    /// Whether the header carries the magic, the block ends at or before
    /// `limit`, and its footer points back.
    ///
    /// # Safety
    /// `[self, limit)` must be readable heap memory.
    pub unsafe fn is_intact(self, limit: usize) -> bool {
        if self.0 + OVERHEAD > limit {
            return false;
        }
        if unsafe { (self.0 as *const u32).read() } != HEAP_MAGIC {
            return false;
        }
        let h = unsafe { self.header() };
        if h.size < OVERHEAD || !h.size.is_multiple_of(BLOCK_ALIGN) || h.size > limit - self.0 {
            return false;
        }
        let f = unsafe { self.footer_mut(h.size) };
        f.magic == HEAP_MAGIC && f.header == self.0
    }

    /// Write fresh tags for a block of `size` bytes.
    ///
    /// # Safety
    /// `[self, self + size)` must be writable heap memory.
    pub unsafe fn write(self, size: usize, is_hole: bool) {
        unsafe {
            *self.header_mut() = Header {
                magic: HEAP_MAGIC,
                is_hole,
                size,
            };
            *self.footer_mut(size) = Footer {
                magic: HEAP_MAGIC,
                header: self.0,
            };
        }
    }

    /// The payload handed to callers.
    #[inline]
    #[must_use]
    pub const fn payload(self) -> usize {
        self.0 + HEADER_SIZE
    }

    #[inline]
    #[must_use]
    pub const fn from_payload(ptr: usize) -> Self {
        Self(ptr - HEADER_SIZE)
    }
}
