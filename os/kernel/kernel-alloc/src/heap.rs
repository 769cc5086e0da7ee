//! # Kernel Heap
//!
//! A hole-indexed allocator over one contiguous virtual range that can grow
//! up to a ceiling and shrink back to a floor.
//!
//! ```text
//! region.start                   start                               end      max
//! │ hole index (capacity slots) │ ┃hdr│payload│ftr┃hdr│ hole │ftr┃ … │ ····· │
//! ```
//!
//! * Every block carries a [`Header`](block::Header) and a
//!   [`Footer`](block::Footer) tagged with [`HEAP_MAGIC`]. Blocks tile
//!   `[start, end)` without gaps.
//! * The index lists every hole, smallest first; allocation takes the first
//!   hole that fits.
//! * When nothing fits, the heap asks its [`HeapBacking`] for more pages,
//!   extends (or creates) the hole at the end, and searches once more.
//! * `free` merges a hole with free neighbours on both sides. A hole that
//!   reaches the end gives whole pages back to the backing.
//!
//! The heap itself does no locking; [`LockedHeap`] wraps it for use as the
//! global allocator.

mod block;
mod locked;
mod ordered_array;

pub use block::{FOOTER_SIZE, HEADER_SIZE, HEAP_MAGIC, OVERHEAD};
pub use locked::LockedHeap;
pub use ordered_array::{LessThan, OrderedArray};

use block::{BLOCK_ALIGN, Block, Footer};
use core::ptr::NonNull;
use kernel_info::config::HeapConfig;
use kernel_vmem::FRAME_BYTES;

const PAGE: usize = FRAME_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
    #[error("heap region {start:#x}..{end:#x} (ceiling {max:#x}) is unusable")]
    InvalidRegion { start: usize, end: usize, max: usize },
    #[error("allocation of {0} bytes overflows the address space")]
    SizeOverflow(usize),
    #[error("heap cannot grow to {requested:#x}: ceiling is {max:#x}")]
    ExpansionExceedsMax { requested: usize, max: usize },
    #[error("no memory to back heap range {start:#x}..{end:#x}")]
    BackingExhausted { start: usize, end: usize },
    #[error("no hole fits {0} bytes after expansion")]
    NoFit(usize),
}

/// Supplies the memory under the heap's virtual range.
pub trait HeapBacking {
    /// Make `[from, to)` usable. Both ends are page aligned.
    ///
    /// # Errors
    /// The memory cannot be provided.
    fn grow(&mut self, from: usize, to: usize) -> Result<(), HeapError>;

    /// Release `[from, to)`. Both ends are page aligned.
    fn shrink(&mut self, from: usize, to: usize);
}

impl<T: HeapBacking + ?Sized> HeapBacking for &mut T {
    fn grow(&mut self, from: usize, to: usize) -> Result<(), HeapError> {
        (**self).grow(from, to)
    }

    fn shrink(&mut self, from: usize, to: usize) {
        (**self).shrink(from, to);
    }
}

/// Placement and limits of a heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRegion {
    /// Page-aligned start; the index lives here.
    pub start: usize,
    /// Bytes mapped when the heap is created.
    pub initial_size: usize,
    /// Blocks never shrink below this many bytes.
    pub min_size: usize,
    /// Exclusive ceiling for growth.
    pub max: usize,
    /// Number of holes the index can track.
    pub index_capacity: usize,
}

impl From<HeapConfig> for HeapRegion {
    fn from(c: HeapConfig) -> Self {
        Self {
            start: c.start as usize,
            initial_size: c.initial_size as usize,
            min_size: c.min_size as usize,
            max: c.max as usize,
            index_capacity: c.index_capacity as usize,
        }
    }
}

/// Result of walking every block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub blocks: usize,
    pub holes: usize,
    /// Sum of hole sizes, tags included.
    pub hole_bytes: usize,
    /// Sum of allocated block sizes, tags included.
    pub used_bytes: usize,
}

impl HeapStats {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.hole_bytes + self.used_bytes
    }
}

pub struct Heap<B: HeapBacking> {
    index: OrderedArray<usize>,
    /// First block.
    start: usize,
    /// One past the last block.
    end: usize,
    /// `end` never drops below this.
    min_end: usize,
    max: usize,
    backing: B,
}

// SAFETY: the heap exclusively owns its region; the raw index pointer is
// never shared.
unsafe impl<B: HeapBacking + Send> Send for Heap<B> {}

fn by_size(a: &usize, b: &usize) -> bool {
    // SAFETY: the index only ever holds addresses of live hole headers.
    unsafe { Block(*a).header().size < Block(*b).header().size }
}

const fn round_up(x: usize, align: usize) -> Option<usize> {
    match x.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

impl<B: HeapBacking> Heap<B> {
    /// Build a heap over `region`, starting as one big hole.
    ///
    /// # Safety
    /// `[region.start, region.start + region.initial_size)` must be mapped,
    /// writable and used by nothing else. Whatever `backing.grow` reports
    /// as done must be mapped the same way.
    ///
    /// # Errors
    /// [`HeapError::InvalidRegion`] if the region is misaligned, exceeds its
    /// ceiling, or is too small for the index and the minimum size.
    pub unsafe fn create(region: HeapRegion, backing: B) -> Result<Self, HeapError> {
        let invalid = HeapError::InvalidRegion {
            start: region.start,
            end: region.start.wrapping_add(region.initial_size),
            max: region.max,
        };
        let end = region.start.checked_add(region.initial_size).ok_or(invalid)?;
        if !region.start.is_multiple_of(PAGE)
            || !end.is_multiple_of(PAGE)
            || end > region.max
            || region.index_capacity == 0
        {
            return Err(invalid);
        }
        let start = region
            .index_capacity
            .checked_mul(size_of::<usize>())
            .and_then(|bytes| region.start.checked_add(bytes))
            .and_then(|s| round_up(s, PAGE))
            .ok_or(invalid)?;
        let min_end = start
            .checked_add(region.min_size)
            .and_then(|e| round_up(e, PAGE))
            .ok_or(invalid)?;
        if start + OVERHEAD > end || min_end > end {
            return Err(invalid);
        }

        let storage = NonNull::new(region.start as *mut usize).ok_or(invalid)?;
        unsafe { storage.as_ptr().write_bytes(0, region.index_capacity) };
        let index = unsafe { OrderedArray::place(storage, region.index_capacity, by_size) };

        let mut heap = Self {
            index,
            start,
            end,
            min_end,
            max: region.max,
            backing,
        };
        unsafe { Block(start).write(end - start, true) };
        heap.index.insert(start);
        log::debug!(
            "heap at {start:#x}..{end:#x}, floor {min_end:#x}, ceiling {:#x}, {} index slots",
            region.max,
            region.index_capacity
        );
        Ok(heap)
    }

    /// Address of the first block.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// One past the last block.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Number of holes in the index.
    #[must_use]
    pub const fn hole_count(&self) -> usize {
        self.index.len()
    }

    /// Hole header addresses, smallest hole first.
    pub fn holes(&self) -> impl Iterator<Item = usize> + '_ {
        self.index.iter()
    }

    #[must_use]
    pub const fn backing(&self) -> &B {
        &self.backing
    }

    /// Allocate `size` bytes; with `page_align` the returned address is
    /// page aligned.
    ///
    /// # Errors
    /// The size overflows, or the heap cannot grow far enough.
    ///
    /// # Panics
    /// If the hole index overflows its capacity.
    pub fn allocate(&mut self, size: usize, page_align: bool) -> Result<NonNull<u8>, HeapError> {
        let need = round_up(size, BLOCK_ALIGN)
            .and_then(|s| s.checked_add(OVERHEAD))
            .ok_or(HeapError::SizeOverflow(size))?;

        let (pos, gap) = match self.find_smallest_hole(need, page_align) {
            Some(found) => found,
            None => {
                self.expand_for(need, page_align)?;
                self.find_smallest_hole(need, page_align)
                    .ok_or(HeapError::NoFit(size))?
            }
        };

        let hole = Block(self.index.remove(pos));
        let mut avail = unsafe { hole.header() }.size;
        let mut block = hole;

        if gap > 0 {
            unsafe { hole.write(gap, true) };
            self.index.insert(hole.address());
            block = Block(hole.address() + gap);
            avail -= gap;
        }

        let block_size = if avail - need < OVERHEAD { avail } else { need };
        unsafe { block.write(block_size, false) };

        if avail > block_size {
            let rest = Block(block.address() + block_size);
            unsafe { rest.write(avail - block_size, true) };
            self.index.insert(rest.address());
        }

        // `block` lies inside the heap, which never starts at address 0.
        NonNull::new(block.payload() as *mut u8).ok_or(HeapError::SizeOverflow(size))
    }

    /// Return a block to the heap. Null is ignored.
    ///
    /// # Safety
    /// `ptr` must be null or have come from [`allocate`](Self::allocate)
    /// (or [`realloc`](Self::realloc)) on this heap and not been freed since.
    ///
    /// # Panics
    /// If the block's tags are corrupted or it is already a hole.
    pub unsafe fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let mut block = self.checked_block(ptr);
        let mut size = unsafe { block.header() }.size;

        if let Some(left) = self.free_left_neighbour(block) {
            if let Some(pos) = self.index.position(left.address()) {
                self.index.remove(pos);
            }
            size += unsafe { left.header() }.size;
            block = left;
        }

        let right = Block(block.address() + size);
        if right.address() < self.end
            && unsafe { right.is_intact(self.end) }
            && unsafe { right.header() }.is_hole
        {
            if let Some(pos) = self.index.position(right.address()) {
                self.index.remove(pos);
            }
            size += unsafe { right.header() }.size;
        }

        if block.address() + size == self.end {
            let new_end = self.contraction_target(block.address());
            if new_end < self.end {
                self.contract(new_end);
            }
            size = self.end - block.address();
        }

        if size > 0 {
            unsafe { block.write(size, true) };
            self.index.insert(block.address());
        }
    }

    /// Move an allocation to a block of `size` bytes, copying what fits.
    ///
    /// A null `ptr` behaves like [`allocate`](Self::allocate). The old block
    /// is freed only once the new one exists.
    ///
    /// # Safety
    /// As for [`free`](Self::free).
    ///
    /// # Errors
    /// As for [`allocate`](Self::allocate); the old block is left intact.
    pub unsafe fn realloc(&mut self, ptr: *mut u8, size: usize) -> Result<NonNull<u8>, HeapError> {
        if ptr.is_null() {
            return self.allocate(size, false);
        }
        let old_usable = unsafe { self.checked_block(ptr).header() }.size - OVERHEAD;
        let new = self.allocate(size, false)?;
        unsafe {
            core::ptr::copy_nonoverlapping(ptr, new.as_ptr(), old_usable.min(size));
            self.free(ptr);
        }
        Ok(new)
    }

    /// Bytes usable at `ptr`, which may exceed what was asked for.
    ///
    /// # Safety
    /// As for [`free`](Self::free).
    #[must_use]
    pub unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        unsafe { self.checked_block(ptr.as_ptr()).header() }.size - OVERHEAD
    }

    /// Walk every block from `start` to `end`, checking tags and the index.
    ///
    /// # Panics
    /// On a corrupted tag, a gap between blocks, or an index that does not
    /// list exactly the holes.
    #[must_use]
    pub fn check(&self) -> HeapStats {
        let mut stats = HeapStats::default();
        let mut at = self.start;
        while at < self.end {
            let block = Block(at);
            assert!(
                unsafe { block.is_intact(self.end) },
                "heap corruption: bad block at {at:#x}"
            );
            let h = unsafe { block.header() };
            stats.blocks += 1;
            if h.is_hole {
                stats.holes += 1;
                stats.hole_bytes += h.size;
                assert!(
                    self.index.position(at).is_some(),
                    "hole at {at:#x} missing from the index"
                );
            } else {
                stats.used_bytes += h.size;
            }
            at += h.size;
        }
        assert_eq!(at, self.end, "blocks overrun the heap end");
        assert_eq!(stats.holes, self.index.len(), "index lists stale holes");
        stats
    }

    fn checked_block(&self, ptr: *mut u8) -> Block {
        let block = Block::from_payload(ptr as usize);
        assert!(
            block.address() >= self.start && unsafe { block.is_intact(self.end) },
            "heap corruption: bad magic at {:#x}",
            block.address()
        );
        assert!(
            !unsafe { block.header() }.is_hole,
            "heap corruption: block at {:#x} is already free",
            block.address()
        );
        block
    }

    /// The hole immediately before `block`, if there is one.
    fn free_left_neighbour(&self, block: Block) -> Option<Block> {
        if block.address() < self.start + OVERHEAD {
            return None;
        }
        let footer = unsafe { &*((block.address() - FOOTER_SIZE) as *const Footer) };
        if footer.magic != HEAP_MAGIC || footer.header < self.start {
            return None;
        }
        let left = Block(footer.header);
        let intact = unsafe { left.is_intact(block.address()) };
        (intact
            && unsafe { left.header() }.is_hole
            && left.address() + unsafe { left.header() }.size == block.address())
        .then_some(left)
    }

    /// Index position of the smallest hole that fits `need` bytes, plus the
    /// leading gap page alignment costs in it.
    fn find_smallest_hole(&self, need: usize, page_align: bool) -> Option<(usize, usize)> {
        self.index.iter().enumerate().find_map(|(i, addr)| {
            let size = unsafe { Block(addr).header() }.size;
            let gap = if page_align { Self::align_gap(addr)? } else { 0 };
            (size >= gap && size - gap >= need).then_some((i, gap))
        })
    }

    /// Bytes to skip from `addr` so the next header's payload is page
    /// aligned, leaving room for a hole in front.
    fn align_gap(addr: usize) -> Option<usize> {
        let payload = Block(addr).payload();
        let mut gap = round_up(payload, PAGE)? - payload;
        if gap != 0 && gap < OVERHEAD {
            gap += PAGE;
        }
        Some(gap)
    }

    /// The hole ending at `end`, if the last block is one.
    fn tail_hole(&self) -> Option<Block> {
        if self.end - self.start < OVERHEAD {
            return None;
        }
        let footer = unsafe { &*((self.end - FOOTER_SIZE) as *const Footer) };
        if footer.magic != HEAP_MAGIC || footer.header < self.start {
            return None;
        }
        let block = Block(footer.header);
        (unsafe { block.is_intact(self.end) } && unsafe { block.header() }.is_hole)
            .then_some(block)
    }

    /// Grow so that a block of `need` bytes fits at the end.
    fn expand_for(&mut self, need: usize, page_align: bool) -> Result<(), HeapError> {
        let slack = if page_align { PAGE + OVERHEAD } else { 0 };
        let tail = self.tail_hole();
        let tail_free = tail.map_or(0, |b| unsafe { b.header() }.size);
        let missing = need
            .checked_add(slack)
            .ok_or(HeapError::SizeOverflow(need))?
            .saturating_sub(tail_free)
            .max(1);
        let old_end = self.end;
        let new_end = old_end
            .checked_add(missing)
            .and_then(|e| round_up(e, PAGE))
            .ok_or(HeapError::SizeOverflow(need))?;
        self.expand(new_end)?;
        let grown = new_end - old_end;

        match tail {
            Some(hole) => {
                if let Some(pos) = self.index.position(hole.address()) {
                    self.index.remove(pos);
                }
                let size = unsafe { hole.header() }.size + grown;
                unsafe { hole.write(size, true) };
                self.index.insert(hole.address());
            }
            None => {
                unsafe { Block(old_end).write(grown, true) };
                self.index.insert(old_end);
            }
        }
        Ok(())
    }

    fn expand(&mut self, new_end: usize) -> Result<(), HeapError> {
        if new_end > self.max {
            return Err(HeapError::ExpansionExceedsMax {
                requested: new_end,
                max: self.max,
            });
        }
        self.backing.grow(self.end, new_end)?;
        log::trace!("heap grown {:#x} -> {new_end:#x}", self.end);
        self.end = new_end;
        Ok(())
    }

    /// Where `end` should move when the hole at `hole` reaches it.
    fn contraction_target(&self, hole: usize) -> usize {
        let target = round_up(hole, PAGE).unwrap_or(self.end).max(self.min_end);
        let target = if target > hole && target - hole < OVERHEAD {
            round_up(hole + OVERHEAD, PAGE)
                .unwrap_or(self.end)
                .max(self.min_end)
        } else {
            target
        };
        target.min(self.end)
    }

    fn contract(&mut self, new_end: usize) {
        self.backing.shrink(new_end, self.end);
        log::trace!("heap shrunk {:#x} -> {new_end:#x}", self.end);
        self.end = new_end;
    }
}
