//! # Kernel Global Allocator
//!
//! [`LockedHeap`] puts a [`Heap`] behind a [`SpinLock`] and implements
//! [`GlobalAlloc`] on top of it. Until [`LockedHeap::init`] runs every
//! allocation fails with a null pointer.
//!
//! Alignments up to the block alignment are served directly; anything up to
//! a page is served page aligned. Larger alignments are refused.

use super::{BLOCK_ALIGN, Heap, HeapBacking, PAGE};
use core::alloc::{GlobalAlloc, Layout};
use core::ptr;
use kernel_sync::SpinLock;

pub struct LockedHeap<B: HeapBacking> {
    heap: SpinLock<Option<Heap<B>>>,
}

impl<B: HeapBacking> LockedHeap<B> {
    /// An allocator with no heap yet.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            heap: SpinLock::new(None),
        }
    }

    /// Install `heap`; returns the previous one, if any.
    pub fn init(&self, heap: Heap<B>) -> Option<Heap<B>> {
        self.heap.lock().replace(heap)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.heap.lock().is_some()
    }

    /// Run `f` on the heap, if installed.
    pub fn with_heap<R>(&self, f: impl FnOnce(&mut Heap<B>) -> R) -> Option<R> {
        self.heap.with_lock(|h| h.as_mut().map(f))
    }
}

unsafe impl<B: HeapBacking + Send> GlobalAlloc for LockedHeap<B> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let page_align = match layout.align() {
            a if a <= BLOCK_ALIGN => false,
            a if a <= PAGE => true,
            _ => return ptr::null_mut(),
        };
        self.with_heap(|h| h.allocate(layout.size(), page_align))
            .and_then(Result::ok)
            .map_or(ptr::null_mut(), |p| p.as_ptr())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.with_heap(|h| unsafe { h.free(ptr) });
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > BLOCK_ALIGN {
            // Keep the stronger alignment: allocate, copy, free.
            let Ok(new_layout) = Layout::from_size_align(new_size, layout.align()) else {
                return ptr::null_mut();
            };
            let new = unsafe { self.alloc(new_layout) };
            if !new.is_null() {
                unsafe {
                    ptr::copy_nonoverlapping(ptr, new, layout.size().min(new_size));
                    self.dealloc(ptr, layout);
                }
            }
            return new;
        }
        self.with_heap(|h| unsafe { h.realloc(ptr, new_size) })
            .and_then(Result::ok)
            .map_or(ptr::null_mut(), |p| p.as_ptr())
    }
}
