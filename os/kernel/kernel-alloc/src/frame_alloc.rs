//! # Physical Frame Allocator
//!
//! One bit per 4 KiB frame of physical RAM, set while the frame is in use.
//! The bitmap itself lives in bootstrap memory and is borrowed for the
//! allocator's lifetime.
//!
//! Frame 0 is marked used on construction and never handed out, so a PTE
//! frame number of zero can mean "no frame".

use kernel_memory_addresses::PhysicalPage;
use kernel_vmem::PageTableEntry;

const BITS: u32 = u32::BITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("no free physical frames left")]
    OutOfFrames,
    #[error("frame {0} is outside physical memory")]
    OutOfRange(PhysicalPage),
}

/// Bitmap of used frames.
pub struct BitmapFrameAlloc<'a> {
    words: &'a mut [u32],
    frame_count: u32,
}

impl<'a> BitmapFrameAlloc<'a> {
    /// Words of bitmap storage needed for `frame_count` frames.
    #[must_use]
    pub const fn words_for(frame_count: u32) -> usize {
        frame_count.div_ceil(BITS) as usize
    }

    /// Take over `words` as the bitmap for `frame_count` frames; everything
    /// but frame 0 starts free.
    ///
    /// # Panics
    /// If `words` is too short for `frame_count`.
    pub fn new(words: &'a mut [u32], frame_count: u32) -> Self {
        assert!(
            words.len() >= Self::words_for(frame_count),
            "bitmap of {} words cannot track {frame_count} frames",
            words.len()
        );
        words.fill(0);
        let mut bitmap = Self { words, frame_count };
        if frame_count > 0 {
            bitmap.set(0);
        }
        bitmap
    }

    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Number of frames currently marked used (frame 0 included).
    #[must_use]
    pub fn used_frames(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    #[must_use]
    pub fn is_used(&self, frame: PhysicalPage) -> bool {
        self.test(frame.index())
    }

    /// Give `entry` a fresh frame unless it already has one.
    ///
    /// The entry ends up present, with `user` = `!kernel_mode` and the
    /// requested writability. An entry that already owns a frame is left
    /// untouched.
    ///
    /// # Errors
    /// [`FrameError::OutOfFrames`] when every frame is in use.
    pub fn allocate_frame(
        &mut self,
        entry: &mut PageTableEntry,
        kernel_mode: bool,
        writable: bool,
    ) -> Result<(), FrameError> {
        if entry.has_frame() {
            return Ok(());
        }
        let index = self.first_free().ok_or(FrameError::OutOfFrames)?;
        self.set(index);
        *entry = PageTableEntry::mapping(PhysicalPage::from_index(index), writable, !kernel_mode);
        Ok(())
    }

    /// Map `entry` onto the specific `frame` and mark it used.
    ///
    /// Used while paging is set up to map memory that is already occupied
    /// (low memory, the kernel image, the bootstrap region).
    ///
    /// # Errors
    /// [`FrameError::OutOfRange`] if the frame is beyond physical memory.
    pub fn claim_frame(
        &mut self,
        entry: &mut PageTableEntry,
        frame: PhysicalPage,
        kernel_mode: bool,
        writable: bool,
    ) -> Result<(), FrameError> {
        if frame.index() >= self.frame_count {
            return Err(FrameError::OutOfRange(frame));
        }
        self.set(frame.index());
        *entry = PageTableEntry::mapping(frame, writable, !kernel_mode);
        Ok(())
    }

    /// Release the frame behind `entry` and clear its frame number.
    ///
    /// An entry without a frame is left untouched. The present bit is
    /// not changed.
    pub fn free_frame(&mut self, entry: &mut PageTableEntry) {
        if !entry.has_frame() {
            return;
        }
        self.clear(entry.frame());
        entry.set_frame(0);
    }

    fn first_free(&self) -> Option<u32> {
        self.words
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != u32::MAX)
            .find_map(|(i, w)| {
                #[allow(clippy::cast_possible_truncation)]
                let index = i as u32 * BITS + (!w).trailing_zeros();
                (index < self.frame_count).then_some(index)
            })
    }

    fn test(&self, index: u32) -> bool {
        index < self.frame_count && self.words[(index / BITS) as usize] & (1 << (index % BITS)) != 0
    }

    fn set(&mut self, index: u32) {
        self.words[(index / BITS) as usize] |= 1 << (index % BITS);
    }

    fn clear(&mut self, index: u32) {
        if index < self.frame_count {
            self.words[(index / BITS) as usize] &= !(1 << (index % BITS));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_zero_is_reserved() {
        let mut words = [0u32; 2];
        let mut frames = BitmapFrameAlloc::new(&mut words, 64);
        assert!(frames.is_used(PhysicalPage::from_index(0)));

        let mut e = PageTableEntry::new();
        frames.allocate_frame(&mut e, true, true).unwrap();
        assert_eq!(e.frame(), 1);
        assert!(e.present());
        assert!(e.writable());
        assert!(!e.user());
    }

    #[test]
    fn allocate_is_first_fit_and_free_reuses() {
        let mut words = [0u32; 2];
        let mut frames = BitmapFrameAlloc::new(&mut words, 64);
        let mut a = PageTableEntry::new();
        let mut b = PageTableEntry::new();
        let mut c = PageTableEntry::new();
        frames.allocate_frame(&mut a, false, false).unwrap();
        frames.allocate_frame(&mut b, false, true).unwrap();
        assert_eq!((a.frame(), b.frame()), (1, 2));
        assert!(a.user());
        assert!(!a.writable());

        frames.free_frame(&mut a);
        assert_eq!(a.frame(), 0);
        assert!(!frames.is_used(PhysicalPage::from_index(1)));

        frames.allocate_frame(&mut c, true, true).unwrap();
        assert_eq!(c.frame(), 1);
        assert_eq!(frames.used_frames(), 3);
    }

    #[test]
    fn entry_with_frame_is_left_alone() {
        let mut words = [0u32; 1];
        let mut frames = BitmapFrameAlloc::new(&mut words, 32);
        let mut e = PageTableEntry::mapping(PhysicalPage::from_index(7), false, true);
        frames.allocate_frame(&mut e, true, true).unwrap();
        assert_eq!(e.frame(), 7);
        assert_eq!(frames.used_frames(), 1);
    }

    #[test]
    fn exhaustion_reports_error() {
        let mut words = [0u32; 1];
        let mut frames = BitmapFrameAlloc::new(&mut words, 3);
        let mut e = [PageTableEntry::new(); 3];
        frames.allocate_frame(&mut e[0], true, true).unwrap();
        frames.allocate_frame(&mut e[1], true, true).unwrap();
        assert_eq!(
            frames.allocate_frame(&mut e[2], true, true),
            Err(FrameError::OutOfFrames)
        );
        assert!(!e[2].present());
    }

    #[test]
    fn scan_crosses_word_boundaries() {
        let mut words = [0u32; 2];
        let mut frames = BitmapFrameAlloc::new(&mut words, 40);
        for i in 1..32 {
            let mut e = PageTableEntry::new();
            frames
                .claim_frame(&mut e, PhysicalPage::from_index(i), true, true)
                .unwrap();
        }
        let mut e = PageTableEntry::new();
        frames.allocate_frame(&mut e, true, true).unwrap();
        assert_eq!(e.frame(), 32);
    }

    #[test]
    fn claim_outside_memory_fails() {
        let mut words = [0u32; 1];
        let mut frames = BitmapFrameAlloc::new(&mut words, 16);
        let mut e = PageTableEntry::new();
        let far = PhysicalPage::from_index(16);
        assert_eq!(
            frames.claim_frame(&mut e, far, true, true),
            Err(FrameError::OutOfRange(far))
        );
    }
}
