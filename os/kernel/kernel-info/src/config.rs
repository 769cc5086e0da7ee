//! # Runtime Configuration
//!
//! Values the kernel core is parameterised over. The kernel binary uses
//! [`KernelConfig::default`]; tests build smaller machines.

use crate::memory::{
    KHEAP_INDEX_CAPACITY, KHEAP_INITIAL_SIZE, KHEAP_MAX, KHEAP_MIN_SIZE, KHEAP_START,
    TOTAL_RAM_SIZE,
};

/// Master PIC vector base after remapping.
pub const PIC_MASTER_OFFSET: u8 = 0x20;

/// Slave PIC vector base after remapping.
pub const PIC_SLAVE_OFFSET: u8 = 0x28;

/// Default timer tick rate in Hz.
pub const TIMER_FREQUENCY_HZ: u32 = 50;

/// Maximum log verbosity; mirrors `log::LevelFilter` without depending on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Kernel heap window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// First byte of the heap window (page aligned).
    pub start: u32,
    /// Bytes mapped when the heap is created.
    pub initial_size: u32,
    /// The heap never contracts below this.
    pub min_size: u32,
    /// Exclusive ceiling for growth.
    pub max: u32,
    /// Number of holes the index can hold.
    pub index_capacity: u32,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            start: KHEAP_START,
            initial_size: KHEAP_INITIAL_SIZE,
            min_size: KHEAP_MIN_SIZE,
            max: KHEAP_MAX,
            index_capacity: KHEAP_INDEX_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Physical memory covered by the frame bitmap, in bytes.
    pub total_ram: u32,
    pub heap: HeapConfig,
    pub pic_master_offset: u8,
    pub pic_slave_offset: u8,
    pub timer_frequency_hz: u32,
    pub log_level: LogLevel,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            total_ram: TOTAL_RAM_SIZE,
            heap: HeapConfig::default(),
            pic_master_offset: PIC_MASTER_OFFSET,
            pic_slave_offset: PIC_SLAVE_OFFSET,
            timer_frequency_hz: TIMER_FREQUENCY_HZ,
            log_level: if cfg!(debug_assertions) {
                LogLevel::Debug
            } else {
                LogLevel::Info
            },
        }
    }
}

impl KernelConfig {
    /// Number of 4 KiB frames in `total_ram`.
    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.total_ram / crate::memory::FRAME_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_machine_has_4096_frames() {
        let cfg = KernelConfig::default();
        assert_eq!(cfg.total_ram, 16 * 1024 * 1024);
        assert_eq!(cfg.frame_count(), 4096);
        assert_eq!(cfg.pic_master_offset, 0x20);
        assert_eq!(cfg.pic_slave_offset, 0x28);
    }
}
