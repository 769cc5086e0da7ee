use crate::PortIo;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

/// One observed port access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAccess {
    Read8(u16),
    Read16(u16),
    Write8(u16, u8),
    Write16(u16, u16),
}

/// A fake port bus that logs every access.
///
/// Reads return scripted values in FIFO order, or `0` once the script runs dry.
#[derive(Debug, Default)]
pub struct RecordingPorts {
    log: Vec<PortAccess>,
    reads: VecDeque<u16>,
}

impl RecordingPorts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a value for the next read.
    pub fn script_read(&mut self, value: u16) -> &mut Self {
        self.reads.push_back(value);
        self
    }

    /// Every access so far, oldest first.
    #[must_use]
    pub fn log(&self) -> &[PortAccess] {
        &self.log
    }

    /// Only the byte writes, as `(port, value)`.
    #[must_use]
    pub fn writes8(&self) -> Vec<(u16, u8)> {
        self.log
            .iter()
            .filter_map(|a| match *a {
                PortAccess::Write8(p, v) => Some((p, v)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}

impl PortIo for RecordingPorts {
    #[allow(clippy::cast_possible_truncation)]
    fn read_port8(&mut self, port: u16) -> u8 {
        self.log.push(PortAccess::Read8(port));
        self.reads.pop_front().unwrap_or(0) as u8
    }

    fn read_port16(&mut self, port: u16) -> u16 {
        self.log.push(PortAccess::Read16(port));
        self.reads.pop_front().unwrap_or(0)
    }

    fn write_port8(&mut self, port: u16, value: u8) {
        self.log.push(PortAccess::Write8(port, value));
    }

    fn write_port16(&mut self, port: u16, value: u16) {
        self.log.push(PortAccess::Write16(port, value));
    }
}
