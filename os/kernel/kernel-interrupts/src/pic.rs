//! # 8259A Programmable Interrupt Controllers
//!
//! Two cascaded PICs deliver IRQ 0‒7 (master) and 8‒15 (slave, wired to
//! master line 2). Out of reset they raise vectors 0x08‒0x0F, colliding with
//! CPU exceptions, so the kernel reprograms them to a free range.

use crate::IRQ_LINES;
use kernel_ports::PortIo;

const MASTER_COMMAND: u16 = 0x20;
const MASTER_DATA: u16 = 0x21;
const SLAVE_COMMAND: u16 = 0xA0;
const SLAVE_DATA: u16 = 0xA1;

/// ICW1: initialization, ICW4 follows, cascade mode.
const ICW1_INIT: u8 = 0x10 | 0x01;
/// ICW4: 8086/88 mode.
const ICW4_8086: u8 = 0x01;
/// Non-specific end-of-interrupt.
const EOI: u8 = 0x20;

/// Vector bases of the master and slave PIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainedPics {
    master_offset: u8,
    slave_offset: u8,
}

impl ChainedPics {
    #[must_use]
    pub const fn new(master_offset: u8, slave_offset: u8) -> Self {
        Self {
            master_offset,
            slave_offset,
        }
    }

    #[must_use]
    pub const fn master_offset(&self) -> u8 {
        self.master_offset
    }

    #[must_use]
    pub const fn slave_offset(&self) -> u8 {
        self.slave_offset
    }

    /// Whether `vector` is one of the 16 remapped IRQ vectors.
    #[must_use]
    pub const fn handles(&self, vector: u32) -> bool {
        self.is_master(vector) || self.is_slave(vector)
    }

    const fn is_master(&self, vector: u32) -> bool {
        let base = self.master_offset as u32;
        vector >= base && vector < base + IRQ_LINES as u32 / 2
    }

    const fn is_slave(&self, vector: u32) -> bool {
        let base = self.slave_offset as u32;
        vector >= base && vector < base + IRQ_LINES as u32 / 2
    }

    /// Reinitialize both PICs at the configured offsets, then unmask every line.
    ///
    /// The previous masks are read and logged but not restored: all sixteen
    /// lines end up enabled.
    pub fn remap<P: PortIo>(&self, ports: &mut P) {
        let master_mask = ports.read_port8(MASTER_DATA);
        let slave_mask = ports.read_port8(SLAVE_DATA);
        log::trace!("PIC masks before remap: master={master_mask:#04x} slave={slave_mask:#04x}");

        ports.write_port8(MASTER_COMMAND, ICW1_INIT);
        ports.write_port8(SLAVE_COMMAND, ICW1_INIT);
        // ICW2: vector offsets.
        ports.write_port8(MASTER_DATA, self.master_offset);
        ports.write_port8(SLAVE_DATA, self.slave_offset);
        // ICW3: slave on master line 2; slave cascade identity 2.
        ports.write_port8(MASTER_DATA, 4);
        ports.write_port8(SLAVE_DATA, 2);
        ports.write_port8(MASTER_DATA, ICW4_8086);
        ports.write_port8(SLAVE_DATA, ICW4_8086);

        ports.write_port8(MASTER_DATA, 0x00);
        ports.write_port8(SLAVE_DATA, 0x00);

        log::debug!(
            "PIC remapped to {:#04x}/{:#04x}",
            self.master_offset,
            self.slave_offset
        );
    }

    /// Acknowledge `vector`: slave first if it came from the slave, then master.
    pub fn end_of_interrupt<P: PortIo>(&self, ports: &mut P, vector: u32) {
        if self.is_slave(vector) {
            ports.write_port8(SLAVE_COMMAND, EOI);
        }
        ports.write_port8(MASTER_COMMAND, EOI);
    }
}

impl Default for ChainedPics {
    fn default() -> Self {
        Self::new(0x20, 0x28)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_ports::{PortAccess, RecordingPorts};

    #[test]
    fn remap_sequence() {
        let mut bus = RecordingPorts::new();
        bus.script_read(0xB8).script_read(0x8F);
        ChainedPics::new(0x20, 0x28).remap(&mut bus);

        assert_eq!(
            bus.log(),
            &[
                PortAccess::Read8(0x21),
                PortAccess::Read8(0xA1),
                PortAccess::Write8(0x20, 0x11),
                PortAccess::Write8(0xA0, 0x11),
                PortAccess::Write8(0x21, 0x20),
                PortAccess::Write8(0xA1, 0x28),
                PortAccess::Write8(0x21, 0x04),
                PortAccess::Write8(0xA1, 0x02),
                PortAccess::Write8(0x21, 0x01),
                PortAccess::Write8(0xA1, 0x01),
                PortAccess::Write8(0x21, 0x00),
                PortAccess::Write8(0xA1, 0x00),
            ]
        );
    }

    #[test]
    fn eoi_targets() {
        let pics = ChainedPics::default();
        let mut bus = RecordingPorts::new();
        pics.end_of_interrupt(&mut bus, 33);
        assert_eq!(bus.log(), &[PortAccess::Write8(0x20, 0x20)]);

        let mut bus = RecordingPorts::new();
        pics.end_of_interrupt(&mut bus, 44);
        assert_eq!(
            bus.log(),
            &[PortAccess::Write8(0xA0, 0x20), PortAccess::Write8(0x20, 0x20)]
        );
    }

    #[test]
    fn irq_range() {
        let pics = ChainedPics::default();
        assert!(!pics.handles(31));
        assert!(pics.handles(32));
        assert!(pics.handles(39));
        assert!(pics.handles(40));
        assert!(pics.handles(47));
        assert!(!pics.handles(48));
    }
}
