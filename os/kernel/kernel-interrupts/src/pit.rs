//! # 8253/8254 Programmable Interval Timer
//!
//! Channel 0 drives IRQ0. The kernel programs it as a square-wave generator
//! and counts ticks in the IRQ0 handler.

use bitfield_struct::bitfield;
use core::sync::atomic::{AtomicU32, Ordering};
use kernel_ports::PortIo;

const CHANNEL0_DATA: u16 = 0x40;
const COMMAND: u16 = 0x43;

/// Input clock of the PIT in Hz.
pub const PIT_BASE_FREQUENCY: u32 = 1_193_180;

/// Mode/command register: `| channel(2) | access(2) | mode(3) | bcd |`.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct PitCommand {
    /// BCD counting instead of binary.
    pub bcd: bool,

    /// Operating mode; 3 = square wave generator.
    #[bits(3)]
    pub mode: u8,

    /// Access mode; 3 = low byte then high byte.
    #[bits(2)]
    pub access: u8,

    #[bits(2)]
    pub channel: u8,
}

impl PitCommand {
    /// Channel 0, lobyte/hibyte, square wave, binary (`0x36`).
    #[must_use]
    pub const fn square_wave_channel0() -> Self {
        Self::new().with_mode(3).with_access(3).with_channel(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PitError {
    #[error("timer frequency {0} Hz is out of range")]
    FrequencyOutOfRange(u32),
}

pub struct Pit;

impl Pit {
    /// The 16-bit reload value for `frequency_hz`.
    ///
    /// # Errors
    /// The frequency is zero or yields a divisor outside `1..=0xFFFF`.
    pub fn divisor(frequency_hz: u32) -> Result<u16, PitError> {
        if frequency_hz == 0 {
            return Err(PitError::FrequencyOutOfRange(frequency_hz));
        }
        match u16::try_from(PIT_BASE_FREQUENCY / frequency_hz) {
            Ok(0) | Err(_) => Err(PitError::FrequencyOutOfRange(frequency_hz)),
            Ok(d) => Ok(d),
        }
    }

    /// Program channel 0 to fire at `frequency_hz`; returns the divisor.
    ///
    /// # Errors
    /// See [`Pit::divisor`]; nothing is written on error.
    pub fn init_timer<P: PortIo>(ports: &mut P, frequency_hz: u32) -> Result<u16, PitError> {
        let divisor = Self::divisor(frequency_hz)?;
        let [low, high] = divisor.to_le_bytes();
        ports.write_port8(COMMAND, PitCommand::square_wave_channel0().into_bits());
        ports.write_port8(CHANNEL0_DATA, low);
        ports.write_port8(CHANNEL0_DATA, high);
        log::debug!("PIT running at {frequency_hz} Hz (divisor {divisor})");
        Ok(divisor)
    }
}

/// Tick counter bumped by the IRQ0 handler.
#[derive(Debug, Default)]
pub struct Ticks(AtomicU32);

impl Ticks {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    #[inline]
    pub fn tick(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_ports::{PortAccess, RecordingPorts};

    #[test]
    fn command_byte() {
        assert_eq!(PitCommand::square_wave_channel0().into_bits(), 0x36);
    }

    #[test]
    fn fifty_hertz() {
        let mut bus = RecordingPorts::new();
        let divisor = Pit::init_timer(&mut bus, 50).unwrap();
        assert_eq!(divisor, 23863);
        assert_eq!(
            bus.log(),
            &[
                PortAccess::Write8(0x43, 0x36),
                PortAccess::Write8(0x40, 0x37),
                PortAccess::Write8(0x40, 0x5D),
            ]
        );
    }

    #[test]
    fn out_of_range_frequencies() {
        assert_eq!(Pit::divisor(0), Err(PitError::FrequencyOutOfRange(0)));
        assert_eq!(Pit::divisor(10), Err(PitError::FrequencyOutOfRange(10)));
        assert_eq!(
            Pit::divisor(2_000_000),
            Err(PitError::FrequencyOutOfRange(2_000_000))
        );
        assert_eq!(Pit::divisor(1_193_180), Ok(1));
    }

    #[test]
    fn ticks_count() {
        let t = Ticks::new();
        t.tick();
        t.tick();
        assert_eq!(t.get(), 2);
    }
}
