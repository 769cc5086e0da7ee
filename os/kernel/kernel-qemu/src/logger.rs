use crate::qemu_trace;
use kernel_sync::SyncOnceCell;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

static LOGGER: SyncOnceCell<QemuLogger> = SyncOnceCell::new();

pub struct QemuLogger {
    max_level: LevelFilter,
}

impl QemuLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Install as the global logger. Call this once during early init.
    ///
    /// # Errors
    /// Fails if a logger was already installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        let logger: &'static Self = LOGGER.get_or_init(|| self);
        log::set_logger(logger)?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Format: "[LEVEL] target: message\n"
        qemu_trace!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn level_filtering() {
        let logger = QemuLogger::new(LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).build();
        let info = Metadata::builder().level(Level::Info).build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }
}
