use kernel_info::config::LogLevel;
use kernel_qemu::QemuLogger;
use log::LevelFilter;

const fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Off => LevelFilter::Off,
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Route `log` records to the QEMU debug console.
pub fn init(level: LogLevel) {
    if QemuLogger::new(level_filter(level)).init().is_err() {
        kernel_qemu::qemu_trace!("logger already installed\n");
    }
}
