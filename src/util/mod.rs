use log::{Level, LevelFilter, Log, Metadata, Record};

/// Writes every enabled record to stderr.
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Parses a `COLPACK_LOG` style level name.
pub fn parse_level_filter(value: &str) -> Option<LevelFilter> {
    match value.trim().to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(Level::Error.to_level_filter()),
        "warn" => Some(Level::Warn.to_level_filter()),
        "info" => Some(Level::Info.to_level_filter()),
        "debug" => Some(Level::Debug.to_level_filter()),
        "trace" => Some(Level::Trace.to_level_filter()),
        _ => None,
    }
}
