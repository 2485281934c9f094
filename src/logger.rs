use log::{Level, Log, Metadata, Record};
use std::io::Write;

/// Console logger. Every record goes to stderr so stdout only ever carries
/// command output (plans, dependency maps, generated templates).
pub struct SimpleLogger {
    pub level: Level,
    pub disabled: bool,
}

impl SimpleLogger {
    pub fn new(level: Level, disabled: bool) -> SimpleLogger {
        SimpleLogger { level, disabled }
    }

    fn format(&self, record: &Record) -> String {
        match record.level() {
            Level::Info => format!("{}", record.args()),
            Level::Warn => format!("\x1b[33m{}\x1b[0m", record.args()),
            Level::Error => format!("\x1b[31m{}\x1b[0m", record.args()),
            Level::Debug | Level::Trace => {
                format!("[{}] {}", record.target(), record.args())
            }
        }
    }
}

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        !self.disabled && metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut stderr = std::io::stderr().lock();
        _ = writeln!(stderr, "{}", self.format(record));
    }

    fn flush(&self) {
        _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_logger_accepts_nothing() {
        let logger = SimpleLogger::new(Level::Trace, true);
        let metadata = Metadata::builder().level(Level::Error).build();
        assert_eq!(false, logger.enabled(&metadata));
    }

    #[test]
    fn level_filters_more_verbose_records() {
        let logger = SimpleLogger::new(Level::Info, false);
        let debug = Metadata::builder().level(Level::Debug).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert_eq!(false, logger.enabled(&debug));
        assert_eq!(true, logger.enabled(&warn));
    }
}
