use crate::env;
use log::{Level, Log, Metadata, Record};

struct Logger;

static LOGGER: Logger = Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= *env::SHAPERCTL_LOG
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let level = match record.level() {
            Level::Error => console::style("ERROR").red(),
            Level::Warn => console::style(" WARN").yellow(),
            Level::Info => console::style(" INFO").green(),
            Level::Debug => console::style("DEBUG").blue(),
            Level::Trace => console::style("TRACE").dim(),
        };
        eprintln!("{ts} {level} {}", record.args());
    }

    fn flush(&self) {}
}

pub fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(*env::SHAPERCTL_LOG);
    }
}
