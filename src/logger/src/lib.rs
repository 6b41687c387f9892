pub use log::*;

use once_cell::sync::OnceCell;

static LOGGER: Logger = Logger;
static LEVEL: OnceCell<LevelFilter> = OnceCell::new();

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    set_logger(&LOGGER).map(|()| {
        let level = *LEVEL.get_or_init(|| level);
        set_max_level(level)
    })
}

#[derive(Copy, Clone)]
struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level()
    }
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!(
            "[{} {}] {}",
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

    #[test]
    fn second_init_is_rejected() {
        // the first caller in this process wins, later ones must error out
        let _ = init(LevelFilter::Warn);
        assert!(init(LevelFilter::Trace).is_err());
        assert_eq!(LEVEL.get(), Some(&LevelFilter::Warn));
    }
}
