use std::{thread, time::Instant};

use log::{Level, LevelFilter};
use once_cell::sync::Lazy;

struct StdoutLogger;

static LOGGER: StdoutLogger = StdoutLogger;

static START: Lazy<Instant> = Lazy::new(Instant::now);

impl log::Log for StdoutLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = match record.level() {
            Level::Error => "Error",
            Level::Warn => "Warn",
            Level::Info => "Info",
            Level::Debug => "Debug",
            Level::Trace => "Trace",
        };
        let current = thread::current();

        println!(
            "[{}] {:>8.3}s {} | {}",
            level,
            START.elapsed().as_secs_f32(),
            current.name().unwrap_or("unnamed"),
            record.args()
        );
    }

    fn flush(&self) {}
}

pub fn init(debug: bool) {
    Lazy::force(&START);

    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Installing fails on later calls; they only change the level.
    if log::set_logger(&LOGGER).is_err() {
        log::debug!("Logger already installed");
    }
    log::set_max_level(level);
}
