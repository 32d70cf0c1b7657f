//! In-process logger: the TUI owns the terminal, so log lines go to a
//! bounded ring the log popup can render.
use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};

const LOG_CAPACITY: usize = 200;

pub type LogBuffer = Arc<Mutex<VecDeque<String>>>;

struct RingLogger {
    level: LevelFilter,
    buffer: LogBuffer,
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}", record.level(), record.args());
        let mut buffer = self.buffer.lock().unwrap();
        if buffer.len() >= LOG_CAPACITY {
            buffer.pop_front();
        }
        buffer.push_back(line);
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<RingLogger> = OnceLock::new();

pub fn init() -> LogBuffer {
    let buffer: LogBuffer = Arc::new(Mutex::new(VecDeque::with_capacity(LOG_CAPACITY)));

    let level = match std::env::var("RUST_LOG") {
        Ok(level) => match level.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        },
        Err(_) => LevelFilter::Info,
    };

    let logger = LOGGER.get_or_init(|| RingLogger {
        level,
        buffer: buffer.clone(),
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }

    logger.buffer.clone()
}

pub fn snapshot(buffer: &LogBuffer) -> Vec<String> {
    buffer.lock().unwrap().iter().cloned().collect()
}
