use chrono::Utc;
use log::{error as log_error, info as log_info, warn as log_warn};
use std::sync::Arc;

/// Run-history logging port for the control loop.
/// Non-fallible from the engine's perspective: a broken sink never stops a tick.
pub trait DomainLogger: Send + Sync + 'static {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

pub type DynLogger = Arc<dyn DomainLogger>;

/// File sink backed by `fast_log`. Pair with a console logger for terminal output.
pub struct FileLogger;

impl FileLogger {
    /// `level` is one of error/warn/info/debug/trace; unknown values mean info.
    pub fn init(path: &str, level: &str) -> Result<(), Box<dyn std::error::Error>> {
        let filter = level.parse::<log::LevelFilter>().unwrap_or(log::LevelFilter::Info);
        fast_log::init(fast_log::config::Config::new().file(path).level(filter))?;
        Ok(())
    }
}

impl DomainLogger for FileLogger {
    fn info(&self, msg: &str) {
        log_info!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn warn(&self, msg: &str) {
        log_warn!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn error(&self, msg: &str) {
        log_error!("{} - {}", Utc::now().to_rfc3339(), msg);
    }
}
