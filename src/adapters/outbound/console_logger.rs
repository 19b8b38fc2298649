use crate::domains::logger::DomainLogger;
use chrono::Utc;
use std::sync::Arc;

/// Writes run history to stdout/stderr, one timestamped line per message.
struct ConsoleBridge {
    prefix: String,
}

impl ConsoleBridge {
    fn line(&self, level: &str, msg: &str) -> String {
        format!("{} {:<5} {}{}", Utc::now().format("%H:%M:%S%.3f"), level, self.prefix, msg)
    }
}

impl DomainLogger for ConsoleBridge {
    fn info(&self, msg: &str) {
        println!("{}", self.line("INFO", msg));
    }

    fn warn(&self, msg: &str) {
        println!("{}", self.line("WARN", msg));
    }

    fn error(&self, msg: &str) {
        eprintln!("{}", self.line("ERROR", msg));
    }
}

/// Console-backed DomainLogger, the fallback when no file sink is available.
pub fn init_console_logger() -> Arc<dyn DomainLogger> {
    Arc::new(ConsoleBridge { prefix: String::new() })
}

/// Console logger whose lines start with `[prefix] `.
pub fn init_prefixed_console_logger(prefix: &str) -> Arc<dyn DomainLogger> {
    Arc::new(ConsoleBridge {
        prefix: format!("[{}] ", prefix),
    })
}
