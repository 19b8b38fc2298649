use crate::domains::logger::DomainLogger;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

enum Level {
    Info,
    Warn,
    Error,
}

struct LogMessage {
    level: Level,
    msg: String,
}

/// Hands messages to a background task so a slow sink never stalls the
/// control loop. Messages are dropped, and counted, when the buffer is full.
pub struct BufferedLogger {
    sender: mpsc::Sender<LogMessage>,
    dropped: AtomicU64,
}

impl BufferedLogger {
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn enqueue(&self, level: Level, msg: &str) {
        let message = LogMessage { level, msg: msg.to_string() };
        if self.sender.try_send(message).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl DomainLogger for BufferedLogger {
    fn info(&self, msg: &str) {
        self.enqueue(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.enqueue(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.enqueue(Level::Error, msg);
    }
}

/// Must be called from within a tokio runtime; the drain task lives there.
pub fn init_buffered_logger(sink: Arc<dyn DomainLogger>, capacity: usize) -> Arc<BufferedLogger> {
    let (sender, mut receiver) = mpsc::channel::<LogMessage>(capacity.max(1));

    tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            match message.level {
                Level::Info => sink.info(&message.msg),
                Level::Warn => sink.warn(&message.msg),
                Level::Error => sink.error(&message.msg),
            }
        }
    });

    Arc::new(BufferedLogger {
        sender,
        dropped: AtomicU64::new(0),
    })
}
