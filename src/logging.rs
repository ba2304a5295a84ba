use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::host::Notifier;

/// Default maximum number of notices to keep in memory
pub const DEFAULT_MAX_LOG_LINES: usize = 10000;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. "info") is used.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub level: String,
    pub message: String,
    /// File name or path the notice is about, when there is one.
    pub subject: Option<String>,
}

type Listener = Box<dyn Fn(&LogEntry) + Send + Sync>;

/// Bounded in-memory record of user-facing notices.
pub struct LogManager {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    max_lines: usize,
    listener: Option<Listener>,
}

impl LogManager {
    pub fn new(max_lines: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(max_lines.min(1024)))),
            max_lines,
            listener: None,
        }
    }

    /// Calls `listener` for every new entry, e.g. to echo notices on a terminal.
    pub fn with_listener(mut self, listener: impl Fn(&LogEntry) + Send + Sync + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn log(&self, level: &str, message: &str, subject: Option<String>) {
        let now = chrono::Utc::now().to_rfc3339();
        let entry = LogEntry {
            id: now.clone(),
            timestamp: now,
            level: level.to_string(),
            message: message.to_string(),
            subject,
        };

        {
            let mut entries = self.lock();
            entries.push_back(entry.clone());
            while entries.len() > self.max_lines {
                entries.pop_front();
            }
        }

        if let Some(listener) = &self.listener {
            listener(&entry);
        }
    }

    pub fn get_logs(&self, subject: Option<&str>) -> Vec<LogEntry> {
        let entries = self.lock();
        match subject {
            Some(s) => entries
                .iter()
                .filter(|e| e.subject.as_deref() == Some(s))
                .cloned()
                .collect(),
            None => entries.iter().cloned().collect(),
        }
    }

    pub fn get_logs_paginated(&self, offset: usize, limit: usize) -> Vec<LogEntry> {
        self.lock().iter().skip(offset).take(limit).cloned().collect()
    }
}

impl Notifier for LogManager {
    fn notify(&self, message: &str) {
        tracing::info!("notice: {}", message);
        self.log("info", message, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_log_manager_log() {
        let manager = LogManager::new(10);

        manager.log("info", "test message", None);
        assert_eq!(manager.get_logs(None).len(), 1);

        manager.log("error", "another message", Some("report.md".to_string()));
        assert_eq!(manager.get_logs(None).len(), 2);
        assert_eq!(manager.get_logs(Some("report.md")).len(), 1);
        assert!(manager.get_logs(Some("missing.md")).is_empty());
    }

    #[test]
    fn test_log_manager_rotation() {
        let manager = LogManager::new(3);

        for i in 0..5 {
            manager.log("info", &format!("message {}", i), None);
        }

        let logs = manager.get_logs(None);
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "message 2");
        assert_eq!(logs[2].message, "message 4");
    }

    #[test]
    fn test_log_manager_pagination() {
        let manager = LogManager::new(100);
        for i in 0..20 {
            manager.log("info", &format!("message {}", i), None);
        }

        assert_eq!(manager.get_logs_paginated(0, 10).len(), 10);
        assert_eq!(manager.get_logs_paginated(10, 10)[0].message, "message 10");
        assert!(manager.get_logs_paginated(20, 10).is_empty());
    }

    #[test]
    fn test_notifier_records_and_forwards() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let manager = LogManager::new(10).with_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.notify("report.md already added");

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        let logs = manager.get_logs(None);
        assert_eq!(logs[0].level, "info");
        assert_eq!(logs[0].message, "report.md already added");
    }

    #[test]
    fn test_log_manager_thread_safety() {
        let manager = Arc::new(LogManager::new(100));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let lm = Arc::clone(&manager);
                std::thread::spawn(move || lm.notify(&format!("Thread {}", i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(manager.get_logs(None).len(), 10);
    }

    #[test]
    fn test_init_tracing_twice_does_not_panic() {
        let _ = init_tracing("warn");
        assert!(init_tracing("warn").is_err());
    }
}
