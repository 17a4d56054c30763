/*!
 * Append-only event log for a translation run.
 *
 * Every event is stored for later reading, mirrored to the `log` facade and
 * broadcast to live subscribers.
 */

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const SUBSCRIBER_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// One immutable log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    /// Lane that produced the event, if any
    pub source: Option<String>,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"), self.severity)?;
        if let Some(source) = &self.source {
            write!(f, " [{}]", source)?;
        }
        write!(f, " {}", self.message)
    }
}

/// Unbounded, append-only event store
#[derive(Debug)]
pub struct EventLog {
    entries: RwLock<Vec<Event>>,
    sender: broadcast::Sender<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            entries: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Appends an event and returns a copy of it
    pub fn record(&self, severity: Severity, message: impl Into<String>, source: Option<&str>) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            source: source.map(str::to_string),
        };

        let prefix = event.source.as_deref().map(|s| format!("[{}] ", s)).unwrap_or_default();
        match severity {
            Severity::Info | Severity::Success => info!("{}{}", prefix, event.message),
            Severity::Warning => warn!("{}{}", prefix, event.message),
            Severity::Error => error!("{}{}", prefix, event.message),
        }

        self.entries.write().push(event.clone());
        // No subscribers is fine
        let _ = self.sender.send(event.clone());
        event
    }

    pub fn info(&self, message: impl Into<String>) -> Event {
        self.record(Severity::Info, message, None)
    }

    pub fn warning(&self, message: impl Into<String>) -> Event {
        self.record(Severity::Warning, message, None)
    }

    pub fn error(&self, message: impl Into<String>) -> Event {
        self.record(Severity::Error, message, None)
    }

    /// Copy of every event so far
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.read().clone()
    }

    /// Events at warning level or above
    pub fn issues(&self) -> Vec<Event> {
        self.entries
            .read()
            .iter()
            .filter(|e| matches!(e.severity, Severity::Warning | Severity::Error))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Live feed of events recorded after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
