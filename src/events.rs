use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Polling,
    Sleeping { interval: Duration },
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorState::Polling => write!(f, "POLLING"),
            MonitorState::Sleeping { .. } => write!(f, "SLEEPING"),
            MonitorState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Everything the monitor reports about its own progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Started { url: String, test_mode: bool },
    StateChanged(MonitorState),
    FetchFailed { url: String, error: String },
    NoProductsFound { url: String },
    UnnamedItemsSkipped { count: usize },
    InStock { name: String },
    OutOfStock { name: String },
    MissingDetailUrl { name: String },
    NotificationSent { name: String, message_id: String },
    NotificationFailed { name: String, error: String },
    TestFinished { success: bool },
}

/// Receives monitor events. Injected so tests can observe behaviour without
/// capturing global log output.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &MonitorEvent);
}

/// Forwards events to `tracing` at a level matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &MonitorEvent) {
        match event {
            MonitorEvent::Started { url, test_mode: true } => {
                tracing::info!(
                    %url,
                    "Stock watcher started in test mode; sending a single test notification"
                );
            }
            MonitorEvent::Started { url, test_mode: false } => {
                tracing::info!(%url, "Stock watcher started");
            }
            MonitorEvent::StateChanged(MonitorState::Polling) => {
                tracing::info!("Checking stock...");
            }
            MonitorEvent::StateChanged(MonitorState::Sleeping { interval }) => {
                tracing::info!("Next check in {} seconds", interval.as_secs());
            }
            MonitorEvent::StateChanged(MonitorState::Stopped) => {
                tracing::info!("Stock watcher stopped");
            }
            MonitorEvent::FetchFailed { url, error } => {
                tracing::error!(%url, "Stock check failed: {}", error);
            }
            MonitorEvent::NoProductsFound { url } => {
                tracing::warn!(%url, "No products found; check the configured selectors");
            }
            MonitorEvent::UnnamedItemsSkipped { count } => {
                tracing::warn!(count, "Skipped listing items without a product name");
            }
            MonitorEvent::InStock { name } => {
                tracing::info!(product = %name, "Product is in stock!");
            }
            MonitorEvent::OutOfStock { name } => {
                tracing::info!(product = %name, "Product is out of stock");
            }
            MonitorEvent::MissingDetailUrl { name } => {
                tracing::error!(product = %name, "Product URL not found; notification skipped");
            }
            MonitorEvent::NotificationSent { name, message_id } => {
                tracing::info!(product = %name, %message_id, "Notification email sent");
            }
            MonitorEvent::NotificationFailed { name, error } => {
                tracing::error!(product = %name, "Failed to send notification email: {}", error);
            }
            MonitorEvent::TestFinished { success } => {
                tracing::info!(success, "Test notification finished");
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&MonitorEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &MonitorEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn emit(&self, event: &MonitorEvent) {
        (**self).emit(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: &MonitorEvent) {
        (**self).emit(event);
    }
}
