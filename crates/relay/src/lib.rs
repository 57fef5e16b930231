//! Engine-to-user notification relay.
//!
//! Engine threads call [`NativeEventRelay`] without blocking; a single
//! dispatcher task drains the events in order, allocates one persisted id per
//! event and hands the finished [`Notification`] to a [`NotificationSink`].

use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use shared::{
    domain::{Notification, NotificationId, Severity},
    protocol::EngineEvent,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

mod counter;
mod grant;
mod sink;

pub use counter::{CounterStore, PersistedCounter, NOTIFICATION_COUNTER_KEY};
pub use grant::{FileGrantProvider, GrantError};
pub use sink::{
    surface_channel, ChannelSink, FileViewer, NotificationSink, NotificationSurface, SurfacePoll,
};

pub const DEFAULT_CHANNEL_ID: &str = "vkb";
pub const DEFAULT_TITLE: &str = "Vulkan Best Practice Error";
pub const FATAL_ERROR_BODY: &str = "Fatal Error: click to view";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub channel: String,
    pub title: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL_ID.to_string(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Thread-safe entry points for engine-originated events.
#[derive(Clone)]
pub struct NativeEventRelay {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl NativeEventRelay {
    pub fn post_message(&self, text: impl Into<String>) {
        self.post(EngineEvent::Message { text: text.into() });
    }

    pub fn post_fatal_error(&self, log_file: impl Into<PathBuf>) {
        self.post(EngineEvent::FatalError {
            log_file: log_file.into(),
        });
    }

    /// Queues an event. Fire-and-forget: returns `false` if the dispatcher has
    /// already shut down.
    pub fn post(&self, event: EngineEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(err) => {
                warn!(event = ?err.0, "notification dispatcher stopped; engine event dropped");
                false
            }
        }
    }
}

/// Turns events into notifications. Owned by the dispatcher task.
pub struct RelayDispatcher<S: CounterStore> {
    counter: Arc<PersistedCounter<S>>,
    sink: Arc<dyn NotificationSink>,
    grants: FileGrantProvider,
    config: RelayConfig,
}

impl<S: CounterStore + 'static> RelayDispatcher<S> {
    pub fn new(
        counter: Arc<PersistedCounter<S>>,
        sink: Arc<dyn NotificationSink>,
        grants: FileGrantProvider,
        config: RelayConfig,
    ) -> Self {
        Self {
            counter,
            sink,
            grants,
            config,
        }
    }

    /// Starts the dispatcher on the current tokio runtime. The task ends once
    /// every [`NativeEventRelay`] clone has been dropped and the queue is empty.
    pub fn spawn(self) -> (NativeEventRelay, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<EngineEvent>();
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.dispatch(event).await;
            }
            debug!("notification dispatcher drained");
        });
        (NativeEventRelay { tx }, handle)
    }

    /// Allocates an id for `event` and posts it. Returns the posted
    /// notification, or `None` when no id could be allocated.
    pub async fn dispatch(&self, event: EngineEvent) -> Option<Notification> {
        let id = match self.counter.next().await {
            Ok(value) => NotificationId(value),
            Err(err) => {
                error!(?event, "dropping engine event, notification id unavailable: {err:#}");
                return None;
            }
        };

        let notification = self.build(id, event);
        info!(
            id = notification.id.0,
            severity = ?notification.severity,
            "posting notification"
        );
        if let Err(err) = self.sink.post(notification.clone()) {
            warn!(id = notification.id.0, "notification delivery failed: {err:#}");
        }
        Some(notification)
    }

    fn build(&self, id: NotificationId, event: EngineEvent) -> Notification {
        match event {
            EngineEvent::Message { text } => Notification {
                id,
                channel: self.config.channel.clone(),
                title: self.config.title.clone(),
                detail: Some(text.clone()),
                body: text,
                severity: Severity::Info,
                attachment_path: None,
                open_action: None,
                auto_cancel: false,
                posted_at: Utc::now(),
            },
            EngineEvent::FatalError { log_file } => {
                let open_action = match self.grants.grant(&log_file) {
                    Ok(grant) => Some(grant),
                    Err(err) => {
                        warn!(path = %log_file.display(), "log file not shared: {err}");
                        None
                    }
                };
                Notification {
                    id,
                    channel: self.config.channel.clone(),
                    title: self.config.title.clone(),
                    body: FATAL_ERROR_BODY.to_string(),
                    detail: Some(format!("Log: {}", log_file.display())),
                    severity: Severity::Fatal,
                    attachment_path: Some(log_file),
                    open_action,
                    auto_cancel: true,
                    posted_at: Utc::now(),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
