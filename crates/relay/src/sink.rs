//! Presentation-side end of the relay: sinks, the notification surface and the
//! open-file action.

use std::{collections::BTreeMap, time::Duration};

use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use shared::domain::{FileGrant, Notification, NotificationId};

/// Host notification-post primitive. Called from the dispatcher task; must not block.
pub trait NotificationSink: Send + Sync {
    fn post(&self, notification: Notification) -> Result<()>;
}

/// Opens a granted file ("open with" chooser on the host).
pub trait FileViewer {
    fn open(&self, grant: &FileGrant) -> Result<()>;
}

/// Marshals notifications onto the thread that owns the [`NotificationSurface`].
#[derive(Clone)]
pub struct ChannelSink {
    tx: Sender<Notification>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelSink {
    fn post(&self, notification: Notification) -> Result<()> {
        match self.tx.try_send(notification) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(n)) => Err(anyhow!(
                "notification surface queue is full; dropped notification {}",
                n.id.0
            )),
            Err(TrySendError::Disconnected(n)) => Err(anyhow!(
                "notification surface disconnected; dropped notification {}",
                n.id.0
            )),
        }
    }
}

pub fn surface_channel(capacity: usize) -> (ChannelSink, NotificationSurface) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (ChannelSink::new(tx), NotificationSurface::new(rx))
}

#[derive(Debug)]
pub enum SurfacePoll {
    Arrived(Notification),
    Idle,
    /// Every sink is gone and the queue is drained.
    Closed,
}

/// Visible notifications, keyed by id the way a host tray keys them: posting an
/// id that is already visible replaces the earlier entry.
pub struct NotificationSurface {
    rx: Receiver<Notification>,
    visible: BTreeMap<NotificationId, Notification>,
}

impl NotificationSurface {
    pub fn new(rx: Receiver<Notification>) -> Self {
        Self {
            rx,
            visible: BTreeMap::new(),
        }
    }

    /// Pulls everything queued so far. Returns the newly arrived notifications in
    /// arrival order.
    pub fn pump(&mut self) -> Vec<Notification> {
        let mut arrived = Vec::new();
        while let Ok(notification) = self.rx.try_recv() {
            self.show(notification.clone());
            arrived.push(notification);
        }
        arrived
    }

    /// Waits up to `timeout` for one notification.
    pub fn pump_one(&mut self, timeout: Duration) -> SurfacePoll {
        match self.rx.recv_timeout(timeout) {
            Ok(notification) => {
                self.show(notification.clone());
                SurfacePoll::Arrived(notification)
            }
            Err(RecvTimeoutError::Timeout) => SurfacePoll::Idle,
            Err(RecvTimeoutError::Disconnected) => SurfacePoll::Closed,
        }
    }

    fn show(&mut self, notification: Notification) {
        if self.visible.contains_key(&notification.id) {
            tracing::warn!(id = notification.id.0, "notification id reused; replacing visible entry");
        }
        self.visible.insert(notification.id, notification);
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notification> {
        self.visible.values()
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.visible.get(&id)
    }

    /// User clicked a notification. Opens its granted file, if any, and
    /// dismisses it when it auto-cancels. Returns whether the notification was
    /// visible.
    pub fn activate(&mut self, id: NotificationId, viewer: &dyn FileViewer) -> Result<bool> {
        let Some(notification) = self.visible.get(&id) else {
            return Ok(false);
        };
        if let Some(grant) = &notification.open_action {
            viewer.open(grant)?;
        }
        if notification.auto_cancel {
            self.visible.remove(&id);
        }
        Ok(true)
    }
}
