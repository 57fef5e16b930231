//! Terminal stand-in for the host notification tray.

use std::{fs, io::Write, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use relay::{FileViewer, NotificationSurface, SurfacePoll};
use shared::domain::{FileGrant, Notification, Severity};
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// "Open with" action: prints the granted file.
pub struct ConsoleViewer<W> {
    out: Mutex<W>,
}

impl<W: Write> ConsoleViewer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> FileViewer for ConsoleViewer<W> {
    fn open(&self, grant: &FileGrant) -> Result<()> {
        let contents = fs::read_to_string(&grant.path)
            .with_context(|| format!("failed to read '{}'", grant.path.display()))?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("viewer output lock poisoned"))?;
        writeln!(out, "--- {} ({}) ---", grant.uri, grant.mime_type)?;
        out.write_all(contents.as_bytes())?;
        if !contents.ends_with('\n') {
            writeln!(out)?;
        }
        writeln!(out, "--- end ---")?;
        Ok(())
    }
}

pub fn render(notification: &Notification) -> String {
    let marker = match notification.severity {
        Severity::Info => "info",
        Severity::Fatal => "FATAL",
    };
    let mut line = format!(
        "[{}#{}] {} ({marker}): {}",
        notification.channel, notification.id.0, notification.title, notification.body
    );
    if let Some(detail) = notification
        .detail
        .as_deref()
        .filter(|detail| *detail != notification.body)
    {
        line.push_str(" | ");
        line.push_str(detail);
    }
    line
}

/// Shows notifications as they arrive until every sender is gone. With
/// `open_fatal_logs` the open action of fatal notifications is activated
/// immediately.
pub fn run_surface<W: Write>(
    mut surface: NotificationSurface,
    out: &mut W,
    viewer: &dyn FileViewer,
    open_fatal_logs: bool,
) -> Result<usize> {
    let mut shown = 0;
    loop {
        match surface.pump_one(POLL_INTERVAL) {
            SurfacePoll::Arrived(notification) => {
                writeln!(out, "{}", render(&notification))?;
                shown += 1;
                if open_fatal_logs && notification.open_action.is_some() {
                    if let Err(err) = surface.activate(notification.id, viewer) {
                        warn!(id = notification.id.0, "failed to open attachment: {err:#}");
                    }
                }
            }
            SurfacePoll::Idle => {}
            SurfacePoll::Closed => break,
        }
    }
    Ok(shown)
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
