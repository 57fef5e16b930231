//! Engine adapter that drives the sample engine as a child process.
//!
//! The engine prints one JSON [`EngineEvent`] per stdout line; everything else
//! on stdout is treated as plain log output.

use std::{
    env,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::Mutex,
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, bail, Context, Result};
use launcher_core::NativeEngine;
use relay::NativeEventRelay;
use shared::{
    domain::{FilesystemRoots, Sample},
    protocol::{EngineEvent, SampleManifest},
};
use tracing::{debug, info, warn};

pub const ASSET_PATH_VAR: &str = "VKB_ASSET_PATH";
pub const TEMP_PATH_VAR: &str = "VKB_TEMP_PATH";
pub const STORAGE_PATH_VAR: &str = "VKB_STORAGE_PATH";
pub const LIST_SAMPLES_FLAG: &str = "--list-samples";

struct Session {
    child: Child,
    reader: JoinHandle<usize>,
}

pub struct ProcessEngine {
    program: PathBuf,
    relay: Option<NativeEventRelay>,
    paths: Mutex<Option<FilesystemRoots>>,
    session: Mutex<Option<Session>>,
}

impl ProcessEngine {
    /// Resolves the engine executable. Failure here is the "library failed to
    /// load" condition.
    pub fn load(program: &Path) -> Result<Self> {
        let program = resolve_program(program)
            .ok_or_else(|| anyhow!("engine executable '{}' not found", program.display()))?;
        info!(program = %program.display(), "engine loaded");
        Ok(Self {
            program,
            relay: None,
            paths: Mutex::new(None),
            session: Mutex::new(None),
        })
    }

    /// Events printed by later sessions are forwarded to `relay`.
    pub fn with_relay(mut self, relay: NativeEventRelay) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Blocks until the running session exits. `None` if nothing was started.
    pub fn wait(&self) -> Result<Option<ExitStatus>> {
        let session = self
            .session
            .lock()
            .map_err(|_| anyhow!("engine session lock poisoned"))?
            .take();
        let Some(mut session) = session else {
            return Ok(None);
        };

        let status = session.child.wait().context("failed to wait for engine")?;
        match session.reader.join() {
            Ok(relayed) => info!(%status, relayed, "engine session ended"),
            Err(_) => warn!(%status, "engine output reader panicked"),
        }
        Ok(Some(status))
    }
}

impl NativeEngine for ProcessEngine {
    fn list_samples(&self) -> Result<Vec<Sample>> {
        let output = Command::new(&self.program)
            .arg(LIST_SAMPLES_FLAG)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run '{}'", self.program.display()))?;
        if !output.status.success() {
            bail!("engine exited with {} while listing samples", output.status);
        }

        let manifest: SampleManifest = serde_json::from_slice(&output.stdout)
            .context("engine sample list is not valid JSON")?;
        let samples = manifest.into_samples();
        debug!(count = samples.len(), "engine listed samples");
        Ok(samples)
    }

    fn initialize_paths(&self, asset: &Path, temp: &Path, storage: Option<&Path>) -> Result<()> {
        let mut roots = FilesystemRoots::new(asset, temp);
        if let Some(storage) = storage {
            roots = roots.with_storage(storage);
        }
        *self
            .paths
            .lock()
            .map_err(|_| anyhow!("engine path lock poisoned"))? = Some(roots);
        Ok(())
    }

    fn begin_session(&self, arguments: &[String]) -> Result<()> {
        let roots = self
            .paths
            .lock()
            .map_err(|_| anyhow!("engine path lock poisoned"))?
            .clone()
            .ok_or_else(|| anyhow!("engine paths were not initialized"))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("engine session lock poisoned"))?;
        if session.is_some() {
            bail!("an engine session is already running");
        }

        let mut command = Command::new(&self.program);
        command
            .args(arguments)
            .env(ASSET_PATH_VAR, &roots.asset)
            .env(TEMP_PATH_VAR, &roots.temp)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        match &roots.storage {
            Some(storage) => {
                command.env(STORAGE_PATH_VAR, storage);
            }
            None => {
                command.env_remove(STORAGE_PATH_VAR);
            }
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start '{}'", self.program.display()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("engine stdout was not captured"))?;
        let relay = self.relay.clone();
        let reader = thread::Builder::new()
            .name("engine-events".into())
            .spawn(move || forward_events(stdout, relay.as_ref()))
            .context("failed to start engine output reader")?;

        info!(pid = child.id(), ?arguments, "engine session started");
        *session = Some(Session { child, reader });
        Ok(())
    }
}

/// Reads engine stdout to EOF, relaying every event line. Returns how many
/// events were relayed.
pub fn forward_events(output: impl Read, relay: Option<&NativeEventRelay>) -> usize {
    let mut relayed = 0;
    for line in BufReader::new(output).lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("engine output unreadable: {err}");
                break;
            }
        };
        match EngineEvent::parse_line(&line) {
            Some(event) => match relay {
                Some(relay) => {
                    if relay.post(event) {
                        relayed += 1;
                    }
                }
                None => info!(?event, "engine event without relay"),
            },
            None => debug!(line = %line, "engine output"),
        }
    }
    relayed
}

fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
