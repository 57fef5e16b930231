use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use shared::{
    domain::{FilesystemRoots, Sample, SelectionSpec},
    error::{InvalidRootReason, LaunchError, RootKind},
};

/// Capability boundary to the native sample engine.
pub trait NativeEngine: Send + Sync {
    fn list_samples(&self) -> Result<Vec<Sample>>;

    /// `storage` is `None` for the two-root deployment.
    fn initialize_paths(&self, asset: &Path, temp: &Path, storage: Option<&Path>) -> Result<()>;

    fn begin_session(&self, arguments: &[String]) -> Result<()>;
}

/// A validated launch: roots checked, arguments derived. Consumed by
/// [`LaunchRequest::hand_off`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    selection: SelectionSpec,
    roots: FilesystemRoots,
    arguments: Vec<String>,
}

impl LaunchRequest {
    pub fn selection(&self) -> &SelectionSpec {
        &self.selection
    }

    pub fn roots(&self) -> &FilesystemRoots {
        &self.roots
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Pushes the roots to the engine, then starts the session.
    pub fn hand_off(self, engine: &dyn NativeEngine) -> Result<(), LaunchError> {
        engine
            .initialize_paths(
                &self.roots.asset,
                &self.roots.temp,
                self.roots.storage.as_deref(),
            )
            .map_err(|err| LaunchError::Engine(format!("{err:#}")))?;
        engine
            .begin_session(&self.arguments)
            .map_err(|err| LaunchError::Engine(format!("{err:#}")))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchRequestBuilder;

impl LaunchRequestBuilder {
    pub fn build(
        &self,
        selection: &SelectionSpec,
        roots: &FilesystemRoots,
    ) -> Result<LaunchRequest, LaunchError> {
        check_root(RootKind::Asset, &roots.asset)?;
        check_root(RootKind::Temp, &roots.temp)?;
        if let Some(storage) = &roots.storage {
            check_root(RootKind::Storage, storage)?;
        }

        Ok(LaunchRequest {
            selection: selection.clone(),
            roots: roots.clone(),
            arguments: arguments_for(selection),
        })
    }
}

/// The engine resolves ids and categories itself and reports misses through
/// the relay, so nothing is checked against the catalog here.
pub fn arguments_for(selection: &SelectionSpec) -> Vec<String> {
    match selection {
        SelectionSpec::Demo => Vec::new(),
        SelectionSpec::BySampleId(id) => vec![id.clone()],
        SelectionSpec::ByCategory(name) => vec![name.clone()],
    }
}

fn check_root(kind: RootKind, path: &Path) -> Result<(), LaunchError> {
    if path.as_os_str().is_empty() {
        return Err(LaunchError::invalid_root(kind, InvalidRootReason::Empty));
    }
    let metadata = fs::metadata(path)
        .map_err(|_| LaunchError::invalid_root(kind, InvalidRootReason::Unresolvable))?;
    if !metadata.is_dir() {
        return Err(LaunchError::invalid_root(
            kind,
            InvalidRootReason::NotADirectory,
        ));
    }
    Ok(())
}

/// Roots that pass [`LaunchRequestBuilder::build`] for `base`, creating the
/// standard sub-directories if needed.
pub fn prepare_roots(base: &Path, with_storage: bool) -> std::io::Result<FilesystemRoots> {
    let asset: PathBuf = base.join("assets");
    let temp = base.join("temp");
    fs::create_dir_all(&asset)?;
    fs::create_dir_all(&temp)?;
    let roots = FilesystemRoots::new(asset, temp);
    if with_storage {
        let storage = base.join("storage");
        fs::create_dir_all(&storage)?;
        return Ok(roots.with_storage(storage));
    }
    Ok(roots)
}
