//! Presentation-facing launcher core: builds the sample catalog and turns a
//! user selection into an engine session.

use std::sync::Arc;

use shared::{
    domain::{FilesystemRoots, SelectionSpec},
    error::LaunchError,
};
use tracing::{info, warn};

mod capability;
mod catalog;
mod launch;

pub use capability::{Permission, PermissionGrants, StorageAccess};
pub use catalog::{
    Catalog, CatalogBuilder, CatalogSection, CategoryOrderPolicy, DEFAULT_PREFERRED_CATEGORIES,
};
pub use launch::{arguments_for, prepare_roots, LaunchRequest, LaunchRequestBuilder, NativeEngine};

pub const ENGINE_LOAD_FAILED: &str = "Native code library failed to load.";

/// What the presentation should render after [`Launcher::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationState {
    Ready(Catalog),
    PermissionRequired { missing: Vec<Permission> },
    /// Renders zero tabs plus `reason` as the status line.
    EngineUnavailable { reason: String },
}

impl PresentationState {
    pub fn catalog(&self) -> Option<&Catalog> {
        match self {
            PresentationState::Ready(catalog) => Some(catalog),
            _ => None,
        }
    }
}

pub struct Launcher {
    engine: Result<Arc<dyn NativeEngine>, String>,
    catalog_builder: CatalogBuilder,
    request_builder: LaunchRequestBuilder,
}

impl Launcher {
    pub fn new(engine: Arc<dyn NativeEngine>, policy: CategoryOrderPolicy) -> Self {
        Self {
            engine: Ok(engine),
            catalog_builder: CatalogBuilder::new(policy),
            request_builder: LaunchRequestBuilder,
        }
    }

    /// A launcher whose engine could not be loaded. Every launch fails with
    /// [`LaunchError::EngineUnavailable`].
    pub fn without_engine(reason: impl Into<String>, policy: CategoryOrderPolicy) -> Self {
        Self {
            engine: Err(reason.into()),
            catalog_builder: CatalogBuilder::new(policy),
            request_builder: LaunchRequestBuilder,
        }
    }

    pub fn is_engine_loaded(&self) -> bool {
        self.engine.is_ok()
    }

    pub fn start(&self, grants: PermissionGrants) -> PresentationState {
        let engine = match &self.engine {
            Ok(engine) => engine,
            Err(reason) => {
                warn!(%reason, "engine not loaded, presenting empty catalog");
                return PresentationState::EngineUnavailable {
                    reason: reason.clone(),
                };
            }
        };

        let access = StorageAccess::evaluate(grants);
        if !access.is_sufficient() {
            let missing = access.missing();
            info!(?missing, "storage permission required");
            return PresentationState::PermissionRequired { missing };
        }

        let samples = match engine.list_samples() {
            Ok(samples) => samples,
            Err(err) => {
                warn!("engine did not report samples: {err:#}");
                Vec::new()
            }
        };
        let (catalog, dropped) = self.catalog_builder.build_lenient(samples);
        for sample in &dropped {
            warn!(id = %sample.id, category = %sample.category, "duplicate sample id ignored");
        }
        info!(
            samples = catalog.len(),
            tabs = catalog.tab_count(),
            "catalog ready"
        );
        PresentationState::Ready(catalog)
    }

    pub fn launch(
        &self,
        selection: &SelectionSpec,
        roots: &FilesystemRoots,
    ) -> Result<(), LaunchError> {
        let engine = self
            .engine
            .as_ref()
            .map_err(|reason| LaunchError::EngineUnavailable(reason.clone()))?;
        let request = self.request_builder.build(selection, roots)?;
        info!(
            selection = ?request.selection(),
            arguments = ?request.arguments(),
            "starting engine session"
        );
        request.hand_off(engine.as_ref())
    }

    /// Runs every sample in the tab at `tab` of `catalog`.
    pub fn launch_category(
        &self,
        catalog: &Catalog,
        tab: usize,
        roots: &FilesystemRoots,
    ) -> Result<(), LaunchError> {
        let category = catalog
            .categories()
            .nth(tab)
            .ok_or(LaunchError::UnknownTab(tab))?;
        self.launch(&SelectionSpec::ByCategory(category.to_string()), roots)
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod catalog_tests;

#[cfg(test)]
#[path = "tests/launch_tests.rs"]
mod launch_tests;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
