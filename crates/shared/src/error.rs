use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    Asset,
    Temp,
    Storage,
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RootKind::Asset => "asset",
            RootKind::Temp => "temp",
            RootKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRootReason {
    Empty,
    Unresolvable,
    NotADirectory,
}

impl fmt::Display for InvalidRootReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InvalidRootReason::Empty => "path is empty",
            InvalidRootReason::Unresolvable => "path does not exist",
            InvalidRootReason::NotADirectory => "path is not a directory",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("duplicate sample id '{id}' reported by engine")]
    DuplicateId { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("invalid {root} root: {reason}")]
    InvalidRoot {
        root: RootKind,
        reason: InvalidRootReason,
    },
    #[error("native engine is not loaded: {0}")]
    EngineUnavailable(String),
    #[error("native engine rejected launch: {0}")]
    Engine(String),
    #[error("no category tab at index {0}")]
    UnknownTab(usize),
}

impl LaunchError {
    pub fn invalid_root(root: RootKind, reason: InvalidRootReason) -> Self {
        Self::InvalidRoot { root, reason }
    }
}
