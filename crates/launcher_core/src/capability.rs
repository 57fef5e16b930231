use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadStorage,
    WriteStorage,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::ReadStorage => f.write_str("read external storage"),
            Permission::WriteStorage => f.write_str("write external storage"),
        }
    }
}

/// Storage grants as reported by the host at presentation start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrants {
    pub read: bool,
    pub write: bool,
}

impl PermissionGrants {
    pub fn all() -> Self {
        Self {
            read: true,
            write: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageAccess {
    Granted,
    Partial { missing: Permission },
    Denied,
}

impl StorageAccess {
    pub fn evaluate(grants: PermissionGrants) -> Self {
        match (grants.read, grants.write) {
            (true, true) => StorageAccess::Granted,
            (true, false) => StorageAccess::Partial {
                missing: Permission::WriteStorage,
            },
            (false, true) => StorageAccess::Partial {
                missing: Permission::ReadStorage,
            },
            (false, false) => StorageAccess::Denied,
        }
    }

    /// Samples read assets and write logs, so both grants are needed.
    pub fn is_sufficient(&self) -> bool {
        matches!(self, StorageAccess::Granted)
    }

    pub fn missing(&self) -> Vec<Permission> {
        match self {
            StorageAccess::Granted => Vec::new(),
            StorageAccess::Partial { missing } => vec![*missing],
            StorageAccess::Denied => vec![Permission::ReadStorage, Permission::WriteStorage],
        }
    }
}
