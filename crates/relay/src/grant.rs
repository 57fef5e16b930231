use std::path::{Component, Path, PathBuf};

use shared::domain::{FileAccess, FileGrant};
use thiserror::Error;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrantError {
    #[error("attachment path is empty")]
    EmptyPath,
    #[error("attachment '{}' has no file name", .0.display())]
    NoFileName(PathBuf),
    #[error("attachment '{}' is outside the shared roots", .0.display())]
    OutsideRoots(PathBuf),
}

/// Hands out read-only grants for single diagnostic files.
///
/// With no roots configured any file may be granted; otherwise the file must
/// live under one of them.
#[derive(Debug, Clone)]
pub struct FileGrantProvider {
    authority: String,
    roots: Vec<PathBuf>,
}

impl FileGrantProvider {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            roots: Vec::new(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn grant(&self, path: &Path) -> Result<FileGrant, GrantError> {
        if path.as_os_str().is_empty() {
            return Err(GrantError::EmptyPath);
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| GrantError::NoFileName(path.to_path_buf()))?;

        let escapes = path
            .components()
            .any(|component| matches!(component, Component::ParentDir));
        if !self.roots.is_empty()
            && (escapes || !self.roots.iter().any(|root| path.starts_with(root)))
        {
            return Err(GrantError::OutsideRoots(path.to_path_buf()));
        }

        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(FALLBACK_MIME)
            .to_string();

        Ok(FileGrant {
            uri: format!("content://{}/{}", self.authority, file_name),
            path: path.to_path_buf(),
            mime_type,
            access: FileAccess::Read,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_single_file_with_guessed_mime() {
        let provider = FileGrantProvider::new("vkb.provider");
        let grant = provider.grant(Path::new("/tmp/log.txt")).expect("grant");
        assert_eq!(grant.uri, "content://vkb.provider/log.txt");
        assert_eq!(grant.path, PathBuf::from("/tmp/log.txt"));
        assert_eq!(grant.mime_type, "text/plain");
        assert_eq!(grant.access, FileAccess::Read);
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        let provider = FileGrantProvider::new("vkb.provider");
        let grant = provider
            .grant(Path::new("/tmp/crash.vkbdump"))
            .expect("grant");
        assert_eq!(grant.mime_type, FALLBACK_MIME);
    }

    #[test]
    fn refuses_files_outside_configured_roots() {
        let provider = FileGrantProvider::new("vkb.provider").with_root("/data/outputs");
        assert!(provider.grant(Path::new("/data/outputs/log.txt")).is_ok());
        assert_eq!(
            provider.grant(Path::new("/etc/passwd")),
            Err(GrantError::OutsideRoots(PathBuf::from("/etc/passwd")))
        );
        assert!(matches!(
            provider.grant(Path::new("/data/outputs/../secrets.txt")),
            Err(GrantError::OutsideRoots(_))
        ));
    }

    #[test]
    fn refuses_empty_path() {
        let provider = FileGrantProvider::new("vkb.provider");
        assert_eq!(provider.grant(Path::new("")), Err(GrantError::EmptyPath));
    }
}
