use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use launcher_core::DEFAULT_PREFERRED_CATEGORIES;
use relay::{DEFAULT_CHANNEL_ID, DEFAULT_TITLE};
use storage::database_url_in;

pub const SETTINGS_FILE: &str = "launcher.toml";
const DEFAULT_PROVIDER_AUTHORITY: &str = "vkb.launcher.provider";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub engine_path: PathBuf,
    pub data_dir: PathBuf,
    pub database_url: String,
    pub preferred_categories: Vec<String>,
    /// Three-root deployment when set.
    pub storage_root: bool,
    pub notification_channel: String,
    pub notification_title: String,
    pub provider_authority: String,
    pub shared_roots: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = storage::default_data_dir();
        Self {
            engine_path: PathBuf::from("vulkan_samples"),
            database_url: database_url_in(&data_dir),
            data_dir,
            preferred_categories: DEFAULT_PREFERRED_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            storage_root: false,
            notification_channel: DEFAULT_CHANNEL_ID.into(),
            notification_title: DEFAULT_TITLE.into(),
            provider_authority: DEFAULT_PROVIDER_AUTHORITY.into(),
            shared_roots: Vec::new(),
        }
    }
}

impl Settings {
    pub fn engine_root(&self) -> PathBuf {
        self.data_dir.join("engine")
    }

    /// Applies `key = "value"` pairs from a settings file.
    pub fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file_cfg = toml::from_str::<HashMap<String, String>>(raw)
            .context("settings file must be a flat table of strings")?;
        self.apply(|key| file_cfg.get(key).cloned(), |key| key.to_string());
        Ok(())
    }

    /// Applies `LAUNCHER_*` then `APP__*` variables; the latter win.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.apply(&lookup, |key| format!("LAUNCHER_{}", key.to_ascii_uppercase()));
        self.apply(&lookup, |key| format!("APP__{}", key.to_ascii_uppercase()));
    }

    fn apply(&mut self, lookup: impl Fn(&str) -> Option<String>, name: impl Fn(&str) -> String) {
        let get = |key: &str| lookup(&name(key)).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("engine_path") {
            self.engine_path = PathBuf::from(v);
        }
        if let Some(v) = get("data_dir") {
            let data_dir = PathBuf::from(v);
            if self.database_url == database_url_in(&self.data_dir) {
                self.database_url = database_url_in(&data_dir);
            }
            self.data_dir = data_dir;
        }
        if let Some(v) = get("database_url") {
            self.database_url = v;
        }
        if let Some(v) = get("preferred_categories") {
            self.preferred_categories = split_list(&v);
        }
        if let Some(v) = get("storage_root") {
            match parse_flag(&v) {
                Some(flag) => self.storage_root = flag,
                None => tracing::warn!(value = %v, "ignoring invalid storage_root flag"),
            }
        }
        if let Some(v) = get("notification_channel") {
            self.notification_channel = v;
        }
        if let Some(v) = get("notification_title") {
            self.notification_title = v;
        }
        if let Some(v) = get("provider_authority") {
            self.provider_authority = v;
        }
        if let Some(v) = get("shared_roots") {
            self.shared_roots = split_list(&v).into_iter().map(PathBuf::from).collect();
        }
    }
}

pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(SETTINGS_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => settings
            .apply_file(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?,
        Err(err) if config_path.is_some() => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
        Err(_) => {}
    }

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(parent) = sqlite_path(database_url).and_then(|p| p.parent().map(Path::to_path_buf))
    else {
        return Ok(());
    };

    fs::create_dir_all(&parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
