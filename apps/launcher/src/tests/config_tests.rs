use super::*;

use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn defaults_match_notification_and_category_conventions() {
    let settings = Settings::default();
    assert_eq!(settings.preferred_categories, vec!["api", "performance"]);
    assert_eq!(settings.notification_channel, "vkb");
    assert_eq!(settings.notification_title, "Vulkan Best Practice Error");
    assert!(!settings.storage_root);
    assert!(settings.database_url.ends_with("/launcher.db"));
}

#[test]
fn default_database_is_the_one_the_operator_tool_opens() {
    assert_eq!(
        Settings::default().database_url,
        storage::database_url_in(&storage::default_data_dir())
    );
}

#[test]
fn settings_file_overrides_defaults() {
    let mut settings = Settings::default();
    settings
        .apply_file(
            r#"
engine_path = "/opt/vkb/vulkan_samples"
preferred_categories = "performance, api ,extensions"
storage_root = "true"
"#,
        )
        .expect("apply file");

    assert_eq!(settings.engine_path, PathBuf::from("/opt/vkb/vulkan_samples"));
    assert_eq!(
        settings.preferred_categories,
        vec!["performance", "api", "extensions"]
    );
    assert!(settings.storage_root);
}

#[test]
fn malformed_settings_file_is_an_error() {
    let mut settings = Settings::default();
    assert!(settings.apply_file("storage_root = true").is_err());
}

#[test]
fn app_env_wins_over_launcher_env() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[
        ("LAUNCHER_NOTIFICATION_TITLE", "from launcher"),
        ("APP__NOTIFICATION_TITLE", "from app"),
        ("LAUNCHER_PROVIDER_AUTHORITY", "vkb.test"),
    ]));
    assert_eq!(settings.notification_title, "from app");
    assert_eq!(settings.provider_authority, "vkb.test");
}

#[test]
fn data_dir_moves_default_database_but_not_explicit_one() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[("APP__DATA_DIR", "/srv/vkb")]));
    assert_eq!(settings.data_dir, PathBuf::from("/srv/vkb"));
    assert_eq!(settings.database_url, "sqlite:///srv/vkb/launcher.db");
    assert_eq!(settings.engine_root(), PathBuf::from("/srv/vkb/engine"));

    let mut explicit = Settings::default();
    explicit.apply_env(env(&[
        ("APP__DATABASE_URL", "sqlite::memory:"),
        ("APP__DATA_DIR", "/srv/vkb"),
    ]));
    assert_eq!(explicit.database_url, "sqlite::memory:");
}

#[test]
fn invalid_flag_and_blank_values_are_ignored() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[
        ("APP__STORAGE_ROOT", "maybe"),
        ("APP__ENGINE_PATH", "   "),
    ]));
    assert!(!settings.storage_root);
    assert_eq!(settings.engine_path, PathBuf::from("vulkan_samples"));
}

#[test]
fn shared_roots_parse_as_paths() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[("LAUNCHER_SHARED_ROOTS", "/tmp/logs,/data/out")]));
    assert_eq!(
        settings.shared_roots,
        vec![PathBuf::from("/tmp/logs"), PathBuf::from("/data/out")]
    );
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite:data/x.db"), "sqlite://data/x.db");
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn creates_parent_dir_for_sqlite_url() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    let url = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(url.starts_with("sqlite://"));
    assert!(temp_root.path().join("data").exists());
}

#[test]
fn explicit_missing_config_file_is_an_error() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let missing = temp_root.path().join("nope.toml");
    assert!(load_settings(Some(&missing)).is_err());
}
