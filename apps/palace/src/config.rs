use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "palace.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub log_filter: String,
    pub seed_sample_room: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/palace.db".into(),
            log_filter: "warn".into(),
            seed_sample_room: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    database_url: Option<String>,
    log_filter: Option<String>,
    seed_sample_room: Option<bool>,
}

/// Defaults, then `palace.toml` (or `$PALACE_CONFIG`), then environment variables.
pub fn load_settings() -> Settings {
    let config_path = std::env::var("PALACE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    load_settings_from(&config_path, |key| std::env::var(key).ok())
}

pub fn load_settings_from(config_path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.database_url {
                    settings.database_url = v;
                }
                if let Some(v) = file_cfg.log_filter {
                    settings.log_filter = v;
                }
                if let Some(v) = file_cfg.seed_sample_room {
                    settings.seed_sample_room = v;
                }
            }
            // Runs before the tracing subscriber exists.
            Err(error) => eprintln!(
                "ignoring unreadable config file '{}': {error}",
                config_path.display()
            ),
        }
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("PALACE_DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("PALACE_LOG") {
        settings.log_filter = v;
    }

    if let Some(v) = env("PALACE_SEED_SAMPLE") {
        match parse_flag(&v) {
            Some(flag) => settings.seed_sample_room = flag,
            None => eprintln!("ignoring PALACE_SEED_SAMPLE={v}: expected a boolean"),
        }
    }

    settings
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Turns a plain file path into a `sqlite://` URL. Missing parent
/// directories are left for `Storage::new` to create.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
