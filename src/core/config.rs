use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::Level;

pub const DEFAULT_DB_PATH: &str = "punchclock.db";
pub const DEFAULT_API_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: u16 = 3000;

/// Runtime settings. Resolved from defaults, then an optional TOML file,
/// then environment variables; CLI flags are applied last by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub telegram_token: Option<String>,
    pub authorized_users: Vec<u64>,
    /// `AUTHORIZED_USERS` items that were not numeric ids. Reported once
    /// logging is up.
    pub rejected_users: Vec<String>,
    pub database_path: PathBuf,
    pub api_host: String,
    pub api_port: u16,
    pub log_level: Level,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    telegram_token: Option<String>,
    authorized_users: Option<Vec<u64>>,
    database_path: Option<PathBuf>,
    api_host: Option<String>,
    api_port: Option<u16>,
    log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            authorized_users: Vec::new(),
            rejected_users: Vec::new(),
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            log_level: Level::INFO,
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("PUNCHCLOCK_CONFIG").map(PathBuf::from));
        if let Some(path) = config_path {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            config.apply_toml(&raw)?;
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_toml(&mut self, raw: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(raw).context("Invalid config file")?;
        if let Some(token) = file.telegram_token {
            self.telegram_token = Some(token);
        }
        if let Some(users) = file.authorized_users {
            self.authorized_users = users;
        }
        if let Some(path) = file.database_path {
            self.database_path = path;
        }
        if let Some(host) = file.api_host {
            self.api_host = host;
        }
        if let Some(port) = file.api_port {
            self.api_port = port;
        }
        if let Some(level) = file.log_level {
            self.log_level = parse_level(&level)?;
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.telegram_token = Some(token);
        }
        if let Some(users) = lookup("AUTHORIZED_USERS") {
            (self.authorized_users, self.rejected_users) = parse_user_ids(&users);
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("API_HOST") {
            self.api_host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.api_port = port
                .trim()
                .parse()
                .with_context(|| format!("API_PORT is not a valid port: {port}"))?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = parse_level(&level)?;
        }
        Ok(())
    }

    pub fn telegram_token(&self) -> Result<&str> {
        self.telegram_token
            .as_deref()
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN environment variable is required"))
    }
}

/// Parses a comma-separated list of Telegram user ids. Items that are not
/// ids are returned separately instead of failing the whole list.
pub fn parse_user_ids(raw: &str) -> (Vec<u64>, Vec<String>) {
    let mut ids = Vec::new();
    let mut rejected = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match item.parse() {
            Ok(id) => ids.push(id),
            Err(_) => rejected.push(item.to_string()),
        }
    }
    (ids, rejected)
}

fn parse_level(raw: &str) -> Result<Level> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("Unknown log level: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_user_ids_skips_garbage() {
        let (ids, rejected) = parse_user_ids("123, 456,abc,,789,-4");
        assert_eq!(ids, vec![123, 456, 789]);
        assert_eq!(rejected, vec!["abc", "-4"]);
        assert_eq!(parse_user_ids(""), (vec![], vec![]));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::default();
        config
            .apply_toml(
                r#"
                telegram_token = "from-file"
                api_port = 8080
                authorized_users = [1, 2]
                "#,
            )
            .unwrap();
        config
            .apply_env(env(&[
                ("TELEGRAM_BOT_TOKEN", "from-env"),
                ("AUTHORIZED_USERS", "5"),
                ("LOG_LEVEL", "debug"),
            ]))
            .unwrap();

        assert_eq!(config.telegram_token.as_deref(), Some("from-env"));
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.authorized_users, vec![5]);
        assert!(config.rejected_users.is_empty());
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(env(&[("API_PORT", "http")])).is_err());
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let mut config = AppConfig::default();
        assert!(config.apply_toml("tokne = \"typo\"").is_err());
    }

    #[test]
    fn missing_telegram_token_is_reported() {
        let config = AppConfig::default();
        let err = config.telegram_token().unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn invalid_env_user_ids_are_kept_for_reporting() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("AUTHORIZED_USERS", "abc,12")]))
            .unwrap();

        assert_eq!(config.authorized_users, vec![12]);
        assert_eq!(config.rejected_users, vec!["abc"]);
    }
}
