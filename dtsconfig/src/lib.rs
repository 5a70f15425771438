//! # dtspotify Configuration Module
//!
//! This module provides configuration management for dtspotify, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides (prefixed and legacy deployment names)
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use dtsconfig::get_config;
//!
//! let config = get_config();
//!
//! let port = config.get_http_port();
//! let client_id = config.get_spotify_client_id()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("dtspotify.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load dtspotify configuration"));
}

const ENV_CONFIG_DIR: &str = "DTSPOTIFY_CONFIG";
const ENV_PREFIX: &str = "DTSPOTIFY_CONFIG__";

/// Plain environment variables understood for compatibility with existing
/// deployments, and the configuration path each one overrides.
const LEGACY_ENV: &[(&str, &[&str])] = &[
    ("SPOTIFY_CLIENT_ID", &["spotify", "client_id"]),
    ("SPOTIFY_CLIENT_SECRET", &["spotify", "client_secret"]),
    ("BASE_URL", &["host", "base_url"]),
    ("HOST_PORT", &["host", "http_port"]),
    ("SLACK_URL", &["notifications", "slack_url"]),
];

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_HEALTH_PORT: u16 = 8086;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const DEFAULT_TOKEN_KEY: &str = "spotify_token";
const DEFAULT_READY_TIMEOUT_SECS: u64 = 300;
const DEFAULT_PERSIST_PERIOD_SECS: u64 = 300;
const DEFAULT_POLL_PERIOD_SECS: u64 = 30;
const DEFAULT_MIN_TTL_SECS: u64 = 120;
const DEFAULT_INIT_MIN_TTL_SECS: u64 = 300;

/// Macro to generate getter/setter for durations stored as seconds
macro_rules! impl_secs_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Duration {
            let secs = match self.get_value($path) {
                Ok(Value::Number(n)) if n.is_u64() => n.as_u64().unwrap_or($default),
                Ok(Value::String(s)) => s.trim().parse().unwrap_or($default),
                _ => $default,
            };
            Duration::from_secs(secs)
        }

        pub fn $setter(&self, value: Duration) -> Result<()> {
            let n = Number::from(value.as_secs());
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path)? {
                Value::Bool(b) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Macro to generate getter/setter for mandatory string values
macro_rules! impl_required_string_config {
    ($getter:ident, $setter:ident, $path:expr, $name:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
                _ => Err(anyhow!("Missing {}", $name)),
            }
        }

        pub fn $setter(&self, value: &str) -> Result<()> {
            self.set_value($path, Value::String(value.to_string()))
        }
    };
}

/// Configuration manager for dtspotify
///
/// # Examples
///
/// ```no_run
/// use dtsconfig::get_config;
///
/// let config = get_config();
/// println!("HTTP port: {}", config.get_http_port());
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<ConfigData>,
}

/// `stored` is what config.yaml holds; `effective` adds the environment
/// overrides on top and is never written to disk.
#[derive(Debug, Clone)]
struct ConfigData {
    stored: Value,
    effective: Value,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.lock_data().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(".dtspotify").exists() {
            return ".dtspotify".to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(".dtspotify");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        ".dtspotify".to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        // Test d'écriture
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;

        Ok(())
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    ///    (argument, `DTSPOTIFY_CONFIG`, `./.dtspotify`, `~/.dtspotify`)
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Saves the merged file configuration
    /// 5. Applies environment variable overrides in memory
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&config_dir))?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file=%path, "Loaded config file");
            data
        } else {
            info!(config_file=%path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
        merge_yaml(&mut default_value, &external_value);
        let config_value = Self::lower_keys_value(default_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(ConfigData {
                effective: config_value.clone(),
                stored: config_value,
            }),
        };
        config.save()?;

        config.apply_env_overrides(env::vars());
        Ok(config)
    }

    fn lock_data(&self) -> std::sync::MutexGuard<'_, ConfigData> {
        // Un panic pendant une écriture ne rend pas l'arbre YAML incohérent
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the directory holding config.yaml
    pub fn config_dir(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.lock_data().stored)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.lock_data();
        Self::set_value_internal(&mut data.stored, path, value.clone())?;
        Self::set_value_internal(&mut data.effective, path, value)?;
        drop(data);
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        Self::get_value_internal(&self.lock_data().effective, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                if let Some(next) = map.get(&Value::String(key.to_lowercase())) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    /// Applies `DTSPOTIFY_CONFIG__A__B` and legacy overrides from `vars`
    fn apply_env_overrides<I>(&self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut data = self.lock_data();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(&mut data.effective, &key_path, yaml_value);
            } else if let Some((_, path)) = LEGACY_ENV.iter().find(|(name, _)| *name == key) {
                // Les secrets montés par Kubernetes finissent souvent par un '\n'
                let yaml_value = Self::convert_env_value(value.trim());
                let _ = Self::set_value_internal(&mut data.effective, path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        match serde_yaml::from_str::<Value>(value) {
            // Une valeur vide ou null ne doit pas effacer une chaîne
            Ok(Value::Null) => Value::String(value.to_string()),
            Ok(parsed) => parsed,
            Err(_) => Value::String(value.to_string()),
        }
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        new_map.insert(Value::String(s.to_lowercase()), Self::lower_keys_value(v));
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Resolves a relative or absolute path and creates the directory if needed
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<String> {
        let path = Path::new(dir_path);

        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(path)
        };

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory=%absolute_path.display(), "Created managed directory");
        }

        Ok(absolute_path.to_string_lossy().to_string())
    }

    /// Gets a directory managed by the configuration
    ///
    /// The directory can be absolute or relative to the configuration
    /// directory. It is created if it doesn't exist.
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
        let dir_path = match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                self.set_managed_dir(path, default.to_string())?;
                default.to_string()
            }
        };
        self.resolve_and_create_dir(&dir_path)
    }

    /// Sets a directory managed by the configuration
    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set_value(path, Value::String(directory))
    }

    fn get_port(&self, path: &[&str], default: u16) -> u16 {
        match self.get_value(path) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    tracing::warn!("Invalid port {} at {}, using default {}", n, path.join("."), default);
                    default
                }
            },
            Ok(Value::String(s)) => match s.trim().parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    tracing::warn!("Invalid port '{}' at {}, using default {}", s, path.join("."), default);
                    default
                }
            },
            Ok(_) => {
                tracing::warn!("Port at {} not a number or string, using default {}", path.join("."), default);
                default
            }
            Err(err) => {
                tracing::warn!("Failed to get port: {}, using default {}", err, default);
                default
            }
        }
    }

    /// Gets the HTTP port of the webhook/login listener (default 8080)
    pub fn get_http_port(&self) -> u16 {
        self.get_port(&["host", "http_port"], DEFAULT_HTTP_PORT)
    }

    /// Sets the HTTP port in configuration
    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.set_value(&["host", "http_port"], Value::Number(Number::from(port)))
    }

    /// Gets the port of the health-check listener (default 8086)
    pub fn get_health_port(&self) -> u16 {
        self.get_port(&["host", "health_port"], DEFAULT_HEALTH_PORT)
    }

    impl_required_string_config!(
        get_base_url,
        set_base_url,
        &["host", "base_url"],
        "BASE_URL"
    );

    impl_required_string_config!(
        get_spotify_client_id,
        set_spotify_client_id,
        &["spotify", "client_id"],
        "SPOTIFY_CLIENT_ID"
    );

    impl_required_string_config!(
        get_spotify_client_secret,
        set_spotify_client_secret,
        &["spotify", "client_secret"],
        "SPOTIFY_CLIENT_SECRET"
    );

    impl_required_string_config!(
        get_slack_url,
        set_slack_url,
        &["notifications", "slack_url"],
        "SLACK_URL"
    );

    fn get_string_or(&self, path: &[&str], default: &str) -> String {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => default.to_string(),
        }
    }

    /// Path of the OAuth redirect handler, always starting with '/'
    pub fn get_spotify_login_path(&self) -> String {
        let path = self.get_string_or(&["spotify", "login_path"], DEFAULT_LOGIN_PATH);
        format!("/{}", path.trim_start_matches('/'))
    }

    /// OAuth redirect URL registered with Spotify: base URL + login path
    pub fn get_spotify_redirect_url(&self) -> Result<String> {
        let base = self.get_base_url()?;
        Ok(format!(
            "{}{}",
            base.trim_end_matches('/'),
            self.get_spotify_login_path()
        ))
    }

    pub fn get_spotify_api_url(&self) -> String {
        self.get_string_or(&["spotify", "api_url"], DEFAULT_API_URL)
    }

    pub fn get_spotify_accounts_url(&self) -> String {
        self.get_string_or(&["spotify", "accounts_url"], DEFAULT_ACCOUNTS_URL)
    }

    /// Key under which the credential is persisted
    pub fn get_token_key(&self) -> String {
        self.get_string_or(&["token_store", "key"], DEFAULT_TOKEN_KEY)
    }

    /// Directory of the file credential store, created on demand
    pub fn get_token_store_dir(&self) -> Result<String> {
        self.get_managed_dir(&["token_store", "directory"], "tokens")
    }

    impl_secs_config!(
        get_ready_timeout,
        set_ready_timeout,
        &["spotify", "ready_timeout_secs"],
        DEFAULT_READY_TIMEOUT_SECS
    );

    impl_secs_config!(
        get_persist_period,
        set_persist_period,
        &["token_store", "persist_period_secs"],
        DEFAULT_PERSIST_PERIOD_SECS
    );

    impl_secs_config!(
        get_poll_period,
        set_poll_period,
        &["token_store", "poll_period_secs"],
        DEFAULT_POLL_PERIOD_SECS
    );

    impl_secs_config!(
        get_min_token_ttl,
        set_min_token_ttl,
        &["token_store", "min_ttl_secs"],
        DEFAULT_MIN_TTL_SECS
    );

    impl_secs_config!(
        get_init_min_token_ttl,
        set_init_min_token_ttl,
        &["token_store", "init_min_ttl_secs"],
        DEFAULT_INIT_MIN_TTL_SECS
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Minimum log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"])? {
            Value::String(s) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Returns the global configuration instance, lazily loaded on first access
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
