use crate::error::{ErrorContext, SyncError};
use serde::Deserialize;
use shellexpand::tilde;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONSUL_URL: &str = "http://localhost:8500";
pub const DEFAULT_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Header Consul reads the ACL token from
pub const TOKEN_HEADER: &str = "X-Consul-Token";

/// Raw, unvalidated settings as they come from the config file or the command line.
///
/// Every field is optional so the two sources can be layered with [`Settings::merge`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub file: Option<String>,
    pub consul_url: Option<String>,
    pub kv_key: Option<String>,
    pub token: Option<String>,
    pub interval: Option<u64>,
    pub timeout: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Layer `overrides` on top of `self`; values set in `overrides` win.
    pub fn merge(self, overrides: Settings) -> Settings {
        Settings {
            file: overrides.file.or(self.file),
            consul_url: overrides.consul_url.or(self.consul_url),
            kv_key: overrides.kv_key.or(self.kv_key),
            token: overrides.token.or(self.token),
            interval: overrides.interval.or(self.interval),
            timeout: overrides.timeout.or(self.timeout),
            log_file: overrides.log_file.or(self.log_file),
        }
    }
}

/// Load settings from a TOML config file
pub fn load_settings_file(path: &Path) -> Result<Settings, SyncError> {
    let content = fs::read_to_string(path)
        .context(&format!("Failed to read config file {}", path.display()))?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}

/// The file being watched. Always an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    path: PathBuf,
}

impl WatchTarget {
    pub fn new(raw: &str) -> Result<Self, SyncError> {
        if raw.trim().is_empty() {
            return Err(SyncError::Validation("File path is empty".to_string()));
        }

        let expanded = tilde(raw);
        let path = PathBuf::from(expanded.as_ref());
        if !path.is_absolute() {
            return Err(SyncError::Validation(format!(
                "File path must be absolute: {}",
                raw
            )));
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Startup check: the file has to exist before the loop starts
    pub fn ensure_exists(&self) -> Result<(), SyncError> {
        if !self.path.is_file() {
            return Err(SyncError::Validation(format!(
                "File does not exist: {}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Remote endpoint, key and credential for the KV store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvTarget {
    base_url: Url,
    key: String,
    token: Option<String>,
}

impl KvTarget {
    pub fn new(base_url: &str, key: &str, token: Option<String>) -> Result<Self, SyncError> {
        let base_url = parse_base_url(base_url)?;

        let key = key.trim().trim_matches('/').to_string();
        if key.is_empty() {
            return Err(SyncError::Validation("KV key is empty".to_string()));
        }

        let token = token.filter(|t| !t.trim().is_empty());

        Ok(Self {
            base_url,
            key,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// `{base_url}/v1/kv/{key}` with each key segment percent-encoded
    pub fn kv_url(&self) -> String {
        let encoded_key = self
            .key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/v1/kv/{}", self.api_root(), encoded_key)
    }

    /// `{base_url}/v1/status/leader`
    pub fn leader_url(&self) -> String {
        format!("{}/v1/status/leader", self.api_root())
    }

    fn api_root(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

/// Parse the store address. Consul's own `CONSUL_HTTP_ADDR` is often given as
/// `host:port`, so a missing scheme means plain http.
fn parse_base_url(raw: &str) -> Result<Url, SyncError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SyncError::Validation("Consul URL is empty".to_string()));
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = Url::parse(&with_scheme)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SyncError::Validation(format!(
            "Unsupported Consul URL scheme '{}': {}",
            other, raw
        ))),
    }
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub watch: WatchTarget,
    pub kv: KvTarget,
    pub interval: Duration,
    pub timeout: Duration,
    pub log_file: Option<PathBuf>,
}

impl SyncConfig {
    pub fn from_settings(settings: Settings) -> Result<Self, SyncError> {
        let file = settings
            .file
            .ok_or_else(|| SyncError::Config("--file is required".to_string()))?;
        let kv_key = settings
            .kv_key
            .ok_or_else(|| SyncError::Config("--kv-key is required".to_string()))?;
        let consul_url = settings
            .consul_url
            .unwrap_or_else(|| DEFAULT_CONSUL_URL.to_string());

        let interval = positive_seconds(
            "interval",
            settings.interval.unwrap_or(DEFAULT_INTERVAL_SECS),
        )?;
        let timeout = positive_seconds(
            "timeout",
            settings.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
        )?;

        Ok(Self {
            watch: WatchTarget::new(&file)?,
            kv: KvTarget::new(&consul_url, &kv_key, settings.token)?,
            interval,
            timeout,
            log_file: settings.log_file,
        })
    }
}

fn positive_seconds(name: &str, secs: u64) -> Result<Duration, SyncError> {
    if secs == 0 {
        return Err(SyncError::Config(format!(
            "{} must be at least 1 second",
            name
        )));
    }
    Ok(Duration::from_secs(secs))
}
