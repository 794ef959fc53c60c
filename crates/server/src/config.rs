use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CATALOG_PATH: &str = "media.redb";
const DEFAULT_MAX_UPLOAD_MB: u64 = 512;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub version: u32,
    pub port: u16,
    /// Directory that holds `uploads/` and its asset subdirectories.
    pub data_root: String,
    pub catalog_path: String,
    /// Base of every URL handed to clients.
    pub public_base_url: String,
    pub max_upload_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            port: DEFAULT_PORT,
            data_root: ".".to_string(),
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            public_base_url: format!("http://localhost:{}", DEFAULT_PORT),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        let bytes = self.max_upload_mb.saturating_mul(1024 * 1024);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }

    fn normalize(&mut self) {
        if self.version < CONFIG_VERSION {
            self.version = CONFIG_VERSION;
        }
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.data_root.trim().is_empty() {
            self.data_root = ".".to_string();
        }
        if self.catalog_path.trim().is_empty() {
            self.catalog_path = DEFAULT_CATALOG_PATH.to_string();
        }
        if self.public_base_url.trim().is_empty() {
            self.public_base_url = format!("http://localhost:{}", self.port);
        }
        if self.max_upload_mb == 0 {
            self.max_upload_mb = DEFAULT_MAX_UPLOAD_MB;
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("MEDIA_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

pub fn load_or_create_config(path: &Path) -> Result<(ServerConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: ServerConfig = serde_yaml::from_str(&contents)?;
        config.normalize();
        return Ok((config, false));
    }

    let config = ServerConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// `API_BASE_URL` wins over the configured base when set.
pub fn public_base_url(config: &ServerConfig) -> String {
    base_url_or(env::var("API_BASE_URL").ok(), &config.public_base_url)
}

fn base_url_or(override_value: Option<String>, configured: &str) -> String {
    let value = match override_value {
        Some(value) if !value.trim().is_empty() => value,
        _ => configured.to_string(),
    };
    value.trim().trim_end_matches('/').to_string()
}

pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(created);
        assert!(path.exists());
        assert_eq!(config.port, 8000);
        assert_eq!(config.catalog_path, "media.redb");
        assert_eq!(config.public_base_url, "http://localhost:8000");

        let (reloaded, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
        assert_eq!(reloaded.port, config.port);
    }

    #[test]
    fn blank_and_zero_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "version: 0\nport: 9100\ndata_root: ''\ncatalog_path: ' '\npublic_base_url: ''\nmax_upload_mb: 0\n",
        )
        .unwrap();
        let (config, _) = load_or_create_config(&path).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.port, 9100);
        assert_eq!(config.data_root, ".");
        assert_eq!(config.catalog_path, "media.redb");
        assert_eq!(config.public_base_url, "http://localhost:9100");
        assert_eq!(config.max_upload_mb, 512);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "port: 8123\n").unwrap();
        let (config, _) = load_or_create_config(&path).unwrap();
        assert_eq!(config.port, 8123);
        assert_eq!(config.data_root, ".");
        assert_eq!(config.max_upload_bytes(), 512 * 1024 * 1024);
    }

    #[test]
    fn base_url_override_trims_trailing_slash() {
        assert_eq!(
            base_url_or(Some("https://media.example.com/".to_string()), "http://localhost:8000"),
            "https://media.example.com"
        );
        assert_eq!(
            base_url_or(Some("  ".to_string()), "http://localhost:8000/"),
            "http://localhost:8000"
        );
        assert_eq!(base_url_or(None, "http://a"), "http://a");
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let config_path = Path::new("/etc/media/config.yaml");
        assert_eq!(
            resolve_path(config_path, "media.redb"),
            PathBuf::from("/etc/media/media.redb")
        );
        assert_eq!(resolve_path(config_path, "/var/data"), PathBuf::from("/var/data"));
        assert_eq!(
            resolve_path(Path::new("config.yaml"), "media.redb"),
            PathBuf::from("./media.redb")
        );
    }
}
