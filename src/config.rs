use std::path::PathBuf;
use std::time::Duration;

pub const APP_IDENTIFIER: &str = "is.curate.desktop";

/// Relative location of the window-info helper inside the resource/app dir.
pub const HELPER_RELATIVE_PATH: &str = "swift-helpers/window-info";

/// Настройки резолвера контекста захвата
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Explicit helper binary; wins over resource/app dir lookup
    pub helper_path: Option<PathBuf>,
    /// Bundled resources directory (packaged builds)
    pub resource_dir: Option<PathBuf>,
    /// Application directory (development builds)
    pub app_dir: PathBuf,
    /// Hard budget for one resolution
    pub deadline: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            helper_path: None,
            resource_dir: None,
            app_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            deadline: Duration::from_millis(3000),
        }
    }
}

impl CaptureConfig {
    /// Defaults overridden by `CURATE_HELPER_PATH` / `CURATE_RESOURCE_DIR`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = env_non_empty("CURATE_HELPER_PATH") {
            config.helper_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = env_non_empty("CURATE_RESOURCE_DIR") {
            config.resource_dir = Some(PathBuf::from(dir));
        }
        config
    }
}

/// Настройки OAuth и хранилища токенов
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub token_url: String,
    /// Public client identifier (no client secret)
    pub client_id: String,
    pub http_timeout_secs: u64,
    /// Refresh proactively when the access token expires within this window
    pub expiry_skew: Duration,
    /// Directory holding the encrypted token blobs
    pub data_dir: PathBuf,
    /// Hex-encoded 32-byte key; when unset the OS keyring holds the key
    pub encryption_key_hex: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: "https://clerk.curate.is/oauth/token".to_string(),
            client_id: String::new(),
            http_timeout_secs: 10,
            expiry_skew: Duration::from_secs(60),
            data_dir: default_data_dir(),
            encryption_key_hex: None,
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = env_non_empty("CURATE_TOKEN_URL") {
            config.token_url = url;
        }
        if let Some(client_id) = env_non_empty("CURATE_OAUTH_CLIENT_ID") {
            config.client_id = client_id;
        }
        if let Some(dir) = env_non_empty("CURATE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.encryption_key_hex = env_non_empty("CURATE_ENCRYPTION_KEY");
        config
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Per-user application data directory, mirroring the platform conventions.
pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library/Application Support")
                .join(APP_IDENTIFIER);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join(APP_IDENTIFIER);
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if let Some(data_home) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(data_home).join(APP_IDENTIFIER);
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".local/share").join(APP_IDENTIFIER);
        }
    }

    std::env::temp_dir().join(APP_IDENTIFIER)
}
