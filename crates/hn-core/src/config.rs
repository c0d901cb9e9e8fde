use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level daemon configuration (loaded from hostnote.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HnConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub crypto: CryptoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP listen address (default: 127.0.0.1:8700)
    pub listen: String,
    /// Request header carrying the reverse-proxy-asserted identity.
    /// The daemon trusts this header unconditionally; the proxy must
    /// strip it from untrusted traffic.
    pub identity_header: String,
    /// Base URL for composing public share links
    pub public_base_url: String,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root storage directory; one subdirectory per namespace
    pub root: PathBuf,
}

/// Encryption configuration.
///
/// The KDF round counts are not embedded in stored blobs, so they must
/// match the values in effect when a blob was written. Changing them
/// makes existing files undecryptable (surfaced as an authentication
/// failure, same as a rotated master secret).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// File holding the 64-hex-char master secret. The
    /// HOSTNOTE_MASTER_SECRET environment variable takes precedence.
    pub master_secret_file: Option<PathBuf>,
    /// PBKDF2 iterations for the per-user key stretch (default: 100000)
    pub user_kdf_rounds: u32,
    /// PBKDF2 iterations for the per-file key stretch (default: 100000)
    pub file_kdf_rounds: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8700".into(),
            identity_header: "x-forwarded-user".into(),
            public_base_url: "http://127.0.0.1:8700".into(),
            log_level: "info".into(),
            log_format: "text".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/lib/hostnote/files"),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            master_secret_file: None,
            user_kdf_rounds: 100_000,
            file_kdf_rounds: 100_000,
        }
    }
}
