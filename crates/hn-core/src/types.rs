use serde::{Deserialize, Serialize};

/// One row of a directory listing: a stored file joined with its
/// sharing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    /// On-disk size of the ciphertext blob in bytes.
    pub size: u64,
    /// Modification time, unix epoch milliseconds.
    pub modified_ms: i64,
    pub is_public: bool,
    pub public_id: Option<String>,
}

/// Sidecar record tracking a file's sharing state.
///
/// Persisted as `.{name}.meta.json` next to the content file. The JSON
/// key names (`isPublic`, `publicId`, `userId`) are part of the on-disk
/// format and must not change. An absent or unreadable sidecar is
/// equivalent to the default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub is_public: bool,
    pub public_id: Option<String>,
    /// Owning identity string, stored so the public-link registry can be
    /// rebuilt from sidecars alone after a restart.
    pub user_id: String,
}

/// What a public link token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicTarget {
    pub user_id: String,
    pub name: String,
}

/// Result of sharing a file. The daemon composes the public URL from
/// its configured base; the core only knows the token.
#[derive(Debug, Clone)]
pub struct ShareGrant {
    pub public_id: String,
}
