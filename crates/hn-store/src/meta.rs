//! Sidecar metadata: one small JSON record per stored file
//!
//! Sharing state is best-effort by policy: a missing, unreadable, or
//! corrupt sidecar reads as "not shared" rather than an error.

use hn_core::types::FileMetadata;
use hn_core::{HnError, HnResult};
use std::path::{Path, PathBuf};

use crate::namespace::NamespaceId;

const SIDECAR_SUFFIX: &str = ".meta.json";

/// Sidecar name for a content file: `.{name}.meta.json`. Valid content
/// names cannot start with a dot, so this can never collide with one.
pub(crate) fn sidecar_name(name: &str) -> String {
    format!(".{name}{SIDECAR_SUFFIX}")
}

/// Inverse of `sidecar_name`; `None` for anything that is not a sidecar.
pub(crate) fn content_name(sidecar: &str) -> Option<&str> {
    sidecar.strip_prefix('.')?.strip_suffix(SIDECAR_SUFFIX)
}

#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn content_path(&self, ns: &NamespaceId, name: &str) -> PathBuf {
        self.root.join(ns.as_str()).join(name)
    }

    pub fn sidecar_path(&self, ns: &NamespaceId, name: &str) -> PathBuf {
        self.root.join(ns.as_str()).join(sidecar_name(name))
    }

    /// Read the sidecar for a file. Any failure — absent file, I/O
    /// error, corrupt JSON — reads as the default (not shared).
    pub fn get(&self, ns: &NamespaceId, name: &str) -> FileMetadata {
        let path = self.sidecar_path(ns, name);
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::debug!(path = %path.display(), "corrupt sidecar ignored: {e}");
                FileMetadata::default()
            }),
            Err(_) => FileMetadata::default(),
        }
    }

    /// Write the sidecar, overwriting any prior content. Creates the
    /// namespace directory if needed.
    pub fn put(&self, ns: &NamespaceId, name: &str, meta: &FileMetadata) -> HnResult<()> {
        let dir = self.root.join(ns.as_str());
        std::fs::create_dir_all(&dir).map_err(|e| HnError::from_io(&dir, e))?;
        let path = self.sidecar_path(ns, name);
        let json = serde_json::to_vec(meta)
            .map_err(|e| HnError::Internal(format!("serializing sidecar: {e}")))?;
        std::fs::write(&path, json).map_err(|e| HnError::from_io(&path, e))
    }

    /// Remove the sidecar. A missing sidecar is tolerated silently.
    pub fn remove(&self, ns: &NamespaceId, name: &str) {
        let path = self.sidecar_path(ns, name);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), "sidecar removal failed: {e}");
            }
        }
    }

    /// Move the sidecar alongside a content rename; a missing sidecar
    /// (never-shared file) is not an error.
    pub fn rename(&self, ns: &NamespaceId, old: &str, new: &str) -> HnResult<()> {
        let from = self.sidecar_path(ns, old);
        if !from.exists() {
            return Ok(());
        }
        let to = self.sidecar_path(ns, new);
        std::fs::rename(&from, &to).map_err(|e| HnError::from_io(&from, e))
    }

    /// Walk every namespace directory and yield each parseable sidecar
    /// as `(content filename, metadata)`. Corrupt or unreadable entries
    /// are skipped; a missing root is an empty store.
    pub fn scan(&self) -> HnResult<Vec<(String, FileMetadata)>> {
        let mut records = Vec::new();
        let namespaces = match std::fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(HnError::from_io(&self.root, e)),
        };
        for ns_entry in namespaces.flatten() {
            if !ns_entry.path().is_dir() {
                continue;
            }
            let files = match std::fs::read_dir(ns_entry.path()) {
                Ok(rd) => rd,
                Err(e) => {
                    tracing::warn!(dir = %ns_entry.path().display(), "skipping namespace: {e}");
                    continue;
                }
            };
            for entry in files.flatten() {
                let file_name = entry.file_name();
                let Some(sidecar) = file_name.to_str() else {
                    continue;
                };
                let Some(name) = content_name(sidecar) else {
                    continue;
                };
                match std::fs::read(entry.path()) {
                    Ok(bytes) => match serde_json::from_slice::<FileMetadata>(&bytes) {
                        Ok(meta) => records.push((name.to_string(), meta)),
                        Err(e) => {
                            tracing::debug!(path = %entry.path().display(), "corrupt sidecar skipped: {e}");
                        }
                    },
                    Err(e) => {
                        tracing::debug!(path = %entry.path().display(), "unreadable sidecar skipped: {e}");
                    }
                }
            }
        }
        Ok(records)
    }
}
