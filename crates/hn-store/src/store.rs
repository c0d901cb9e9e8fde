//! Encrypted CRUD over one identity's namespace
//!
//! Every operation resolves the namespace from the caller-supplied,
//! already-authenticated identity, validates the filename before any
//! path is constructed, and passes contents through the hn-crypto blob
//! format. Writes go to a temp file and rename into place, so a write
//! either fully replaces the file or fails before touching it.

use hn_core::types::FileEntry;
use hn_core::{HnError, HnResult};
use hn_crypto::{derive_user_key, KdfParams, MasterSecret};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use crate::filename::validate_filename;
use crate::meta::MetadataStore;
use crate::namespace::resolve_namespace;
use crate::registry::PublicLinkRegistry;

/// Maximum plaintext size accepted by `write` (5 MiB).
pub const MAX_PLAINTEXT: usize = 5 * 1024 * 1024;

const TMP_SUFFIX: &str = ".tmp";

pub struct FileStore {
    master: MasterSecret,
    kdf: KdfParams,
    meta: MetadataStore,
    registry: Arc<PublicLinkRegistry>,
}

impl FileStore {
    pub fn new(
        root: impl Into<PathBuf>,
        master: MasterSecret,
        kdf: KdfParams,
        registry: Arc<PublicLinkRegistry>,
    ) -> Self {
        Self {
            master,
            kdf,
            meta: MetadataStore::new(root),
            registry,
        }
    }

    /// Enumerate the caller's files with their sharing state, sorted by
    /// name. A namespace that does not exist yet is an empty store, not
    /// an error. Sidecars (dot-prefixed) are excluded.
    pub fn list(&self, identity: &str) -> HnResult<Vec<FileEntry>> {
        let ns = resolve_namespace(identity)?;
        let dir = self.meta.root().join(ns.as_str());
        let entries = match std::fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HnError::from_io(&dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let Ok(fs_meta) = entry.metadata() else {
                continue;
            };
            if !fs_meta.is_file() {
                continue;
            }
            let modified_ms = fs_meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            let sharing = self.meta.get(&ns, name);
            files.push(FileEntry {
                name: name.to_string(),
                size: fs_meta.len(),
                modified_ms,
                is_public: sharing.is_public,
                public_id: sharing.public_id,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Read and decrypt one file. Missing file is `NotFound`; a blob
    /// that fails tag verification is `Authentication` (tampered store
    /// or rotated master secret), never silently returned.
    pub fn read(&self, identity: &str, name: &str) -> HnResult<Vec<u8>> {
        validate_filename(name)?;
        let ns = resolve_namespace(identity)?;
        let path = self.meta.content_path(&ns, name);
        let raw = std::fs::read(&path).map_err(|e| HnError::from_io(&path, e))?;
        // A blob is base64 text; anything non-UTF-8 on disk is
        // corruption and fails the same way a bad tag does.
        let blob = String::from_utf8(raw).map_err(|_| HnError::Authentication)?;
        let user_key = derive_user_key(&self.master, identity, &self.kdf);
        hn_crypto::open(&user_key, &blob, &self.kdf)
    }

    /// Encrypt and persist, fully replacing any prior content. Creates
    /// the namespace directory on first use.
    pub fn write(&self, identity: &str, name: &str, plaintext: &[u8]) -> HnResult<()> {
        validate_filename(name)?;
        if plaintext.len() > MAX_PLAINTEXT {
            return Err(HnError::InvalidInput(format!(
                "content exceeds {MAX_PLAINTEXT} bytes"
            )));
        }
        let ns = resolve_namespace(identity)?;
        let dir = self.meta.root().join(ns.as_str());
        std::fs::create_dir_all(&dir).map_err(|e| HnError::from_io(&dir, e))?;

        let user_key = derive_user_key(&self.master, identity, &self.kdf);
        let blob = hn_crypto::seal(&user_key, plaintext, &self.kdf)?;

        // Write-then-rename: the old content stays intact until the new
        // blob is fully on disk. The dot prefix keeps the temp file out
        // of list() and out of the user-reachable namespace.
        let tmp = dir.join(format!(".{name}{TMP_SUFFIX}"));
        let path = self.meta.content_path(&ns, name);
        std::fs::write(&tmp, blob.as_bytes()).map_err(|e| HnError::from_io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| HnError::from_io(&path, e))?;

        tracing::info!(namespace = %ns, file = %name, bytes = plaintext.len(), "file written");
        Ok(())
    }

    /// Remove temp files left behind by a write interrupted between
    /// the temp write and the rename. Run once at startup; returns the
    /// number removed.
    pub fn sweep_temp_files(&self) -> usize {
        let mut removed = 0;
        let Ok(namespaces) = std::fs::read_dir(self.meta.root()) else {
            return 0;
        };
        for ns_entry in namespaces.flatten() {
            if !ns_entry.path().is_dir() {
                continue;
            }
            let Ok(files) = std::fs::read_dir(ns_entry.path()) else {
                continue;
            };
            for entry in files.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                if !name.starts_with('.') || !name.ends_with(TMP_SUFFIX) {
                    continue;
                }
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), "temp file removal failed: {e}");
                    }
                }
            }
        }
        if removed > 0 {
            tracing::info!(count = removed, "orphaned temp files removed");
        }
        removed
    }

    /// Delete a file and its sidecar. If the file is public, the
    /// registry entry is removed before the unlink so no dangling link
    /// can resolve afterwards. Deleting a nonexistent file is
    /// `NotFound`; a missing sidecar is tolerated.
    pub fn delete(&self, identity: &str, name: &str) -> HnResult<()> {
        validate_filename(name)?;
        let ns = resolve_namespace(identity)?;
        let path = self.meta.content_path(&ns, name);
        if !path.is_file() {
            return Err(HnError::NotFound(name.to_string()));
        }

        let sharing = self.meta.get(&ns, name);
        if let Some(token) = &sharing.public_id {
            self.registry.remove_token(token);
        }
        std::fs::remove_file(&path).map_err(|e| HnError::from_io(&path, e))?;
        self.meta.remove(&ns, name);

        tracing::info!(namespace = %ns, file = %name, "file deleted");
        Ok(())
    }

    /// Rename a file and its sidecar. If the file is public, the
    /// registry entry is repointed at the new name; the token is
    /// preserved so outstanding links keep working.
    pub fn rename(&self, identity: &str, old: &str, new: &str) -> HnResult<()> {
        validate_filename(old)?;
        validate_filename(new)?;
        let ns = resolve_namespace(identity)?;
        let from = self.meta.content_path(&ns, old);
        if !from.is_file() {
            return Err(HnError::NotFound(old.to_string()));
        }
        let to = self.meta.content_path(&ns, new);
        if to.exists() {
            return Err(HnError::Conflict(new.to_string()));
        }

        std::fs::rename(&from, &to).map_err(|e| HnError::from_io(&from, e))?;
        self.meta.rename(&ns, old, new)?;

        let sharing = self.meta.get(&ns, new);
        if sharing.is_public {
            if let Some(token) = &sharing.public_id {
                self.registry.retarget(token, new);
            }
        }

        tracing::info!(namespace = %ns, from = %old, to = %new, "file renamed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_crypto::KEY_SIZE;

    fn fast_kdf() -> KdfParams {
        KdfParams {
            user_rounds: 2,
            file_rounds: 2,
        }
    }

    fn setup() -> (tempfile::TempDir, FileStore, Arc<PublicLinkRegistry>) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(PublicLinkRegistry::new(MetadataStore::new(dir.path())));
        let store = FileStore::new(
            dir.path(),
            MasterSecret::from_bytes([3u8; KEY_SIZE]),
            fast_kdf(),
            registry.clone(),
        );
        (dir, store, registry)
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (_dir, store, _reg) = setup();
        store.write("alice", "hello.txt", b"hi").unwrap();
        assert_eq!(store.read("alice", "hello.txt").unwrap(), b"hi");
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let (_dir, store, _reg) = setup();
        store.write("alice", "hello.txt", b"hi").unwrap();

        // Bob has no such file in his own namespace, and no operation
        // can reach into alice's.
        assert!(matches!(
            store.read("bob", "hello.txt"),
            Err(HnError::NotFound(_))
        ));
        assert!(store.list("bob").unwrap().is_empty());
    }

    #[test]
    fn test_write_replaces_content() {
        let (_dir, store, _reg) = setup();
        store.write("alice", "note.md", b"first").unwrap();
        store.write("alice", "note.md", b"second").unwrap();
        assert_eq!(store.read("alice", "note.md").unwrap(), b"second");
    }

    #[test]
    fn test_list_excludes_sidecars_and_sorts() {
        let (_dir, store, reg) = setup();
        store.write("alice", "b.txt", b"b").unwrap();
        store.write("alice", "a.txt", b"a").unwrap();
        reg.share("alice", "a.txt").unwrap();

        let entries = store.list("alice").unwrap();
        assert_eq!(entries.len(), 2, "sidecar must not appear in listing");
        assert_eq!(entries[0].name, "a.txt");
        assert!(entries[0].is_public);
        assert!(entries[0].public_id.is_some());
        assert_eq!(entries[1].name, "b.txt");
        assert!(!entries[1].is_public);
    }

    #[test]
    fn test_list_missing_namespace_is_empty() {
        let (_dir, store, _reg) = setup();
        assert!(store.list("nobody-yet").unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, store, _reg) = setup();
        assert!(matches!(
            store.read("alice", "ghost.txt"),
            Err(HnError::NotFound(_))
        ));
    }

    #[test]
    fn test_read_tampered_is_authentication() {
        let (dir, store, _reg) = setup();
        store.write("alice", "note.md", b"secret").unwrap();

        let ns = resolve_namespace("alice").unwrap();
        let path = dir.path().join(ns.as_str()).join("note.md");
        let mut blob = std::fs::read_to_string(&path).unwrap();
        blob.truncate(blob.len() - 4);
        std::fs::write(&path, blob).unwrap();

        assert!(matches!(
            store.read("alice", "note.md"),
            Err(HnError::Authentication)
        ));
    }

    #[test]
    fn test_read_bit_flipped_is_authentication() {
        let (dir, store, _reg) = setup();
        store.write("alice", "note.md", b"secret").unwrap();

        // Setting the high bit takes the base64 text out of UTF-8
        // entirely; that must still read as tampering, not an I/O
        // failure.
        let ns = resolve_namespace("alice").unwrap();
        let path = dir.path().join(ns.as_str()).join("note.md");
        let mut raw = std::fs::read(&path).unwrap();
        raw[0] |= 0x80;
        std::fs::write(&path, raw).unwrap();

        assert!(matches!(
            store.read("alice", "note.md"),
            Err(HnError::Authentication)
        ));
    }

    #[test]
    fn test_sweep_removes_orphan_temp_files() {
        let (dir, store, _reg) = setup();
        store.write("alice", "note.md", b"kept").unwrap();

        let ns = resolve_namespace("alice").unwrap();
        let ns_dir = dir.path().join(ns.as_str());
        let orphan = ns_dir.join(".draft.md.tmp");
        std::fs::write(&orphan, b"half-written blob").unwrap();

        assert_eq!(store.sweep_temp_files(), 1);
        assert!(!orphan.exists());
        assert_eq!(store.read("alice", "note.md").unwrap(), b"kept");
        // Sweeping again finds nothing, and intact files survive.
        assert_eq!(store.sweep_temp_files(), 0);
    }

    #[test]
    fn test_sweep_keeps_sidecars() {
        let (dir, store, reg) = setup();
        store.write("alice", "note.md", b"kept").unwrap();
        reg.share("alice", "note.md").unwrap();

        assert_eq!(store.sweep_temp_files(), 0);
        let ns = resolve_namespace("alice").unwrap();
        let listed = store.list("alice").unwrap();
        assert!(listed[0].is_public);
        assert!(dir
            .path()
            .join(ns.as_str())
            .join(".note.md.meta.json")
            .exists());
    }

    #[test]
    fn test_oversized_write_rejected() {
        let (dir, store, _reg) = setup();
        let big = vec![0u8; MAX_PLAINTEXT + 1];
        assert!(matches!(
            store.write("alice", "big.bin", &big),
            Err(HnError::InvalidInput(_))
        ));
        // Rejected before touching storage.
        let ns = resolve_namespace("alice").unwrap();
        assert!(!dir.path().join(ns.as_str()).join("big.bin").exists());
    }

    #[test]
    fn test_invalid_names_rejected_everywhere() {
        let (_dir, store, _reg) = setup();
        for name in ["../up.txt", ".hidden", "a/b", ""] {
            assert!(matches!(
                store.write("alice", name, b"x"),
                Err(HnError::InvalidInput(_))
            ));
            assert!(matches!(
                store.read("alice", name),
                Err(HnError::InvalidInput(_))
            ));
            assert!(matches!(
                store.delete("alice", name),
                Err(HnError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (_dir, store, _reg) = setup();
        assert!(matches!(
            store.delete("alice", "ghost.txt"),
            Err(HnError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_cleans_registry_and_files() {
        let (dir, store, reg) = setup();
        store.write("alice", "shared.md", b"content").unwrap();
        let grant = reg.share("alice", "shared.md").unwrap();

        store.delete("alice", "shared.md").unwrap();

        assert!(matches!(
            reg.resolve(&grant.public_id),
            Err(HnError::NotFound(_))
        ));
        let ns = resolve_namespace("alice").unwrap();
        assert!(!dir.path().join(ns.as_str()).join("shared.md").exists());
        assert!(!dir
            .path()
            .join(ns.as_str())
            .join(".shared.md.meta.json")
            .exists());
    }

    #[test]
    fn test_rename_basic() {
        let (_dir, store, _reg) = setup();
        store.write("alice", "old.md", b"content").unwrap();
        store.rename("alice", "old.md", "new.md").unwrap();

        assert_eq!(store.read("alice", "new.md").unwrap(), b"content");
        assert!(matches!(
            store.read("alice", "old.md"),
            Err(HnError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_conflict() {
        let (_dir, store, _reg) = setup();
        store.write("alice", "a.md", b"a").unwrap();
        store.write("alice", "b.md", b"b").unwrap();
        assert!(matches!(
            store.rename("alice", "a.md", "b.md"),
            Err(HnError::Conflict(_))
        ));
    }

    #[test]
    fn test_rename_missing_source() {
        let (_dir, store, _reg) = setup();
        assert!(matches!(
            store.rename("alice", "ghost.md", "new.md"),
            Err(HnError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_preserves_sharing() {
        let (_dir, store, reg) = setup();
        store.write("alice", "old.md", b"content").unwrap();
        let grant = reg.share("alice", "old.md").unwrap();

        store.rename("alice", "old.md", "new.md").unwrap();

        let target = reg.resolve(&grant.public_id).unwrap();
        assert_eq!(target.name, "new.md", "token must follow the rename");
        assert_eq!(target.user_id, "alice");

        // The sidecar moved too, so a rebuild agrees with the live map.
        reg.rebuild().unwrap();
        let target = reg.resolve(&grant.public_id).unwrap();
        assert_eq!(target.name, "new.md");
    }

    #[test]
    fn test_end_to_end_share_read_cycle() {
        let (_dir, store, reg) = setup();
        store.write("alice", "hello.txt", b"hi").unwrap();
        let grant = reg.share("alice", "hello.txt").unwrap();

        // A public read goes token → target → owner-scoped read.
        let target = reg.resolve(&grant.public_id).unwrap();
        let content = store.read(&target.user_id, &target.name).unwrap();
        assert_eq!(content, b"hi");
    }

    #[test]
    fn test_empty_identity_rejected() {
        let (_dir, store, _reg) = setup();
        assert!(matches!(
            store.write("", "a.txt", b"x"),
            Err(HnError::Unauthorized)
        ));
        assert!(matches!(store.list(""), Err(HnError::Unauthorized)));
    }
}
