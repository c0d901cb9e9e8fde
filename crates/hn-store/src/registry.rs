//! Public-link registry: token → (identity, filename)
//!
//! An in-memory index over the metadata sidecars. The sidecars are the
//! source of truth; the map is a cache that is rebuilt by scanning them
//! at startup (or on demand) and kept in sync on every mutation. Losing
//! it is always recoverable.

use hn_core::types::{FileMetadata, PublicTarget, ShareGrant};
use hn_core::{HnError, HnResult};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::filename::validate_filename;
use crate::meta::MetadataStore;
use crate::namespace::resolve_namespace;

/// Public token width: 128 bits, hex-encoded.
const TOKEN_LEN: usize = 32;

pub struct PublicLinkRegistry {
    /// All access goes through this single lock; concurrent shares of
    /// different files must not corrupt the map.
    map: RwLock<HashMap<String, PublicTarget>>,
    meta: MetadataStore,
}

impl PublicLinkRegistry {
    pub fn new(meta: MetadataStore) -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            meta,
        }
    }

    /// Reconcile the in-memory map with the sidecars: clear it and
    /// re-insert every `isPublic` record with a token and an owner.
    /// Returns the number of live links.
    pub fn rebuild(&self) -> HnResult<usize> {
        let mut fresh = HashMap::new();
        for (name, meta) in self.meta.scan()? {
            if !meta.is_public || meta.user_id.is_empty() {
                continue;
            }
            let Some(token) = meta.public_id else {
                continue;
            };
            fresh.insert(
                token,
                PublicTarget {
                    user_id: meta.user_id,
                    name,
                },
            );
        }
        let count = fresh.len();
        *self.map.write().expect("registry lock poisoned") = fresh;
        tracing::info!(links = count, "public link registry rebuilt");
        Ok(count)
    }

    /// Mark a file public. Idempotent: an already-public file keeps its
    /// existing token, so outstanding links never break.
    pub fn share(&self, identity: &str, name: &str) -> HnResult<ShareGrant> {
        validate_filename(name)?;
        let ns = resolve_namespace(identity)?;
        if !self.meta.content_path(&ns, name).is_file() {
            return Err(HnError::NotFound(name.to_string()));
        }

        let current = self.meta.get(&ns, name);
        if current.is_public {
            if let Some(token) = current.public_id {
                // Re-insert in case the map and sidecar drifted.
                self.map.write().expect("registry lock poisoned").insert(
                    token.clone(),
                    PublicTarget {
                        user_id: identity.to_string(),
                        name: name.to_string(),
                    },
                );
                return Ok(ShareGrant { public_id: token });
            }
        }

        let token = mint_token();
        self.meta.put(
            &ns,
            name,
            &FileMetadata {
                is_public: true,
                public_id: Some(token.clone()),
                user_id: identity.to_string(),
            },
        )?;
        self.map.write().expect("registry lock poisoned").insert(
            token.clone(),
            PublicTarget {
                user_id: identity.to_string(),
                name: name.to_string(),
            },
        );
        tracing::info!(namespace = %ns, file = %name, "file shared");
        Ok(ShareGrant { public_id: token })
    }

    /// Revoke public access. The in-memory entry goes first so a
    /// concurrent public read sees the link gone as early as possible;
    /// the sidecar write follows.
    pub fn unshare(&self, identity: &str, name: &str) -> HnResult<()> {
        validate_filename(name)?;
        let ns = resolve_namespace(identity)?;
        if !self.meta.content_path(&ns, name).is_file() {
            return Err(HnError::NotFound(name.to_string()));
        }

        let current = self.meta.get(&ns, name);
        if let Some(token) = &current.public_id {
            self.map
                .write()
                .expect("registry lock poisoned")
                .remove(token);
        }
        self.meta.put(
            &ns,
            name,
            &FileMetadata {
                is_public: false,
                public_id: None,
                user_id: identity.to_string(),
            },
        )?;
        tracing::info!(namespace = %ns, file = %name, "file unshared");
        Ok(())
    }

    /// Resolve a public token. Malformed tokens are rejected before the
    /// lookup to keep enumeration attempts cheap.
    pub fn resolve(&self, token: &str) -> HnResult<PublicTarget> {
        if !is_well_formed_token(token) {
            return Err(HnError::NotFound("public link".into()));
        }
        self.map
            .read()
            .expect("registry lock poisoned")
            .get(token)
            .cloned()
            .ok_or_else(|| HnError::NotFound("public link".into()))
    }

    /// Drop a token from the map (file deletion path). The caller is
    /// responsible for the sidecar.
    pub(crate) fn remove_token(&self, token: &str) {
        self.map
            .write()
            .expect("registry lock poisoned")
            .remove(token);
    }

    /// Repoint a token at a renamed file; the token itself is preserved.
    pub(crate) fn retarget(&self, token: &str, new_name: &str) {
        if let Some(target) = self
            .map
            .write()
            .expect("registry lock poisoned")
            .get_mut(token)
        {
            target.name = new_name.to_string();
        }
    }
}

fn mint_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_LEN
        && token
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, PublicLinkRegistry, MetadataStore) {
        let dir = tempfile::tempdir().unwrap();
        let meta = MetadataStore::new(dir.path());
        let registry = PublicLinkRegistry::new(meta.clone());
        (dir, registry, meta)
    }

    /// Drop a content blob on disk so share() sees an existing file.
    fn put_blob(meta: &MetadataStore, identity: &str, name: &str) {
        let ns = resolve_namespace(identity).unwrap();
        std::fs::create_dir_all(meta.root().join(ns.as_str())).unwrap();
        std::fs::write(meta.content_path(&ns, name), b"blob").unwrap();
    }

    #[test]
    fn test_token_shape() {
        let token = mint_token();
        assert_eq!(token.len(), 32);
        assert!(is_well_formed_token(&token));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let (_dir, registry, _meta) = setup();
        for token in ["", "short", "GG".repeat(16).as_str(), "x".repeat(32).as_str()] {
            assert!(
                matches!(registry.resolve(token), Err(HnError::NotFound(_))),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_share_resolve_unshare() {
        let (_dir, registry, meta) = setup();
        put_blob(&meta, "alice", "notes.md");

        let grant = registry.share("alice", "notes.md").unwrap();
        let target = registry.resolve(&grant.public_id).unwrap();
        assert_eq!(target.user_id, "alice");
        assert_eq!(target.name, "notes.md");

        registry.unshare("alice", "notes.md").unwrap();
        assert!(matches!(
            registry.resolve(&grant.public_id),
            Err(HnError::NotFound(_))
        ));
        // And the sidecar agrees.
        let ns = resolve_namespace("alice").unwrap();
        let sidecar = meta.get(&ns, "notes.md");
        assert!(!sidecar.is_public);
        assert!(sidecar.public_id.is_none());
    }

    #[test]
    fn test_share_is_idempotent() {
        let (_dir, registry, meta) = setup();
        put_blob(&meta, "alice", "notes.md");

        let first = registry.share("alice", "notes.md").unwrap();
        let second = registry.share("alice", "notes.md").unwrap();
        assert_eq!(first.public_id, second.public_id);
    }

    #[test]
    fn test_share_missing_file() {
        let (_dir, registry, _meta) = setup();
        assert!(matches!(
            registry.share("alice", "ghost.md"),
            Err(HnError::NotFound(_))
        ));
    }

    #[test]
    fn test_share_invalid_name() {
        let (_dir, registry, _meta) = setup();
        assert!(matches!(
            registry.share("alice", "../etc/passwd"),
            Err(HnError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rebuild_recovers_after_restart() {
        let (_dir, registry, meta) = setup();
        put_blob(&meta, "alice", "notes.md");
        let grant = registry.share("alice", "notes.md").unwrap();

        // Simulate a restart: a fresh registry over the same sidecars.
        let fresh = PublicLinkRegistry::new(meta.clone());
        assert!(matches!(
            fresh.resolve(&grant.public_id),
            Err(HnError::NotFound(_))
        ));
        assert_eq!(fresh.rebuild().unwrap(), 1);

        let target = fresh.resolve(&grant.public_id).unwrap();
        assert_eq!(target.user_id, "alice");
        assert_eq!(target.name, "notes.md");
    }

    #[test]
    fn test_rebuild_skips_non_public_and_corrupt() {
        let (_dir, registry, meta) = setup();
        put_blob(&meta, "alice", "private.md");
        put_blob(&meta, "alice", "public.md");
        registry.share("alice", "public.md").unwrap();

        let ns = resolve_namespace("alice").unwrap();
        std::fs::write(meta.sidecar_path(&ns, "junk.md"), b"]]]").unwrap();

        assert_eq!(registry.rebuild().unwrap(), 1);
    }
}
