//! Identity → namespace directory derivation

use hn_core::{HnError, HnResult};
use sha2::{Digest, Sha256};

/// A namespace directory name: SHA-256 of the identity string truncated
/// to 128 bits, lowercase hex. One-way — nothing about the identity is
/// recoverable from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceId(String);

impl NamespaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the namespace for an identity. Deterministic; an empty or
/// whitespace-only identity is rejected as `Unauthorized` (the caller
/// was supposed to authenticate upstream).
pub fn resolve_namespace(identity: &str) -> HnResult<NamespaceId> {
    if identity.trim().is_empty() {
        return Err(HnError::Unauthorized);
    }
    let digest = Sha256::digest(identity.as_bytes());
    Ok(NamespaceId(hex::encode(&digest[..16])))
}
