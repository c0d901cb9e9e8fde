//! Key derivation: master secret → per-user key → per-file key
//!
//! Both stretches are PBKDF2-HMAC-SHA512 with a high iteration count, so
//! deriving any specific user's key is deliberately expensive even for a
//! holder of the master secret.

use hn_core::{HnError, HnResult};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use zeroize::Zeroize;

use crate::{KEY_SIZE, SALT_SIZE};

/// Domain prefix for the user-key stretch. Part of the on-disk format:
/// changing it makes every existing blob undecryptable.
const USER_KEY_DOMAIN: &str = "hostnote/user-key/v1:";

/// The process-wide 256-bit master secret. Zeroized on drop.
#[derive(Clone)]
pub struct MasterSecret {
    bytes: [u8; KEY_SIZE],
}

impl MasterSecret {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Parse the externally supplied secret: exactly 64 hex characters.
    pub fn from_hex(hex_str: &SecretString) -> HnResult<Self> {
        let raw = hex_str.expose_secret().trim();
        if raw.len() != KEY_SIZE * 2 {
            return Err(HnError::Config(format!(
                "master secret must be {} hex chars, got {}",
                KEY_SIZE * 2,
                raw.len()
            )));
        }
        let mut decoded = hex::decode(raw)
            .map_err(|e| HnError::Config(format!("master secret is not valid hex: {e}")))?;
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MasterSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A per-identity 256-bit key. Zeroized on drop.
#[derive(Clone)]
pub struct UserKey {
    bytes: [u8; KEY_SIZE],
}

impl UserKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for UserKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A per-blob 256-bit key, derived fresh for every seal/open.
pub struct FileKey {
    bytes: [u8; KEY_SIZE],
}

impl FileKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for FileKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// PBKDF2 iteration counts for the two stretches.
///
/// Not embedded in stored blobs; must match the values in effect when a
/// blob was written.
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Iterations for master secret → user key (default: 100000)
    pub user_rounds: u32,
    /// Iterations for user key → file key (default: 100000)
    pub file_rounds: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            user_rounds: 100_000,
            file_rounds: 100_000,
        }
    }
}

/// Derive the 256-bit key for one identity from the master secret.
///
/// Deterministic: the same identity always yields the same key. The
/// identity string is embedded in the PBKDF2 salt under a fixed domain
/// prefix, so distinct identities get independent keys.
pub fn derive_user_key(master: &MasterSecret, identity: &str, params: &KdfParams) -> UserKey {
    let salt = format!("{USER_KEY_DOMAIN}{identity}");
    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha512>(
        master.as_bytes(),
        salt.as_bytes(),
        params.user_rounds,
        &mut bytes,
    );
    UserKey { bytes }
}

/// Derive a per-blob key from the user key and a random 64-byte salt.
///
/// The salt is generated fresh for every encryption and stored in the
/// blob header, so re-encrypting the same plaintext never reuses a key.
pub fn derive_file_key(user_key: &UserKey, salt: &[u8; SALT_SIZE], params: &KdfParams) -> FileKey {
    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha512>(user_key.as_bytes(), salt, params.file_rounds, &mut bytes);
    FileKey { bytes }
}
