//! hn-crypto: At-rest encryption for HostNote files
//!
//! Stored blob format (base64 text on disk, binary layout):
//! ```text
//! [64 bytes: random salt][16 bytes: random nonce][16 bytes: GCM tag][N bytes: ciphertext]
//! ```
//!
//! Key hierarchy (two PBKDF2-HMAC-SHA512 stretches, both stateless):
//! ```text
//! Master Secret (256-bit, externally supplied)
//!   └── User Key  = PBKDF2(master, "hostnote/user-key/v1:" + identity)
//!         └── File Key = PBKDF2(user_key, per-blob random salt)
//! ```
//!
//! Two distinct users get cryptographically independent keys, and every
//! encryption of every file uses a fresh key. Knowing the master secret
//! alone is not enough to decrypt a blob without the owner's identity
//! string and both expensive stretches.

pub mod blob;
pub mod kdf;

pub use blob::{open, seal};
pub use kdf::{derive_file_key, derive_user_key, FileKey, KdfParams, MasterSecret, UserKey};

/// Size of every derived key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the per-blob random KDF salt
pub const SALT_SIZE: usize = 64;

/// Size of the AES-GCM nonce
pub const NONCE_SIZE: usize = 16;

/// Size of the GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Decoded blob header length: salt + nonce + tag
pub const HEADER_SIZE: usize = SALT_SIZE + NONCE_SIZE + TAG_SIZE;
