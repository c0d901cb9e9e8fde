//! Authenticated encryption of file contents
//!
//! Decoded blob layout (fixed offsets, part of the on-disk format):
//! ```text
//! [0..64   salt]  per-blob PBKDF2 salt
//! [64..80  nonce] AES-GCM nonce
//! [80..96  tag]   GCM authentication tag
//! [96..    ct]    ciphertext, same length as the plaintext
//! ```
//! The whole concatenation is base64-encoded before it touches disk.

use aes_gcm::{
    aead::{
        generic_array::{typenum::U16, GenericArray},
        Aead, KeyInit,
    },
    aes::Aes256,
    AesGcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hn_core::{HnError, HnResult};
use rand::RngCore;

use crate::kdf::{derive_file_key, KdfParams, UserKey};
use crate::{HEADER_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// AES-256-GCM with a 16-byte nonce (the format the store has always used;
/// the usual 12-byte nonce would change the fixed offsets).
type ContentCipher = AesGcm<Aes256, U16>;

/// Encrypt `plaintext` under a fresh per-blob key derived from `user_key`.
///
/// Generates a random salt and nonce, stretches the user key with the
/// salt, and returns the base64-encoded `salt || nonce || tag || ct`.
pub fn seal(user_key: &UserKey, plaintext: &[u8], params: &KdfParams) -> HnResult<String> {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let file_key = derive_file_key(user_key, &salt, params);
    let cipher = ContentCipher::new(file_key.as_bytes().into());
    let nonce = GenericArray::from_slice(&nonce_bytes);

    // aes-gcm appends the tag to the ciphertext; the blob layout wants it
    // between the nonce and the ciphertext.
    let sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| HnError::Internal("AEAD encryption failed".into()))?;
    let ct_len = sealed.len() - TAG_SIZE;

    let mut blob = Vec::with_capacity(HEADER_SIZE + ct_len);
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&sealed[ct_len..]);
    blob.extend_from_slice(&sealed[..ct_len]);

    Ok(BASE64.encode(blob))
}

/// Decrypt a stored blob for the owner of `user_key`.
///
/// Re-derives the per-blob key from the embedded salt and verifies the
/// GCM tag before returning any plaintext. Every failure mode — bad
/// base64, truncated header, tag mismatch — is `Authentication`: a blob
/// that does not verify is tampered (or sealed under a different key),
/// and no partial plaintext ever escapes.
pub fn open(user_key: &UserKey, blob: &str, params: &KdfParams) -> HnResult<Vec<u8>> {
    let decoded = BASE64
        .decode(blob.trim())
        .map_err(|_| HnError::Authentication)?;
    if decoded.len() < HEADER_SIZE {
        return Err(HnError::Authentication);
    }

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&decoded[..SALT_SIZE]);
    let nonce = GenericArray::from_slice(&decoded[SALT_SIZE..SALT_SIZE + NONCE_SIZE]);
    let tag = &decoded[SALT_SIZE + NONCE_SIZE..HEADER_SIZE];
    let ct = &decoded[HEADER_SIZE..];

    let file_key = derive_file_key(user_key, &salt, params);
    let cipher = ContentCipher::new(file_key.as_bytes().into());

    // Reassemble ct || tag, the order aes-gcm expects.
    let mut sealed = Vec::with_capacity(ct.len() + TAG_SIZE);
    sealed.extend_from_slice(ct);
    sealed.extend_from_slice(tag);

    cipher
        .decrypt(nonce, sealed.as_ref())
        .map_err(|_| HnError::Authentication)
}
