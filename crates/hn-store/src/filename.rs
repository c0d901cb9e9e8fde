//! Filename validation — the primary defense against path traversal
//!
//! Accepted names match `^[A-Za-z0-9][A-Za-z0-9._-]*$`, at most 255
//! bytes, with no `..` anywhere. Validation runs before any path is
//! built from user input. Because a leading dot is rejected, the
//! sidecar naming convention (`.{name}.meta.json`) is unreachable by
//! user-chosen names.

use hn_core::{HnError, HnResult};

pub const MAX_FILENAME_LEN: usize = 255;

pub fn validate_filename(name: &str) -> HnResult<()> {
    if name.is_empty() {
        return Err(HnError::InvalidInput("empty filename".into()));
    }
    if name.len() > MAX_FILENAME_LEN {
        return Err(HnError::InvalidInput(format!(
            "filename longer than {MAX_FILENAME_LEN} bytes"
        )));
    }
    // The charset below would already reject separators; the explicit
    // checks keep traversal rejection independent of the charset rule.
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(HnError::InvalidInput(format!(
            "filename contains a path sequence: {name:?}"
        )));
    }
    let bytes = name.as_bytes();
    if !bytes[0].is_ascii_alphanumeric() {
        return Err(HnError::InvalidInput(format!(
            "filename must start with a letter or digit: {name:?}"
        )));
    }
    for &b in &bytes[1..] {
        if !(b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-') {
            return Err(HnError::InvalidInput(format!(
                "filename contains an invalid character: {name:?}"
            )));
        }
    }
    Ok(())
}

pub fn is_valid_filename(name: &str) -> bool {
    validate_filename(name).is_ok()
}
