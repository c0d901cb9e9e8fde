use thiserror::Error;

pub type HnResult<T> = Result<T, HnError>;

/// Error taxonomy shared by every HostNote crate.
///
/// Store operations never leak raw I/O errors: `io::ErrorKind::NotFound`
/// becomes `NotFound` and everything else becomes `Internal` at the
/// operation boundary. `Authentication` (AEAD tag rejection) is a distinct
/// condition from `NotFound` and is never collapsed into it inside the
/// core; only the HTTP boundary may present them identically.
#[derive(Debug, Error)]
pub enum HnError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing or empty identity")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("authentication failed: ciphertext rejected")]
    Authentication,

    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HnError {
    /// Normalize a filesystem error for `path`: missing file becomes
    /// `NotFound`, anything else `Internal` with the path for context.
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            HnError::NotFound(path.display().to_string())
        } else {
            HnError::Internal(format!("{}: {err}", path.display()))
        }
    }
}
