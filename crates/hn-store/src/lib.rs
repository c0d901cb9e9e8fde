//! hn-store: the per-user encrypted file store
//!
//! Layout on disk (bit-exact with existing stores):
//! ```text
//! <root>/
//! ├── <namespace>/              one dir per identity (32 hex chars)
//! │   ├── notes.md              base64 ciphertext blob
//! │   ├── .notes.md.meta.json   sharing sidecar
//! │   └── ...
//! └── ...
//! ```
//!
//! All operations take the caller's already-authenticated identity
//! string; the namespace is derived from it one-way, so there is no
//! cross-namespace read path at all.

pub mod filename;
pub mod meta;
pub mod namespace;
pub mod registry;
pub mod store;

pub use filename::{is_valid_filename, validate_filename};
pub use meta::MetadataStore;
pub use namespace::{resolve_namespace, NamespaceId};
pub use registry::PublicLinkRegistry;
pub use store::FileStore;
