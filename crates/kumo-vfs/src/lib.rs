//! # kumo-vfs
//!
//! In-memory virtual filesystem engine.
//!
//! Key components:
//!
//! - [`MountPoint`] - Owns the node tree; every mutation is a method on it
//! - [`VirtualFile`] - Borrowed read-only view of one file or folder
//! - [`Path`] - Normalized, slash-separated path value
//! - [`Searcher`] / [`SearcherProvider`] - Best-effort index notifications
//! - [`VfsConfig`] - Lock, archive and index settings loaded from TOML
//!
//! ## Design Decisions
//!
//! - **Arena, not pointers**: Nodes live in one `Vec` and are addressed by
//!   [`NodeId`]. A folder owns its child map; `parent` is a plain index.
//! - **Tombstones**: Deleted nodes stay in the arena with `exists == false`
//!   and reject every further operation with [`VfsError::Removed`].
//! - **Single writer**: Mutations take `&mut MountPoint`. Share a mount
//!   through [`SharedMountPoint`].
//! - **Check, then mutate**: Lock scans, cycle checks and archive validation
//!   finish before the first change, so errors have no side effects.

mod archive;
mod config;
mod error;
mod lock;
mod mount;
mod node;
mod ops;
mod path;
mod search;
mod types;

pub use config::{ArchiveConfig, Compression, ConfigError, IndexConfig, LockConfig, VfsConfig};
pub use error::{ErrorKind, VfsError, VfsResult};
pub use lock::LockHolder;
pub use mount::{MountPoint, SharedMountPoint, shared_mount_point};
pub use node::{NodeId, VirtualFile};
pub use path::{Path, SEPARATOR};
pub use search::{FixedSearcherProvider, Searcher, SearcherError, SearcherProvider};
pub use types::{DEFAULT_MEDIA_TYPE, NodeType, Property, guess_media_type};
