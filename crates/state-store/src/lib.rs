//! Object storage backends for the state server.
//!
//! The rest of the workspace talks to blob storage only through the
//! [`ObjectStore`] trait: put, get and exists by `(bucket, key)`. Buckets are
//! plain strings supplied by configuration.
//!
//! # Storage Backends
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`LocalObjectStore`] -- one directory per bucket on local disk
//! - [`TimeoutObjectStore`] -- decorator bounding every call by a deadline
//!
//! # Design Rules
//!
//! 1. The store never interprets object contents -- it is a pure key-value store.
//! 2. A missing object is the distinguished [`StoreError::NotFound`].
//! 3. No backend holds a lock across an await point.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod local;
pub mod memory;
pub mod timeout;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;
pub use timeout::{TimeoutObjectStore, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT};
pub use traits::ObjectStore;
