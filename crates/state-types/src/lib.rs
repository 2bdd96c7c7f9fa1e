//! Foundation types for the state server.
//!
//! This crate provides the document and identifier types shared by every
//! other crate in the workspace.
//!
//! # Key Types
//!
//! - [`StateDocument`]: Top-level JSON object a client saves and loads
//! - [`LayerName`]: A layer's `name`, parsed once into plain or directive form
//! - [`LayerAction`]: The `CREATE` / `READ` / `UPDATE` / `DELETE` directives
//! - [`StateId`]: Externally visible handle of a saved document
//! - [`StoredObjectRef`]: A `StateId` paired with its object-store key

pub mod document;
pub mod error;
pub mod id;
pub mod layer;

pub use document::{StateDocument, LAYERS_FIELD};
pub use error::TypeError;
pub use id::{namespaced_key, StateId, StoredObjectRef, MAX_STATE_ID_LEN};
pub use layer::{LayerAction, LayerName, NAME_FIELD};
