//! State persistence pipeline.
//!
//! Saving a state document runs it through the [`LayerProcessor`] (which
//! applies layer directives against the layer store), encodes it with the
//! payload codec, allocates a fresh identifier with the [`IdAllocator`] and
//! writes it. Loading reverses the read side only.
//!
//! # Architecture
//!
//! ```text
//! save:  bytes -> StateDocument -> LayerProcessor -> PayloadCodec -> IdAllocator -> put
//! load:  id -> get -> PayloadCodec -> StateDocument
//! ```
//!
//! All store calls go through a timeout-bounded wrapper; configuration is
//! passed in as a [`PipelineConfig`] value.

pub mod allocator;
pub mod config;
pub mod error;
pub mod layers;
pub mod pipeline;

pub use allocator::{IdAllocator, IdStrategy, ID_SPACE_HIGH, ID_SPACE_LOW};
pub use config::PipelineConfig;
pub use error::{AllocationError, ConfigError, PipelineError, PipelineResult};
pub use layers::{LayerError, LayerOutcome, LayerProcessor, LayerReport, LayerStatus};
pub use pipeline::{public_reference, LoadedState, SaveReceipt, StatePipeline, JSON_ENDPOINT};
