//! Payload codec for stored state documents.
//!
//! Every payload written to the object store passes through
//! [`PayloadCodec::encode`]: zstd compression, an optional attribution frame
//! carrying the originating user, and base64 wrapping for text-oriented
//! transports. [`PayloadCodec::decode`] reverses the transform and tolerates
//! payloads that were stored without the base64 layer.

pub mod codec;
pub mod error;
pub mod frame;

pub use codec::{CodecConfig, Decoded, PayloadCodec, DEFAULT_COMPRESSION_LEVEL};
pub use error::{CodecError, CodecResult};
pub use frame::{ATTRIBUTION_MAGIC, MAX_ATTRIBUTION_LEN};
