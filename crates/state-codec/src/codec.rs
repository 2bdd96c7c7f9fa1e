use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::frame::{split_attribution, write_attribution};

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Settings for [`PayloadCodec`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// zstd compression level.
    pub level: i32,
    /// Wrap the compressed stream in standard base64 before storing.
    pub text_safe: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
            text_safe: true,
        }
    }
}

/// A decoded payload and the attribution that travelled with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub data: Vec<u8>,
    /// Informational only; never used for access decisions.
    pub attribution: Option<String>,
}

/// Compress-and-encode transform applied to every stored payload.
#[derive(Clone, Debug, Default)]
pub struct PayloadCodec {
    config: CodecConfig,
}

impl PayloadCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Compress `raw`, prefix the attribution frame, and base64-wrap if enabled.
    pub fn encode(&self, raw: &[u8], attribution: Option<&str>) -> CodecResult<Vec<u8>> {
        let compressed = zstd::encode_all(raw, self.config.level)
            .map_err(|e| CodecError::Compress(e.to_string()))?;

        let mut stream = Vec::with_capacity(compressed.len() + 64);
        if let Some(attribution) = attribution {
            write_attribution(&mut stream, attribution);
        }
        stream.extend_from_slice(&compressed);

        if self.config.text_safe {
            Ok(STANDARD.encode(&stream).into_bytes())
        } else {
            Ok(stream)
        }
    }

    /// Reverse [`encode`](Self::encode).
    ///
    /// Input that is not valid base64 is treated as an unwrapped compressed
    /// stream, so objects written before or without the text-safe layer
    /// still decode regardless of the current `text_safe` setting.
    pub fn decode(&self, stored: &[u8]) -> CodecResult<Decoded> {
        let stream = unwrap_text_safe(stored)?;
        let (attribution, compressed) = split_attribution(&stream)?;
        let data =
            zstd::decode_all(compressed).map_err(|e| CodecError::Decompress(e.to_string()))?;
        Ok(Decoded { data, attribution })
    }

    /// Read the attribution without decompressing the payload.
    pub fn peek_attribution(&self, stored: &[u8]) -> CodecResult<Option<String>> {
        let stream = unwrap_text_safe(stored)?;
        let (attribution, _) = split_attribution(&stream)?;
        Ok(attribution)
    }
}

fn unwrap_text_safe(stored: &[u8]) -> CodecResult<Vec<u8>> {
    if stored.is_empty() {
        return Err(CodecError::Empty);
    }
    match STANDARD.decode(stored.trim_ascii()) {
        Ok(decoded) if !decoded.is_empty() => Ok(decoded),
        _ => {
            tracing::debug!(
                size = stored.len(),
                "payload is not base64, decoding as raw compressed stream"
            );
            Ok(stored.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw_codec() -> PayloadCodec {
        PayloadCodec::new(CodecConfig {
            text_safe: false,
            ..Default::default()
        })
    }

    #[test]
    fn round_trip_with_attribution() {
        let codec = PayloadCodec::default();
        let raw = br#"{"layers":[{"name":"img"}]}"#;
        let stored = codec.encode(raw, Some("alice@example.org")).unwrap();
        let decoded = codec.decode(&stored).unwrap();
        assert_eq!(decoded.data, raw);
        assert_eq!(decoded.attribution.as_deref(), Some("alice@example.org"));
    }

    #[test]
    fn round_trip_empty_payload() {
        let codec = PayloadCodec::default();
        let stored = codec.encode(b"", None).unwrap();
        let decoded = codec.decode(&stored).unwrap();
        assert!(decoded.data.is_empty());
        assert!(decoded.attribution.is_none());
    }

    #[test]
    fn text_safe_output_is_base64() {
        let stored = PayloadCodec::default().encode(b"hello", Some("u")).unwrap();
        assert!(stored
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')));
    }

    #[test]
    fn unwrapped_payload_decodes_with_text_safe_codec() {
        let stored = raw_codec().encode(b"legacy", Some("bob")).unwrap();
        let decoded = PayloadCodec::default().decode(&stored).unwrap();
        assert_eq!(decoded.data, b"legacy");
        assert_eq!(decoded.attribution.as_deref(), Some("bob"));
    }

    #[test]
    fn wrapped_payload_decodes_with_raw_codec() {
        let stored = PayloadCodec::default().encode(b"wrapped", None).unwrap();
        let decoded = raw_codec().decode(&stored).unwrap();
        assert_eq!(decoded.data, b"wrapped");
    }

    #[test]
    fn trailing_newline_is_tolerated() {
        let codec = PayloadCodec::default();
        let mut stored = codec.encode(b"x", None).unwrap();
        stored.push(b'\n');
        assert_eq!(codec.decode(&stored).unwrap().data, b"x");
    }

    #[test]
    fn peek_attribution_without_payload() {
        let codec = PayloadCodec::default();
        let stored = codec.encode(&[7u8; 4096], Some("carol")).unwrap();
        assert_eq!(codec.peek_attribution(&stored).unwrap().as_deref(), Some("carol"));
        let stored = codec.encode(b"anon", None).unwrap();
        assert_eq!(codec.peek_attribution(&stored).unwrap(), None);
    }

    #[test]
    fn corrupt_stream_is_rejected() {
        let codec = PayloadCodec::default();
        assert!(matches!(
            codec.decode(b"definitely not zstd"),
            Err(CodecError::Decompress(_))
        ));
        let garbage = STANDARD.encode(b"also not zstd").into_bytes();
        assert!(matches!(codec.decode(&garbage), Err(CodecError::Decompress(_))));
    }

    #[test]
    fn empty_stored_payload_is_rejected() {
        assert!(matches!(
            PayloadCodec::default().decode(b""),
            Err(CodecError::Empty)
        ));
    }

    #[test]
    fn compresses_repetitive_payloads() {
        let raw = br#"{"k":"v"}"#.repeat(1000);
        let stored = raw_codec().encode(&raw, None).unwrap();
        assert!(stored.len() < raw.len() / 10);
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            raw in proptest::collection::vec(any::<u8>(), 0..2048),
            attribution in proptest::option::of("[ -~]{0,40}"),
            text_safe in any::<bool>(),
        ) {
            let codec = PayloadCodec::new(CodecConfig { text_safe, ..Default::default() });
            let stored = codec.encode(&raw, attribution.as_deref()).unwrap();
            let decoded = codec.decode(&stored).unwrap();
            prop_assert_eq!(decoded.data, raw);
            prop_assert_eq!(decoded.attribution, attribution);
        }
    }
}
