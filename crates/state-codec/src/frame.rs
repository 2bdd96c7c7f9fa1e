//! Attribution frame.
//!
//! The attribution is written as a zstd *skippable frame* ahead of the
//! compressed payload:
//!
//! ```text
//! [magic: u32 LE = 0x184D2A5A][len: u32 LE][len bytes of UTF-8]
//! ```
//!
//! Zstd decoders ignore skippable frames, so the payload stays a valid zstd
//! stream, and the attribution can be read without decompressing anything.

use crate::error::{CodecError, CodecResult};

/// Skippable-frame magic used for attribution (zstd reserves `0x184D2A5?`).
pub const ATTRIBUTION_MAGIC: u32 = 0x184D2A5A;

/// Attributions longer than this are truncated on a char boundary.
pub const MAX_ATTRIBUTION_LEN: usize = 64 * 1024;

const HEADER_LEN: usize = 8;

/// Append an attribution frame for `attribution` to `out`.
///
/// Returns `true` when the attribution had to be truncated.
pub fn write_attribution(out: &mut Vec<u8>, attribution: &str) -> bool {
    let text = truncate_on_char_boundary(attribution, MAX_ATTRIBUTION_LEN);
    let truncated = text.len() < attribution.len();
    if truncated {
        tracing::warn!(
            original_len = attribution.len(),
            stored_len = text.len(),
            "attribution exceeds {MAX_ATTRIBUTION_LEN} bytes, truncating"
        );
    }
    out.reserve(HEADER_LEN + text.len());
    out.extend_from_slice(&ATTRIBUTION_MAGIC.to_le_bytes());
    out.extend_from_slice(&(text.len() as u32).to_le_bytes());
    out.extend_from_slice(text.as_bytes());
    truncated
}

/// Split a leading attribution frame off `data`.
///
/// Returns the attribution (if a frame is present) and the remaining bytes.
pub fn split_attribution(data: &[u8]) -> CodecResult<(Option<String>, &[u8])> {
    if data.len() < 4 || data[..4] != ATTRIBUTION_MAGIC.to_le_bytes() {
        return Ok((None, data));
    }
    if data.len() < HEADER_LEN {
        return Err(CodecError::Attribution("truncated header".into()));
    }
    let len = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let end = HEADER_LEN + len;
    if data.len() < end {
        return Err(CodecError::Attribution(format!(
            "frame declares {len} bytes, {} available",
            data.len() - HEADER_LEN
        )));
    }
    let text = std::str::from_utf8(&data[HEADER_LEN..end])
        .map_err(|e| CodecError::Attribution(e.to_string()))?;
    Ok((Some(text.to_string()), &data[end..]))
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
