//! Text frame payloads as sent by browser clients.

use base64::Engine;

use super::frame_decoder::FrameDecodeError;

const DATA_URL_MARKER: &str = "base64,";

/// Decode a base64 frame payload into encoded image bytes.
///
/// Accepts either raw base64 or a data URL (`data:image/png;base64,...`);
/// everything up to and including the first `base64,` is discarded. ASCII
/// whitespace inside the payload is ignored. An empty payload, or the bare
/// `data:,` a canvas produces before it has content, is
/// [`FrameDecodeError::Empty`].
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, FrameDecodeError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() || trimmed == "data:," {
        return Err(FrameDecodeError::Empty);
    }

    let encoded = match trimmed.find(DATA_URL_MARKER) {
        Some(i) => &trimmed[i + DATA_URL_MARKER.len()..],
        None => trimmed,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(FrameDecodeError::Empty);
    }

    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::raw("aGVsbG8=")]
    #[case::png_data_url("data:image/png;base64,aGVsbG8=")]
    #[case::jpeg_data_url("data:image/jpeg;base64,aGVsbG8=")]
    #[case::surrounding_whitespace("  aGVsbG8=\n")]
    #[case::wrapped_lines("aGVs\nbG8=")]
    fn test_accepted_forms(#[case] payload: &str) {
        assert_eq!(decode_payload(payload).unwrap(), b"hello");
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::empty_canvas("data:,")]
    #[case::empty_data_url("data:image/png;base64,")]
    fn test_empty_payloads(#[case] payload: &str) {
        assert!(matches!(decode_payload(payload), Err(FrameDecodeError::Empty)));
    }

    #[test]
    fn test_invalid_base64() {
        let err = decode_payload("data:image/png;base64,@@@@").unwrap_err();
        assert!(matches!(err, FrameDecodeError::Base64(_)));
        assert!(err.to_string().starts_with("Base64 decode failed"));
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(FrameDecodeError::Empty.to_string(), "No frame data provided");
    }
}
