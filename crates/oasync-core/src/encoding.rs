//! Plain-text decoding
//!
//! Strict RFC 2616 handling (ISO-8859-1 whenever a `text/*` response has no
//! charset) misaligns character offsets when servers forget to declare
//! UTF-8. When no charset is given and the body is valid UTF-8 with
//! non-ASCII content, the detected encoding wins over the default.

use encoding_rs::Encoding;
use tracing::warn;

use crate::error::{SyncError, SyncResult};

/// Encoding assumed for text without a declared charset
pub const RFC_DEFAULT_ENCODING: &str = "ISO-8859-1";

/// Labels decoded as true ISO-8859-1 rather than the windows-1252 superset
const LATIN1_LABELS: &[&str] = &["iso-8859-1", "iso8859-1", "iso_8859-1", "latin1", "l1"];

/// Extract the charset parameter from a Content-Type header value
pub fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then_some(value)
        } else {
            None
        }
    })
}

/// Decode a plain-text body according to its Content-Type
pub fn decode_text(content_type: Option<&str>, body: &[u8]) -> SyncResult<String> {
    if let Some(label) = content_type.and_then(charset) {
        if LATIN1_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
            return Ok(decode_latin1(body));
        }
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| SyncError::format(format!("unknown charset '{}'", label)))?;
        let (text, _, _) = encoding.decode(body);
        return Ok(text.into_owned());
    }

    let is_ascii = Encoding::ascii_valid_up_to(body) == body.len();
    if !is_ascii && Encoding::utf8_valid_up_to(body) == body.len() {
        warn!(
            "Breaking RFC 2616: using detected encoding (UTF-8) instead of default ({})",
            RFC_DEFAULT_ENCODING
        );
        return Ok(String::from_utf8_lossy(body).into_owned());
    }

    Ok(decode_latin1(body))
}

/// ISO-8859-1 maps every byte to the code point of the same value
fn decode_latin1(body: &[u8]) -> String {
    body.iter().map(|&b| char::from(b)).collect()
}
