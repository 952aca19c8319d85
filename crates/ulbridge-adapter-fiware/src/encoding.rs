//! URL encoding of entity identifiers.
//!
//! Device and entity ids are caller-assigned and end up as a single path
//! segment (`/iot/devices/{id}`, `/v2/entities/{id}`). Anything that would
//! change the shape of the URL is percent-encoded.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters that must be percent-encoded in a path segment.
const PATH_SEGMENT_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\');

/// Encode an identifier for use as one URL path segment.
///
/// # Examples
///
/// ```
/// use ulbridge_adapter_fiware::encode_path_segment;
///
/// assert_eq!(encode_path_segment("7e133545550e496a"), "7e133545550e496a");
/// assert_eq!(encode_path_segment("room 1/lamp"), "room%201%2Flamp");
/// ```
#[must_use]
pub fn encode_path_segment(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT_ESCAPE).to_string()
}
