//! Percent-escaping helpers shared by the validator and the repair stages.

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, percent_encode, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except ASCII alphanumerics and `_ . -` is escaped, slashes
/// and colons included.
const QUOTE_ALL: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-');

/// Percent-encode every reserved byte with no safe exceptions.
pub fn quote_all(input: &str) -> String {
    utf8_percent_encode(input, QUOTE_ALL).to_string()
}

/// Decode once and escape the resulting bytes again with [`quote_all`]'s set.
///
/// Works on raw bytes, so escapes that are not UTF-8 (`%E9`) come back
/// unchanged.
pub fn requote(input: &str) -> String {
    let bytes: Vec<u8> = percent_decode_str(input).collect();
    percent_encode(&bytes, QUOTE_ALL).to_string()
}

/// Percent-decode once. Invalid UTF-8 is replaced rather than rejected.
pub fn unquote(input: &str) -> Cow<'_, str> {
    percent_decode_str(input).decode_utf8_lossy()
}
