//! Signature validation against candidate URLs.

use crate::signature::escape::unquote;
use crate::signature::signer::SignerFactory;

/// Which key accepted a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// The server-wide security key.
    Primary,
    /// The key stored alongside the requested image.
    PerImage,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Primary => "primary",
            KeySource::PerImage => "per_image",
        }
    }
}

/// Recover the signed string from a candidate URL by removing the leading
/// `/<token>/` segment. The token may appear raw or percent-decoded.
pub fn signed_payload<'a>(candidate: &'a str, token: &str) -> &'a str {
    strip_segment(candidate, token)
        .or_else(|| strip_segment(candidate, &unquote(token)))
        .unwrap_or(candidate)
}

fn strip_segment<'a>(candidate: &'a str, segment: &str) -> Option<&'a str> {
    candidate
        .strip_prefix('/')?
        .strip_prefix(segment)?
        .strip_prefix('/')
}

/// Validate a candidate URL against a single key.
pub fn validate(candidate: &str, token: &str, key: &[u8], factory: &dyn SignerFactory) -> bool {
    let payload = signed_payload(candidate, token);
    factory.signer(key).validate(&unquote(token), payload)
}

/// Validates candidates with the server key, falling back to a per-image key.
pub struct SignatureValidator<'a> {
    factory: &'a dyn SignerFactory,
    primary: &'a [u8],
    per_image: Option<&'a [u8]>,
}

impl<'a> SignatureValidator<'a> {
    pub fn new(factory: &'a dyn SignerFactory, primary: &'a [u8], per_image: Option<&'a [u8]>) -> Self {
        Self {
            factory,
            primary,
            per_image,
        }
    }

    /// Try the primary key, then the per-image key on the same candidate.
    pub fn check(&self, candidate: &str, token: &str) -> Option<KeySource> {
        if validate(candidate, token, self.primary, self.factory) {
            return Some(KeySource::Primary);
        }

        match self.per_image {
            Some(key) if validate(candidate, token, key, self.factory) => Some(KeySource::PerImage),
            _ => None,
        }
    }
}
