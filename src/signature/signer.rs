//! Keyed URL signers.
//!
//! Signatures are HMAC-SHA1 over the `options/image` part of the URL,
//! encoded as URL-safe base64 with padding. That is the format thumbor and
//! its client libraries emit, so URLs produced by any of them validate here.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Encodes with padding, decodes tokens whether or not the client kept it.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A stateless signer bound to a single key.
pub trait Signer: Send + Sync {
    /// Sign `payload`, returning the token as it appears in a URL.
    fn signature(&self, payload: &str) -> String;

    /// Returns true if `signature` was produced over `payload` by this key.
    fn validate(&self, signature: &str, payload: &str) -> bool {
        self.signature(payload) == signature
    }
}

/// Builds signers from raw key material.
///
/// Used for both the server-wide key and per-image keys, so it must accept
/// arbitrary keys at request time.
pub trait SignerFactory: Send + Sync {
    fn signer(&self, key: &[u8]) -> Box<dyn Signer>;
}

/// HMAC-SHA1 signer compatible with thumbor URLs.
#[derive(Clone)]
pub struct HmacSha1Signer {
    key: Vec<u8>,
}

impl HmacSha1Signer {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn mac(&self, payload: &str) -> HmacSha1 {
        let mut mac =
            HmacSha1::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac
    }
}

impl Signer for HmacSha1Signer {
    fn signature(&self, payload: &str) -> String {
        URL_SAFE_LENIENT.encode(self.mac(payload).finalize().into_bytes())
    }

    fn validate(&self, signature: &str, payload: &str) -> bool {
        match URL_SAFE_LENIENT.decode(signature) {
            Ok(expected) => self.mac(payload).verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for HmacSha1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha1Signer").finish_non_exhaustive()
    }
}

/// Factory for [`HmacSha1Signer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha1Factory;

impl SignerFactory for HmacSha1Factory {
    fn signer(&self, key: &[u8]) -> Box<dyn Signer> {
        Box::new(HmacSha1Signer::new(key))
    }
}
