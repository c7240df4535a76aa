//! Signature repair cascade.
//!
//! Proxies and browsers sometimes rewrite a signed URL in transit: the
//! slash after `http:` gets collapsed, `%3A` is escaped again as `%253A`,
//! or the whole target is re-encoded. The request is still the one that was
//! signed, but the bytes no longer match. Each [`Stage`] is one hypothesis
//! about what happened to the target. Stages run in a fixed order against the
//! target as received and the first candidate that validates is committed to
//! the request.
//!
//! When nothing validates the request is left untouched; the upstream image
//! service still performs its own signature check.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::imaging::SignedRequest;
use crate::keys::{lookup_key, KeyStore};
use crate::observability::metrics;
use crate::signature::escape::{quote_all, requote};
use crate::signature::signer::SignerFactory;
use crate::signature::validator::{KeySource, SignatureValidator};

/// `http%3A` or `http%3A/` followed by anything but another slash.
static ENCODED_COLON_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?%3A/?)[^/]").expect("encoded colon pattern is valid"));

/// `%253A`, `%25253A`, ... right after the scheme.
static OVER_ESCAPED_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?(%(?:25)+3A)").expect("escaped colon pattern is valid"));

/// `http:` or `http:/` followed by anything but another slash.
static LITERAL_COLON_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?:/?)[^/]").expect("literal colon pattern is valid"));

/// One hypothesis about how the target was altered in transit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Nothing happened; validate the path as received.
    AsReceived,
    /// The slash after an encoded scheme colon was collapsed.
    EncodedColonSlash,
    /// The encoded scheme colon was escaped one or more extra times.
    OverEscapedColon,
    /// The slash after a literal scheme colon was collapsed.
    LiteralColonSlash,
    /// The target was signed fully percent-encoded.
    FullyEncoded,
    /// The target was signed decoded, then fully percent-encoded.
    DecodedReencoded,
}

impl Stage {
    /// Repair stages in evaluation order. [`Stage::AsReceived`] always runs first.
    pub const REPAIRS: [Stage; 5] = [
        Stage::EncodedColonSlash,
        Stage::OverEscapedColon,
        Stage::LiteralColonSlash,
        Stage::FullyEncoded,
        Stage::DecodedReencoded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::AsReceived => "as_received",
            Stage::EncodedColonSlash => "encoded_colon_slash",
            Stage::OverEscapedColon => "over_escaped_colon",
            Stage::LiteralColonSlash => "literal_colon_slash",
            Stage::FullyEncoded => "fully_encoded",
            Stage::DecodedReencoded => "decoded_reencoded",
        }
    }

    /// Rewrite a raw target under this stage's hypothesis.
    ///
    /// Returns `None` when the target does not show the alteration this
    /// stage repairs. Pattern stages only look at the start of the target.
    pub fn repair(&self, target: &str) -> Option<String> {
        match self {
            Stage::AsReceived => Some(target.to_string()),
            Stage::EncodedColonSlash => {
                insert_slash(&ENCODED_COLON_SLASH, &target.replace(':', "%3A"))
            }
            Stage::OverEscapedColon => {
                let escaped = OVER_ESCAPED_COLON.captures(target)?.get(1)?;
                Some(format!(
                    "{}%3A{}",
                    &target[..escaped.start()],
                    &target[escaped.end()..]
                ))
            }
            Stage::LiteralColonSlash => insert_slash(&LITERAL_COLON_SLASH, target),
            Stage::FullyEncoded => Some(quote_all(target)),
            Stage::DecodedReencoded => Some(requote(target)),
        }
    }
}

fn insert_slash(pattern: &Regex, target: &str) -> Option<String> {
    let end = pattern.captures(target)?.get(1)?.end();
    Some(format!("{}/{}", &target[..end], &target[end..]))
}

/// Result of running the cascade over one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeOutcome {
    /// The request carries no signature (`unsafe/`); nothing to validate.
    Unsigned,
    /// A candidate validated. Any stage but [`Stage::AsReceived`] rewrote
    /// the request.
    Accepted { stage: Stage, key: KeySource },
    /// No candidate validated; the request is unchanged.
    Exhausted,
}

impl CascadeOutcome {
    pub fn is_rewrite(&self) -> bool {
        matches!(self, CascadeOutcome::Accepted { stage, .. } if *stage != Stage::AsReceived)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CascadeOutcome::Unsigned => "unsigned",
            CascadeOutcome::Accepted { .. } => "accepted",
            CascadeOutcome::Exhausted => "exhausted",
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            CascadeOutcome::Accepted { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Run every stage against `request`, committing the first candidate that
/// validates.
pub fn run(request: &mut SignedRequest, validator: &SignatureValidator<'_>) -> CascadeOutcome {
    let Some(token) = request.signature().map(str::to_owned) else {
        return CascadeOutcome::Unsigned;
    };

    if let Some(key) = validator.check(request.path(), &token) {
        tracing::debug!(path = %request.path(), key = key.as_str(), "Signature valid as received");
        return CascadeOutcome::Accepted {
            stage: Stage::AsReceived,
            key,
        };
    }

    for stage in Stage::REPAIRS {
        let Some(target) = stage.repair(request.target()) else {
            tracing::trace!(stage = stage.as_str(), "Stage does not apply");
            continue;
        };

        let candidate = request.candidate(&target);
        match validator.check(&candidate, &token) {
            Some(key) => {
                tracing::info!(
                    stage = stage.as_str(),
                    key = key.as_str(),
                    from = %request.path(),
                    to = %candidate,
                    "Repaired signed URL"
                );
                request.commit(candidate, target);
                return CascadeOutcome::Accepted { stage, key };
            }
            None => {
                tracing::debug!(stage = stage.as_str(), candidate = %candidate, "Candidate rejected");
            }
        }
    }

    tracing::debug!(path = %request.path(), "No repair validated, passing request through");
    CascadeOutcome::Exhausted
}

/// Validates and repairs inbound signed requests.
pub struct SignatureRepair {
    factory: Arc<dyn SignerFactory>,
    security_key: Vec<u8>,
    key_store: Option<Arc<dyn KeyStore>>,
    lookup_timeout: Duration,
}

impl SignatureRepair {
    pub fn new(factory: Arc<dyn SignerFactory>, security_key: impl Into<Vec<u8>>) -> Self {
        Self {
            factory,
            security_key: security_key.into(),
            key_store: None,
            lookup_timeout: Duration::from_secs(1),
        }
    }

    /// Resolve per-image keys from `store`, waiting at most `timeout`.
    pub fn with_key_store(mut self, store: Arc<dyn KeyStore>, timeout: Duration) -> Self {
        self.key_store = Some(store);
        self.lookup_timeout = timeout;
        self
    }

    /// Look up the per-image key once, then run the cascade.
    pub async fn apply(&self, request: &mut SignedRequest) -> CascadeOutcome {
        if request.signature().is_none() {
            metrics::record_cascade(CascadeOutcome::Unsigned.label(), "none");
            return CascadeOutcome::Unsigned;
        }

        if let Some(store) = &self.key_store {
            let key = lookup_key(store.as_ref(), request.image(), self.lookup_timeout).await;
            request.set_per_image_key(key);
        }

        let per_image = request.per_image_key().map(<[u8]>::to_vec);
        let validator =
            SignatureValidator::new(self.factory.as_ref(), &self.security_key, per_image.as_deref());
        let outcome = run(request, &validator);

        metrics::record_cascade(
            outcome.label(),
            outcome.stage().map(|s| s.as_str()).unwrap_or("none"),
        );
        outcome
    }
}
