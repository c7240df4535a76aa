//! Signed image requests parsed from the inbound path.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::imaging::options::ImageOptions;
use crate::signature::escape::unquote;

static REQUEST_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^/?",
        r"(?:(?:(?P<unsafe>unsafe)|(?P<hash>.+?))/)?",
        r"(?:(?P<debug>debug)/)?",
        r"(?:(?P<meta>meta)/)?",
        r"(?:(?P<trim>trim(?::(?:top-left|bottom-right))?(?::\d+)?)/)?",
        r"(?:(?P<crop_left>\d+)x(?P<crop_top>\d+):(?P<crop_right>\d+)x(?P<crop_bottom>\d+)/)?",
        r"(?:(?P<adaptive>adaptive-)?(?P<full>full-)?(?P<fit_in>fit-in)/)?",
        r"(?:(?P<horizontal_flip>-)?(?P<width>(?:\d+|orig))?x(?P<vertical_flip>-)?(?P<height>(?:\d+|orig))?/)?",
        r"(?:(?P<halign>left|right|center)/)?",
        r"(?:(?P<valign>top|bottom|middle)/)?",
        r"(?:(?P<smart>smart)/)?",
        r"(?:filters:(?P<filters>.+?\))/)?",
        r"(?P<image>.+)$",
    ))
    .expect("request path pattern is valid")
});

/// Errors raised while parsing a request path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The path has no image segment.
    #[error("path does not address an image: {0}")]
    NoImage(String),
}

/// One inbound image request, mutated in place when a repair is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    path: String,
    signature: Option<String>,
    options: ImageOptions,
    target: String,
    image: String,
    per_image_key: Option<Vec<u8>>,
}

impl SignedRequest {
    /// Parse a raw (still percent-encoded) request path.
    pub fn parse(path: &str) -> Result<Self, ParseError> {
        let caps = REQUEST_PATH
            .captures(path)
            .ok_or_else(|| ParseError::NoImage(path.to_string()))?;

        let target = caps
            .name("image")
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ParseError::NoImage(path.to_string()))?;

        Ok(Self {
            path: path.to_string(),
            signature: caps.name("hash").map(|m| m.as_str().to_string()),
            options: ImageOptions::from_captures(&caps),
            image: unquote(&target).into_owned(),
            target,
            per_image_key: None,
        })
    }

    /// Effective request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Signature token as received, absent for `unsafe/` requests.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    /// Raw, possibly escaped, image segment.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Percent-decoded image target.
    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn per_image_key(&self) -> Option<&[u8]> {
        self.per_image_key.as_deref()
    }

    pub fn set_per_image_key(&mut self, key: Option<Vec<u8>>) {
        self.per_image_key = key;
    }

    /// Assemble `/<signature>/<options>/<target>`, omitting empty segments.
    pub fn candidate(&self, target: &str) -> String {
        let fragment = self.options.fragment();
        let mut candidate = String::with_capacity(self.path.len() + 8);
        for segment in [self.signature.as_deref().unwrap_or_default(), fragment.as_str(), target] {
            if !segment.is_empty() {
                candidate.push('/');
                candidate.push_str(segment);
            }
        }
        candidate
    }

    /// Accept a repaired target and the candidate path that validated it.
    pub fn commit(&mut self, path: String, target: String) {
        self.image = unquote(&target).into_owned();
        self.target = target;
        self.path = path;
    }
}
