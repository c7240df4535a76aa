//! Image transformation options and their canonical URL fragment.
//!
//! The fragment grammar follows thumbor's URL layout, in this order:
//!
//! ```text
//! debug/ meta/ trim[:top-left|:bottom-right][:N]/ AxB:CxD/
//! [adaptive-][full-]fit-in/ [-]Wx[-]H/ left|right|center/ top|bottom|middle/
//! smart/ filters:name(args)/
//! ```
//!
//! Unset options are omitted, as are the default alignments `center` and
//! `middle`.

use std::fmt;

use regex::Captures;

/// Manual crop box, in source pixels. Coordinates keep their digits as
/// received so the fragment reproduces the signed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropBox {
    pub left: String,
    pub top: String,
    pub right: String,
    pub bottom: String,
}

/// `fit-in` with its optional modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FitIn {
    pub adaptive: bool,
    pub full: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

impl HorizontalAlign {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl VerticalAlign {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "top" => Some(Self::Top),
            "middle" => Some(Self::Middle),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Middle => "middle",
            Self::Bottom => "bottom",
        }
    }
}

/// Transformation directives carried between the signature and the image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOptions {
    pub debug: bool,
    pub meta: bool,
    /// Full trim directive, e.g. `trim` or `trim:top-left:10`.
    pub trim: Option<String>,
    pub crop: Option<CropBox>,
    pub fit_in: Option<FitIn>,
    pub horizontal_flip: bool,
    pub vertical_flip: bool,
    /// Digits or `orig`.
    pub width: Option<String>,
    /// Digits or `orig`.
    pub height: Option<String>,
    pub halign: Option<HorizontalAlign>,
    pub valign: Option<VerticalAlign>,
    pub smart: bool,
    /// Filter chain without the `filters:` prefix.
    pub filters: Option<String>,
}

impl ImageOptions {
    /// Build options from a match of the request path grammar.
    pub(crate) fn from_captures(caps: &Captures<'_>) -> Self {
        let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
        let flag = |name: &str| caps.name(name).is_some();
        let digits = |name: &str| text(name).unwrap_or_default();

        let crop = flag("crop_left").then(|| CropBox {
            left: digits("crop_left"),
            top: digits("crop_top"),
            right: digits("crop_right"),
            bottom: digits("crop_bottom"),
        });

        let fit_in = flag("fit_in").then(|| FitIn {
            adaptive: flag("adaptive"),
            full: flag("full"),
        });

        Self {
            debug: flag("debug"),
            meta: flag("meta"),
            trim: text("trim"),
            crop,
            fit_in,
            horizontal_flip: flag("horizontal_flip"),
            vertical_flip: flag("vertical_flip"),
            width: text("width"),
            height: text("height"),
            halign: caps.name("halign").and_then(|m| HorizontalAlign::parse(m.as_str())),
            valign: caps.name("valign").and_then(|m| VerticalAlign::parse(m.as_str())),
            smart: flag("smart"),
            filters: text("filters"),
        }
    }

    fn has_dimensions(&self) -> bool {
        self.width.is_some() || self.height.is_some() || self.horizontal_flip || self.vertical_flip
    }

    /// Canonical options fragment, segments joined by `/`. Empty when no
    /// option is set.
    pub fn fragment(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if self.debug {
            parts.push("debug".into());
        }
        if self.meta {
            parts.push("meta".into());
        }
        if let Some(trim) = &self.trim {
            parts.push(trim.clone());
        }
        if let Some(crop) = &self.crop {
            parts.push(format!("{}x{}:{}x{}", crop.left, crop.top, crop.right, crop.bottom));
        }
        if let Some(fit) = &self.fit_in {
            let mut fit_ops = Vec::with_capacity(3);
            if fit.adaptive {
                fit_ops.push("adaptive");
            }
            if fit.full {
                fit_ops.push("full");
            }
            fit_ops.push("fit-in");
            parts.push(fit_ops.join("-"));
        }
        if self.has_dimensions() {
            parts.push(format!(
                "{}{}x{}{}",
                if self.horizontal_flip { "-" } else { "" },
                self.width.as_deref().unwrap_or_default(),
                if self.vertical_flip { "-" } else { "" },
                self.height.as_deref().unwrap_or_default(),
            ));
        }
        if let Some(halign) = self.halign.filter(|a| *a != HorizontalAlign::Center) {
            parts.push(halign.as_str().into());
        }
        if let Some(valign) = self.valign.filter(|a| *a != VerticalAlign::Middle) {
            parts.push(valign.as_str().into());
        }
        if self.smart {
            parts.push("smart".into());
        }
        if let Some(filters) = &self.filters {
            parts.push(format!("filters:{}", filters));
        }

        parts.join("/")
    }
}

impl fmt::Display for ImageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fragment())
    }
}
