//! `link_style` overrides carried in the Link URL.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;
use url::Url;

/// Standard alphabet, padding optional, matching `window.atob`.
pub(crate) const BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub const DEFAULT_RADIUS: f64 = 24.0;
pub const DEFAULT_BACKDROP_OPACITY: f64 = 0.6;

/// `ir` is the corner radius in pixels, `io` the backdrop opacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct LinkStyle {
    #[serde(default)]
    pub ir: Option<f64>,
    #[serde(default)]
    pub io: Option<f64>,
}

impl LinkStyle {
    pub fn radius(&self) -> f64 {
        self.ir.unwrap_or(DEFAULT_RADIUS)
    }

    pub fn backdrop_opacity(&self) -> f64 {
        self.io.unwrap_or(DEFAULT_BACKDROP_OPACITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleOverride {
    /// No `link_style` parameter.
    Absent,
    /// A parameter that is not base64 JSON of the expected shape.
    Malformed,
    Present(LinkStyle),
}

impl StyleOverride {
    /// Style to render with; defaults apply to anything missing.
    pub fn style(&self) -> LinkStyle {
        match self {
            StyleOverride::Present(style) => *style,
            StyleOverride::Absent | StyleOverride::Malformed => LinkStyle::default(),
        }
    }
}

pub fn read_link_style(link: &str) -> StyleOverride {
    let Ok(url) = Url::parse(link) else {
        return StyleOverride::Malformed;
    };
    let Some(raw) = url
        .query_pairs()
        .find(|(key, _)| key == "link_style")
        .map(|(_, value)| value.into_owned())
    else {
        return StyleOverride::Absent;
    };

    let decoded = match BASE64_LENIENT.decode(raw.trim()) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(%err, "link_style is not base64");
            return StyleOverride::Malformed;
        }
    };
    match serde_json::from_slice::<LinkStyle>(&decoded) {
        Ok(style) => StyleOverride::Present(style),
        Err(err) => {
            tracing::debug!(%err, "link_style is not valid JSON");
            StyleOverride::Malformed
        }
    }
}
