//! Encoder options and the typed accessors the pipeline reads them with.
//!
//! Options travel as an opaque, case-sensitive `string → string` map so the
//! CLI and library callers share one currency; the conversion core never
//! looks at anything but the handful of recognized keys. Container
//! metadata is a separate plain map, copied into the MP4 verbatim.

use std::{collections::HashMap, str::FromStr};

use crate::error::UgoiraError;

/// Default Constant Rate Factor when `crf` is unset.
const DEFAULT_CRF: i32 = 18;

/// Default libx264 preset when `preset` is unset.
const DEFAULT_PRESET: &str = "slow";

/// Encoder options for a conversion.
///
/// Recognized keys:
///
/// | Key | Effect |
/// |-----|--------|
/// | `force_yuv420p` | any value forces 4:2:0 planar 8-bit YUV output |
/// | `crf` | integer in `[0, 51]`, default 18 |
/// | `preset` | passed opaquely to libx264, default `slow` |
/// | `level` | passed opaquely to libx264, unset by default |
/// | `profile` | passed opaquely to libx264, unset by default |
///
/// Unrecognized keys are ignored. The map is read-only once conversion
/// begins.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    map: HashMap<String, String>,
}

impl EncodeOptions {
    /// Create an empty options map (all defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option. Later values replace earlier ones.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.map.insert(key.into(), value.into());
        self
    }

    /// Look up a raw option value. Case-sensitive.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// The Constant Rate Factor to encode with.
    ///
    /// # Errors
    ///
    /// [`UgoiraError::InvalidCrf`] if the configured value is not an
    /// integer in `[0, 51]`.
    pub(crate) fn crf(&self) -> Result<i32, UgoiraError> {
        match self.get("crf") {
            None => Ok(DEFAULT_CRF),
            Some(raw) => match raw.trim().parse::<i32>() {
                Ok(value) if (0..=51).contains(&value) => Ok(value),
                _ => Err(UgoiraError::InvalidCrf(raw.to_string())),
            },
        }
    }

    /// The libx264 preset name.
    pub(crate) fn preset(&self) -> &str {
        self.get("preset").unwrap_or(DEFAULT_PRESET)
    }

    /// The libx264 level, if configured.
    pub(crate) fn level(&self) -> Option<&str> {
        self.get("level")
    }

    /// The libx264 profile, if configured.
    pub(crate) fn profile(&self) -> Option<&str> {
        self.get("profile")
    }

    /// Whether output is pinned to 4:2:0 planar 8-bit YUV.
    pub(crate) fn force_yuv420p(&self) -> bool {
        self.get("force_yuv420p").is_some()
    }
}

/// H.264 profile names libx264 understands, for callers that want them
/// validated instead of passing free-form strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum X264Profile {
    /// Let x264 pick.
    #[default]
    Auto,
    /// No interlacing, no lossless.
    Baseline,
    /// No lossless.
    Main,
    /// No lossless.
    High,
    /// Bit depths 8-10.
    High10,
    /// Bit depths 8-10, 4:2:0/4:2:2 chroma subsampling.
    High422,
    /// Bit depths 8-10, 4:2:0/4:2:2/4:4:4 chroma subsampling.
    High444,
}

impl X264Profile {
    /// The option value libx264 expects. Empty for [`Auto`](Self::Auto),
    /// which callers should treat as "leave the option unset".
    pub fn as_str(&self) -> &'static str {
        match self {
            X264Profile::Auto => "",
            X264Profile::Baseline => "baseline",
            X264Profile::Main => "main",
            X264Profile::High => "high",
            X264Profile::High10 => "high10",
            X264Profile::High422 => "high422",
            X264Profile::High444 => "high444",
        }
    }

    /// `true` for [`Auto`](Self::Auto).
    pub fn is_auto(&self) -> bool {
        matches!(self, X264Profile::Auto)
    }
}

impl AsRef<str> for X264Profile {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for X264Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(X264Profile::Auto),
            "baseline" => Ok(X264Profile::Baseline),
            "main" => Ok(X264Profile::Main),
            "high" => Ok(X264Profile::High),
            "high10" => Ok(X264Profile::High10),
            "high422" => Ok(X264Profile::High422),
            "high444" => Ok(X264Profile::High444),
            other => Err(format!("unknown H.264 profile: {other}")),
        }
    }
}
