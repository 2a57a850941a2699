//! Tunable settings for the encode and extraction paths.

use image::imageops::FilterType;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

//===========================================================================//

/// Standard ICO sizes for multi-resolution icons.
pub const DEFAULT_SIZES: &[u32] = &[16, 24, 32, 48, 64, 128, 256];

/// Images whose larger dimension is at least this many pixels are stored as
/// PNG rather than DIB.
pub const PNG_THRESHOLD: u32 = 512;

//===========================================================================//

/// The resampling filter used when scaling a source image to each icon size.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ResizeFilter {
    /// Nearest-neighbour sampling
    Nearest,
    /// Linear (triangle) filter
    Triangle,
    /// Cubic (Catmull-Rom) filter
    CatmullRom,
    /// Gaussian filter
    Gaussian,
    /// Lanczos with window 3
    Lanczos3,
}

impl ResizeFilter {
    pub(crate) fn filter_type(&self) -> FilterType {
        match *self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl Default for ResizeFilter {
    fn default() -> ResizeFilter {
        ResizeFilter::Lanczos3
    }
}

//===========================================================================//

/// Settings for building an ICO file from a source image.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncodeOptions {
    /// Square sizes to generate, in pixels (1 through 65535).
    pub sizes: Vec<u32>,
    /// Resampling filter.
    pub filter: ResizeFilter,
    /// Minimum size at which frames are stored as PNG.
    pub png_threshold: u32,
}

impl Default for EncodeOptions {
    fn default() -> EncodeOptions {
        EncodeOptions {
            sizes: DEFAULT_SIZES.to_vec(),
            filter: ResizeFilter::default(),
            png_threshold: PNG_THRESHOLD,
        }
    }
}

impl EncodeOptions {
    /// Options generating exactly the given sizes, with default filter and
    /// threshold.
    pub fn with_sizes(sizes: &[u32]) -> EncodeOptions {
        EncodeOptions { sizes: sizes.to_vec(), ..EncodeOptions::default() }
    }
}

//===========================================================================//

/// Settings for locating satellite resource files next to a binary.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProbeOptions {
    /// Locale tags (e.g. `en-US`) or LCIDs (e.g. `0409`) used to build
    /// `<name>.<locale>.mui` candidates, in preference order.
    pub locales: Vec<String>,
    /// System resource directories probed after the binary's own directory.
    pub system_dirs: Vec<PathBuf>,
    /// Whether to list immediate subdirectories that look like locale names.
    pub scan_locale_dirs: bool,
}

impl Default for ProbeOptions {
    fn default() -> ProbeOptions {
        let mut locales = Vec::new();
        if let Some(locale) = env_locale() {
            locales.push(locale);
        }
        if !locales.iter().any(|l| l.eq_ignore_ascii_case("en-US")) {
            locales.push("en-US".to_string());
        }
        let mut system_dirs = Vec::new();
        if let Some(root) = env::var_os("SystemRoot") {
            let root = PathBuf::from(root);
            system_dirs.push(root.join("System32"));
            system_dirs.push(root.join("SystemResources"));
        }
        ProbeOptions { locales, system_dirs, scan_locale_dirs: true }
    }
}

impl ProbeOptions {
    /// Options that only look beside the binary itself.
    pub fn local_only() -> ProbeOptions {
        ProbeOptions {
            locales: Vec::new(),
            system_dirs: Vec::new(),
            scan_locale_dirs: true,
        }
    }
}

// Turns a POSIX-style `LANG` value such as `de_DE.UTF-8` into `de-DE`.
fn env_locale() -> Option<String> {
    let raw = env::var("LC_ALL").or_else(|_| env::var("LANG")).ok()?;
    let tag = raw.split(['.', '@']).next()?.replace('_', "-");
    if tag.is_empty() || tag == "C" || tag == "POSIX" {
        None
    } else {
        Some(tag)
    }
}

//===========================================================================//


//===========================================================================//
