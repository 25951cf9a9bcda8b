//! Color helpers shared by intent inference and compression.

use regex::Regex;
use std::sync::LazyLock;

static RGB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rgb\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)").expect("static rgb() pattern")
});

/// Luminance threshold at or above which a color counts as light.
pub const LIGHT_THRESHOLD: f64 = 128.0;

/// Parses the first `rgb(r,g,b)` triple in `s`. Components above 255 are rejected.
pub fn parse_rgb(s: &str) -> Option<(u8, u8, u8)> {
    let caps = RGB_RE.captures(s)?;
    let channel = |i: usize| caps.get(i)?.as_str().parse::<u8>().ok();
    Some((channel(1)?, channel(2)?, channel(3)?))
}

/// Perceptual (YIQ) luminance in `0.0..=255.0`.
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Absent or unparsable input counts as light.
pub fn is_light(rgb: Option<&str>) -> bool {
    match rgb.and_then(parse_rgb) {
        // Integer form of `luminance(..) >= 128` so boundary cases are exact.
        Some((r, g, b)) => 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b) >= 128_000,
        None => true,
    }
}
