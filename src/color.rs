//! Label color maps and the color strings they contain
//!
//! A color map is a JSON object mapping annotation labels to colors. Each
//! value may be:
//! - a CSS color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`, `rgb()`,
//!   `hsl()`, named colors such as `red`
//! - an integer label value `0..=255`, stored as an opaque gray
//! - an array `[r, g, b]` or `[r, g, b, a]`

use image::Rgba;
use lightningcss::traits::Parse;
use lightningcss::values::color::CssColor;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for color string parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 3, 4, 6, or 8 hex chars after #)
    #[error("invalid color length {0}, expected 3, 4, 6, or 8")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// CSS parsing error from lightningcss
    #[error("CSS parse error: {0}")]
    CssParse(String),
}

/// Error type for loading a color map file
#[derive(Debug, Error)]
pub enum ColorMapError {
    #[error("cannot read color map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid color map JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("color map must be a JSON object mapping labels to colors")]
    NotAnObject,
    #[error("invalid color for label \"{label}\": {reason}")]
    InvalidColor { label: String, reason: String },
}

/// Parse a CSS color string into an RGBA color.
///
/// # Examples
///
/// ```
/// use overlay_labels::color::parse_color;
///
/// assert_eq!(parse_color("#F00").unwrap(), image::Rgba([255, 0, 0, 255]));
/// assert_eq!(parse_color("#ff000080").unwrap(), image::Rgba([255, 0, 0, 128]));
/// assert_eq!(parse_color("blue").unwrap(), image::Rgba([0, 0, 255, 255]));
/// ```
pub fn parse_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ColorError::Empty);
    }

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex_color(hex);
    }

    parse_css_color(s)
}

/// Parse the digits of a hex color (#RGB, #RGBA, #RRGGBB, #RRGGBBAA)
fn parse_hex_color(hex: &str) -> Result<Rgba<u8>, ColorError> {
    if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(c));
    }

    // All characters are ASCII hex digits from here on
    let digits: Vec<u8> = hex.bytes().map(hex_value).collect();
    match digits.as_slice() {
        [r, g, b] => Ok(Rgba([r * 17, g * 17, b * 17, 255])),
        [r, g, b, a] => Ok(Rgba([r * 17, g * 17, b * 17, a * 17])),
        [r1, r0, g1, g0, b1, b0] => Ok(Rgba([r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0, 255])),
        [r1, r0, g1, g0, b1, b0, a1, a0] => {
            Ok(Rgba([r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0, a1 * 16 + a0]))
        }
        _ => Err(ColorError::InvalidLength(digits.len())),
    }
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// Parse a CSS color using lightningcss (rgb, hsl, hwb, oklch, named colors)
fn parse_css_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    use lightningcss::values::color::FloatColor;

    let css_color = CssColor::parse_string(s).map_err(|e| ColorError::CssParse(e.to_string()))?;
    let rgb_color = css_color
        .to_rgb()
        .map_err(|_| ColorError::CssParse("cannot convert color to RGB".to_string()))?;

    match rgb_color {
        CssColor::RGBA(rgba) => Ok(Rgba([rgba.red, rgba.green, rgba.blue, rgba.alpha])),
        CssColor::Float(float_color) => match float_color.as_ref() {
            FloatColor::RGB(rgb) => Ok(Rgba([
                (rgb.r * 255.0).round() as u8,
                (rgb.g * 255.0).round() as u8,
                (rgb.b * 255.0).round() as u8,
                (rgb.alpha * 255.0).round() as u8,
            ])),
            _ => Err(ColorError::CssParse("unexpected float color format".to_string())),
        },
        _ => Err(ColorError::CssParse("color conversion did not produce RGB".to_string())),
    }
}

/// Interpret one JSON color map value.
fn parse_color_value(value: &Value) -> Result<Rgba<u8>, String> {
    match value {
        Value::String(s) => parse_color(s).map_err(|e| e.to_string()),
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .map(|v| Rgba([v, v, v, 255]))
            .ok_or_else(|| format!("label value {} is outside 0..=255", n)),
        Value::Array(items) => {
            let channels = items
                .iter()
                .map(|item| item.as_u64().and_then(|v| u8::try_from(v).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(|| "channels must be integers in 0..=255".to_string())?;
            match channels.as_slice() {
                [r, g, b] => Ok(Rgba([*r, *g, *b, 255])),
                [r, g, b, a] => Ok(Rgba([*r, *g, *b, *a])),
                _ => Err(format!("expected 3 or 4 channels, got {}", channels.len())),
            }
        }
        other => Err(format!("unsupported color value {}", other)),
    }
}

/// Immutable mapping from annotation label to drawing color.
///
/// A JSON value may be a color string, an array of 3 or 4 channels, or an
/// integer `v` in `0..=255`. The integer form is a label value for label-map
/// overlays and is stored as gray `[v, v, v, 255]`: 8-bit and 16-bit
/// grayscale overlays receive `v` itself. Palette overlays are expanded to
/// RGB by the decoder, so they receive the gray color rather than palette
/// index `v`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorMap {
    colors: BTreeMap<String, Rgba<u8>>,
}

impl ColorMap {
    /// Load a color map from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ColorMapError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ColorMapError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&contents)
    }

    /// Parse a color map from JSON text.
    ///
    /// # Examples
    ///
    /// ```
    /// use overlay_labels::color::ColorMap;
    ///
    /// let map = ColorMap::from_json_str(r##"{"tumor": "#ff0000", "stroma": 2}"##).unwrap();
    /// assert_eq!(map.get("tumor"), Some(image::Rgba([255, 0, 0, 255])));
    /// assert_eq!(map.get("stroma"), Some(image::Rgba([2, 2, 2, 255])));
    /// assert_eq!(map.get("fat"), None);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ColorMapError> {
        let root: Value = serde_json::from_str(json)?;
        let Value::Object(entries) = root else {
            return Err(ColorMapError::NotAnObject);
        };

        let mut colors = BTreeMap::new();
        for (label, value) in entries {
            let color = parse_color_value(&value)
                .map_err(|reason| ColorMapError::InvalidColor { label: label.clone(), reason })?;
            colors.insert(label, color);
        }
        Ok(Self { colors })
    }

    /// Color for a label, if mapped.
    pub fn get(&self, label: &str) -> Option<Rgba<u8>> {
        self.colors.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Mapped labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.colors.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_hex_lengths() {
        assert_eq!(parse_color("#0f0").unwrap(), Rgba([0, 255, 0, 255]));
        assert_eq!(parse_color("#0f08").unwrap(), Rgba([0, 255, 0, 136]));
        assert_eq!(parse_color("#00FF00").unwrap(), Rgba([0, 255, 0, 255]));
        assert_eq!(parse_color("#00ff0040").unwrap(), Rgba([0, 255, 0, 64]));
    }

    #[test]
    fn test_parse_hex_errors() {
        assert_eq!(parse_color(""), Err(ColorError::Empty));
        assert_eq!(parse_color("#12345"), Err(ColorError::InvalidLength(5)));
        assert_eq!(parse_color("#GG0000"), Err(ColorError::InvalidHex('G')));
    }

    #[test]
    fn test_parse_css_functional_and_named() {
        assert_eq!(parse_color("rgb(255, 0, 0)").unwrap(), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("white").unwrap(), Rgba([255, 255, 255, 255]));
        assert!(matches!(parse_color("notacolor"), Err(ColorError::CssParse(_))));
    }

    #[test]
    fn test_colormap_value_forms() {
        let map = ColorMap::from_json_str(
            r##"{"a": "#00f", "b": 7, "c": [1, 2, 3], "d": [1, 2, 3, 4]}"##,
        )
        .unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.get("a"), Some(Rgba([0, 0, 255, 255])));
        assert_eq!(map.get("b"), Some(Rgba([7, 7, 7, 255])));
        assert_eq!(map.get("c"), Some(Rgba([1, 2, 3, 255])));
        assert_eq!(map.get("d"), Some(Rgba([1, 2, 3, 4])));
        assert_eq!(map.labels().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_colormap_rejects_bad_values() {
        let err = ColorMap::from_json_str(r#"{"tumor": 300}"#).unwrap_err();
        assert!(matches!(err, ColorMapError::InvalidColor { ref label, .. } if label == "tumor"));

        let err = ColorMap::from_json_str(r#"{"tumor": [1, 2]}"#).unwrap_err();
        assert!(err.to_string().contains("expected 3 or 4 channels"));

        let err = ColorMap::from_json_str(r#"{"tumor": true}"#).unwrap_err();
        assert!(matches!(err, ColorMapError::InvalidColor { .. }));
    }

    #[test]
    fn test_colormap_rejects_non_object() {
        assert!(matches!(ColorMap::from_json_str("[1, 2]"), Err(ColorMapError::NotAnObject)));
        assert!(matches!(ColorMap::from_json_str("{"), Err(ColorMapError::Json(_))));
    }

    #[test]
    fn test_colormap_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br##"{"tumor": "#ff0000"}"##).unwrap();

        let map = ColorMap::load(file.path()).unwrap();
        assert_eq!(map.get("tumor"), Some(Rgba([255, 0, 0, 255])));
    }

    #[test]
    fn test_colormap_load_missing_file() {
        let err = ColorMap::load(Path::new("/nonexistent/colormap.json")).unwrap_err();
        assert!(matches!(err, ColorMapError::Io { .. }));
    }
}
