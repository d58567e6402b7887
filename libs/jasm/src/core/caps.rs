//! Video capabilities: pixel formats and the caps strings used to pin them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::JasmError;

/// Pixel format of a CPU video frame. All formats are 4 bytes per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelFormat {
    /// 8-bit red, green, blue, alpha.
    Rgba8,
    /// 8-bit alpha, luma, Cb, Cr (packed AYUV).
    Ayuv8,
}

impl PixelFormat {
    pub const BYTES_PER_PIXEL: usize = 4;

    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Rgba8 => "RGBA",
            PixelFormat::Ayuv8 => "AYUV",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RGBA" => Some(PixelFormat::Rgba8),
            "AYUV" => Some(PixelFormat::Ayuv8),
            _ => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Caps constrain what a port emits or accepts. `None` fields are
/// wildcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoCaps {
    pub format: Option<PixelFormat>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl VideoCaps {
    /// Fully unconstrained caps.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_format(format: PixelFormat) -> Self {
        Self {
            format: Some(format),
            ..Self::default()
        }
    }

    pub fn exact(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            format: Some(format),
            width: Some(width),
            height: Some(height),
        }
    }

    /// Parse a caps string such as
    /// `video/x-raw,format=AYUV,width=1024,height=768`.
    ///
    /// The legacy `video/x-raw-yuv` media type and parenthesized type
    /// annotations in values (`format=(fourcc)AYUV`) are accepted.
    pub fn parse(s: &str) -> Result<Self, JasmError> {
        let mut parts = s.split(',').map(str::trim);
        let media_type = parts
            .next()
            .ok_or_else(|| JasmError::Caps("empty caps string".into()))?;
        if !media_type.starts_with("video/x-raw") {
            return Err(JasmError::Caps(format!(
                "unsupported media type '{media_type}'"
            )));
        }

        let mut caps = VideoCaps::any();
        for field in parts {
            let (key, raw) = field.split_once('=').ok_or_else(|| {
                JasmError::Caps(format!("field '{field}' is not key=value"))
            })?;
            // Strip "(fourcc)"-style annotations.
            let value = match raw.rfind(')') {
                Some(pos) => &raw[pos + 1..],
                None => raw,
            };
            match key {
                "format" => {
                    caps.format = Some(PixelFormat::parse(value).ok_or_else(|| {
                        JasmError::Caps(format!("unknown format '{value}'"))
                    })?);
                }
                "width" => {
                    caps.width = Some(value.parse().map_err(|_| {
                        JasmError::Caps(format!("bad width '{value}'"))
                    })?);
                }
                "height" => {
                    caps.height = Some(value.parse().map_err(|_| {
                        JasmError::Caps(format!("bad height '{value}'"))
                    })?);
                }
                _ => {
                    return Err(JasmError::Caps(format!("unknown caps field '{key}'")));
                }
            }
        }
        Ok(caps)
    }

    /// Two caps are compatible when every field constrained on both sides
    /// agrees. Wildcards match anything.
    pub fn is_compatible_with(&self, other: &VideoCaps) -> bool {
        fn field_ok<T: PartialEq>(a: Option<T>, b: Option<T>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }
        field_ok(self.format, other.format)
            && field_ok(self.width, other.width)
            && field_ok(self.height, other.height)
    }

    /// Whether concrete frame properties satisfy these caps.
    pub fn accepts(&self, format: PixelFormat, width: u32, height: u32) -> bool {
        self.format.is_none_or(|f| f == format)
            && self.width.is_none_or(|w| w == width)
            && self.height.is_none_or(|h| h == height)
    }

    pub fn is_any(&self) -> bool {
        self.format.is_none() && self.width.is_none() && self.height.is_none()
    }
}

impl fmt::Display for VideoCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "video/x-raw")?;
        if let Some(format) = self.format {
            write!(f, ",format={format}")?;
        }
        if let Some(width) = self.width {
            write!(f, ",width={width}")?;
        }
        if let Some(height) = self.height {
            write!(f, ",height={height}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_caps() {
        let caps = VideoCaps::parse("video/x-raw,format=AYUV,width=1024,height=768").unwrap();
        assert_eq!(caps.format, Some(PixelFormat::Ayuv8));
        assert_eq!(caps.width, Some(1024));
        assert_eq!(caps.height, Some(768));
    }

    #[test]
    fn test_parse_legacy_fourcc_annotation() {
        let caps = VideoCaps::parse("video/x-raw-yuv,format=(fourcc)AYUV").unwrap();
        assert_eq!(caps.format, Some(PixelFormat::Ayuv8));
        assert_eq!(caps.width, None);
    }

    #[test]
    fn test_parse_rejects_unknown_media_type() {
        assert!(VideoCaps::parse("audio/x-raw,format=S16LE").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        assert!(VideoCaps::parse("video/x-raw,framerate=30/1").is_err());
    }

    #[test]
    fn test_wildcard_compatibility() {
        let any = VideoCaps::any();
        let ayuv = VideoCaps::with_format(PixelFormat::Ayuv8);
        let rgba = VideoCaps::with_format(PixelFormat::Rgba8);

        assert!(any.is_compatible_with(&ayuv));
        assert!(ayuv.is_compatible_with(&any));
        assert!(!ayuv.is_compatible_with(&rgba));
    }

    #[test]
    fn test_exact_compatibility() {
        let a = VideoCaps::exact(PixelFormat::Rgba8, 1024, 768);
        let b = VideoCaps::exact(PixelFormat::Rgba8, 1024, 768);
        let c = VideoCaps::exact(PixelFormat::Rgba8, 640, 480);

        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
    }

    #[test]
    fn test_accepts_frame_properties() {
        let caps = VideoCaps::with_format(PixelFormat::Rgba8);
        assert!(caps.accepts(PixelFormat::Rgba8, 320, 240));
        assert!(!caps.accepts(PixelFormat::Ayuv8, 320, 240));
    }

    #[test]
    fn test_display_round_trip() {
        let caps = VideoCaps::exact(PixelFormat::Ayuv8, 1024, 768);
        let parsed = VideoCaps::parse(&caps.to_string()).unwrap();
        assert_eq!(caps, parsed);
    }
}
