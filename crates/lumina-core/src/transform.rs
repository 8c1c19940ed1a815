//! Transformation parameter codec
//!
//! Encodes a typed transformation set into the abbreviated comma-separated
//! `key=value` segment used by transformation URLs, and parses it back.
//! Unknown keys are ignored on parse so that URLs minted by newer deployments
//! still resolve; validation collects every violation instead of
//! short-circuiting so callers can report all problems at once.

pub const ALLOWED_FORMATS: &[&str] = &["webp", "jpeg", "jpg", "png", "avif", "auto"];
pub const ALLOWED_FIT_MODES: &[&str] = &["cover", "contain", "fill", "inside", "outside"];

pub const MIN_DIMENSION: u32 = 1;
pub const MAX_DIMENSION: u32 = 4000;
pub const MIN_QUALITY: u32 = 1;
pub const MAX_QUALITY: u32 = 100;
pub const MAX_ROTATE: u32 = 360;
pub const MAX_BLUR: f32 = 100.0;

/// A typed transformation parameter set.
///
/// Field order here matches the canonical encoding order of
/// [`TransformParams::to_param_string`]; signatures are computed over that
/// canonical string, so the order must stay stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformParams {
    /// Target width in pixels (`w`)
    pub width: Option<u32>,
    /// Target height in pixels (`h`)
    pub height: Option<u32>,
    /// Output quality 1-100 (`q`)
    pub quality: Option<u32>,
    /// Output format (`f`): webp, jpeg, jpg, png, avif, or auto
    pub format: Option<String>,
    /// Fit mode (`fit`): cover, contain, fill, inside, or outside
    pub fit: Option<String>,
    /// Blur radius 0-100 (`blur`)
    pub blur: Option<f32>,
    /// Brightness adjustment -100..100 (`brightness`)
    pub brightness: Option<i32>,
    /// Contrast adjustment -100..100 (`contrast`)
    pub contrast: Option<i32>,
    /// Saturation adjustment -100..100 (`saturation`)
    pub saturation: Option<i32>,
    /// Rotation in degrees 0-360 (`rotate`)
    pub rotate: Option<u32>,
    /// Horizontal flip (`flip_h`)
    pub flip_h: bool,
    /// Vertical flip (`flip_v`)
    pub flip_v: bool,
}

/// Outcome of validating a transformation set: `valid` is false when any
/// range or enumeration check failed, and `errors` carries one message per
/// violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl TransformParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn quality(mut self, quality: u32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn fit(mut self, fit: &str) -> Self {
        self.fit = Some(fit.to_string());
        self
    }

    pub fn rotate(mut self, degrees: u32) -> Self {
        self.rotate = Some(degrees);
        self
    }

    /// Encode into the canonical abbreviated parameter string, e.g.
    /// `w=400,h=300,q=80,f=webp`. Returns an empty string when no
    /// transformation is set.
    pub fn to_param_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(width) = self.width {
            parts.push(format!("w={}", width));
        }
        if let Some(height) = self.height {
            parts.push(format!("h={}", height));
        }
        if let Some(quality) = self.quality {
            parts.push(format!("q={}", quality));
        }
        if let Some(ref format) = self.format {
            parts.push(format!("f={}", format));
        }
        if let Some(ref fit) = self.fit {
            parts.push(format!("fit={}", fit));
        }
        if let Some(blur) = self.blur {
            parts.push(format!("blur={}", blur));
        }
        if let Some(brightness) = self.brightness {
            parts.push(format!("brightness={}", brightness));
        }
        if let Some(contrast) = self.contrast {
            parts.push(format!("contrast={}", contrast));
        }
        if let Some(saturation) = self.saturation {
            parts.push(format!("saturation={}", saturation));
        }
        if let Some(rotate) = self.rotate {
            parts.push(format!("rotate={}", rotate));
        }
        if self.flip_h {
            parts.push("flip_h=1".to_string());
        }
        if self.flip_v {
            parts.push("flip_v=1".to_string());
        }
        parts.join(",")
    }

    /// Parse an abbreviated parameter string back into a typed set.
    ///
    /// Tolerant by design: unknown keys and unparseable values are skipped,
    /// never rejected, so forward-compatible additions don't break old
    /// parsers. Range violations survive parsing and are reported by
    /// [`TransformParams::validate`].
    pub fn from_param_string(segment: &str) -> Self {
        let mut params = TransformParams::default();
        for pair in segment.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = match pair.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };
            match key {
                "w" => params.width = value.parse().ok(),
                "h" => params.height = value.parse().ok(),
                "q" => params.quality = value.parse().ok(),
                "f" => params.format = Some(value.to_string()),
                "fit" => params.fit = Some(value.to_string()),
                "blur" => params.blur = value.parse().ok(),
                "brightness" => params.brightness = value.parse().ok(),
                "contrast" => params.contrast = value.parse().ok(),
                "saturation" => params.saturation = value.parse().ok(),
                "rotate" => params.rotate = value.parse().ok(),
                "flip_h" => params.flip_h = matches!(value, "1" | "true"),
                "flip_v" => params.flip_v = matches!(value, "1" | "true"),
                // Unknown keys are ignored for forward compatibility.
                _ => {}
            }
        }
        params
    }

    /// Validate ranges and enumerations, collecting every violation.
    pub fn validate(&self) -> TransformValidation {
        let mut errors = Vec::new();

        if let Some(width) = self.width {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&width) {
                errors.push(format!(
                    "Width must be between {} and {} pixels",
                    MIN_DIMENSION, MAX_DIMENSION
                ));
            }
        }
        if let Some(height) = self.height {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&height) {
                errors.push(format!(
                    "Height must be between {} and {} pixels",
                    MIN_DIMENSION, MAX_DIMENSION
                ));
            }
        }
        if let Some(quality) = self.quality {
            if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
                errors.push(format!(
                    "Quality must be between {} and {}",
                    MIN_QUALITY, MAX_QUALITY
                ));
            }
        }
        if let Some(ref format) = self.format {
            if !ALLOWED_FORMATS.contains(&format.as_str()) {
                errors.push(format!(
                    "Format must be one of: {}",
                    ALLOWED_FORMATS.join(", ")
                ));
            }
        }
        if let Some(ref fit) = self.fit {
            if !ALLOWED_FIT_MODES.contains(&fit.as_str()) {
                errors.push(format!(
                    "Fit must be one of: {}",
                    ALLOWED_FIT_MODES.join(", ")
                ));
            }
        }
        if let Some(blur) = self.blur {
            if !(0.0..=MAX_BLUR).contains(&blur) {
                errors.push(format!("Blur must be between 0 and {}", MAX_BLUR as u32));
            }
        }
        if let Some(brightness) = self.brightness {
            if !(-100..=100).contains(&brightness) {
                errors.push("Brightness must be between -100 and 100".to_string());
            }
        }
        if let Some(contrast) = self.contrast {
            if !(-100..=100).contains(&contrast) {
                errors.push("Contrast must be between -100 and 100".to_string());
            }
        }
        if let Some(saturation) = self.saturation {
            if !(-100..=100).contains(&saturation) {
                errors.push("Saturation must be between -100 and 100".to_string());
            }
        }
        if let Some(rotate) = self.rotate {
            if rotate > MAX_ROTATE {
                errors.push(format!(
                    "Rotate must be between 0 and {} degrees",
                    MAX_ROTATE
                ));
            }
        }

        TransformValidation {
            valid: errors.is_empty(),
            errors,
        }
    }
}
