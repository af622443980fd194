use serde::{Deserialize, Serialize};

use crate::devices::builtin::BuiltinDevice;
use crate::errors::{DevframeError, DevframeResult};

/// Slack allowed on the region bounds checks for accumulated float error.
pub const REGION_EPSILON: f64 = 1e-6;

/// Photo of a physical device shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceFrameImage {
    /// Inline byte source, normally a base64 data URL.
    pub image_url: String,
    /// Intrinsic size of the decoded image. Zero means unknown.
    pub natural_width: u32,
    pub natural_height: u32,
}

impl DeviceFrameImage {
    pub fn has_natural_size(&self) -> bool {
        self.natural_width > 0 && self.natural_height > 0
    }
}

/// Where the screen sits inside a frame image, as fractions of the image's
/// natural size. Always in normalized min/max form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRegion {
    /// Validating constructor. Values within [`REGION_EPSILON`] of a bound are
    /// snapped onto it.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> DevframeResult<Self> {
        let values = [x, y, width, height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DevframeError::Validation("screen region contains a non-finite value".into()));
        }
        if width <= REGION_EPSILON || height <= REGION_EPSILON {
            return Err(DevframeError::Validation(format!(
                "screen region has no area ({width} x {height})"
            )));
        }
        if x < -REGION_EPSILON || y < -REGION_EPSILON {
            return Err(DevframeError::Validation(format!(
                "screen region starts outside the image ({x}, {y})"
            )));
        }
        if x + width > 1.0 + REGION_EPSILON || y + height > 1.0 + REGION_EPSILON {
            return Err(DevframeError::Validation(format!(
                "screen region extends past the image ({x}+{width}, {y}+{height})"
            )));
        }

        let x = x.max(0.0);
        let y = y.max(0.0);
        Ok(Self {
            x,
            y,
            width: width.min(1.0 - x),
            height: height.min(1.0 - y),
        })
    }
}

/// A saved custom device. Never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDefinition {
    pub id: String,
    pub name: String,
    pub frame_image: DeviceFrameImage,
    pub screen_region: ScreenRegion,
}

/// A device definition before the registry assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDevice {
    pub name: String,
    pub frame_image: DeviceFrameImage,
    pub screen_region: ScreenRegion,
}

/// A device as chosen in the UI, resolved once at the shell boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceRef {
    Builtin(BuiltinDevice),
    Custom(DeviceDefinition),
}

impl DeviceRef {
    pub fn id(&self) -> &str {
        match self {
            DeviceRef::Builtin(b) => b.id(),
            DeviceRef::Custom(d) => &d.id,
        }
    }
}
