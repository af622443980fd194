/// On-disk record shapes for custom devices and the upgrade path from the
/// shapes written by earlier releases.
///
/// Versions:
///   - 0: `screenCoordinates { left, top, width, height }` in natural-image pixels
///   - 1: `screenCoordinates` bundle that also carries `percentX/percentY/percentWidth/percentHeight`
///   - 2: `screenRegion { x, y, width, height }` fractions plus an explicit `version`
///
/// Versions 0 and 1 predate the `version` field and are recognised by content.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::devices::types::{DeviceDefinition, DeviceFrameImage, ScreenRegion};
use crate::errors::{DevframeError, DevframeResult};

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDevice {
    pub version: u32,
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub width: u32,
    pub height: u32,
    pub screen_region: StoredRegion,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Same as [`StoredDevice`] but tolerant of a missing `version`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnversionedDevice {
    id: String,
    name: String,
    image_url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    screen_region: StoredRegion,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDevice {
    id: String,
    name: String,
    image_url: String,
    width: Option<f64>,
    height: Option<f64>,
    image_width: Option<f64>,
    image_height: Option<f64>,
    screen_coordinates: LegacyCoordinates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCoordinates {
    left: Option<f64>,
    top: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    percent_x: Option<f64>,
    percent_y: Option<f64>,
    percent_width: Option<f64>,
    percent_height: Option<f64>,
    image_width: Option<f64>,
    image_height: Option<f64>,
}

impl From<&DeviceDefinition> for StoredDevice {
    fn from(def: &DeviceDefinition) -> Self {
        let r = def.screen_region;
        Self {
            version: CURRENT_SCHEMA_VERSION,
            id: def.id.clone(),
            name: def.name.clone(),
            image_url: def.frame_image.image_url.clone(),
            width: def.frame_image.natural_width,
            height: def.frame_image.natural_height,
            screen_region: StoredRegion {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
            },
        }
    }
}

/// Which shape a raw record was recognised as. Reported for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    AbsolutePixels,
    PercentBundle,
    Fractions,
}

impl RecordShape {
    pub fn version(&self) -> u32 {
        match self {
            RecordShape::AbsolutePixels => 0,
            RecordShape::PercentBundle => 1,
            RecordShape::Fractions => CURRENT_SCHEMA_VERSION,
        }
    }
}

/// Upgrade one raw stored record to a [`DeviceDefinition`].
pub fn migrate_record(value: Value) -> DevframeResult<(DeviceDefinition, RecordShape)> {
    match value.get("version").and_then(Value::as_u64) {
        Some(v) if v > CURRENT_SCHEMA_VERSION as u64 => {
            return Err(DevframeError::Persistence(format!(
                "record written by a newer schema (version {v})"
            )));
        }
        Some(v) if v == CURRENT_SCHEMA_VERSION as u64 => {
            let s: StoredDevice = serde_json::from_value(value)?;
            let def = from_fractions(s.id, s.name, s.image_url, s.width, s.height, s.screen_region)?;
            return Ok((def, RecordShape::Fractions));
        }
        _ => {}
    }

    if value.get("screenRegion").is_some() {
        let d: UnversionedDevice = serde_json::from_value(value)?;
        let def = from_fractions(d.id, d.name, d.image_url, d.width, d.height, d.screen_region)?;
        return Ok((def, RecordShape::Fractions));
    }

    let legacy: LegacyDevice = serde_json::from_value(value)?;
    migrate_legacy(legacy)
}

fn from_fractions(
    id: String,
    name: String,
    image_url: String,
    width: u32,
    height: u32,
    r: StoredRegion,
) -> DevframeResult<DeviceDefinition> {
    Ok(DeviceDefinition {
        id,
        name,
        frame_image: DeviceFrameImage {
            image_url,
            natural_width: width,
            natural_height: height,
        },
        screen_region: ScreenRegion::new(r.x, r.y, r.width, r.height)?,
    })
}

fn to_dimension(v: Option<f64>) -> u32 {
    match v {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u32,
        _ => 0,
    }
}

/// Legacy records were captured from an unclamped pointer, so their box can
/// overhang the image. Clip it to the image; only an empty result is fatal.
fn clipped_region(x: f64, y: f64, width: f64, height: f64) -> DevframeResult<ScreenRegion> {
    let x0 = x.clamp(0.0, 1.0);
    let y0 = y.clamp(0.0, 1.0);
    let x1 = (x + width).clamp(0.0, 1.0);
    let y1 = (y + height).clamp(0.0, 1.0);
    ScreenRegion::new(x0, y0, x1 - x0, y1 - y0)
}

fn migrate_legacy(d: LegacyDevice) -> DevframeResult<(DeviceDefinition, RecordShape)> {
    let c = &d.screen_coordinates;
    let natural_width = to_dimension(d.width.or(d.image_width).or(c.image_width));
    let natural_height = to_dimension(d.height.or(d.image_height).or(c.image_height));

    let (region, shape) = match (c.percent_x, c.percent_y, c.percent_width, c.percent_height) {
        (Some(x), Some(y), Some(w), Some(h)) => {
            (clipped_region(x, y, w, h)?, RecordShape::PercentBundle)
        }
        _ => {
            let (Some(left), Some(top), Some(w), Some(h)) = (c.left, c.top, c.width, c.height) else {
                return Err(DevframeError::Persistence(format!(
                    "device '{}' has neither percentages nor pixel coordinates",
                    d.id
                )));
            };
            if natural_width == 0 || natural_height == 0 {
                return Err(DevframeError::Persistence(format!(
                    "device '{}' stores pixel coordinates without an image size",
                    d.id
                )));
            }
            let nw = natural_width as f64;
            let nh = natural_height as f64;
            (
                clipped_region(left / nw, top / nh, w / nw, h / nh)?,
                RecordShape::AbsolutePixels,
            )
        }
    };

    Ok((
        DeviceDefinition {
            id: d.id,
            name: d.name,
            frame_image: DeviceFrameImage {
                image_url: d.image_url,
                natural_width,
                natural_height,
            },
            screen_region: region,
        },
        shape,
    ))
}
