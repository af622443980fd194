/// "Contain" layout math and the fraction <-> pixel conversions built on it.
///
/// Calibration maps pointer positions backwards through these functions and
/// the render mapper maps stored fractions forwards through them, so the two
/// directions stay exact inverses of one another.
use crate::errors::{DevframeError, DevframeResult};
use crate::geometry::types::ContainFit;

/// Lay `content_w × content_h` out inside `container_w × container_h`,
/// preserving aspect ratio, fitting entirely, centred.
///
/// Exactly one axis is constrained: its rendered span equals the container
/// span and the other axis is scaled by the same factor, with the leftover
/// split evenly into the offset.
pub fn contain_fit(
    container_w: f64,
    container_h: f64,
    content_w: f64,
    content_h: f64,
) -> DevframeResult<ContainFit> {
    for (name, v) in [
        ("container width", container_w),
        ("container height", container_h),
        ("content width", content_w),
        ("content height", content_h),
    ] {
        if !(v.is_finite() && v > 0.0) {
            return Err(DevframeError::Geometry(format!("{name} must be positive, got {v}")));
        }
    }

    let content_aspect = content_w / content_h;
    let container_aspect = container_w / container_h;

    let (rendered_width, rendered_height) = if content_aspect > container_aspect {
        (container_w, container_w / content_aspect)
    } else {
        (container_h * content_aspect, container_h)
    };

    Ok(ContainFit {
        rendered_width,
        rendered_height,
        offset_x: (container_w - rendered_width) / 2.0,
        offset_y: (container_h - rendered_height) / 2.0,
    })
}

/// `(px - origin_px) / span_px`. Fails on a non-positive span.
pub fn pixel_to_fraction(px: f64, origin_px: f64, span_px: f64) -> DevframeResult<f64> {
    if !(span_px.is_finite() && span_px > 0.0) {
        return Err(DevframeError::Geometry(format!("span must be positive, got {span_px}")));
    }
    Ok((px - origin_px) / span_px)
}

/// Inverse of [`pixel_to_fraction`].
pub fn fraction_to_pixel(fraction: f64, origin_px: f64, span_px: f64) -> f64 {
    origin_px + fraction * span_px
}
