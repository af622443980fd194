use serde::Serialize;

use crate::config::RenderConfig;
use crate::devices::{BuiltinDevice, DeviceDefinition, DeviceRef};
use crate::errors::DevframeResult;
use crate::geometry::{contain_fit, fraction_to_pixel, Rect, Size};

/// The display element that user content is composited into.
pub trait ScreenCutout {
    /// Restore the fixed position that the builtin frame's template defines.
    fn use_template(&mut self, device: BuiltinDevice);
    /// Position the cutout absolutely inside the frame's display box.
    fn set_rect(&mut self, rect: Rect);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CutoutPlacement {
    Template { device: BuiltinDevice },
    Positioned { rect: Rect, degraded: bool },
}

/// Maps stored screen regions onto the current display box of a frame.
///
/// Holds no per-device state: every call derives the layout from the box it
/// is given, so a resize only needs another call.
#[derive(Debug, Clone)]
pub struct RenderMapper {
    fallback_width_fraction: f64,
    fallback_height_fraction: f64,
}

impl Default for RenderMapper {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

impl RenderMapper {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            fallback_width_fraction: config.fallback_width_fraction,
            fallback_height_fraction: config.fallback_height_fraction,
        }
    }

    /// Centred rectangle used when a definition cannot be mapped.
    pub fn fallback_rect(&self, display: Size) -> Rect {
        let width = display.width.max(0.0) * self.fallback_width_fraction;
        let height = display.height.max(0.0) * self.fallback_height_fraction;
        Rect::new(
            (display.width.max(0.0) - width) / 2.0,
            (display.height.max(0.0) - height) / 2.0,
            width,
            height,
        )
    }

    fn try_map(def: &DeviceDefinition, display: Size) -> DevframeResult<Rect> {
        let image = &def.frame_image;
        let fit = contain_fit(
            display.width,
            display.height,
            image.natural_width as f64,
            image.natural_height as f64,
        )?;
        let r = def.screen_region;
        Ok(Rect::new(
            fraction_to_pixel(r.x, fit.offset_x, fit.rendered_width),
            fraction_to_pixel(r.y, fit.offset_y, fit.rendered_height),
            fraction_to_pixel(r.width, 0.0, fit.rendered_width),
            fraction_to_pixel(r.height, 0.0, fit.rendered_height),
        ))
    }

    /// Pixel rectangle of a custom device's screen inside `display`, which is
    /// the box the frame image is drawn into with "contain".
    pub fn map_custom(&self, def: &DeviceDefinition, display: Size) -> CutoutPlacement {
        match Self::try_map(def, display) {
            Ok(rect) => CutoutPlacement::Positioned { rect, degraded: false },
            Err(e) => {
                tracing::warn!(
                    device_id = %def.id,
                    natural_width = def.frame_image.natural_width,
                    natural_height = def.frame_image.natural_height,
                    error = %e,
                    "cannot map screen region, using default rectangle"
                );
                CutoutPlacement::Positioned {
                    rect: self.fallback_rect(display),
                    degraded: true,
                }
            }
        }
    }

    pub fn placement(&self, device: &DeviceRef, display: Size) -> CutoutPlacement {
        match device {
            DeviceRef::Builtin(b) => CutoutPlacement::Template { device: *b },
            DeviceRef::Custom(def) => self.map_custom(def, display),
        }
    }

    /// Compute the placement for the current box and push it to `cutout`.
    pub fn apply(&self, device: &DeviceRef, display: Size, cutout: &mut dyn ScreenCutout) -> CutoutPlacement {
        let placement = self.placement(device, display);
        match placement {
            CutoutPlacement::Template { device } => cutout.use_template(device),
            CutoutPlacement::Positioned { rect, .. } => {
                tracing::debug!(
                    device_id = %device.id(),
                    left = rect.x,
                    top = rect.y,
                    width = rect.width,
                    height = rect.height,
                    "screen cutout positioned"
                );
                cutout.set_rect(rect);
            }
        }
        placement
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::devices::{DeviceFrameImage, ScreenRegion};

    /// Records what the mapper pushed to the display element.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingCutout {
        pub templates: Vec<BuiltinDevice>,
        pub rects: Vec<Rect>,
    }

    impl ScreenCutout for RecordingCutout {
        fn use_template(&mut self, device: BuiltinDevice) {
            self.templates.push(device);
        }

        fn set_rect(&mut self, rect: Rect) {
            self.rects.push(rect);
        }
    }

    fn device(nw: u32, nh: u32, region: ScreenRegion) -> DeviceDefinition {
        DeviceDefinition {
            id: "custom-1".into(),
            name: "Phone".into(),
            frame_image: DeviceFrameImage {
                image_url: "data:image/png;base64,AAAA".into(),
                natural_width: nw,
                natural_height: nh,
            },
            screen_region: region,
        }
    }

    fn assert_rect(actual: Rect, expected: Rect) {
        for (a, e) in [
            (actual.x, expected.x),
            (actual.y, expected.y),
            (actual.width, expected.width),
            (actual.height, expected.height),
        ] {
            assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn letterboxed_box_adds_offset() {
        let def = device(1000, 2000, ScreenRegion::new(0.2, 0.2, 0.6, 0.6).unwrap());
        let placement = RenderMapper::default().map_custom(&def, Size::new(100.0, 300.0));
        let CutoutPlacement::Positioned { rect, degraded } = placement else {
            panic!("expected positioned cutout");
        };
        assert!(!degraded);
        assert_rect(rect, Rect::new(20.0, 90.0, 60.0, 120.0));
    }

    #[test]
    fn region_stays_fixed_relative_to_rendered_image() {
        let def = device(500, 1000, ScreenRegion::new(0.1, 0.05, 0.8, 0.9).unwrap());
        let mapper = RenderMapper::default();
        let natural_aspect = Size::new(250.0, 500.0);
        let wide = Size::new(600.0, 500.0);

        let mut fractions = Vec::new();
        for display in [natural_aspect, wide] {
            let CutoutPlacement::Positioned { rect, .. } = mapper.map_custom(&def, display) else {
                panic!("expected positioned cutout");
            };
            let fit = contain_fit(display.width, display.height, 500.0, 1000.0).unwrap();
            fractions.push((
                (rect.x - fit.offset_x) / fit.rendered_width,
                (rect.width) / fit.rendered_width,
                rect.x / display.width,
            ));
        }
        assert!((fractions[0].0 - fractions[1].0).abs() < 1e-9);
        assert!((fractions[0].1 - fractions[1].1).abs() < 1e-9);
        // Measured against the whole box the two layouts disagree.
        assert!((fractions[0].2 - fractions[1].2).abs() > 0.01);
    }

    #[test]
    fn missing_natural_size_falls_back() {
        let def = device(0, 0, ScreenRegion::new(0.2, 0.2, 0.6, 0.6).unwrap());
        let placement = RenderMapper::default().map_custom(&def, Size::new(200.0, 400.0));
        let CutoutPlacement::Positioned { rect, degraded } = placement else {
            panic!("expected positioned cutout");
        };
        assert!(degraded);
        assert_rect(rect, Rect::new(20.0, 80.0, 160.0, 240.0));
    }

    #[test]
    fn builtin_uses_template_only() {
        let mut cutout = RecordingCutout::default();
        let placement = RenderMapper::default().apply(
            &DeviceRef::Builtin(BuiltinDevice::Ipad),
            Size::new(300.0, 400.0),
            &mut cutout,
        );
        assert_eq!(placement, CutoutPlacement::Template { device: BuiltinDevice::Ipad });
        assert_eq!(cutout.templates, vec![BuiltinDevice::Ipad]);
        assert!(cutout.rects.is_empty());
    }

    #[test]
    fn apply_recomputes_for_each_box() {
        let def = DeviceRef::Custom(device(1000, 2000, ScreenRegion::new(0.2, 0.2, 0.6, 0.6).unwrap()));
        let mapper = RenderMapper::default();
        let mut cutout = RecordingCutout::default();
        mapper.apply(&def, Size::new(200.0, 400.0), &mut cutout);
        mapper.apply(&def, Size::new(100.0, 300.0), &mut cutout);
        assert_eq!(cutout.rects.len(), 2);
        assert_rect(cutout.rects[0], Rect::new(40.0, 80.0, 120.0, 240.0));
        assert_rect(cutout.rects[1], Rect::new(20.0, 90.0, 60.0, 120.0));
    }
}
