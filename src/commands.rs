/// Entry points the UI shell calls. The shell forwards its events here and
/// renders whatever state comes back; all device, geometry and storage
/// decisions stay on this side.
use crate::calibration::CalibrationSession;
use crate::config::AppConfig;
use crate::devices::{BuiltinDevice, DeviceDefinition, DeviceRef, DeviceRegistry, Persisted};
use crate::errors::{DevframeError, DevframeResult};
use crate::geometry::Size;
use crate::media::{self, ExportArtifact, ExportScene, Exporter, Rasterizer};
use crate::render::{frame_display_size, CutoutPlacement, RenderMapper, ScreenCutout};

pub struct Composer {
    config: AppConfig,
    registry: DeviceRegistry,
    mapper: RenderMapper,
    exporter: Exporter,
    current: DeviceRef,
    display: Size,
    screenshot_url: Option<String>,
}

impl Composer {
    pub fn new(config: AppConfig, registry: DeviceRegistry) -> Self {
        let default_device = Self::default_builtin(&config);
        let display = Self::default_display(&config);
        Self {
            mapper: RenderMapper::new(&config.render),
            exporter: Exporter::new(config.export.scale),
            current: DeviceRef::Builtin(default_device),
            display,
            screenshot_url: None,
            registry,
            config,
        }
    }

    fn default_builtin(config: &AppConfig) -> BuiltinDevice {
        BuiltinDevice::from_id(&config.export.default_device).unwrap_or_else(|| {
            tracing::warn!(
                device = %config.export.default_device,
                "unknown default device, using iphone"
            );
            BuiltinDevice::Iphone
        })
    }

    /// Box used for builtin frames, which have no natural size of their own.
    fn default_display(config: &AppConfig) -> Size {
        Size::new(config.render.max_frame_width, config.render.max_frame_height)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn current_device(&self) -> &DeviceRef {
        &self.current
    }

    pub fn display_size(&self) -> Size {
        self.display
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Turn a device id from the UI into a typed reference.
    pub fn resolve_device(&self, id: &str) -> DevframeResult<DeviceRef> {
        if let Some(builtin) = BuiltinDevice::from_id(id) {
            return Ok(DeviceRef::Builtin(builtin));
        }
        self.registry
            .get(id)
            .cloned()
            .map(DeviceRef::Custom)
            .ok_or_else(|| DevframeError::Validation(format!("unknown device '{id}'")))
    }

    /// Show device `id`. The display box is reset for the new frame: custom
    /// frames get their capped natural size, builtins the configured box.
    pub fn select_device(&mut self, id: &str, cutout: &mut dyn ScreenCutout) -> DevframeResult<CutoutPlacement> {
        let device = self.resolve_device(id)?;
        self.display = match &device {
            DeviceRef::Custom(def) => {
                let render = &self.config.render;
                frame_display_size(
                    def.frame_image.natural_width,
                    def.frame_image.natural_height,
                    render.max_frame_width,
                    render.max_frame_height,
                )
                .unwrap_or_else(|| Self::default_display(&self.config))
            }
            DeviceRef::Builtin(_) => Self::default_display(&self.config),
        };
        tracing::info!(device_id = %id, "device selected");
        self.current = device;
        Ok(self.mapper.apply(&self.current, self.display, cutout))
    }

    /// The frame's display box changed size; re-place the cutout.
    pub fn resize_display(&mut self, size: Size, cutout: &mut dyn ScreenCutout) -> CutoutPlacement {
        self.display = size;
        self.mapper.apply(&self.current, self.display, cutout)
    }

    pub fn begin_custom_device(&self) -> CalibrationSession {
        CalibrationSession::new()
    }

    /// Save the wizard's device and display it right away.
    pub fn save_custom_device(
        &mut self,
        session: &mut CalibrationSession,
        cutout: &mut dyn ScreenCutout,
    ) -> DevframeResult<Persisted<DeviceDefinition>> {
        let saved = session.save(&mut self.registry)?;
        self.select_device(&saved.value.id, cutout)?;
        Ok(saved)
    }

    /// Delete a custom device. If it is on display, the default builtin
    /// device takes its place.
    pub fn delete_custom_device(&mut self, id: &str, cutout: &mut dyn ScreenCutout) -> Persisted<bool> {
        let removed = self.registry.remove(id);
        if matches!(&self.current, DeviceRef::Custom(def) if def.id == id) {
            let fallback = Self::default_builtin(&self.config);
            tracing::info!(device_id = %id, fallback = fallback.id(), "displayed device deleted");
            self.current = DeviceRef::Builtin(fallback);
            self.display = Self::default_display(&self.config);
            self.mapper.apply(&self.current, self.display, cutout);
        }
        removed
    }

    /// Decode and keep the screenshot shown inside the device.
    pub async fn set_screenshot(&mut self, bytes: &[u8]) -> DevframeResult<()> {
        let url = media::encode_data_url(bytes)?;
        let decoded = media::decode(url.clone()).await?;
        tracing::info!(
            width = decoded.natural_width,
            height = decoded.natural_height,
            "screenshot loaded"
        );
        self.screenshot_url = Some(url);
        Ok(())
    }

    pub fn clear_screenshot(&mut self) {
        self.screenshot_url = None;
    }

    pub fn has_screenshot(&self) -> bool {
        self.screenshot_url.is_some()
    }

    /// Snapshot of what is on display, laid out for the current box.
    pub fn export_scene(&self) -> DevframeResult<ExportScene> {
        let screenshot_url = self
            .screenshot_url
            .clone()
            .ok_or_else(|| DevframeError::Validation("upload a screenshot before exporting".into()))?;
        let frame_image_url = match &self.current {
            DeviceRef::Builtin(_) => None,
            DeviceRef::Custom(def) => Some(def.frame_image.image_url.clone()),
        };
        Ok(ExportScene {
            device_id: self.current.id().to_string(),
            frame_image_url,
            display_size: self.display,
            cutout: self.mapper.placement(&self.current, self.display),
            screenshot_url,
        })
    }

    pub async fn export(&self, rasterizer: &dyn Rasterizer) -> DevframeResult<ExportArtifact> {
        let scene = self.export_scene()?;
        self.exporter.export(rasterizer, &scene).await
    }
}
