use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::{DevframeError, DevframeResult};
use crate::geometry::Size;
use crate::render::CutoutPlacement;

/// Everything the rasterizer needs to draw the composed mockup.
#[derive(Debug, Clone, Serialize)]
pub struct ExportScene {
    pub device_id: String,
    /// Inline frame photo for custom devices; builtin frames are drawn from their template.
    pub frame_image_url: Option<String>,
    pub display_size: Size,
    pub cutout: CutoutPlacement,
    pub screenshot_url: String,
}

/// Turns a scene into an encoded bitmap. The scene must stay unchanged until
/// the returned future resolves.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, scene: &ExportScene, scale: f32) -> DevframeResult<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub png_bytes: Vec<u8>,
}

/// Runs exports one at a time. Clones share the in-flight flag.
#[derive(Debug, Clone)]
pub struct Exporter {
    in_flight: Arc<AtomicBool>,
    scale: f32,
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Exporter {
    pub fn new(scale: f32) -> Self {
        Self {
            in_flight: Arc::new(AtomicBool::new(false)),
            scale,
        }
    }

    /// True while an export is running; the shell disables its export control.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn export(&self, rasterizer: &dyn Rasterizer, scene: &ExportScene) -> DevframeResult<ExportArtifact> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(device_id = %scene.device_id, "export requested while another is running");
            return Err(DevframeError::ExportInProgress);
        }
        let _guard = InFlightGuard(self.in_flight.clone());

        tracing::info!(device_id = %scene.device_id, scale = self.scale, "export started");
        let bytes = rasterizer.rasterize(scene, self.scale).await?;

        match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Png) => {}
            Ok(other) => {
                return Err(DevframeError::Export(format!("rasterizer returned {other:?}, expected PNG")));
            }
            Err(e) => return Err(DevframeError::Export(format!("rasterizer output unreadable: {e}"))),
        }

        let artifact = ExportArtifact {
            file_name: format!("{}-mockup.png", scene.device_id),
            png_bytes: bytes,
        };
        tracing::info!(file = %artifact.file_name, bytes = artifact.png_bytes.len(), "export finished");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::BuiltinDevice;
    use crate::media::decode::tests::png_bytes;
    use tokio::sync::Notify;

    fn scene() -> ExportScene {
        ExportScene {
            device_id: "iphone".into(),
            frame_image_url: None,
            display_size: Size::new(300.0, 600.0),
            cutout: CutoutPlacement::Template { device: BuiltinDevice::Iphone },
            screenshot_url: "data:image/png;base64,AAAA".into(),
        }
    }

    struct PngRasterizer;

    #[async_trait]
    impl Rasterizer for PngRasterizer {
        async fn rasterize(&self, scene: &ExportScene, scale: f32) -> DevframeResult<Vec<u8>> {
            let w = (scene.display_size.width * scale as f64) as u32;
            let h = (scene.display_size.height * scale as f64) as u32;
            Ok(png_bytes(w, h))
        }
    }

    /// Blocks until released, so a second export can be attempted meanwhile.
    struct GatedRasterizer {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Rasterizer for GatedRasterizer {
        async fn rasterize(&self, _scene: &ExportScene, _scale: f32) -> DevframeResult<Vec<u8>> {
            self.gate.notified().await;
            Ok(png_bytes(2, 2))
        }
    }

    struct JpegRasterizer;

    #[async_trait]
    impl Rasterizer for JpegRasterizer {
        async fn rasterize(&self, _scene: &ExportScene, _scale: f32) -> DevframeResult<Vec<u8>> {
            Ok(vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0])
        }
    }

    #[tokio::test]
    async fn export_names_file_after_device() {
        let exporter = Exporter::new(2.0);
        let artifact = exporter.export(&PngRasterizer, &scene()).await.unwrap();
        assert_eq!(artifact.file_name, "iphone-mockup.png");
        let img = image::load_from_memory(&artifact.png_bytes).unwrap();
        assert_eq!((img.width(), img.height()), (600, 1200));
        assert!(!exporter.is_busy());
    }

    #[tokio::test]
    async fn exports_do_not_interleave() {
        let exporter = Exporter::new(1.0);
        let gate = Arc::new(Notify::new());
        let gated = GatedRasterizer { gate: gate.clone() };
        let s = scene();

        let (first, second) = tokio::join!(exporter.export(&gated, &s), async {
            assert!(exporter.is_busy());
            let second = exporter.export(&PngRasterizer, &s).await;
            gate.notify_one();
            second
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(DevframeError::ExportInProgress)));
        assert!(!exporter.is_busy());
        assert!(exporter.export(&PngRasterizer, &s).await.is_ok());
    }

    #[tokio::test]
    async fn non_png_output_is_rejected_and_releases_flag() {
        let exporter = Exporter::new(1.0);
        let err = exporter.export(&JpegRasterizer, &scene()).await.unwrap_err();
        assert!(matches!(err, DevframeError::Export(_)));
        assert!(!exporter.is_busy());
    }
}
