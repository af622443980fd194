use serde::Serialize;

use crate::calibration::drag::DragSelection;
use crate::devices::{DeviceDefinition, DeviceFrameImage, DeviceRegistry, NewDevice, Persisted, ScreenRegion};
use crate::errors::{DevframeError, DevframeResult};
use crate::geometry::{contain_fit, fraction_to_pixel, pixel_to_fraction, Point, Rect, Size};
use crate::media::{self, DecodedImage};

/// Steps of the "add custom device" wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    ImageIntake,
    RegionSelection,
    Metadata,
}

impl WizardStep {
    /// 1-based position shown in the wizard header.
    pub fn number(self) -> u8 {
        match self {
            WizardStep::ImageIntake => 1,
            WizardStep::RegionSelection => 2,
            WizardStep::Metadata => 3,
        }
    }
}

/// A finished drag: fractions of the image box it was drawn over, plus that box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSelection {
    pub region: ScreenRegion,
    pub image_box: Rect,
}

struct FrameUpload {
    url: String,
    decoded: DecodedImage,
}

/// Transient state of one run through the wizard. Nothing here is persisted
/// until [`CalibrationSession::save`] hands a finished device to the registry.
pub struct CalibrationSession {
    session_id: String,
    step: WizardStep,
    upload: Option<FrameUpload>,
    drag: DragSelection,
    selection: Option<BoxSelection>,
    name: String,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationSession {
    pub fn new() -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(session_id = %session_id, "calibration session opened");
        Self {
            session_id,
            step: WizardStep::ImageIntake,
            upload: None,
            drag: DragSelection::default(),
            selection: None,
            name: String::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn image_url(&self) -> Option<&str> {
        self.upload.as_ref().map(|u| u.url.as_str())
    }

    /// Natural size of the uploaded frame, as decoded.
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        self.upload
            .as_ref()
            .map(|u| (u.decoded.natural_width, u.decoded.natural_height))
    }

    /// The current finished selection, in fractions of the image box.
    pub fn selection(&self) -> Option<BoxSelection> {
        self.selection
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    // ── Step 1: image intake ─────────────────────────────────────────────────

    /// Decode the frame photo held in `url`. On failure the session keeps
    /// whatever it had before so the user can pick another file.
    pub async fn load_image(&mut self, url: String) -> DevframeResult<()> {
        self.require_step(WizardStep::ImageIntake, "load an image")?;

        let decoded = match media::decode(url.clone()).await {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "frame image rejected");
                return Err(e);
            }
        };
        tracing::info!(
            session_id = %self.session_id,
            natural_width = decoded.natural_width,
            natural_height = decoded.natural_height,
            "frame image loaded"
        );
        self.upload = Some(FrameUpload { url, decoded });
        self.drag.clear();
        self.selection = None;
        Ok(())
    }

    /// Same as [`Self::load_image`] for raw file bytes.
    pub async fn load_image_bytes(&mut self, bytes: &[u8]) -> DevframeResult<()> {
        self.require_step(WizardStep::ImageIntake, "load an image")?;
        let url = media::encode_data_url(bytes)?;
        self.load_image(url).await
    }

    // ── Navigation ───────────────────────────────────────────────────────────

    /// Whether the current step's precondition for moving forward holds.
    pub fn can_advance(&self) -> bool {
        match self.step {
            WizardStep::ImageIntake => self.upload.is_some(),
            WizardStep::RegionSelection => self.selection.is_some() && !self.drag.is_dragging(),
            WizardStep::Metadata => false,
        }
    }

    pub fn can_save(&self) -> bool {
        self.step == WizardStep::Metadata
            && self.upload.is_some()
            && self.selection.is_some()
            && !self.name.trim().is_empty()
    }

    pub fn next(&mut self) -> DevframeResult<WizardStep> {
        if !self.can_advance() {
            let reason = match self.step {
                WizardStep::ImageIntake => "upload a device image first",
                WizardStep::RegionSelection => "draw the screen area first",
                WizardStep::Metadata => "this is the last step",
            };
            return Err(DevframeError::Validation(reason.into()));
        }
        self.step = match self.step {
            WizardStep::ImageIntake => WizardStep::RegionSelection,
            WizardStep::RegionSelection | WizardStep::Metadata => WizardStep::Metadata,
        };
        tracing::debug!(session_id = %self.session_id, step = ?self.step, "wizard advanced");
        Ok(self.step)
    }

    /// One step back. Step 1 stays on step 1. Entered data is kept.
    pub fn back(&mut self) -> WizardStep {
        self.drag = DragSelection::default();
        self.step = match self.step {
            WizardStep::ImageIntake | WizardStep::RegionSelection => WizardStep::ImageIntake,
            WizardStep::Metadata => WizardStep::RegionSelection,
        };
        tracing::debug!(session_id = %self.session_id, step = ?self.step, "wizard went back");
        self.step
    }

    // ── Step 2: region selection ─────────────────────────────────────────────

    /// Pointer pressed at `p` (container coordinates) while the frame image
    /// occupies `image_box` inside the same container.
    pub fn pointer_down(&mut self, p: Point, image_box: Rect) -> bool {
        if self.step != WizardStep::RegionSelection || self.upload.is_none() {
            return false;
        }
        let started = self.drag.press(p, image_box);
        if started {
            self.selection = None;
        }
        started
    }

    /// Live rectangle in container coordinates while dragging.
    pub fn pointer_move(&mut self, p: Point) -> Option<Rect> {
        self.drag.update(p)
    }

    /// Finishes the drag. A rectangle with no area leaves the selection unset.
    pub fn pointer_up(&mut self, p: Point) -> Option<ScreenRegion> {
        let rect = self.drag.release(p)?;
        let image_box = self.drag.image_box()?;

        match box_fractions(rect, image_box) {
            Ok(region) => {
                tracing::debug!(session_id = %self.session_id, ?region, "screen area selected");
                self.selection = Some(BoxSelection { region, image_box });
                Some(region)
            }
            Err(e) => {
                tracing::debug!(session_id = %self.session_id, error = %e, "selection discarded");
                self.selection = None;
                None
            }
        }
    }

    pub fn reset_selection(&mut self) {
        self.drag.clear();
        self.selection = None;
    }

    // ── Step 3: metadata + save ──────────────────────────────────────────────

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Assemble the device and add it to `registry`. On success the session
    /// starts over; on error it stays on step 3 with everything intact.
    pub fn save(&mut self, registry: &mut DeviceRegistry) -> DevframeResult<Persisted<DeviceDefinition>> {
        self.require_step(WizardStep::Metadata, "save")?;
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DevframeError::Validation("enter a name for the device".into()));
        }
        let (Some(upload), Some(selection)) = (&self.upload, self.selection) else {
            return Err(DevframeError::Validation("missing image or screen area".into()));
        };

        let (natural_width, natural_height) = upload.decoded.pixel_dimensions();
        if (natural_width, natural_height) != (upload.decoded.natural_width, upload.decoded.natural_height) {
            tracing::warn!(
                session_id = %self.session_id,
                natural_width,
                natural_height,
                "decoded size changed since upload, using pixel buffer size"
            );
        }

        let screen_region = natural_fractions(selection, natural_width, natural_height)?;
        let new_device = NewDevice {
            name: name.to_string(),
            frame_image: DeviceFrameImage {
                image_url: upload.url.clone(),
                natural_width,
                natural_height,
            },
            screen_region,
        };

        match registry.add(new_device) {
            Ok(saved) => {
                tracing::info!(session_id = %self.session_id, device_id = %saved.value.id, "custom device saved");
                self.cancel();
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "saving custom device failed");
                Err(e)
            }
        }
    }

    /// Drops all transient state and returns to step 1.
    pub fn cancel(&mut self) {
        self.step = WizardStep::ImageIntake;
        self.upload = None;
        self.drag.clear();
        self.selection = None;
        self.name.clear();
        tracing::debug!(session_id = %self.session_id, "calibration session reset");
    }

    fn require_step(&self, step: WizardStep, action: &str) -> DevframeResult<()> {
        if self.step != step {
            return Err(DevframeError::Validation(format!(
                "cannot {action} on step {} (needs step {})",
                self.step.number(),
                step.number()
            )));
        }
        Ok(())
    }
}

/// Fractions of `image_box` covered by `rect`; both in container pixels.
fn box_fractions(rect: Rect, image_box: Rect) -> DevframeResult<ScreenRegion> {
    ScreenRegion::new(
        pixel_to_fraction(rect.x, image_box.x, image_box.width)?,
        pixel_to_fraction(rect.y, image_box.y, image_box.height)?,
        pixel_to_fraction(rect.width, 0.0, image_box.width)?,
        pixel_to_fraction(rect.height, 0.0, image_box.height)?,
    )
}

/// Re-anchor a box selection onto the image's natural size.
///
/// The image is drawn into its box with "contain", so when the box's aspect
/// ratio differs from the image's the selection is shifted by the letterbox
/// offset and clipped to the image content.
pub fn natural_fractions(selection: BoxSelection, natural_width: u32, natural_height: u32) -> DevframeResult<ScreenRegion> {
    let box_size: Size = selection.image_box.size();
    let fit = contain_fit(box_size.width, box_size.height, natural_width as f64, natural_height as f64)?;
    let r = selection.region;

    let left = fraction_to_pixel(r.x, 0.0, box_size.width);
    let top = fraction_to_pixel(r.y, 0.0, box_size.height);
    let right = fraction_to_pixel(r.x + r.width, 0.0, box_size.width);
    let bottom = fraction_to_pixel(r.y + r.height, 0.0, box_size.height);

    let x0 = pixel_to_fraction(left, fit.offset_x, fit.rendered_width)?.clamp(0.0, 1.0);
    let y0 = pixel_to_fraction(top, fit.offset_y, fit.rendered_height)?.clamp(0.0, 1.0);
    let x1 = pixel_to_fraction(right, fit.offset_x, fit.rendered_width)?.clamp(0.0, 1.0);
    let y1 = pixel_to_fraction(bottom, fit.offset_y, fit.rendered_height)?.clamp(0.0, 1.0);

    ScreenRegion::new(x0, y0, x1 - x0, y1 - y0)
        .map_err(|_| DevframeError::Validation("the selected area does not cover the device image".into()))
}
