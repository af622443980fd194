/// Data-URL handling and image decoding for frame photos and screenshots.
///
/// Frames are kept as inline data URLs so a saved device is self-contained;
/// decoding happens on a blocking thread and resolves exactly once.
use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use image::{DynamicImage, GenericImageView, ImageFormat};
use regex::Regex;

use crate::errors::{DevframeError, DevframeResult};

fn data_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^data:(?P<mime>[^;,]*)(?P<params>(?:;[^;,]*)*),(?P<data>.*)$")
            .expect("data URL regex")
    })
}

/// Payload of a `data:` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn parse_data_url(url: &str) -> DevframeResult<DataUrl> {
    let caps = data_url_regex()
        .captures(url.trim())
        .ok_or_else(|| DevframeError::Decode("not a data URL".into()))?;

    let mime = caps.name("mime").map(|m| m.as_str()).unwrap_or_default();
    let mime = if mime.is_empty() { "text/plain" } else { mime }.to_ascii_lowercase();
    let is_base64 = caps
        .name("params")
        .map(|p| p.as_str().split(';').any(|param| param.eq_ignore_ascii_case("base64")))
        .unwrap_or(false);
    let data = caps.name("data").map(|m| m.as_str()).unwrap_or_default();

    let bytes = if is_base64 {
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| DevframeError::Decode(format!("bad base64 payload: {e}")))?
    } else {
        data.as_bytes().to_vec()
    };

    Ok(DataUrl { mime, bytes })
}

/// Wrap raw image file bytes into a base64 data URL. The format is sniffed
/// from the bytes, not taken from a file name.
pub fn encode_data_url(bytes: &[u8]) -> DevframeResult<String> {
    let format = image::guess_format(bytes)
        .map_err(|e| DevframeError::Decode(format!("unrecognised image format: {e}")))?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{b64}", format.to_mime_type()))
}

/// A decoded image and its intrinsic size.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub natural_width: u32,
    pub natural_height: u32,
    pub format: Option<ImageFormat>,
    image: Arc<DynamicImage>,
}

impl DecodedImage {
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Dimensions read back from the pixel buffer itself.
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Decode an image held in a data URL.
pub fn decode_data_url(url: &str) -> DevframeResult<DecodedImage> {
    let payload = parse_data_url(url)?;
    decode_bytes(&payload.bytes)
}

pub fn decode_bytes(bytes: &[u8]) -> DevframeResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(DevframeError::Decode("image data is empty".into()));
    }
    let format = image::guess_format(bytes).ok();
    let img = image::load_from_memory(bytes)
        .map_err(|e| DevframeError::Decode(format!("cannot decode image: {e}")))?;
    let (natural_width, natural_height) = img.dimensions();
    if natural_width == 0 || natural_height == 0 {
        return Err(DevframeError::Decode("decoded image has no pixels".into()));
    }
    tracing::debug!(natural_width, natural_height, ?format, "image decoded");
    Ok(DecodedImage {
        natural_width,
        natural_height,
        format,
        image: Arc::new(img),
    })
}

/// Async entry point: decodes on a blocking thread.
pub async fn decode(url: String) -> DevframeResult<DecodedImage> {
    tokio::task::spawn_blocking(move || decode_data_url(&url))
        .await
        .map_err(|e| DevframeError::Decode(format!("join: {e}")))?
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// PNG bytes of a `w × h` opaque image.
    pub(crate) fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([20, 20, 20, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn encode_sniffs_png() {
        let url = encode_data_url(&png_bytes(3, 5)).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn parse_handles_plain_and_base64() {
        let plain = parse_data_url("data:,hello").unwrap();
        assert_eq!(plain.mime, "text/plain");
        assert_eq!(plain.bytes, b"hello");

        let b64 = parse_data_url("data:image/PNG;base64,aGk=").unwrap();
        assert_eq!(b64.mime, "image/png");
        assert_eq!(b64.bytes, b"hi");

        assert!(parse_data_url("https://example.com/a.png").is_err());
        assert!(parse_data_url("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn decode_reports_natural_size() {
        let url = encode_data_url(&png_bytes(40, 80)).unwrap();
        let decoded = decode_data_url(&url).unwrap();
        assert_eq!((decoded.natural_width, decoded.natural_height), (40, 80));
        assert_eq!(decoded.pixel_dimensions(), (40, 80));
        assert_eq!(decoded.format, Some(ImageFormat::Png));
    }

    #[test]
    fn corrupt_data_is_a_decode_error() {
        assert!(encode_data_url(b"definitely not an image").is_err());
        let err = decode_data_url("data:image/png;base64,iVBORw0KGgoAAAA=").unwrap_err();
        assert!(matches!(err, DevframeError::Decode(_)));
    }

    #[tokio::test]
    async fn async_decode_resolves_once() {
        let url = encode_data_url(&png_bytes(10, 20)).unwrap();
        let decoded = decode(url).await.unwrap();
        assert_eq!(decoded.natural_height, 20);
        assert!(decode("data:,nope".into()).await.is_err());
    }
}
