//! Upload validation for hen feces photos
//!
//! Only JPEG and PNG are forwarded upstream. The container format is
//! sniffed from magic bytes first so that other formats are reported as
//! unsupported rather than undecodable, then the image is fully decoded to
//! catch truncated or corrupt uploads.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use bytes::Bytes;
use image::{GenericImageView, ImageFormat};
use tokio::task;
use tracing::debug;

/// Image validation failures
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("{0}")]
    Decode(String),

    #[error("unsupported image format: {0}")]
    Unsupported(String),
}

impl ImageError {
    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

/// Accepted upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptedFormat {
    Jpeg,
    Png,
}

impl AcceptedFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }
}

/// A decoded, accepted upload; the original bytes are kept for forwarding
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub format: AcceptedFormat,
    pub width: u32,
    pub height: u32,
    bytes: Bytes,
}

impl ValidatedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:<mime>;base64,<payload>` for inline transport
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            BASE64_STANDARD.encode(&self.bytes)
        )
    }
}

/// Sniff the container format and reject anything but JPEG/PNG
pub fn sniff_format(raw: &[u8]) -> Result<AcceptedFormat, ImageError> {
    if raw.is_empty() {
        return Err(ImageError::Decode("empty image upload".to_string()));
    }

    match image::guess_format(raw) {
        Ok(ImageFormat::Jpeg) => Ok(AcceptedFormat::Jpeg),
        Ok(ImageFormat::Png) => Ok(AcceptedFormat::Png),
        Ok(other) => Err(ImageError::Unsupported(format!("{:?}", other).to_uppercase())),
        Err(e) => Err(ImageError::Decode(e.to_string())),
    }
}

/// Validate synchronously; prefer [`validate_image`] from async code
pub fn validate_image_blocking(raw: Bytes) -> Result<ValidatedImage, ImageError> {
    let format = sniff_format(&raw)?;

    let decoded = image::load_from_memory_with_format(&raw, format.image_format())
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    let (width, height) = decoded.dimensions();

    debug!(
        "Accepted {} upload: {}x{}, {} bytes",
        format.mime_type(),
        width,
        height,
        raw.len()
    );

    Ok(ValidatedImage {
        format,
        width,
        height,
        bytes: raw,
    })
}

/// Validate on the blocking pool
pub async fn validate_image(raw: Bytes) -> Result<ValidatedImage, ImageError> {
    task::spawn_blocking(move || validate_image_blocking(raw))
        .await
        .map_err(|e| ImageError::Decode(format!("image decode task failed: {}", e)))?
}
