//! Data-URI handling for image analysis.
//!
//! Images arrive as `data:<mime>;base64,<payload>`. The model receives the raw
//! base64 payload; the action boundary checks the MIME type and decoded size
//! before anything is forwarded.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// MIME types accepted for medical image analysis.
pub const ALLOWED_IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Split a base64 data URI into MIME type and payload. Returns `None`
    /// for anything that is not `data:<mime>;base64,<payload>`.
    pub fn parse(uri: &'a str) -> Option<Self> {
        let rest = uri.trim().strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        if mime.is_empty() || !mime.contains('/') || payload.is_empty() {
            return None;
        }
        Some(Self { mime, payload })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("The image must be sent as a base64 data URI")]
    Malformed,

    #[error("Unsupported image type '{0}', use JPEG, PNG, WebP or GIF")]
    UnsupportedType(String),

    #[error("The image data is not valid base64")]
    InvalidEncoding,

    #[error("Image too large ({size} bytes), maximum is {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// Validate an image data URI and return its decoded size in bytes.
///
/// The size check runs on the encoded length first so oversized payloads
/// are rejected without decoding them.
pub fn validate_image_data_uri(uri: &str, max_bytes: usize) -> Result<usize, MediaError> {
    let data = DataUri::parse(uri).ok_or(MediaError::Malformed)?;

    let mime = data.mime.to_ascii_lowercase();
    if !ALLOWED_IMAGE_MIME_TYPES.contains(&mime.as_str()) {
        return Err(MediaError::UnsupportedType(data.mime.to_string()));
    }

    let estimated = data.payload.len() / 4 * 3;
    if estimated > max_bytes.saturating_add(2) {
        return Err(MediaError::TooLarge {
            size: estimated,
            max: max_bytes,
        });
    }

    let decoded = STANDARD
        .decode(data.payload.trim())
        .map_err(|_| MediaError::InvalidEncoding)?;

    if decoded.len() > max_bytes {
        return Err(MediaError::TooLarge {
            size: decoded.len(),
            max: max_bytes,
        });
    }

    Ok(decoded.len())
}
