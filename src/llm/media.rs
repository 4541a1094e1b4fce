use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

pub const MAX_DIMENSION: u32 = 1280;
pub const JPEG_QUALITY: u8 = 85;

#[derive(Debug, thiserror::Error)]
#[error("無法處理圖片 {filename}: {reason}")]
pub struct ImageDecodeError {
    pub filename: String,
    pub reason: String,
}

/// One raw file as it arrived on the form, before any validation.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub declared_mime: Option<String>,
    pub filename: String,
}

/// Bounded, recompressed image ready to be inlined into a model request.
/// Immutable once produced and discarded with the request.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub data_uri: String,
    pub filename: String,
}

impl ImagePayload {
    /// The bare base64 portion of the data URI.
    pub fn base64_data(&self) -> &str {
        self.data_uri
            .split_once(',')
            .map(|(_, data)| data)
            .unwrap_or("")
    }
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| kind.mime_type().to_string())
}

fn is_jpeg_mime(mime_type: &str) -> bool {
    let lowered = mime_type.to_lowercase();
    lowered.contains("jpeg") || lowered.contains("jpg")
}

fn decode_error(upload: &UploadedImage, reason: impl ToString) -> ImageDecodeError {
    ImageDecodeError {
        filename: upload.filename.clone(),
        reason: reason.to_string(),
    }
}

fn encode_image(
    img: &DynamicImage,
    mime_type: &str,
    original: &[u8],
) -> Result<(Vec<u8>, String), image::ImageError> {
    let mut output = Vec::new();

    if is_jpeg_mime(mime_type) {
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut output), JPEG_QUALITY);
        img.to_rgb8().write_with_encoder(encoder)?;
        return Ok((output, mime_type.to_string()));
    }

    // Non-JPEG input keeps its original container when we can re-encode it,
    // otherwise it is rewritten as PNG.
    let (format, mime) = match image::guess_format(original) {
        Ok(ImageFormat::Jpeg) => (ImageFormat::Jpeg, mime_type.to_string()),
        Ok(ImageFormat::WebP) => (ImageFormat::WebP, mime_type.to_string()),
        Ok(ImageFormat::Png) => (ImageFormat::Png, mime_type.to_string()),
        _ => (ImageFormat::Png, "image/png".to_string()),
    };
    img.write_to(&mut Cursor::new(&mut output), format)?;
    Ok((output, mime))
}

/// Decodes one uploaded file, bounds it to `MAX_DIMENSION` per axis and
/// re-encodes it as an inline data URI. Any decode or encode failure is the
/// caller's signal that the upload was not a usable image.
pub fn normalize_image(upload: &UploadedImage) -> Result<ImagePayload, ImageDecodeError> {
    let img = image::load_from_memory(&upload.bytes)
        .map_err(|err| decode_error(upload, err))?;

    let img = if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        img
    };

    let mime_type = upload
        .declared_mime
        .clone()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| detect_mime_type(&upload.bytes))
        .unwrap_or_else(|| "image/jpeg".to_string());

    let (compressed, mime_type) =
        encode_image(&img, &mime_type, &upload.bytes).map_err(|err| decode_error(upload, err))?;

    debug!(
        "圖片壓縮完成: {} 原始 {:.2} KB → 壓縮 {:.2} KB ({}x{})",
        upload.filename,
        upload.bytes.len() as f64 / 1024.0,
        compressed.len() as f64 / 1024.0,
        img.width(),
        img.height()
    );

    let data_uri = format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(&compressed)
    );

    Ok(ImagePayload {
        mime_type,
        width: img.width(),
        height: img.height(),
        data_uri,
        filename: upload.filename.clone(),
    })
}
