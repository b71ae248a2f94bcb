// ABOUTME: Image decoding and JPEG re-encoding for uploaded scan payloads
// ABOUTME: Decode failure here is the pipeline's only fatal error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Bitmap handling for uploaded images
//!
//! Uploads are read fully into memory before processing; no streaming
//! decode. Before an image is handed to the remote vision API it is
//! re-encoded as JPEG at quality 85 (alpha and palette images are converted
//! to RGB first, since JPEG cannot carry them).

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageOutputFormat};
use tracing::debug;

use crate::errors::{AppError, AppResult};

/// JPEG quality used for the vision payload
pub const VISION_JPEG_QUALITY: u8 = 85;

/// Decode uploaded bytes into a bitmap
///
/// # Errors
///
/// Returns [`crate::errors::ErrorCode::ImageDecodeFailed`] when the payload
/// is corrupt or not an image. This is the sole error that aborts a
/// pipeline run.
pub fn decode_image(bytes: &[u8]) -> AppResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| {
        AppError::image_decode(format!("uploaded bytes are not a decodable image: {e}"))
            .with_details(serde_json::json!({ "payload_len": bytes.len() }))
    })
}

/// Re-encode a bitmap as quality-85 JPEG bytes
///
/// # Errors
///
/// Returns an internal error if encoding fails, which only happens on
/// pathological dimensions.
pub fn encode_jpeg(image: &DynamicImage) -> AppResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buffer = Vec::new();
    rgb.write_to(
        &mut Cursor::new(&mut buffer),
        ImageOutputFormat::Jpeg(VISION_JPEG_QUALITY),
    )
    .map_err(|e| AppError::internal(format!("JPEG re-encoding failed: {e}")))?;

    debug!(bytes = buffer.len(), "re-encoded image for vision payload");
    Ok(buffer)
}

/// Re-encode a bitmap as base64 JPEG for the inline vision payload
///
/// # Errors
///
/// Propagates the [`encode_jpeg`] failure case.
pub fn encode_jpeg_base64(image: &DynamicImage) -> AppResult<String> {
    Ok(BASE64.encode(encode_jpeg(image)?))
}
