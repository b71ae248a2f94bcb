// ABOUTME: Visual barcode symbology decoding from uploaded bitmaps
// ABOUTME: Backend is feature-gated; without it the recognizer reports unavailable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Barcode decode recognizer
//!
//! Decoding is an optional capability: the `barcode-rxing` cargo feature
//! pulls in the symbology backend. When it is absent the recognizer reports
//! `Unavailable` rather than a miss, so the pipeline knows the skip is
//! structural and moves straight to the next method without wasting a
//! remote call.

use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;

use super::{AttemptOutcome, Recognizer, ScanInput};
use crate::models::SourceMethod;

/// Decodes EAN/UPC symbology from an uploaded image
#[derive(Debug, Default, Clone, Copy)]
pub struct BarcodeDecode;

impl BarcodeDecode {
    /// Create the barcode decode recognizer
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether a decoding backend is compiled in
    #[must_use]
    pub fn backend_available() -> bool {
        cfg!(feature = "barcode-rxing")
    }
}

#[async_trait]
impl Recognizer for BarcodeDecode {
    fn method(&self) -> SourceMethod {
        SourceMethod::BarcodeDecode
    }

    async fn attempt(&self, input: &ScanInput<'_>) -> AttemptOutcome {
        match input {
            // A bare barcode string needs no visual decoding.
            ScanInput::Barcode(code) => AttemptOutcome::Barcode((*code).to_owned()),
            ScanInput::Image { image, .. } => decode_symbol(image),
        }
    }
}

#[cfg(feature = "barcode-rxing")]
fn decode_symbol(image: &DynamicImage) -> AttemptOutcome {
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();

    match rxing::helpers::detect_in_luma(luma.into_raw(), width, height, None) {
        Ok(result) => {
            let code = result.getText().to_owned();
            debug!(%code, format = ?result.getBarcodeFormat(), "decoded barcode symbol");
            AttemptOutcome::Barcode(code)
        }
        Err(_) => AttemptOutcome::Miss {
            message: "no barcode symbol found in image".to_owned(),
        },
    }
}

#[cfg(not(feature = "barcode-rxing"))]
fn decode_symbol(_image: &DynamicImage) -> AttemptOutcome {
    debug!("barcode decode requested but no backend is compiled in");
    AttemptOutcome::Unavailable {
        message: "barcode decoding backend not compiled in (enable the barcode-rxing feature)"
            .to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bare_barcode_passes_through() {
        let recognizer = BarcodeDecode::new();
        let outcome = recognizer.attempt(&ScanInput::Barcode("4607034170148")).await;
        match outcome {
            AttemptOutcome::Barcode(code) => assert_eq!(code, "4607034170148"),
            other => panic!("expected barcode passthrough, got {other:?}"),
        }
    }

    #[cfg(not(feature = "barcode-rxing"))]
    #[tokio::test]
    async fn image_decode_reports_unavailable_without_backend() {
        let image = DynamicImage::new_rgb8(8, 8);
        let recognizer = BarcodeDecode::new();
        let outcome = recognizer
            .attempt(&ScanInput::Image {
                image: &image,
                hint: None,
            })
            .await;
        assert!(matches!(outcome, AttemptOutcome::Unavailable { .. }));
    }

    #[cfg(feature = "barcode-rxing")]
    #[tokio::test]
    async fn blank_image_is_a_miss_with_backend() {
        let image = DynamicImage::new_rgb8(64, 64);
        let recognizer = BarcodeDecode::new();
        let outcome = recognizer
            .attempt(&ScanInput::Image {
                image: &image,
                hint: None,
            })
            .await;
        assert!(matches!(outcome, AttemptOutcome::Miss { .. }));
    }
}
