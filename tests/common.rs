// ABOUTME: Shared test utilities for integration tests
// ABOUTME: Provides quiet logging setup and small fixture builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors
#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

//! Shared test utilities
//!
//! Common setup shared by the integration tests to reduce duplication.

use std::sync::Once;

use image::{DynamicImage, ImageOutputFormat, RgbaImage};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("error")
            .with_test_writer()
            .try_init();
    });
}

/// A tiny valid PNG upload for pipeline tests
pub fn png_fixture() -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        8,
        8,
        image::Rgba([200, 160, 40, 255]),
    ));
    let mut buf = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageOutputFormat::Png)
        .expect("encoding a fixture PNG cannot fail");
    buf.into_inner()
}
