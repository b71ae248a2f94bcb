// ABOUTME: Structured logging setup built on tracing-subscriber
// ABOUTME: Supports json, pretty, and compact formats selected by environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Logging configuration with structured output
//!
//! The embedding server calls [`init_logging`] once at startup. The filter
//! honors `RUST_LOG` when set, otherwise the configured level applies to
//! this crate and `warn` to everything else.

use std::env;
use std::io;

use tracing::info;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::LogLevel;
use crate::errors::{AppError, AppResult};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

impl LogFormat {
    /// Parse from string with fallback to `Pretty`
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }

    /// Read the format from `NUTRISCAN_LOG_FORMAT`
    #[must_use]
    pub fn from_env() -> Self {
        env::var("NUTRISCAN_LOG_FORMAT")
            .map(|value| Self::from_str_or_default(&value))
            .unwrap_or(Self::Pretty)
    }
}

/// Initialize the global tracing subscriber
///
/// # Errors
///
/// Returns an error if a subscriber was already installed or the filter
/// directive fails to parse.
pub fn init_logging(level: LogLevel, format: LogFormat) -> AppResult<()> {
    let default_directive = format!("nutriscan={level},warn");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_directive))
        .map_err(|e| AppError::config(format!("invalid log filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);

    let init_result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(io::stderr))
            .try_init(),
    };

    init_result.map_err(|e| AppError::config(format!("failed to install subscriber: {e}")))?;

    info!(%level, ?format, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_with_fallback() {
        assert_eq!(LogFormat::from_str_or_default("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_or_default("COMPACT"), LogFormat::Compact);
        assert_eq!(LogFormat::from_str_or_default("other"), LogFormat::Pretty);
    }
}
