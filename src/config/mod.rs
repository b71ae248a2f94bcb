// ABOUTME: Environment-based configuration for the recognition core
// ABOUTME: Parses env vars into a typed ServerConfig with sensible defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Environment-based configuration management
//!
//! All runtime settings come from environment variables, parsed once at
//! process start into a [`ServerConfig`] that is passed by reference to the
//! pipeline and its collaborators. Nothing here is read lazily at call time.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

use crate::errors::AppResult;

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable overriding the vision model name
pub const GEMINI_MODEL_ENV: &str = "NUTRISCAN_GEMINI_MODEL";
/// Environment variable overriding the product catalog base URL
pub const CATALOG_BASE_URL_ENV: &str = "NUTRISCAN_CATALOG_BASE_URL";
/// Environment variable for the remote call timeout in seconds
pub const HTTP_TIMEOUT_ENV: &str = "NUTRISCAN_HTTP_TIMEOUT_SECS";
/// Environment variable for the TCP connect timeout in seconds
pub const CONNECT_TIMEOUT_ENV: &str = "NUTRISCAN_CONNECT_TIMEOUT_SECS";
/// Environment variable for the log level
pub const LOG_LEVEL_ENV: &str = "NUTRISCAN_LOG_LEVEL";
/// Environment variable for the fallback portion weight estimate
pub const DEFAULT_WEIGHT_ENV: &str = "NUTRISCAN_DEFAULT_WEIGHT_GRAMS";

/// Default product catalog (OpenFoodFacts v2)
pub const DEFAULT_CATALOG_BASE_URL: &str = "https://world.openfoodfacts.org/api/v2";
/// Default bounded timeout for every remote recognizer call
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Portion estimate used when the caller supplies no weight
pub const DEFAULT_WEIGHT_GRAMS: f64 = 150.0;
/// Default vision model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-001";

/// Strongly typed log level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Standard operational logging
    #[default]
    Info,
    /// Verbose debugging
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Convert to `tracing::Level`
    #[must_use]
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback to `Info`
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Runtime configuration for the recognition core
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Gemini API key; `None` disables the vision recognizer and AI advice
    pub gemini_api_key: Option<String>,
    /// Vision model name
    pub gemini_model: String,
    /// Product catalog base URL
    pub catalog_base_url: String,
    /// Bounded timeout applied to every remote call, in seconds
    pub http_timeout_secs: u64,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Portion weight estimate used when the caller supplies none, in grams
    pub default_weight_grams: f64,
    /// Log level
    pub log_level: LogLevel,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_owned(),
            catalog_base_url: DEFAULT_CATALOG_BASE_URL.to_owned(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            default_weight_grams: DEFAULT_WEIGHT_GRAMS,
            log_level: LogLevel::Info,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    ///
    /// Missing variables fall back to defaults; a missing Gemini key is not
    /// an error (the vision recognizer reports itself unavailable instead).
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is present but unparsable.
    pub fn from_env() -> AppResult<Self> {
        let gemini_api_key = env::var(GEMINI_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if gemini_api_key.is_none() {
            warn!(
                "{} not set; vision identification and AI advice are disabled",
                GEMINI_API_KEY_ENV
            );
        }

        let config = Self {
            gemini_api_key,
            gemini_model: env::var(GEMINI_MODEL_ENV)
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_owned()),
            catalog_base_url: env::var(CATALOG_BASE_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_CATALOG_BASE_URL.to_owned())
                .trim_end_matches('/')
                .to_owned(),
            http_timeout_secs: parse_env_u64(HTTP_TIMEOUT_ENV, DEFAULT_HTTP_TIMEOUT_SECS)?,
            connect_timeout_secs: parse_env_u64(CONNECT_TIMEOUT_ENV, DEFAULT_CONNECT_TIMEOUT_SECS)?,
            default_weight_grams: parse_env_f64(DEFAULT_WEIGHT_ENV, DEFAULT_WEIGHT_GRAMS)?,
            log_level: env::var(LOG_LEVEL_ENV)
                .map(|value| LogLevel::from_str_or_default(&value))
                .unwrap_or_default(),
        };

        info!(
            catalog = %config.catalog_base_url,
            timeout_secs = config.http_timeout_secs,
            vision_enabled = config.gemini_api_key.is_some(),
            "configuration loaded"
        );

        Ok(config)
    }
}

fn parse_env_u64(var: &str, default: u64) -> AppResult<u64> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
            crate::errors::AppError::config(format!("{var} must be an integer: {e}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_f64(var: &str, default: f64) -> AppResult<f64> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse::<f64>().map_err(|e| {
            crate::errors::AppError::config(format!("{var} must be a number: {e}"))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parses_with_fallback() {
        assert_eq!(LogLevel::from_str_or_default("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_or_default("nonsense"), LogLevel::Info);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.http_timeout_secs, 10);
        assert!((config.default_weight_grams - 150.0).abs() < f64::EPSILON);
        assert_eq!(config.catalog_base_url, DEFAULT_CATALOG_BASE_URL);
    }
}
