// ABOUTME: Hosted generative-model client module
// ABOUTME: Gemini transport plus shared model-output hygiene helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Generative model access
//!
//! The vision recognizer and the goal-aware advisory path both talk to the
//! same hosted model through [`GeminiClient`]. The client is constructed
//! once from configuration and injected; there is no lazily-initialized
//! global handle.

/// Google Gemini client implementation
pub mod gemini;

pub use gemini::GeminiClient;

/// Strip markdown code fences from model output
///
/// Models regularly wrap the JSON they were asked for in ` ```json ... ``` `
/// fences. Returns the inner text trimmed; input without fences is returned
/// trimmed and otherwise untouched.
#[must_use]
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fences() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
