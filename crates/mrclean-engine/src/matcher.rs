//! Case-insensitive mask matching

use crate::EngineError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use mrclean_domain::MaskSet;
use std::ffi::OsStr;

/// Compiled form of a [`MaskSet`]
///
/// The all-match set `["*.*"]` compiles to nothing and accepts every name,
/// including names without an extension.
#[derive(Debug, Clone)]
pub struct MaskMatcher {
    set: Option<GlobSet>,
}

impl MaskMatcher {
    /// Compile masks into a matcher
    ///
    /// Malformed patterns such as an unclosed `[` are rejected with
    /// [`EngineError::Mask`] rather than matched literally, so the rule fails.
    pub fn new(masks: &MaskSet) -> Result<Self, EngineError> {
        if masks.is_match_all() {
            return Ok(Self { set: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in masks.patterns() {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|source| EngineError::Mask {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|source| EngineError::Mask {
            pattern: masks.to_string(),
            source,
        })?;
        Ok(Self { set: Some(set) })
    }

    /// Matcher that accepts every name
    pub fn match_all() -> Self {
        Self { set: None }
    }

    /// Whether this matcher skips glob evaluation entirely
    pub fn is_match_all(&self) -> bool {
        self.set.is_none()
    }

    /// Whether a file name matches at least one mask
    pub fn matches(&self, file_name: &OsStr) -> bool {
        match &self.set {
            None => true,
            Some(set) => set.is_match(file_name),
        }
    }
}
