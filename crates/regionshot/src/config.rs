//! Assertion configuration.

use crate::paths::normalize;
use crate::result::{SnapError, SnapResult};
use crate::screenshot::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default comparison tolerance
pub const DEFAULT_TOLERANCE: f64 = 2.3;

/// Configuration for screenshot assertions
///
/// All paths are relative to the process working directory unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Directory test file paths are made relative to
    pub project_root: PathBuf,
    /// Directory containing the test files
    pub test_base_path: PathBuf,
    /// Root for reference (baseline) images
    pub reference_path: PathBuf,
    /// Root for candidates that failed to match
    pub unmatched_path: PathBuf,
    /// Root for diff artifacts
    pub diff_path: PathBuf,
    /// Log successful verifications at info level
    pub verbose: bool,
    /// Tolerance used when a call does not set one
    pub tolerance: f64,
    /// Color marking differing pixels in diff artifacts
    pub highlight_color: Color,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            test_base_path: PathBuf::from("func-test"),
            reference_path: PathBuf::from("func-test/screenshots"),
            unmatched_path: PathBuf::from("func-test/screenshots-unmatched"),
            diff_path: PathBuf::from("func-test/screenshots-diff"),
            verbose: false,
            tolerance: DEFAULT_TOLERANCE,
            highlight_color: Color::GREEN,
        }
    }
}

impl SnapConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from YAML, filling missing keys with defaults
    pub fn from_yaml_str(yaml: &str) -> SnapResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| SnapError::config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON, filling missing keys with defaults
    pub fn from_json_str(json: &str) -> SnapResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SnapError::config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML config file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> SnapResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SnapError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Set the project root
    #[must_use]
    pub fn with_project_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_root = dir.into();
        self
    }

    /// Set the test base path
    #[must_use]
    pub fn with_test_base_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_base_path = dir.into();
        self
    }

    /// Set the reference root
    #[must_use]
    pub fn with_reference_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reference_path = dir.into();
        self
    }

    /// Set the unmatched root
    #[must_use]
    pub fn with_unmatched_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.unmatched_path = dir.into();
        self
    }

    /// Set the diff root
    #[must_use]
    pub fn with_diff_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diff_path = dir.into();
        self
    }

    /// Put reference, unmatched and diff roots side by side under `dir`
    #[must_use]
    pub fn with_artifact_root(self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.with_reference_path(dir.join("screenshots"))
            .with_unmatched_path(dir.join("screenshots-unmatched"))
            .with_diff_path(dir.join("screenshots-diff"))
    }

    /// Enable verbose logging
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the default tolerance
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the diff highlight color
    #[must_use]
    pub const fn with_highlight_color(mut self, color: Color) -> Self {
        self.highlight_color = color;
        self
    }

    /// Check that the three artifact roots cannot overwrite each other
    pub fn validate(&self) -> SnapResult<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SnapError::config(format!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }

        let roots = [
            ("reference_path", &self.reference_path),
            ("unmatched_path", &self.unmatched_path),
            ("diff_path", &self.diff_path),
        ];
        let mut normalized = Vec::with_capacity(roots.len());
        for (name, root) in roots {
            let path = normalize(root)
                .map_err(|e| SnapError::config(format!("{name}: {e}")))?;
            if path.as_os_str().is_empty() {
                return Err(SnapError::config(format!(
                    "{name} must name a directory, got {:?}",
                    root.display().to_string()
                )));
            }
            normalized.push((name, root, path));
        }
        for (i, (name_a, a, norm_a)) in normalized.iter().enumerate() {
            for (name_b, b, norm_b) in normalized.iter().skip(i + 1) {
                if norm_a.starts_with(norm_b) || norm_b.starts_with(norm_a) {
                    return Err(SnapError::config(format!(
                        "{name_a} ({}) and {name_b} ({}) must not overlap",
                        a.display(),
                        b.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SnapConfig::default();
        assert_eq!(config.test_base_path, PathBuf::from("func-test"));
        assert_eq!(config.diff_path, PathBuf::from("func-test/screenshots-diff"));
        assert!(!config.verbose);
        assert!((config.tolerance - DEFAULT_TOLERANCE).abs() < f64::EPSILON);
        assert_eq!(config.highlight_color, Color::GREEN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SnapConfig::new()
            .with_test_base_path("tests/e2e")
            .with_artifact_root("out")
            .with_verbose(true)
            .with_tolerance(5.0);
        assert_eq!(config.reference_path, PathBuf::from("out/screenshots"));
        assert_eq!(config.unmatched_path, PathBuf::from("out/screenshots-unmatched"));
        assert!(config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial() {
        let config = SnapConfig::from_yaml_str(
            "test_base_path: spec\nreference_path: spec/ref\nverbose: true\nhighlight_color: '#ff00ff'\n",
        )
        .unwrap();
        assert_eq!(config.test_base_path, PathBuf::from("spec"));
        assert_eq!(config.reference_path, PathBuf::from("spec/ref"));
        assert_eq!(config.unmatched_path, PathBuf::from("func-test/screenshots-unmatched"));
        assert!(config.verbose);
        assert_eq!(config.highlight_color, Color::rgb(255, 0, 255));
    }

    #[test]
    fn test_json() {
        let config = SnapConfig::from_json_str(r#"{"tolerance": 0.5}"#).unwrap();
        assert!((config.tolerance - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = SnapConfig::from_yaml_str("verbose: [").unwrap_err();
        assert!(matches!(err, SnapError::Config { .. }));
    }

    #[test]
    fn test_overlapping_roots_rejected() {
        let config = SnapConfig::new().with_unmatched_path("func-test/screenshots");
        assert!(config.validate().is_err());

        let nested = SnapConfig::new().with_diff_path("func-test/screenshots/diff");
        assert!(nested.validate().is_err());
    }

    #[test]
    fn test_overlap_detected_through_dot_components() {
        let config = SnapConfig::new().with_unmatched_path("./func-test/screenshots");
        assert!(matches!(config.validate(), Err(SnapError::Config { .. })));

        let dotted = SnapConfig::new().with_diff_path("func-test/./screenshots/diff");
        assert!(dotted.validate().is_err());
    }

    #[test]
    fn test_current_dir_root_rejected() {
        assert!(SnapConfig::new().with_diff_path(".").validate().is_err());
        assert!(SnapConfig::new().with_diff_path("out/../diff").validate().is_err());
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        assert!(SnapConfig::new().with_tolerance(-1.0).validate().is_err());
        assert!(SnapConfig::new().with_tolerance(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regionshot.yaml");
        std::fs::write(&path, "diff_path: artifacts/diff\n").unwrap();
        let config = SnapConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.diff_path, PathBuf::from("artifacts/diff"));

        let missing = SnapConfig::from_yaml_file(dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(SnapError::Config { .. })));
    }
}
