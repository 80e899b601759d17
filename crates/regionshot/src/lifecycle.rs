//! Reference / candidate / diff lifecycle.
//!
//! # State machine
//!
//! ```text
//! Start ──(reference absent)──► Bootstrap ──► Bootstrapped   (warning, not a failure)
//!   │
//!   └──(reference present)──► Compare ──(match)────► CleanupUnmatched ──► Passed
//!                                │
//!                                └──(mismatch)──► ProduceDiff ──► Err(Mismatch)
//! ```
//!
//! The reference is written only by Bootstrap, and only if no reference
//! exists at that instant: the candidate goes to a temporary sibling which is
//! then hard-linked into place. Linking onto an existing path fails, so of
//! two concurrent first runs exactly one creates the baseline and the other
//! compares against it.
//!
//! On mismatch the unmatched candidate and the diff are left on disk for
//! inspection. On match both are removed.

use crate::comparator::{ComparisonEngine, Comparator, PixelDiffEngine};
use crate::config::SnapConfig;
use crate::driver::ScreenshotDriver;
use crate::exclusion::{apply_exclusions, ExcludeSpec, MaskReport};
use crate::geometry::{clip_region, resolve_region, RegionRequest};
use crate::paths::{ArtifactPaths, ExecutionContext};
use crate::reporter::{attach_best_effort, Reporter};
use crate::result::{SnapError, SnapResult};
use crate::screenshot::ScreenshotImage;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Per-call assertion options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssertOptions {
    /// Regions to paint over before comparison
    pub excludes: Vec<ExcludeSpec>,
    /// Tolerance override; the configured default applies when `None`
    pub tolerance: Option<f64>,
}

impl AssertOptions {
    /// Create empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exclusion
    #[must_use]
    pub fn with_exclude(mut self, spec: ExcludeSpec) -> Self {
        self.excludes.push(spec);
        self
    }

    /// Set the tolerance
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
}

/// Successful outcome of a screenshot assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Candidate matched the reference
    Passed {
        /// Artifact locations
        paths: ArtifactPaths,
    },
    /// No reference existed; the candidate became the new baseline
    Bootstrapped {
        /// Artifact locations
        paths: ArtifactPaths,
    },
}

impl Verdict {
    /// True if this run created the baseline
    #[must_use]
    pub const fn is_bootstrapped(&self) -> bool {
        matches!(self, Self::Bootstrapped { .. })
    }

    /// Artifact locations
    #[must_use]
    pub const fn paths(&self) -> &ArtifactPaths {
        match self {
            Self::Passed { paths } | Self::Bootstrapped { paths } => paths,
        }
    }
}

/// Screenshot assertion controller
///
/// # Example
///
/// ```ignore
/// let asserter = ScreenshotAsserter::new(SnapConfig::default(), driver, PixelDiffEngine::new())?;
/// let ctx = ExecutionContext::new("func-test/login.js", "chrome");
/// let options = AssertOptions::new().with_exclude(ExcludeSpec::new(".clock"));
/// asserter
///     .assert_screenshot(&RegionRequest::element("#login-form"), "form", &ctx, &options)
///     .await?;
/// ```
pub struct ScreenshotAsserter<D, E = PixelDiffEngine> {
    config: SnapConfig,
    driver: D,
    comparator: Comparator<E>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl<D: fmt::Debug, E: fmt::Debug> fmt::Debug for ScreenshotAsserter<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenshotAsserter")
            .field("config", &self.config)
            .field("driver", &self.driver)
            .field("comparator", &self.comparator)
            .field("reporter", &self.reporter.is_some())
            .finish()
    }
}

impl<D: ScreenshotDriver, E: ComparisonEngine> ScreenshotAsserter<D, E> {
    /// Create an asserter; the configuration is validated here
    pub fn new(config: SnapConfig, driver: D, engine: E) -> SnapResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            driver,
            comparator: Comparator::new(engine),
            reporter: None,
        })
    }

    /// Send mismatch artifacts to `reporter`
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// Get the driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Capture, mask and crop the requested region
    pub async fn capture(
        &self,
        request: &RegionRequest,
        excludes: &[ExcludeSpec],
    ) -> SnapResult<(ScreenshotImage, MaskReport)> {
        let bytes = self.driver.capture_screenshot().await?;
        let mut screenshot = ScreenshotImage::from_png(&bytes)?;

        let region = resolve_region(request, &self.driver).await?;
        let mask = apply_exclusions(&mut screenshot, excludes, &self.driver).await;
        let clipped = clip_region(&region, screenshot.size())?;
        tracing::debug!(
            region = ?clipped,
            painted = mask.painted,
            dropped = mask.dropped,
            failed = mask.failed.len(),
            "captured region"
        );

        Ok((screenshot.crop(clipped)?, mask))
    }

    /// Capture the region and run it through the lifecycle
    pub async fn assert_screenshot(
        &self,
        request: &RegionRequest,
        id: &str,
        context: &ExecutionContext,
        options: &AssertOptions,
    ) -> SnapResult<Verdict> {
        let paths = ArtifactPaths::derive(&self.config, context, id)?;
        let tolerance = self.tolerance(options)?;
        let (image, _) = self.capture(request, &options.excludes).await?;
        self.verify(&image, id, &context.browser_id, &paths, tolerance)
            .await
    }

    /// Run an already captured image through the lifecycle
    pub async fn verify(
        &self,
        image: &ScreenshotImage,
        id: &str,
        browser_id: &str,
        paths: &ArtifactPaths,
        tolerance: f64,
    ) -> SnapResult<Verdict> {
        let png = image.to_png()?;

        if !tokio::fs::try_exists(&paths.reference).await? {
            if create_reference(&png, &paths.reference).await? {
                remove_if_present(&paths.unmatched).await?;
                remove_if_present(&paths.diff).await?;
                tracing::warn!(
                    id = %id,
                    browser = %browser_id,
                    path = %paths.reference.display(),
                    "Reference screenshot \"{id}\" for browser \"{browser_id}\" does not exist. \
                     Saved it now; verify it manually"
                );
                return Ok(Verdict::Bootstrapped {
                    paths: paths.clone(),
                });
            }
            tracing::info!(
                id = %id,
                browser = %browser_id,
                "reference created concurrently, comparing against it"
            );
        }

        write_file(&paths.unmatched, &png).await?;
        let same = self
            .comparator
            .looks_same(&paths.unmatched, &paths.reference, tolerance)
            .await?;

        if same {
            tokio::fs::remove_file(&paths.unmatched).await?;
            remove_if_present(&paths.diff).await?;
            if self.config.verbose {
                tracing::info!(id = %id, browser = %browser_id, "verified {id} screenshot in {browser_id}");
            } else {
                tracing::debug!(id = %id, browser = %browser_id, "verified screenshot");
            }
            return Ok(Verdict::Passed {
                paths: paths.clone(),
            });
        }

        self.comparator
            .diff(
                &paths.unmatched,
                &paths.reference,
                &paths.diff,
                tolerance,
                self.config.highlight_color,
            )
            .await?;
        self.report_mismatch(id, paths).await;

        tracing::warn!(
            id = %id,
            browser = %browser_id,
            diff = %paths.diff.display(),
            "screenshot mismatch"
        );
        Err(SnapError::Mismatch {
            id: id.to_string(),
            diff_path: paths.diff.clone(),
        })
    }

    fn tolerance(&self, options: &AssertOptions) -> SnapResult<f64> {
        let tolerance = options.tolerance.unwrap_or(self.config.tolerance);
        if tolerance.is_finite() && tolerance >= 0.0 {
            Ok(tolerance)
        } else {
            Err(SnapError::config(format!(
                "tolerance must be a finite non-negative number, got {tolerance}"
            )))
        }
    }

    async fn report_mismatch(&self, id: &str, paths: &ArtifactPaths) {
        let Some(reporter) = self.reporter.as_deref() else {
            return;
        };
        let artifacts = [
            ("unmatched", &paths.unmatched),
            ("reference", &paths.reference),
            ("diff", &paths.diff),
        ];
        for (label, path) in artifacts {
            match tokio::fs::read(path).await {
                Ok(data) => attach_best_effort(reporter, &format!("{id} ({label})"), &data),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "attachment unreadable");
                }
            }
        }
    }
}

/// Atomically create `reference` with `png`; false if it already existed
async fn create_reference(png: &[u8], reference: &Path) -> SnapResult<bool> {
    ensure_parent(reference).await?;

    let name = reference
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = reference.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()));
    tokio::fs::write(&staging, png).await?;

    let linked = tokio::fs::hard_link(&staging, reference).await;
    if let Err(e) = tokio::fs::remove_file(&staging).await {
        tracing::debug!(path = %staging.display(), error = %e, "staging file not removed");
    }

    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn write_file(path: &Path, data: &[u8]) -> SnapResult<()> {
    ensure_parent(path).await?;
    tokio::fs::write(path, data).await?;
    Ok(())
}

async fn ensure_parent(path: &Path) -> SnapResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await?;
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn remove_if_present(path: &Path) -> SnapResult<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
