//! Regionshot: Region Screenshot Assertions
//!
//! Captures a rectangular region of a browser page, paints over volatile
//! content, and compares the result against a stored reference image with a
//! perceptual tolerance.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    REGIONSHOT Pipeline                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Screenshot │    │ Region     │    │ Exclusion  │            │
//! │   │ Driver     │───►│ Resolver   │───►│ Masker     │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             │ crop              │
//! │   ┌────────────┐    ┌────────────┐    ┌─────▼──────┐            │
//! │   │ Reporter   │◄───│ Comparator │◄───│ Lifecycle  │            │
//! │   │ (attach)   │    │ (engine)   │    │ Controller │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use regionshot::{
//!     AssertOptions, ExcludeSpec, ExecutionContext, PixelDiffEngine, RegionRequest,
//!     ScreenshotAsserter, SnapConfig,
//! };
//!
//! let asserter = ScreenshotAsserter::new(SnapConfig::default(), driver, PixelDiffEngine::new())?;
//! let ctx = ExecutionContext::new("func-test/login.js", "chrome");
//! let verdict = asserter
//!     .assert_screenshot(
//!         &RegionRequest::element("#login-form"),
//!         "login-form",
//!         &ctx,
//!         &AssertOptions::new().with_exclude(ExcludeSpec::new(".captcha")),
//!     )
//!     .await?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod comparator;
mod config;
mod driver;
mod exclusion;
mod geometry;
mod lifecycle;
/// Tracing subscriber setup
pub mod logging;
mod paths;
mod reporter;
mod result;
mod screenshot;

pub use comparator::{perceptual_diff, Comparator, ComparisonEngine, PixelDiffEngine};
pub use config::{SnapConfig, DEFAULT_TOLERANCE};
pub use driver::{MockDriver, ScreenshotDriver};
pub use exclusion::{
    apply_exclusions, resolve_exclusion, resolve_exclusions, ExcludeSpec, Exclusion, MaskReport,
};
pub use geometry::{
    clip_region, resolve_region, ImageSize, PixelRect, Point, Rect, RegionRequest, Size,
};
pub use lifecycle::{AssertOptions, ScreenshotAsserter, Verdict};
pub use paths::{ArtifactPaths, ExecutionContext};
pub use reporter::{Attachment, MemoryReporter, NoopReporter, Reporter, PNG_MIME};
pub use result::{SnapError, SnapResult};
pub use screenshot::{Color, ScreenshotImage};
