//! Exclusion masking.
//!
//! Volatile page content (clocks, avatars, ads) is painted over before the
//! candidate is compared. Masking is noise reduction, not a correctness
//! gate: a selector that cannot be resolved is logged and skipped, and the
//! assertion carries on with whatever exclusions did resolve.
//!
//! Only rectangles lying strictly inside the screenshot are painted. A
//! rectangle touching or crossing an edge is dropped rather than partially
//! masked.

use crate::driver::ScreenshotDriver;
use crate::geometry::{PixelRect, Rect};
use crate::result::{SnapError, SnapResult};
use crate::screenshot::{Color, ScreenshotImage};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

/// Elements to paint over before comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeSpec {
    /// Selector; every matching element is excluded
    pub selector: String,
    /// Fill color
    #[serde(default)]
    pub color: Color,
}

impl ExcludeSpec {
    /// Exclusion filled with the default red
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            color: Color::default(),
        }
    }

    /// Set the fill color
    #[must_use]
    pub const fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// One resolved exclusion rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    /// Selector it came from
    pub selector: String,
    /// Element bounds in page coordinates
    pub rect: Rect,
    /// Fill color
    pub color: Color,
}

/// Outcome of masking one screenshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskReport {
    /// Rectangles painted
    pub painted: usize,
    /// Rectangles dropped for touching or crossing an edge
    pub dropped: usize,
    /// Selectors whose resolution failed
    pub failed: Vec<String>,
}

/// Resolve one spec into a rectangle per matching element
pub async fn resolve_exclusion<D>(spec: &ExcludeSpec, driver: &D) -> SnapResult<Vec<Exclusion>>
where
    D: ScreenshotDriver + ?Sized,
{
    let wrap = |e: SnapError| SnapError::ExclusionResolution {
        selector: spec.selector.clone(),
        message: e.to_string(),
    };
    let locations = driver.element_locations(&spec.selector).await.map_err(wrap)?;
    let sizes = driver.element_sizes(&spec.selector).await.map_err(wrap)?;

    if locations.len() != sizes.len() {
        return Err(SnapError::ExclusionResolution {
            selector: spec.selector.clone(),
            message: format!(
                "{} locations but {} sizes",
                locations.len(),
                sizes.len()
            ),
        });
    }

    Ok(locations
        .into_iter()
        .zip(sizes)
        .map(|(location, size)| Exclusion {
            selector: spec.selector.clone(),
            rect: Rect::from_parts(location, size),
            color: spec.color,
        })
        .collect())
}

/// Resolve all specs concurrently, settling every one
///
/// The result is index-aligned with `specs`; a failure in one entry does
/// not affect the others.
pub async fn resolve_exclusions<D>(
    specs: &[ExcludeSpec],
    driver: &D,
) -> Vec<SnapResult<Vec<Exclusion>>>
where
    D: ScreenshotDriver + ?Sized,
{
    join_all(specs.iter().map(|spec| resolve_exclusion(spec, driver))).await
}

/// Paint every resolvable, in-bounds exclusion onto `image`
///
/// Never fails; problems are logged and summarized in the returned report.
pub async fn apply_exclusions<D>(
    image: &mut ScreenshotImage,
    specs: &[ExcludeSpec],
    driver: &D,
) -> MaskReport
where
    D: ScreenshotDriver + ?Sized,
{
    let mut report = MaskReport::default();
    if specs.is_empty() {
        return report;
    }

    let settled = resolve_exclusions(specs, driver).await;
    let size = image.size();

    for (spec, outcome) in specs.iter().zip(settled) {
        let exclusions = match outcome {
            Ok(exclusions) => exclusions,
            Err(e) => {
                tracing::warn!(selector = %spec.selector, error = %e, "skipping exclusion");
                report.failed.push(spec.selector.clone());
                continue;
            }
        };

        for exclusion in exclusions {
            if !exclusion.rect.is_strictly_inside(size) {
                tracing::debug!(
                    selector = %exclusion.selector,
                    rect = ?exclusion.rect,
                    "exclusion touches screenshot edge, not painted"
                );
                report.dropped += 1;
                continue;
            }
            match image.fill(PixelRect::covering(&exclusion.rect), exclusion.color) {
                Ok(()) => report.painted += 1,
                Err(e) => {
                    tracing::warn!(selector = %exclusion.selector, error = %e, "exclusion fill failed");
                    report.dropped += 1;
                }
            }
        }
    }

    report
}
