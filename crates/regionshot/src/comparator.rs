//! Tolerance-based image comparison.
//!
//! The similarity algorithm sits behind [`ComparisonEngine`]. [`Comparator`]
//! adapts any engine to the assertion lifecycle: it prepares the diff
//! directory and reports engine malfunctions as
//! [`SnapError::ComparisonEngine`], never as a mismatch.
//!
//! [`PixelDiffEngine`] is the built-in engine: a per-pixel perceptual
//! distance check with a tolerance, written with the `image` crate.

use crate::result::{SnapError, SnapResult};
use crate::screenshot::Color;
use async_trait::async_trait;
use image::{ImageEncoder, Rgba, RgbaImage};
use std::path::Path;

/// Pixel similarity engine operating on image files
#[async_trait]
pub trait ComparisonEngine: Send + Sync {
    /// Whether `candidate` and `reference` match within `tolerance`
    async fn looks_same(
        &self,
        candidate: &Path,
        reference: &Path,
        tolerance: f64,
    ) -> SnapResult<bool>;

    /// Render a visualization of differing pixels to `diff`
    async fn render_diff(
        &self,
        candidate: &Path,
        reference: &Path,
        diff: &Path,
        tolerance: f64,
        highlight: Color,
    ) -> SnapResult<()>;
}

/// Adapter that runs an engine on behalf of the lifecycle controller
#[derive(Debug, Clone, Default)]
pub struct Comparator<E> {
    engine: E,
}

impl<E: ComparisonEngine> Comparator<E> {
    /// Wrap an engine
    #[must_use]
    pub const fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Borrow the engine
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Compare candidate against reference
    pub async fn looks_same(
        &self,
        candidate: &Path,
        reference: &Path,
        tolerance: f64,
    ) -> SnapResult<bool> {
        self.engine
            .looks_same(candidate, reference, tolerance)
            .await
            .map_err(into_engine_error)
    }

    /// Render the diff artifact, creating its directory first
    pub async fn diff(
        &self,
        candidate: &Path,
        reference: &Path,
        diff: &Path,
        tolerance: f64,
        highlight: Color,
    ) -> SnapResult<()> {
        if let Some(parent) = diff.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.engine
            .render_diff(candidate, reference, diff, tolerance, highlight)
            .await
            .map_err(into_engine_error)
    }
}

fn into_engine_error(e: SnapError) -> SnapError {
    match e {
        SnapError::ComparisonEngine { .. } => e,
        other => SnapError::engine(other.to_string()),
    }
}

/// Built-in engine: per-pixel perceptual distance against a tolerance
///
/// Two pixels differ when their weighted RGB distance exceeds the
/// tolerance. Images of different dimensions never look the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelDiffEngine;

impl PixelDiffEngine {
    /// Create the engine
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Count pixels whose distance exceeds `tolerance`
    ///
    /// Returns `None` when dimensions differ.
    #[must_use]
    pub fn count_differences(
        candidate: &RgbaImage,
        reference: &RgbaImage,
        tolerance: f64,
    ) -> Option<usize> {
        if candidate.dimensions() != reference.dimensions() {
            return None;
        }
        Some(
            candidate
                .pixels()
                .zip(reference.pixels())
                .filter(|(a, b)| perceptual_diff(**a, **b) > tolerance)
                .count(),
        )
    }

    /// Build the diff image
    ///
    /// The canvas covers both images; pixels outside either image or
    /// differing beyond `tolerance` are painted with `highlight`, the rest
    /// are a dimmed copy of the candidate.
    #[must_use]
    pub fn diff_image(
        candidate: &RgbaImage,
        reference: &RgbaImage,
        tolerance: f64,
        highlight: Color,
    ) -> RgbaImage {
        let width = candidate.width().max(reference.width());
        let height = candidate.height().max(reference.height());
        let highlight = highlight.to_rgba();

        RgbaImage::from_fn(width, height, |x, y| {
            match (
                candidate.get_pixel_checked(x, y),
                reference.get_pixel_checked(x, y),
            ) {
                (Some(a), Some(b)) if perceptual_diff(*a, *b) <= tolerance => {
                    let Rgba([r, g, b, _]) = *a;
                    Rgba([r / 2, g / 2, b / 2, 128])
                }
                _ => highlight,
            }
        })
    }
}

#[async_trait]
impl ComparisonEngine for PixelDiffEngine {
    async fn looks_same(
        &self,
        candidate: &Path,
        reference: &Path,
        tolerance: f64,
    ) -> SnapResult<bool> {
        let candidate = load_rgba(candidate).await?;
        let reference = load_rgba(reference).await?;
        Ok(Self::count_differences(&candidate, &reference, tolerance) == Some(0))
    }

    async fn render_diff(
        &self,
        candidate: &Path,
        reference: &Path,
        diff: &Path,
        tolerance: f64,
        highlight: Color,
    ) -> SnapResult<()> {
        let candidate = load_rgba(candidate).await?;
        let reference = load_rgba(reference).await?;
        let diff_img = Self::diff_image(&candidate, &reference, tolerance, highlight);

        let mut buffer = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buffer)
            .write_image(
                diff_img.as_raw(),
                diff_img.width(),
                diff_img.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| SnapError::engine(format!("Failed to encode diff image: {e}")))?;
        tokio::fs::write(diff, buffer).await?;
        Ok(())
    }
}

async fn load_rgba(path: &Path) -> SnapResult<RgbaImage> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        SnapError::engine(format!("Failed to read {}: {e}", path.display()))
    })?;
    let img = image::load_from_memory(&bytes).map_err(|e| {
        SnapError::engine(format!("Failed to decode {}: {e}", path.display()))
    })?;
    Ok(img.to_rgba8())
}

/// Calculate perceptual color difference (weighted for human vision)
///
/// Uses weighted RGB based on human perception:
/// - Red: 0.299
/// - Green: 0.587
/// - Blue: 0.114
#[must_use]
pub fn perceptual_diff(a: Rgba<u8>, b: Rgba<u8>) -> f64 {
    let Rgba([r1, g1, b1, _]) = a;
    let Rgba([r2, g2, b2, _]) = b;

    let dr = (f64::from(r1) - f64::from(r2)) * 0.299;
    let dg = (f64::from(g1) - f64::from(g2)) * 0.587;
    let db = (f64::from(b1) - f64::from(b2)) * 0.114;

    (dr * dr + dg * dg + db * db).sqrt()
}
