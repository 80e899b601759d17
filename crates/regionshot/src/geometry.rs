//! Region resolution and clipping.
//!
//! A [`RegionRequest`] names what to capture: an explicit rectangle or the
//! bounding box of an element. [`resolve_region`] turns it into a [`Rect`]
//! in page coordinates (possibly unbounded or partly off-screen), and
//! [`clip_region`] turns that into a [`PixelRect`] that is guaranteed to lie
//! inside the screenshot.
//!
//! ```text
//!   RegionRequest ──resolve_region──► Rect ──clip_region──► PixelRect
//!   (explicit | element)              (f64, may be ∞)       (u32, non-empty)
//! ```

use crate::driver::ScreenshotDriver;
use crate::result::{SnapError, SnapResult};
use serde::{Deserialize, Serialize};

/// Position of an element as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of an element as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Size {
    /// Create a new size
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Pixel dimensions of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageSize {
    /// Create a new image size
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Rectangle in page coordinates, before clipping
///
/// `width`/`height` may be `f64::INFINITY`, meaning "up to the screenshot edge".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// X position of the top-left corner
    pub x: f64,
    /// Y position of the top-left corner
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering the whole screenshot
    #[must_use]
    pub const fn unbounded() -> Self {
        Self::new(0.0, 0.0, f64::INFINITY, f64::INFINITY)
    }

    /// Build from a driver location and size
    #[must_use]
    pub const fn from_parts(location: Point, size: Size) -> Self {
        Self::new(location.x, location.y, size.width, size.height)
    }

    /// Right edge (`x + width`)
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`)
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when the rectangle lies strictly inside `size`, touching no edge
    #[must_use]
    pub fn is_strictly_inside(&self, size: ImageSize) -> bool {
        self.x > 0.0
            && self.right() < f64::from(size.width)
            && self.y > 0.0
            && self.bottom() < f64::from(size.height)
    }
}

/// Whole-pixel rectangle that lies inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    /// X position of the top-left corner
    pub x: u32,
    /// Y position of the top-left corner
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl PixelRect {
    /// Create a new pixel rectangle
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest pixel rectangle covering `rect`
    ///
    /// Negative coordinates saturate at zero.
    #[must_use]
    pub fn covering(rect: &Rect) -> Self {
        let x0 = rect.x.max(0.0).floor();
        let y0 = rect.y.max(0.0).floor();
        let x1 = rect.right().max(0.0).ceil();
        let y1 = rect.bottom().max(0.0).ceil();
        Self::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0).max(0.0) as u32,
            (y1 - y0).max(0.0) as u32,
        )
    }

    /// Whether the rectangle has no pixels
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle fits inside an image of `size`
    #[must_use]
    pub fn fits_within(&self, size: ImageSize) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(size.width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(size.height)
    }
}

/// What part of the page to capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionRequest {
    /// Explicit rectangle; omitted offsets are 0, omitted sizes are unbounded
    Explicit {
        /// X offset
        #[serde(default)]
        x: Option<f64>,
        /// Y offset
        #[serde(default)]
        y: Option<f64>,
        /// Width
        #[serde(default)]
        width: Option<f64>,
        /// Height
        #[serde(default)]
        height: Option<f64>,
    },
    /// Bounding box of the first element matching `selector`
    Element {
        /// Element selector
        selector: String,
    },
}

impl Default for RegionRequest {
    fn default() -> Self {
        Self::full_page()
    }
}

impl RegionRequest {
    /// The whole screenshot
    #[must_use]
    pub const fn full_page() -> Self {
        Self::Explicit {
            x: None,
            y: None,
            width: None,
            height: None,
        }
    }

    /// Explicit rectangle with all four fields set
    #[must_use]
    pub const fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::Explicit {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
        }
    }

    /// Element region
    #[must_use]
    pub fn element(selector: impl Into<String>) -> Self {
        Self::Element {
            selector: selector.into(),
        }
    }
}

/// Resolve a region request into page coordinates
///
/// Element requests check visibility first, then use index 0 of the
/// driver's location and size lists; further matches are ignored.
pub async fn resolve_region<D>(request: &RegionRequest, driver: &D) -> SnapResult<Rect>
where
    D: ScreenshotDriver + ?Sized,
{
    match request {
        RegionRequest::Explicit {
            x,
            y,
            width,
            height,
        } => Ok(Rect::new(
            x.unwrap_or(0.0),
            y.unwrap_or(0.0),
            width.unwrap_or(f64::INFINITY),
            height.unwrap_or(f64::INFINITY),
        )),
        RegionRequest::Element { selector } => {
            if !driver.is_element_visible(selector).await? {
                return Err(SnapError::ElementNotVisible {
                    selector: selector.clone(),
                });
            }

            let locations = driver.element_locations(selector).await?;
            let sizes = driver.element_sizes(selector).await?;
            match (locations.first(), sizes.first()) {
                (Some(location), Some(size)) => {
                    if locations.len() > 1 {
                        tracing::debug!(
                            selector = %selector,
                            matches = locations.len(),
                            "selector matched several elements, using the first"
                        );
                    }
                    Ok(Rect::from_parts(*location, *size))
                }
                _ => Err(SnapError::ElementNotVisible {
                    selector: selector.clone(),
                }),
            }
        }
    }
}

/// Clip a page rectangle to the screenshot
///
/// `offset = max(origin, 0)` and `extent = min(screen - offset, requested, screen)`,
/// floored to whole pixels. A region left with no area is rejected.
pub fn clip_region(rect: &Rect, screen: ImageSize) -> SnapResult<PixelRect> {
    if !rect.x.is_finite() || !rect.y.is_finite() {
        return Err(SnapError::InvalidRegion {
            message: format!("offset ({}, {}) is not finite", rect.x, rect.y),
        });
    }
    if rect.width.is_nan() || rect.height.is_nan() {
        return Err(SnapError::InvalidRegion {
            message: "width or height is NaN".to_string(),
        });
    }

    let screen_w = f64::from(screen.width);
    let screen_h = f64::from(screen.height);

    let offset_x = rect.x.max(0.0).floor();
    let offset_y = rect.y.max(0.0).floor();
    let width = (screen_w - offset_x).min(rect.width).min(screen_w).floor();
    let height = (screen_h - offset_y).min(rect.height).min(screen_h).floor();

    if width < 1.0 || height < 1.0 {
        return Err(SnapError::EmptyRegion { width, height });
    }

    Ok(PixelRect::new(
        offset_x as u32,
        offset_y as u32,
        width as u32,
        height as u32,
    ))
}
