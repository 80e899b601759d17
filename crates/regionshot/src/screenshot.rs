//! Decoded screenshot buffer and fill colors.

use crate::geometry::{ImageSize, PixelRect};
use crate::result::{SnapError, SnapResult};
use image::{ImageEncoder, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RGBA color, written as `#rgb`, `#rrggbb` or `#rrggbbaa`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Color {
    /// Default exclusion fill (`#ff0000`)
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Default diff highlight (`#00ff00`)
    pub const GREEN: Self = Self::rgb(0, 255, 0);

    /// Opaque color from RGB channels
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// As an `image` pixel
    #[must_use]
    pub const fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::RED
    }
}

impl FromStr for Color {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SnapError::InvalidColor {
            value: s.to_string(),
        };
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        let short = |i: usize| channel(i..i + 1).map(|v| v * 17);

        match hex.len() {
            3 => Ok(Self::rgb(short(0)?, short(1)?, short(2)?)),
            6 => Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Self {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
                a: channel(6..8)?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = SnapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Screenshot pixels, decoded to RGBA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotImage {
    pixels: RgbaImage,
}

impl ScreenshotImage {
    /// Decode a screenshot from encoded bytes (PNG as returned by the driver)
    pub fn from_png(data: &[u8]) -> SnapResult<Self> {
        let img = image::load_from_memory(data)
            .map_err(|e| SnapError::image(format!("Failed to decode screenshot: {e}")))?;
        Ok(Self {
            pixels: img.to_rgba8(),
        })
    }

    /// Wrap an existing RGBA buffer
    #[must_use]
    pub const fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Solid image of one color
    #[must_use]
    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, color.to_rgba()),
        }
    }

    /// Pixel dimensions
    #[must_use]
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.pixels.width(), self.pixels.height())
    }

    /// Borrow the raw pixels
    #[must_use]
    pub const fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Pixel at `(x, y)`, if inside the image
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.pixels.get_pixel_checked(x, y).map(|&Rgba([r, g, b, a])| Color { r, g, b, a })
    }

    /// Copy out the pixels under `rect`
    pub fn crop(&self, rect: PixelRect) -> SnapResult<Self> {
        self.check_bounds(rect, "crop")?;
        let cropped =
            image::imageops::crop_imm(&self.pixels, rect.x, rect.y, rect.width, rect.height)
                .to_image();
        Ok(Self { pixels: cropped })
    }

    /// Paint `rect` with an opaque fill of `color`
    ///
    /// Pixels are replaced, not blended, so repeating a fill changes nothing.
    /// The buffer is untouched when `rect` does not fit.
    pub fn fill(&mut self, rect: PixelRect, color: Color) -> SnapResult<()> {
        self.check_bounds(rect, "fill")?;
        let rgba = color.to_rgba();
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                self.pixels.put_pixel(x, y, rgba);
            }
        }
        Ok(())
    }

    /// Encode to PNG bytes
    pub fn to_png(&self) -> SnapResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
        encoder
            .write_image(
                self.pixels.as_raw(),
                self.pixels.width(),
                self.pixels.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| SnapError::image(format!("Failed to encode PNG: {e}")))?;
        Ok(buffer)
    }

    fn check_bounds(&self, rect: PixelRect, op: &str) -> SnapResult<()> {
        if rect.fits_within(self.size()) {
            Ok(())
        } else {
            let size = self.size();
            Err(SnapError::image(format!(
                "{op} rectangle {}x{}+{}+{} exceeds {}x{} image",
                rect.width, rect.height, rect.x, rect.y, size.width, size.height
            )))
        }
    }
}
