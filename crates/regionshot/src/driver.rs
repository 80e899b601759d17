//! ScreenshotDriver - Abstract Browser Automation Trait
//!
//! The assertion core only needs four things from a browser: a full-page
//! screenshot, element visibility, element locations and element sizes.
//! Anything that can answer those (CDP, WebDriver, a canned fixture) can
//! back a [`ScreenshotAsserter`](crate::ScreenshotAsserter).
//!
//! Location and size queries return every matching element, index-aligned.
//! Region resolution uses index 0; exclusion masking uses all of them.

use crate::geometry::{Point, Size};
use crate::result::{SnapError, SnapResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Abstract driver trait for browser automation
#[async_trait]
pub trait ScreenshotDriver: Send + Sync {
    /// Capture the current page as PNG bytes
    async fn capture_screenshot(&self) -> SnapResult<Vec<u8>>;

    /// Whether the first element matching `selector` is visible
    async fn is_element_visible(&self, selector: &str) -> SnapResult<bool>;

    /// Locations of all elements matching `selector`
    async fn element_locations(&self, selector: &str) -> SnapResult<Vec<Point>>;

    /// Sizes of all elements matching `selector`, aligned with [`Self::element_locations`]
    async fn element_sizes(&self, selector: &str) -> SnapResult<Vec<Size>>;
}

/// Mock driver for unit testing
#[derive(Debug, Default)]
pub struct MockDriver {
    screenshot: Option<Vec<u8>>,
    elements: HashMap<String, Vec<(Point, Size)>>,
    hidden: HashSet<String>,
    failing: HashSet<String>,
    misaligned: HashSet<String>,
    call_history: Mutex<Vec<String>>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the PNG bytes returned by `capture_screenshot`
    #[must_use]
    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = Some(png);
        self
    }

    /// Add a matching element for `selector` (call repeatedly for multi-match)
    #[must_use]
    pub fn with_element(mut self, selector: impl Into<String>, location: Point, size: Size) -> Self {
        self.elements
            .entry(selector.into())
            .or_default()
            .push((location, size));
        self
    }

    /// Report `selector` as present but not visible
    #[must_use]
    pub fn with_hidden(mut self, selector: impl Into<String>) -> Self {
        self.hidden.insert(selector.into());
        self
    }

    /// Fail every query for `selector` with a driver error
    #[must_use]
    pub fn with_failing(mut self, selector: impl Into<String>) -> Self {
        self.failing.insert(selector.into());
        self
    }

    /// Return one size fewer than locations for `selector`
    #[must_use]
    pub fn with_misaligned(mut self, selector: impl Into<String>) -> Self {
        self.misaligned.insert(selector.into());
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.call_history
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.history().iter().any(|c| c.starts_with(method))
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.call_history.lock() {
            calls.push(call);
        }
    }

    fn matches(&self, selector: &str) -> SnapResult<&[(Point, Size)]> {
        if self.failing.contains(selector) {
            return Err(SnapError::driver(format!(
                "mock failure for selector {selector}"
            )));
        }
        self.elements
            .get(selector)
            .map(Vec::as_slice)
            .ok_or_else(|| SnapError::driver(format!("no element matches selector {selector}")))
    }
}

#[async_trait]
impl ScreenshotDriver for MockDriver {
    async fn capture_screenshot(&self) -> SnapResult<Vec<u8>> {
        self.record("capture_screenshot".to_string());
        self.screenshot
            .clone()
            .ok_or_else(|| SnapError::driver("No mock screenshot set"))
    }

    async fn is_element_visible(&self, selector: &str) -> SnapResult<bool> {
        self.record(format!("is_element_visible:{selector}"));
        if self.failing.contains(selector) {
            return Err(SnapError::driver(format!(
                "mock failure for selector {selector}"
            )));
        }
        Ok(!self.hidden.contains(selector) && self.elements.contains_key(selector))
    }

    async fn element_locations(&self, selector: &str) -> SnapResult<Vec<Point>> {
        self.record(format!("element_locations:{selector}"));
        Ok(self.matches(selector)?.iter().map(|(p, _)| *p).collect())
    }

    async fn element_sizes(&self, selector: &str) -> SnapResult<Vec<Size>> {
        self.record(format!("element_sizes:{selector}"));
        let mut sizes: Vec<Size> = self.matches(selector)?.iter().map(|(_, s)| *s).collect();
        if self.misaligned.contains(selector) {
            sizes.pop();
        }
        Ok(sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod mock_driver_tests {
        use super::*;

        #[test]
        fn test_mock_driver_creation() {
            let driver = MockDriver::new();
            assert!(driver.history().is_empty());
            assert!(!driver.was_called("capture_screenshot"));
        }

        #[tokio::test]
        async fn test_capture_without_screenshot_fails() {
            let driver = MockDriver::new();
            let err = driver.capture_screenshot().await.unwrap_err();
            assert!(matches!(err, SnapError::Driver { .. }));
            assert!(driver.was_called("capture_screenshot"));
        }

        #[tokio::test]
        async fn test_multi_match_is_index_aligned() {
            let driver = MockDriver::new()
                .with_element("li", Point::new(1.0, 2.0), Size::new(3.0, 4.0))
                .with_element("li", Point::new(5.0, 6.0), Size::new(7.0, 8.0));
            let locations = driver.element_locations("li").await.unwrap();
            let sizes = driver.element_sizes("li").await.unwrap();
            assert_eq!(locations, vec![Point::new(1.0, 2.0), Point::new(5.0, 6.0)]);
            assert_eq!(sizes, vec![Size::new(3.0, 4.0), Size::new(7.0, 8.0)]);
        }

        #[tokio::test]
        async fn test_visibility() {
            let driver = MockDriver::new()
                .with_element("#a", Point::default(), Size::new(1.0, 1.0))
                .with_element("#b", Point::default(), Size::new(1.0, 1.0))
                .with_hidden("#b");
            assert!(driver.is_element_visible("#a").await.unwrap());
            assert!(!driver.is_element_visible("#b").await.unwrap());
            assert!(!driver.is_element_visible("#c").await.unwrap());
        }

        #[tokio::test]
        async fn test_misaligned_drops_a_size() {
            let driver = MockDriver::new()
                .with_element("p", Point::default(), Size::new(1.0, 1.0))
                .with_misaligned("p");
            assert_eq!(driver.element_locations("p").await.unwrap().len(), 1);
            assert!(driver.element_sizes("p").await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_history_tracking() {
            let driver = MockDriver::new().with_failing("#x");
            assert!(driver.element_locations("#x").await.is_err());
            assert!(driver.element_sizes("#y").await.is_err());
            assert_eq!(
                driver.history(),
                vec!["element_locations:#x".to_string(), "element_sizes:#y".to_string()]
            );
        }
    }
}
