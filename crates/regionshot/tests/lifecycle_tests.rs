//! End-to-end tests of the screenshot assertion pipeline.
//!
//! Every test runs against a temporary project directory with a
//! `MockDriver` serving canned screenshots and element geometry.

use async_trait::async_trait;
use regionshot::{
    AssertOptions, ComparisonEngine, Color, ExcludeSpec, ExecutionContext, MemoryReporter,
    MockDriver, PixelDiffEngine, PixelRect, Point, RegionRequest, ScreenshotAsserter,
    ScreenshotImage, Size, SnapConfig, SnapError, SnapResult, Verdict, PNG_MIME,
};
use std::path::Path;
use std::sync::Arc;

const WHITE: Color = Color::rgb(255, 255, 255);
const BLUE: Color = Color::rgb(0, 0, 255);

fn config(root: &Path) -> SnapConfig {
    SnapConfig::new()
        .with_project_root(root)
        .with_artifact_root(root.join("func-test"))
}

fn context(root: &Path) -> ExecutionContext {
    ExecutionContext::new(root.join("func-test/account/profile.js"), "chrome")
}

fn page(color: Color) -> ScreenshotImage {
    ScreenshotImage::solid(100, 80, color)
}

fn driver(screenshot: &ScreenshotImage) -> MockDriver {
    MockDriver::new()
        .with_screenshot(screenshot.to_png().unwrap())
        .with_element("#card", Point::new(10.0, 10.0), Size::new(40.0, 30.0))
        .with_element(".clock", Point::new(20.0, 20.0), Size::new(5.0, 5.0))
}

fn asserter(root: &Path, screenshot: &ScreenshotImage) -> ScreenshotAsserter<MockDriver> {
    ScreenshotAsserter::new(config(root), driver(screenshot), PixelDiffEngine::new()).unwrap()
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn first_run_creates_reference_from_masked_crop() {
    let dir = tempfile::tempdir().unwrap();
    let screenshot = page(WHITE);
    let asserter = asserter(dir.path(), &screenshot);
    let options = AssertOptions::new().with_exclude(ExcludeSpec::new(".clock"));

    let verdict = asserter
        .assert_screenshot(&RegionRequest::element("#card"), "card", &context(dir.path()), &options)
        .await
        .unwrap();
    assert!(verdict.is_bootstrapped());

    let mut expected = screenshot.clone();
    expected.fill(PixelRect::new(20, 20, 5, 5), Color::RED).unwrap();
    let expected = expected.crop(PixelRect::new(10, 10, 40, 30)).unwrap();

    let paths = verdict.paths();
    assert_eq!(
        paths.reference,
        dir.path().join("func-test/screenshots/account/profile/card.chrome.png")
    );
    let stored = ScreenshotImage::from_png(&std::fs::read(&paths.reference).unwrap()).unwrap();
    assert_eq!(stored, expected);
    assert!(!paths.unmatched.exists());
    assert!(!paths.diff.exists());
}

#[tokio::test]
async fn concurrent_first_runs_create_one_reference() {
    let dir = tempfile::tempdir().unwrap();
    let white = asserter(dir.path(), &page(WHITE));
    let blue = asserter(dir.path(), &page(BLUE));
    let ctx = context(dir.path());
    let request = RegionRequest::element("#card");
    let options = AssertOptions::new();

    let (a, b) = tokio::join!(
        white.assert_screenshot(&request, "card", &ctx, &options),
        blue.assert_screenshot(&request, "card", &ctx, &options),
    );

    let outcomes = [a, b];
    let bootstrapped = outcomes
        .iter()
        .filter(|r| matches!(r, Ok(Verdict::Bootstrapped { .. })))
        .count();
    let mismatched = outcomes
        .iter()
        .filter(|r| matches!(r, Err(SnapError::Mismatch { .. })))
        .count();
    assert_eq!(bootstrapped, 1);
    assert_eq!(mismatched, 1);
}

// ============================================================================
// Pass / Fail
// ============================================================================

#[tokio::test]
async fn second_identical_run_passes_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let asserter = asserter(dir.path(), &page(WHITE));
    let ctx = context(dir.path());
    let request = RegionRequest::element("#card");

    asserter
        .assert_screenshot(&request, "card", &ctx, &AssertOptions::new())
        .await
        .unwrap();
    let verdict = asserter
        .assert_screenshot(&request, "card", &ctx, &AssertOptions::new())
        .await
        .unwrap();

    assert!(matches!(verdict, Verdict::Passed { .. }));
    assert!(verdict.paths().reference.exists());
    assert!(!verdict.paths().unmatched.exists());
    assert!(!verdict.paths().diff.exists());
}

#[tokio::test]
async fn changed_page_fails_with_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    let request = RegionRequest::element("#card");

    asserter(dir.path(), &page(WHITE))
        .assert_screenshot(&request, "card", &ctx, &AssertOptions::new())
        .await
        .unwrap();

    let reporter = Arc::new(MemoryReporter::new());
    let changed = asserter(dir.path(), &page(BLUE)).with_reporter(reporter.clone());
    let err = changed
        .assert_screenshot(&request, "card", &ctx, &AssertOptions::new())
        .await
        .unwrap_err();

    let SnapError::Mismatch { id, diff_path } = &err else {
        panic!("expected mismatch, got {err:?}");
    };
    assert_eq!(id, "card");
    assert!(diff_path.exists());
    assert!(err.to_string().contains("\"card\""));
    assert!(dir
        .path()
        .join("func-test/screenshots-unmatched/account/profile/card.chrome.png")
        .exists());

    let diff = ScreenshotImage::from_png(&std::fs::read(diff_path).unwrap()).unwrap();
    assert_eq!(diff.pixel(0, 0), Some(Color::GREEN));

    let attachments = reporter.attachments();
    assert_eq!(attachments.len(), 3);
    assert!(attachments.iter().all(|a| a.mime_type == PNG_MIME));
    assert_eq!(attachments[2].name, "card (diff)");
}

#[tokio::test]
async fn excluded_change_still_passes() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    let request = RegionRequest::element("#card");
    let options = AssertOptions::new().with_exclude(ExcludeSpec::new(".clock"));

    asserter(dir.path(), &page(WHITE))
        .assert_screenshot(&request, "card", &ctx, &options)
        .await
        .unwrap();

    let mut ticked = page(WHITE);
    ticked.fill(PixelRect::new(21, 21, 3, 3), BLUE).unwrap();
    let verdict = asserter(dir.path(), &ticked)
        .assert_screenshot(&request, "card", &ctx, &options)
        .await
        .unwrap();
    assert!(matches!(verdict, Verdict::Passed { .. }));
}

#[tokio::test]
async fn unresolvable_exclusion_does_not_abort() {
    let dir = tempfile::tempdir().unwrap();
    let asserter = asserter(dir.path(), &page(WHITE));
    let options = AssertOptions::new()
        .with_exclude(ExcludeSpec::new(".missing"))
        .with_exclude(ExcludeSpec::new(".clock"));

    let verdict = asserter
        .assert_screenshot(&RegionRequest::full_page(), "page", &context(dir.path()), &options)
        .await
        .unwrap();
    let stored =
        ScreenshotImage::from_png(&std::fs::read(&verdict.paths().reference).unwrap()).unwrap();
    assert_eq!(stored.size().width, 100);
    assert_eq!(stored.pixel(22, 22), Some(Color::RED));
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn hidden_element_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let screenshot = page(WHITE);
    let driver = driver(&screenshot).with_hidden("#card");
    let asserter = ScreenshotAsserter::new(config(dir.path()), driver, PixelDiffEngine::new()).unwrap();

    let err = asserter
        .assert_screenshot(
            &RegionRequest::element("#card"),
            "card",
            &context(dir.path()),
            &AssertOptions::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Element \"#card\" could not be snapped because it is not visible"
    );
    assert!(!dir.path().join("func-test/screenshots").exists());
}

#[tokio::test]
async fn region_outside_screenshot_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let asserter = asserter(dir.path(), &page(WHITE));
    let err = asserter
        .assert_screenshot(
            &RegionRequest::rect(150.0, 0.0, 10.0, 10.0),
            "offscreen",
            &context(dir.path()),
            &AssertOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SnapError::EmptyRegion { .. }));
}

#[tokio::test]
async fn engine_failure_is_not_a_mismatch() {
    #[derive(Debug)]
    struct Unavailable;

    #[async_trait]
    impl ComparisonEngine for Unavailable {
        async fn looks_same(&self, _: &Path, _: &Path, _: f64) -> SnapResult<bool> {
            Err(SnapError::Driver {
                message: "engine offline".to_string(),
            })
        }

        async fn render_diff(&self, _: &Path, _: &Path, _: &Path, _: f64, _: Color) -> SnapResult<()> {
            Ok(())
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let screenshot = page(WHITE);
    let asserter = ScreenshotAsserter::new(config(dir.path()), driver(&screenshot), Unavailable).unwrap();
    let ctx = context(dir.path());
    let request = RegionRequest::full_page();

    asserter
        .assert_screenshot(&request, "page", &ctx, &AssertOptions::new())
        .await
        .unwrap();
    let err = asserter
        .assert_screenshot(&request, "page", &ctx, &AssertOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SnapError::ComparisonEngine { .. }));
    assert!(!err.is_mismatch());
}

#[tokio::test]
async fn invalid_identifier_rejected_before_capture() {
    let dir = tempfile::tempdir().unwrap();
    let asserter = asserter(dir.path(), &page(WHITE));
    let err = asserter
        .assert_screenshot(
            &RegionRequest::full_page(),
            "../escape",
            &context(dir.path()),
            &AssertOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SnapError::InvalidIdentifier { .. }));
    assert!(!asserter.driver().was_called("capture_screenshot"));
}
