//! Reference / unmatched / diff path derivation.
//!
//! Every screenshot maps to three files sharing one relative suffix:
//!
//! ```text
//! test file:  func-test/login/form.test.js      id: submit     browser: firefox
//! suffix:     login/form.test/submit.firefox.png
//! reference:  <reference_path>/login/form.test/submit.firefox.png
//! unmatched:  <unmatched_path>/login/form.test/submit.firefox.png
//! diff:       <diff_path>/login/form.test/submit.firefox.png
//! ```
//!
//! Derivation is lexical. The working directory is consulted only to relate
//! an absolute test file to a relative project root (or the reverse).

use crate::config::SnapConfig;
use crate::result::{SnapError, SnapResult};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Where a screenshot assertion runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Test file issuing the assertion
    pub file: PathBuf,
    /// Browser identifier, e.g. `chrome` or `firefox-mobile`
    pub browser_id: String,
}

impl ExecutionContext {
    /// Create a new execution context
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, browser_id: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            browser_id: browser_id.into(),
        }
    }
}

/// The three artifact locations for one screenshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Baseline image
    pub reference: PathBuf,
    /// Candidate kept when it does not match
    pub unmatched: PathBuf,
    /// Rendered difference
    pub diff: PathBuf,
}

impl ArtifactPaths {
    /// Derive artifact paths for screenshot `id` in `context`
    ///
    /// `id` and the browser id become a single file name component, so
    /// neither may contain separators; the browser id may not contain `.`.
    pub fn derive(config: &SnapConfig, context: &ExecutionContext, id: &str) -> SnapResult<Self> {
        check_component("screenshot id", id, true)?;
        check_component("browser id", &context.browser_id, false)?;

        let (file, root) = anchor(&context.file, &config.project_root)?;
        let file = normalize(&file)?;
        let root = normalize(&root)?;
        let relative = file.strip_prefix(&root).map_err(|_| SnapError::InvalidIdentifier {
            message: format!(
                "test file {} is outside project root {}",
                context.file.display(),
                config.project_root.display()
            ),
        })?;

        let base = normalize(&config.test_base_path)?;
        let stem = relative.with_extension("");
        let suffix = stem.strip_prefix(&base).map_err(|_| SnapError::InvalidIdentifier {
            message: format!(
                "test file {} is outside test base path {}",
                context.file.display(),
                config.test_base_path.display()
            ),
        })?;

        if suffix.has_root() {
            return Err(SnapError::InvalidIdentifier {
                message: format!(
                    "test file {} is absolute; set project_root to make it relative",
                    context.file.display()
                ),
            });
        }

        let file_name = format!("{id}.{}.png", context.browser_id);
        let tail = suffix.join(file_name);

        Ok(Self {
            reference: config.reference_path.join(&tail),
            unmatched: config.unmatched_path.join(&tail),
            diff: config.diff_path.join(&tail),
        })
    }
}

fn check_component(what: &str, value: &str, allow_dot: bool) -> SnapResult<()> {
    let invalid = |reason: &str| {
        Err(SnapError::InvalidIdentifier {
            message: format!("{what} {value:?} {reason}"),
        })
    };
    if value.is_empty() {
        return invalid("is empty");
    }
    if value == "." || value == ".." {
        return invalid("is a relative path component");
    }
    if value.contains(['/', '\\', '\0']) {
        return invalid("contains a path separator");
    }
    if !allow_dot && value.contains('.') {
        return invalid("contains '.'");
    }
    Ok(())
}

/// Resolve whichever of `file` and `root` is relative against the working
/// directory when the other one is absolute
fn anchor(file: &Path, root: &Path) -> SnapResult<(PathBuf, PathBuf)> {
    match (file.is_absolute(), root.is_absolute()) {
        (true, false) => Ok((file.to_path_buf(), std::env::current_dir()?.join(root))),
        (false, true) => Ok((std::env::current_dir()?.join(file), root.to_path_buf())),
        _ => Ok((file.to_path_buf(), root.to_path_buf())),
    }
}

/// Drop `.` components and reject `..`
pub(crate) fn normalize(path: &Path) -> SnapResult<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(SnapError::InvalidIdentifier {
                    message: format!("path {} contains '..'", path.display()),
                })
            }
            Component::RootDir | Component::Prefix(_) => out.push(component.as_os_str()),
            Component::Normal(part) => out.push(part),
        }
    }
    Ok(out)
}
