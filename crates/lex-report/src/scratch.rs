//! Transient storage for chart images.
//!
//! Chart images live in one directory for the duration of a run. The
//! directory is created on demand, tolerates leftovers from earlier runs and
//! is removed only when nothing else is in it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

/// Unique-suffix counter so two artifacts created in the same millisecond
/// never collide.
static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// Scratch directory holding chart images between visualization and rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// Unique path for an artifact: `{root}/{stem}_{index}_{stamp}.png`.
    pub fn artifact_path(&self, stem: &str, index: usize) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            "{stem}_{index}_{stamp}_{}_{seq}.png",
            std::process::id()
        ))
    }

    /// Remove the directory if it is empty. Errors are logged and swallowed.
    pub fn remove_if_empty(&self) {
        let is_empty = match std::fs::read_dir(&self.root) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => return,
        };

        if is_empty {
            if let Err(e) = std::fs::remove_dir(&self.root) {
                debug!("Could not remove scratch directory {}: {}", self.root.display(), e);
            } else {
                debug!("Removed scratch directory {}", self.root.display());
            }
        }
    }
}

/// Delete files best-effort, then drop each containing directory that
/// ended up empty.
pub fn remove_artifacts<'a>(paths: impl IntoIterator<Item = &'a Path>) {
    let mut dirs: Vec<&Path> = Vec::new();
    for path in paths {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !dirs.contains(&parent)
        {
            dirs.push(parent);
        }
        if !path.exists() {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed chart file {}", path.display()),
            Err(e) => debug!("Could not remove chart file {}: {}", path.display(), e),
        }
    }

    for dir in dirs {
        ScratchDir::new(dir).remove_if_empty();
    }
}
