use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::TilingError;

/// File extensions recognized as slides (compared case-insensitively).
pub const SLIDE_EXTENSIONS: [&str; 5] = ["svs", "ndpi", "mrxs", "tif", "tiff"];

/// Returns `true` if the path carries a slide extension.
pub fn is_slide_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SLIDE_EXTENSIONS.contains(&ext.as_str()))
}

/// File name of a slide without its extension.
pub fn slide_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Recursively list every slide file under `root`, sorted by path.
pub fn discover_slides(root: &Path) -> Result<Vec<PathBuf>, TilingError> {
    if !root.exists() {
        return Err(TilingError::PathNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut slides = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_file() && is_slide_file(path) {
            slides.push(path.to_path_buf());
        }
    }

    if slides.is_empty() {
        return Err(TilingError::NoSlidesFound {
            root: root.to_path_buf(),
            extensions: SLIDE_EXTENSIONS.join(", "),
        });
    }

    slides.sort();
    debug!(root = %root.display(), count = slides.len(), "discovered slides");
    Ok(slides)
}
