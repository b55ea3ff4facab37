// ============================================================
// Layer 3 — Image Record
// ============================================================
// One image found by a loader. Only the path and the decoded
// dimensions are kept; pixels are read lazily by the dataset.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An image file on disk together with its pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Location of the encoded image (jpg, png, ...)
    pub path: PathBuf,

    pub width: u32,
    pub height: u32,
}

impl ImageRecord {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self { path: path.into(), width, height }
    }

    /// File name for log lines; falls back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_uses_file_name() {
        let r = ImageRecord::new("photos/city/a.jpg", 10, 10);
        assert_eq!(r.display_name(), "a.jpg");
    }
}
