//! File filtering logic for the scanner.

use std::path::Path;

/// Filters files to determine if they are supported images
pub struct ImageFilter {
    /// File extensions to include
    extensions: std::collections::HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl ImageFilter {
    /// Create a new filter with default supported extensions
    pub fn new() -> Self {
        Self {
            extensions: [
                "jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif",
            ]
            .iter()
            .map(|e| e.to_string())
            .collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    return false;
                }
            }
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.contains(&ext.to_lowercase()),
            None => false,
        }
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_includes_jpeg() {
        let filter = ImageFilter::new();
        assert!(filter.should_include(Path::new("/data/image.jpg")));
        assert!(filter.should_include(Path::new("/data/image.JPEG")));
    }

    #[test]
    fn filter_includes_webp_and_tiff() {
        let filter = ImageFilter::new();
        assert!(filter.should_include(Path::new("/data/image.webp")));
        assert!(filter.should_include(Path::new("/data/scan.TIF")));
    }

    #[test]
    fn filter_excludes_non_images() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/data/caption.txt")));
        assert!(!filter.should_include(Path::new("/data/video.mp4")));
    }

    #[test]
    fn filter_excludes_hidden_by_default() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/data/.hidden.jpg")));
    }

    #[test]
    fn filter_can_include_hidden() {
        let filter = ImageFilter::new().with_hidden(true);
        assert!(filter.should_include(Path::new("/data/.hidden.jpg")));
    }

    #[test]
    fn filter_handles_no_extension() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/data/no_extension")));
    }
}
