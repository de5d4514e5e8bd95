//! Directory walking implementation using walkdir.

use super::{filter::ImageFilter, ImageRecord};
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
    /// Sidecar caption extension, without the dot
    pub sidecar_extension: String,
    /// Subtree to skip entirely (the quarantine directory)
    pub exclude: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: false,
            max_depth: None,
            extensions: None,
            sidecar_extension: "txt".to_string(),
            exclude: None,
        }
    }
}

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanOutcome {
    /// Discovered image records, sorted by path
    pub records: Vec<ImageRecord>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for image scanners.
///
/// The engine only needs "a list of candidate image paths, each with an
/// optional sidecar"; implement this to substitute a custom source.
pub trait ImageScanner: Send + Sync {
    /// Scan a directory and return discovered records
    fn scan(&self, root: &Path, events: &EventSender) -> Result<ScanOutcome, ScanError>;
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    /// Look for a caption sidecar next to an image: same stem, sidecar
    /// extension.
    fn find_sidecar(&self, image_path: &Path) -> Option<PathBuf> {
        let candidate = image_path.with_extension(&self.config.sidecar_extension);
        candidate.is_file().then_some(candidate)
    }

    fn build_record(&self, path: &Path) -> Result<ImageRecord, ScanError> {
        let metadata = fs::metadata(path).map_err(|e| ScanError::ReadEntry {
            path: path.to_path_buf(),
            source: e,
        })?;

        // Header-only probe; a file whose header is unreadable still gets a
        // record so the exact layer can see it
        let dimensions = image::image_dimensions(path).ok();

        Ok(ImageRecord::new(
            path.to_path_buf(),
            metadata.len(),
            dimensions,
            self.find_sidecar(path),
        ))
    }
}

impl ImageScanner for WalkDirScanner {
    fn scan(&self, root: &Path, events: &EventSender) -> Result<ScanOutcome, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut records = Vec::new();
        let mut errors = Vec::new();

        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        for entry_result in walker {
            match entry_result {
                Ok(entry) => {
                    let path = entry.path();

                    if let Some(ref exclude) = self.config.exclude {
                        if path.starts_with(exclude) {
                            continue;
                        }
                    }

                    if path.is_dir() {
                        // Skip hidden directories unless configured otherwise
                        if !self.config.include_hidden {
                            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                                if name.starts_with('.') && path != root {
                                    continue;
                                }
                            }
                        }
                        continue;
                    }

                    if !self.filter.should_include(path) {
                        continue;
                    }

                    match self.build_record(path) {
                        Ok(record) => {
                            events.send(Event::Scan(ScanEvent::ImageFound {
                                path: record.path().to_path_buf(),
                                has_sidecar: record.sidecar().is_some(),
                            }));
                            records.push(record);
                        }
                        Err(error) => {
                            events.send(Event::Scan(ScanEvent::Error {
                                path: path.to_path_buf(),
                                message: error.to_string(),
                            }));
                            errors.push(error);
                        }
                    }
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();

                    let error = if e.io_error().map(|e| e.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadEntry {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };

                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    errors.push(error);
                }
            }
        }

        // Path order keeps every later stage deterministic regardless of
        // filesystem enumeration order
        records.sort_by(|a, b| a.path().cmp(b.path()));

        events.send(Event::Scan(ScanEvent::Completed {
            total_images: records.len(),
            with_sidecars: records.iter().filter(|r| r.sidecar().is_some()).count(),
        }));

        Ok(ScanOutcome { records, errors })
    }
}
