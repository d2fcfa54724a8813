//! On-disk image media for recipes and the profile.
//!
//! Images are stored as `{key}.{ext}` in a single directory. The store never
//! looks at records; it hands back paths that the caller persists.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Extensions the media directory may contain.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "gif", "webp", "heic"];

/// Extension used when the data's format cannot be recognised.
const FALLBACK_EXTENSION: &str = "jpg";

/// Image formats recognised from their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG / JFIF.
    Jpeg,
    /// PNG.
    Png,
    /// GIF87a or GIF89a.
    Gif,
    /// WebP in a RIFF container.
    Webp,
    /// HEIC / HEIF, as produced by phone cameras.
    Heic,
}

impl ImageFormat {
    /// Detect the format from magic bytes.
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::Webp);
        }
        if data.len() >= 12 && &data[4..8] == b"ftyp" {
            let brand = &data[8..12];
            if [b"heic", b"heix", b"mif1", b"msf1"].iter().any(|b| brand == &b[..]) {
                return Some(Self::Heic);
            }
        }
        None
    }

    /// File extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Heic => "heic",
        }
    }
}

/// Filesystem-backed image storage.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl MediaStore {
    /// Create a media store rooted at `dir`, creating the directory if needed.
    ///
    /// Image paths are persisted as text, so `dir` must be valid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryCreate`] if the directory is not valid UTF-8
    /// or cannot be created.
    pub fn open(dir: impl Into<PathBuf>, max_bytes: usize) -> Result<Self> {
        let dir = dir.into();
        if dir.to_str().is_none() {
            return Err(Error::DirectoryCreate {
                path: dir,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "media directory path is not valid UTF-8",
                ),
            });
        }
        fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;
        debug!("Media directory at {}", dir.display());
        Ok(Self { dir, max_bytes })
    }

    /// The media directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path [`MediaStore::save`] would write `data` to under `key`.
    #[must_use]
    pub fn path_for(&self, data: &[u8], key: &str) -> PathBuf {
        let ext = ImageFormat::detect(data).map_or(FALLBACK_EXTENSION, ImageFormat::extension);
        self.dir.join(format!("{key}.{ext}"))
    }

    /// Write image bytes as `{key}.{ext}` and return the path.
    ///
    /// The file is written to a temporary name first and renamed into place,
    /// so a failed write never leaves a truncated image at the final path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for empty or oversized data and
    /// [`Error::ImageWrite`] if the file cannot be written.
    pub fn save(&self, data: &[u8], key: &str) -> Result<PathBuf> {
        if data.is_empty() {
            return Err(Error::validation("image", "image data is empty"));
        }
        if data.len() > self.max_bytes {
            return Err(Error::validation(
                "image",
                format!(
                    "image is {} bytes, limit is {} bytes",
                    data.len(),
                    self.max_bytes
                ),
            ));
        }

        if ImageFormat::detect(data).is_none() {
            warn!("Unrecognised image format for {key}, storing as {FALLBACK_EXTENSION}");
        }
        let path = self.path_for(data, key);
        let tmp = self.dir.join(format!(".{key}.tmp"));

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(data)?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };
        if let Err(source) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(Error::ImageWrite { path, source });
        }

        debug!("Saved {} byte image to {}", data.len(), path.display());
        Ok(path)
    }

    /// Remove the file at `path`.
    ///
    /// Returns `false` if the file was already gone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] for failures other than the file being missing.
    pub fn delete(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Deleted image {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the image at `path`, or `None` if it is missing or unreadable.
    #[must_use]
    pub fn load(&self, path: &Path) -> Option<Vec<u8>> {
        fs::read(path).ok()
    }

    /// Paths of every image file in the media directory.
    #[must_use]
    pub fn list(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            })
            .collect()
    }

    /// Delete every image in the directory that is not in `keep`.
    ///
    /// Returns the number of files removed.
    #[must_use]
    pub fn prune_except(&self, keep: &HashSet<PathBuf>) -> usize {
        self.list()
            .into_iter()
            .filter(|path| !keep.contains(path))
            .filter(|path| fs::remove_file(path).is_ok())
            .count()
    }

    /// Total size of the stored images in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.list()
            .iter()
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }
}
