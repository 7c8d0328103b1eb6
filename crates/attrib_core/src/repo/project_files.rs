//! Project file store contracts and filesystem implementation.
//!
//! # Responsibility
//! - Decode the input file and the overlay file into their wire shapes.
//! - Write a freshly seeded overlay durably before anyone reads it back.
//!
//! # Invariants
//! - The input file is never written.
//! - `write_overlay` returns only after file contents are synced to disk.
//! - The overlay path holds either nothing or a complete overlay; a failed
//!   write leaves nothing behind.
//! - The overlay lives next to the input file; see `overlay_path_for`.

use md5::{Digest, Md5};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::repo::raw::{RawInputFile, RawOverlayFile};

/// Suffix that turns an input file name into its overlay file name.
pub const DEFAULT_OVERLAY_SUFFIX: &str = "_attributions.json";

pub type FileResult<T> = Result<T, FileError>;

/// Failure to read, decode or write one project file.
#[derive(Debug)]
pub enum FileError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidContent {
        path: PathBuf,
        message: String,
    },
}

impl FileError {
    /// Path of the file the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Json { path, .. } | Self::InvalidContent { path, .. } => {
                path
            }
        }
    }
}

impl Display for FileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot access `{}`: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "invalid JSON in `{}`: {source}", path.display())
            }
            Self::InvalidContent { path, message } => {
                write!(f, "invalid content in `{}`: {message}", path.display())
            }
        }
    }
}

impl Error for FileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidContent { .. } => None,
        }
    }
}

/// Decoded input file plus the checksum of its raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFileContent {
    pub file: RawInputFile,
    /// Lowercase MD5 hex digest of the file bytes.
    pub checksum: String,
}

/// File access used by the import pipeline.
pub trait ProjectFileStore {
    fn read_input(&self, path: &Path) -> FileResult<InputFileContent>;
    /// True when anything occupies `path`, whatever its kind.
    fn overlay_exists(&self, path: &Path) -> bool;
    fn read_overlay(&self, path: &Path) -> FileResult<RawOverlayFile>;
    /// Must not return `Ok` before the content is durable.
    fn write_overlay(&self, path: &Path, content: &RawOverlayFile) -> FileResult<()>;
}

/// JSON files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProjectFileStore;

impl FsProjectFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectFileStore for FsProjectFileStore {
    /// Reads and decodes the input file.
    ///
    /// `metadata.projectId` is required by the wire shape but its value is
    /// not checked; an empty id loads like any other.
    fn read_input(&self, path: &Path) -> FileResult<InputFileContent> {
        let bytes = read_bytes(path)?;
        let file: RawInputFile = decode_json(path, &bytes)?;

        Ok(InputFileContent {
            file,
            checksum: md5_hex(&bytes),
        })
    }

    fn overlay_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_overlay(&self, path: &Path) -> FileResult<RawOverlayFile> {
        let bytes = read_bytes(path)?;
        decode_json(path, &bytes)
    }

    fn write_overlay(&self, path: &Path, content: &RawOverlayFile) -> FileResult<()> {
        let bytes = serde_json::to_vec(content).map_err(|source| FileError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let io_error = |source| FileError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Rename must not cross filesystems. A dropped staged file is deleted.
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(parent).map_err(io_error)?;
        staged.write_all(&bytes).map_err(io_error)?;
        staged.as_file().sync_all().map_err(io_error)?;
        staged
            .persist(path)
            .map_err(|err| io_error(err.error))?;
        Ok(())
    }
}

/// Overlay path for `input_path`: same directory, extension replaced by `suffix`.
///
/// `project.json` becomes `project_attributions.json` with the default suffix.
pub fn overlay_path_for(input_path: &Path, suffix: &str) -> PathBuf {
    let stem = input_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input_path.with_file_name(format!("{stem}{suffix}"))
}

/// Lowercase hex MD5 digest of `bytes`.
pub fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

fn read_bytes(path: &Path) -> FileResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> FileResult<T> {
    serde_json::from_slice(bytes).map_err(|source| FileError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        md5_hex, overlay_path_for, FsProjectFileStore, ProjectFileStore, DEFAULT_OVERLAY_SUFFIX,
    };
    use crate::repo::raw::{RawOverlayFile, RawOverlayMetadata};
    use std::path::Path;

    fn overlay() -> RawOverlayFile {
        RawOverlayFile {
            metadata: RawOverlayMetadata {
                project_id: "project-1".to_string(),
                file_creation_date: "1700000000000".to_string(),
                input_file_md5_checksum: Some("abc".to_string()),
            },
            manual_attributions: Default::default(),
            resources_to_attributions: Default::default(),
            resolved_external_attributions: Default::default(),
        }
    }

    fn entry_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn overlay_path_replaces_extension_in_same_directory() {
        let path = overlay_path_for(Path::new("/data/project.json"), DEFAULT_OVERLAY_SUFFIX);
        assert_eq!(path, Path::new("/data/project_attributions.json"));

        let bare = overlay_path_for(Path::new("/data/project"), DEFAULT_OVERLAY_SUFFIX);
        assert_eq!(bare, Path::new("/data/project_attributions.json"));
    }

    #[test]
    fn md5_hex_matches_known_digest() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn write_overlay_leaves_only_the_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project_attributions.json");

        FsProjectFileStore::new()
            .write_overlay(&path, &overlay())
            .unwrap();

        assert_eq!(entry_names(dir.path()), vec!["project_attributions.json"]);
        let read_back = FsProjectFileStore::new().read_overlay(&path).unwrap();
        assert_eq!(read_back, overlay());
    }

    #[test]
    fn failed_overlay_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("project_attributions.json");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let err = FsProjectFileStore::new()
            .write_overlay(&blocker, &overlay())
            .unwrap_err();

        assert_eq!(err.path(), blocker.as_path());
        assert_eq!(entry_names(dir.path()), vec!["project_attributions.json"]);
        assert_eq!(entry_names(&blocker), vec!["keep"]);
    }

    #[test]
    fn overlay_exists_for_any_kind_of_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsProjectFileStore::new();
        let path = dir.path().join("project_attributions.json");
        assert!(!store.overlay_exists(&path));

        std::fs::create_dir(&path).unwrap();
        assert!(store.overlay_exists(&path));
    }
}
