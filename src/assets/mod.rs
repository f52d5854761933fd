//! Staging of the bundled CLI artifacts.
//!
//! The `assets/cli-artifacts` tree is embedded into the binary and written
//! to `<temp>/cli-artifacts` before either subsystem starts. The dispatch API
//! serves the staged copy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir, DirEntry};
use thiserror::Error;

/// Name of the embedded bundle and of the directory it is staged into.
pub const CLI_ARTIFACTS: &str = "cli-artifacts";

static CLI_ARTIFACTS_BUNDLE: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/assets/cli-artifacts");

/// Error staging a bundle.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to extract asset {path}: {source}")]
    Extraction {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes an embedded bundle to `<root>/<name>`.
pub struct AssetStager {
    bundle: &'static Dir<'static>,
    name: String,
    root: PathBuf,
}

impl AssetStager {
    pub fn new(bundle: &'static Dir<'static>, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            bundle,
            name: name.into(),
            root: root.into(),
        }
    }

    /// The embedded CLI artifacts, staged under the OS temp directory.
    pub fn embedded() -> Self {
        Self::new(&CLI_ARTIFACTS_BUNDLE, CLI_ARTIFACTS, std::env::temp_dir())
    }

    /// Same bundle, different destination root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Directory the bundle lands in.
    pub fn destination(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Extract the bundle, overwriting existing files, and return its directory.
    pub fn stage(&self) -> Result<PathBuf, AssetError> {
        let destination = self.destination();
        create_dir(&destination)?;

        let files = extract(self.bundle, &destination)?;
        tracing::info!(
            path = %destination.display(),
            files,
            "Staged CLI artifacts"
        );
        Ok(destination)
    }
}

fn extract(dir: &Dir<'_>, destination: &Path) -> Result<usize, AssetError> {
    let mut files = 0;
    for entry in dir.entries() {
        // Entry paths are relative to the bundle root, not to `dir`.
        let path = destination.join(entry.path());
        match entry {
            DirEntry::Dir(sub) => {
                create_dir(&path)?;
                files += extract(sub, destination)?;
            }
            DirEntry::File(file) => {
                fs::write(&path, file.contents())
                    .map_err(|source| AssetError::Extraction { path: path.clone(), source })?;
                tracing::debug!(path = %path.display(), "Wrote asset");
                files += 1;
            }
        }
    }
    Ok(files)
}

fn create_dir(path: &Path) -> Result<(), AssetError> {
    fs::create_dir_all(path).map_err(|source| AssetError::Extraction {
        path: path.to_path_buf(),
        source,
    })
}
