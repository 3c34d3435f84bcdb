//! Staging artifacts for converted PDFs.
//!
//! Every conversion writes its PDF to a uniquely named file in the staging
//! directory. The name is a random UUID, never derived from the uploaded file
//! name, so concurrent requests cannot collide and a hostile name cannot walk
//! out of the directory.
//!
//! A [`TempArtifact`] owns its file. Dropping it deletes the file, which covers
//! every early return and panic; [`TempArtifact::release`] does the same
//! explicitly and reports errors.

use crate::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory in which staging artifacts are allocated.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a new empty artifact named `<uuid>.pdf`.
    ///
    /// The staging directory is created on first use. The file is opened with
    /// `create_new`, so an existing file is never reused.
    pub async fn allocate(&self) -> Result<TempArtifact> {
        fs::create_dir_all(&self.dir).await?;

        let key = uuid::Uuid::new_v4();
        let path = self.dir.join(format!("{}.pdf", key));

        fs::OpenOptions::new().write(true).create_new(true).open(&path).await?;

        tracing::debug!("Allocated staging artifact {}", path.display());
        Ok(TempArtifact { path, released: false })
    }
}

/// A staging file owned by exactly one request.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    released: bool,
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the artifact's contents with `bytes` and flush them to disk.
    pub async fn write_all(&self, bytes: &[u8]) -> Result<()> {
        let mut file = fs::File::create(&self.path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Current size in bytes.
    pub async fn len(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path).await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path).await?)
    }

    pub async fn open(&self) -> Result<fs::File> {
        Ok(fs::File::open(&self.path).await?)
    }

    /// Copy the artifact to `dest`, then release it.
    pub async fn persist_to(mut self, dest: impl AsRef<Path>) -> Result<u64> {
        let copied = fs::copy(&self.path, dest.as_ref()).await?;
        self.release_async().await?;
        Ok(copied)
    }

    /// Delete the file on the async runtime's blocking pool.
    ///
    /// Same contract as [`TempArtifact::release`].
    pub async fn release_async(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        let removed = fs::remove_file(&self.path).await;
        self.mark_released(removed)
    }

    /// Delete the file.
    ///
    /// Idempotent: calling it twice, or after someone else removed the file,
    /// is not an error. Blocks the calling thread; drop paths use it, async
    /// callers should prefer [`TempArtifact::release_async`].
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        let removed = std::fs::remove_file(&self.path);
        self.mark_released(removed)
    }

    fn mark_released(&mut self, removed: std::io::Result<()>) -> Result<()> {
        match removed {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.released = true;
        tracing::debug!("Released staging artifact {}", self.path.display());
        Ok(())
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("Failed to delete staging artifact {}: {}", self.path.display(), e);
        }
    }
}
