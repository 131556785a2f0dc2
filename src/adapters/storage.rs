use crate::domain::model::{PersistOutcome, Window};
use crate::domain::ports::ArtifactStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::Timelike;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Raw window bodies under `<base>/<date>/<hour>00/`, gzip compressed.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    base_path: PathBuf,
    prefix: String,
}

impl LocalArtifactStore {
    pub fn new(base_path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            prefix: prefix.into(),
        }
    }

    fn folder(&self, window: &Window) -> PathBuf {
        let label = window.local_label();
        self.base_path
            .join(label.date().to_string())
            .join(format!("{}00", label.hour()))
    }

    fn file_stem(&self, window: &Window) -> String {
        format!(
            "{}_{}~{}",
            self.prefix,
            window.start_rfc3339(),
            window.end_rfc3339()
        )
    }

    /// Where the uncompressed body sits before (or after a failed) compression.
    pub fn raw_path(&self, window: &Window) -> PathBuf {
        self.folder(window)
            .join(format!("{}.json", self.file_stem(window)))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    fn artifact_path(&self, window: &Window) -> PathBuf {
        self.folder(window)
            .join(format!("{}.json.gz", self.file_stem(window)))
    }

    async fn exists(&self, window: &Window) -> bool {
        for path in [self.artifact_path(window), self.raw_path(window)] {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return true;
            }
        }
        false
    }

    async fn persist(&self, window: &Window, body: &str) -> Result<PersistOutcome> {
        let raw_path = self.raw_path(window);
        let gz_path = self.artifact_path(window);

        if let Some(parent) = raw_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&raw_path, body).await?;
        tracing::debug!("{}: Logs saved as {}", window, raw_path.display());

        let (src, dst) = (raw_path.clone(), gz_path.clone());
        let compressed = tokio::task::spawn_blocking(move || compress_in_place(&src, &dst))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(e)));

        Ok(match compressed {
            Ok(()) => PersistOutcome::Compressed(gz_path),
            Err(error) => PersistOutcome::Uncompressed { raw_path, error },
        })
    }
}

/// Gzips `src` into `dst` and removes `src`. On failure `src` is left alone and
/// any partial `dst` is removed.
fn compress_in_place(src: &Path, dst: &Path) -> io::Result<()> {
    let result = (|| {
        let mut reader = BufReader::new(File::open(src)?);
        let mut encoder = GzEncoder::new(BufWriter::new(File::create(dst)?), Compression::default());
        io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()
    })();

    match result {
        Ok(()) => std::fs::remove_file(src),
        Err(e) => {
            let _ = std::fs::remove_file(dst);
            Err(e)
        }
    }
}
