use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::data::AttachedFile;
use crate::error::Result;

const FALLBACK_NAME: &str = "attachment";

impl AttachedFile {
    /// Write the body to `folder`, creating the folder if needed.
    ///
    /// Uses `name` when given, else the part's filename; only the final path
    /// component is kept. Existing files are never overwritten: `report.pdf`
    /// becomes `report_1.pdf`, `report_2.pdf`, ... Returns the path written.
    pub async fn save(&self, folder: impl AsRef<Path>, name: Option<&str>) -> Result<PathBuf> {
        let folder = folder.as_ref();
        fs::create_dir_all(folder).await?;

        let name = safe_file_name(name.unwrap_or(&self.filename));
        let (stem, extension) = split_extension(&name);

        for n in 0u32.. {
            let candidate = match n {
                0 => folder.join(&name),
                _ => folder.join(format!("{stem}_{n}{extension}")),
            };
            let file = fs::OpenOptions::new().write(true).create_new(true).open(&candidate).await;
            let mut file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(&self.body).await?;
            file.flush().await?;
            debug!(path = %candidate.display(), size = self.body.len(), "saved attachment");
            return Ok(candidate);
        }
        Err(io::Error::new(io::ErrorKind::AlreadyExists, "no free file name").into())
    }
}

/// Save every file in `files` to `folder`, in order.
pub async fn save_all(files: &[AttachedFile], folder: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        paths.push(file.save(folder.as_ref(), None).await?);
    }
    Ok(paths)
}

fn safe_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty() && n != "." && n != "..")
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// `("archive.tar", ".gz")` for `archive.tar.gz`; dotfiles have no extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(i) => name.split_at(i),
    }
}
