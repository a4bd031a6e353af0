//! Working directory lifecycle and file staging.
//!
//! The run owns `tiles/` and `output/` outright; both are destroyed and
//! recreated at startup so nothing from an earlier run can leak into this
//! run's reassembly.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tokio::fs;

use crate::errors::{GridifyError, Result};

/// Deletes `path` recursively, if present, and recreates it empty.
pub async fn reset_directory(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(GridifyError::file_system(path, "directory removal", e)),
    }

    fs::create_dir_all(path)
        .await
        .map_err(|e| GridifyError::file_system(path, "directory creation", e))
}

/// Resets both working directories concurrently.
pub async fn reset_directories(tiles_dir: &Path, output_dir: &Path) -> Result<()> {
    tokio::try_join!(reset_directory(tiles_dir), reset_directory(output_dir))?;
    Ok(())
}

/// Moves a file, falling back to copy + delete across filesystems.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    fs::copy(from, to)
        .await
        .map_err(|e| GridifyError::file_system(to, format!("file move from {:?}", from), e))?;
    remove_file(from).await
}

pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|e| GridifyError::file_system(to, format!("file copy from {:?}", from), e))
}

pub async fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path)
        .await
        .map_err(|e| GridifyError::file_system(path, "file removal", e))
}

pub async fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| GridifyError::file_system(path, "directory creation", e))
}

/// Regular files directly inside `dir` accepted by `keep`, in no
/// particular order.
pub async fn files_in<F>(dir: &Path, keep: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| GridifyError::file_system(dir, "directory listing", e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| GridifyError::file_system(dir, "directory listing", e))?
    {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file && keep(&path) {
            files.push(path);
        }
    }

    Ok(files)
}

pub async fn image_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    files_in(dir, is_image).await
}

/// Removes the files directly inside `dir` accepted by `keep`.
pub async fn remove_files_in<F>(dir: &Path, keep: F) -> Result<usize>
where
    F: Fn(&Path) -> bool,
{
    let files = files_in(dir, keep).await?;
    for file in &files {
        remove_file(file).await?;
    }
    Ok(files.len())
}

pub(crate) fn is_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reset_creates_missing_directory() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let target = temp_dir.path().join("tiles");

        reset_directory(&target).await?;
        assert!(target.is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_is_idempotent_and_empties() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let target = temp_dir.path().join("tiles");
        std::fs::create_dir_all(target.join("tiles_0"))?;
        std::fs::write(target.join("tiles_3.png"), b"stale")?;

        reset_directory(&target).await?;
        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(&target)?.count(), 0);

        reset_directory(&target).await?;
        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(&target)?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_both_directories() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let tiles = temp_dir.path().join("tiles");
        let output = temp_dir.path().join("output");
        std::fs::create_dir_all(&output)?;
        std::fs::write(output.join("output.png"), b"old")?;

        reset_directories(&tiles, &output).await?;
        assert!(tiles.is_dir());
        assert!(output.is_dir());
        assert!(!output.join("output.png").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_move_and_copy() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let a = temp_dir.path().join("a.png");
        let b = temp_dir.path().join("b.png");
        let c = temp_dir.path().join("c.png");
        std::fs::write(&a, b"pixels")?;

        move_file(&a, &b).await?;
        assert!(!a.exists());
        assert_eq!(std::fs::read(&b)?, b"pixels");

        copy_file(&b, &c).await?;
        assert!(b.exists());
        assert_eq!(std::fs::read(&c)?, b"pixels");
        Ok(())
    }

    #[tokio::test]
    async fn test_move_missing_file_fails() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let result = move_file(
            &temp_dir.path().join("missing.png"),
            &temp_dir.path().join("dest.png"),
        )
        .await;
        assert!(matches!(result, Err(GridifyError::FileSystem { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_files_in_honours_filter() -> Result<()> {
        let temp_dir = TempDir::new()?;
        std::fs::write(temp_dir.path().join("out.png"), b"x")?;
        std::fs::write(temp_dir.path().join("out_100.png"), b"x")?;
        std::fs::write(temp_dir.path().join("starry.jpg"), b"x")?;
        std::fs::write(temp_dir.path().join("neural_style.lua"), b"x")?;
        std::fs::create_dir(temp_dir.path().join("models.png"))?;

        let removed = remove_files_in(temp_dir.path(), |path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("out"))
        })
        .await?;

        assert_eq!(removed, 2);
        assert!(temp_dir.path().join("starry.jpg").exists());
        assert!(temp_dir.path().join("neural_style.lua").exists());
        assert!(temp_dir.path().join("models.png").is_dir());
        assert_eq!(image_files_in(temp_dir.path()).await?.len(), 1);
        Ok(())
    }
}
