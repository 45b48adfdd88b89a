use std::io;
use std::path::{Path, PathBuf};

/// Moves `file` into `<parent>/<dir_name>/`, creating the directory when
/// missing and replacing a file of the same name already there.
pub async fn move_into_subdir(file: &Path, dir_name: &str) -> io::Result<PathBuf> {
    let parent = file.parent().unwrap_or_else(|| Path::new(""));
    let file_name = file.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", file.display()),
        )
    })?;

    let target_dir = parent.join(dir_name);
    if !tokio::fs::try_exists(&target_dir).await? {
        tracing::info!("📁 Creating directory {}", target_dir.display());
        tokio::fs::create_dir_all(&target_dir).await?;
    }

    let destination = target_dir.join(file_name);
    // rename does not replace an existing target on every platform
    if tokio::fs::try_exists(&destination).await? {
        tokio::fs::remove_file(&destination).await?;
    }
    tokio::fs::rename(file, &destination).await?;
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("doc1.pdf");
        tokio::fs::write(&file, b"%PDF").await.unwrap();

        let moved = move_into_subdir(&file, "error").await.unwrap();

        assert_eq!(moved, temp_dir.path().join("error").join("doc1.pdf"));
        assert!(!file.exists());
        assert_eq!(tokio::fs::read(&moved).await.unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_move_overwrites_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let error_dir = temp_dir.path().join("error");
        tokio::fs::create_dir_all(&error_dir).await.unwrap();
        tokio::fs::write(error_dir.join("doc1.pdf"), b"old").await.unwrap();

        let file = temp_dir.path().join("doc1.pdf");
        tokio::fs::write(&file, b"new").await.unwrap();

        let moved = move_into_subdir(&file, "error").await.unwrap();
        assert_eq!(tokio::fs::read(&moved).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_move_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = move_into_subdir(&temp_dir.path().join("absent.pdf"), "error").await;
        assert!(result.is_err());
    }
}
