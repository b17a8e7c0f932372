use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::storage::file_name;

/// Create the scratch directory if needed.
pub fn ensure_scratch_dir(scratch_dir: &Path) -> std::io::Result<()> {
    ensure_dir(scratch_dir)
}

/// Local working path for an object key: `<scratch>/<filename>`.
pub fn scratch_path_for(scratch_dir: &Path, key: &str) -> PathBuf {
    scratch_dir.join(file_name(key))
}

/// Remove a scratch file; a missing file is fine.
pub fn remove_scratch_file(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_path_uses_filename_only() {
        let scratch = Path::new("/tmp/work");
        assert_eq!(
            scratch_path_for(scratch, "incoming/2024/batch.csv"),
            PathBuf::from("/tmp/work/batch.csv")
        );
    }

    #[test]
    fn test_ensure_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("nested/scratch");
        ensure_scratch_dir(&scratch).unwrap();
        assert!(scratch.is_dir());
        // already present
        ensure_scratch_dir(&scratch).unwrap();

        let file = scratch.join("a.csv");
        fs::write(&file, "x").unwrap();
        remove_scratch_file(&file).unwrap();
        assert!(!file.exists());
        remove_scratch_file(&file).unwrap();
    }
}
