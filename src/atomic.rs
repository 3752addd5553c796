//! All-or-nothing file replacement.
//!
//! Content is staged in a temporary file next to the target (same directory,
//! so the same filesystem) and renamed over the target only once it is fully
//! written and synced. A reader opening the target sees either the old bytes
//! or the new bytes, never a mix. If anything fails before the rename, or the
//! staged write is dropped without being committed, the temporary file is
//! removed and the target is left exactly as it was.
//!
//! The rename gives no isolation between concurrent *writers*; managers
//! serialise their read-modify-write sequences with their own locks.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

/// Normalise line endings to LF and guarantee a trailing newline
pub fn normalize_content(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n");
    if !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// A fully written temporary file waiting to be renamed onto its target
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Write `content` to a temporary file beside `target`.
    ///
    /// The target is not modified. The temporary file carries the target's
    /// permission bits when the target already exists.
    pub fn stage(target: impl AsRef<Path>, content: &str) -> std::io::Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = format!(
            ".{}-",
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string())
        );

        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&dir)?;
        trace!("Staging {} via {}", target.display(), temp.path().display());

        temp.write_all(content.as_bytes())?;
        temp.flush()?;
        temp.as_file().sync_all()?;

        match fs::metadata(&target) {
            Ok(meta) => fs::set_permissions(temp.path(), meta.permissions())?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        Ok(Self { temp, target })
    }

    /// Path of the staged temporary file
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Rename the staged file onto the target
    pub fn commit(self) -> std::io::Result<()> {
        let target = self.target;
        match self.temp.persist(&target) {
            Ok(_) => {
                debug!("Atomically replaced {}", target.display());
                Ok(())
            }
            Err(persist_err) => {
                let path = persist_err.file.path().to_path_buf();
                if let Err(e) = persist_err.file.close() {
                    warn!("Failed to remove temp file {}: {}", path.display(), e);
                }
                Err(persist_err.error)
            }
        }
    }
}

/// Replace the file at `path` with `content` atomically.
///
/// Content is passed through [`normalize_content`] first. Use
/// [`StagedWrite`] directly to write bytes verbatim.
pub fn write_atomic(path: impl AsRef<Path>, content: &str) -> std::io::Result<()> {
    StagedWrite::stage(path, &normalize_content(content))?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_normalize_content() {
        assert_eq!(normalize_content("a\r\nb"), "a\nb\n");
        assert_eq!(normalize_content("a\n"), "a\n");
        assert_eq!(normalize_content(""), "\n");
        assert_eq!(normalize_content("a\r\n\r\n"), "a\n\n");
    }

    #[test]
    fn test_write_creates_and_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.example.com");

        write_atomic(&path, "first\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\n");

        write_atomic(&path, "second\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        assert_eq!(dir_entries(dir.path()), vec!["db.example.com"]);
    }

    #[test]
    fn test_write_normalizes_line_endings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Corefile");

        write_atomic(&path, ".:53 {\r\n    forward . 1.1.1.1\r\n}").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            ".:53 {\n    forward . 1.1.1.1\n}\n"
        );
    }

    #[test]
    fn test_uncommitted_stage_leaves_original_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.example.com");
        fs::write(&path, "original\n").unwrap();

        let staged = StagedWrite::stage(&path, "replacement\n").unwrap();
        assert!(staged.temp_path().exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "original\n");

        // Interrupted before the rename
        drop(staged);

        assert_eq!(fs::read_to_string(&path).unwrap(), "original\n");
        assert_eq!(dir_entries(dir.path()), vec!["db.example.com"]);
    }

    #[test]
    fn test_failed_rename_cleans_up() {
        let dir = tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        assert!(write_atomic(&target, "data\n").is_err());
        assert!(target.is_dir());
        assert_eq!(dir_entries(dir.path()), vec!["occupied"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("db.example.com");
        assert!(write_atomic(&path, "x\n").is_err());
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.example.com");
        fs::write(&path, "old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&path, "new\n").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }
}
