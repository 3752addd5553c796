//! The DNS server's own configuration file.
//!
//! The Corefile is treated as opaque text. The only structural check is
//! that opening and closing braces balance.

use crate::atomic::{normalize_content, write_atomic};
use crate::config::Config;
use crate::diff::unified_diff;
use crate::error::{ManagerError, Result};
use parking_lot::RwLock;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub fn validate_corefile(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ManagerError::Validation(
            "Corefile cannot be empty".to_string(),
        ));
    }

    let open = content.matches('{').count();
    let close = content.matches('}').count();
    if open != close {
        return Err(ManagerError::Validation(format!(
            "unbalanced braces: {} opening, {} closing",
            open, close
        )));
    }
    Ok(())
}

pub struct CorefileManager {
    path: PathBuf,
    lock: RwLock<()>,
}

impl CorefileManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.corefile_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<String> {
        let _guard = self.lock.read();
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                debug!("Read Corefile {} ({} bytes)", self.path.display(), content.len());
                Ok(content)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ManagerError::NotFound(format!(
                "Corefile {}",
                self.path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the Corefile without validating it
    pub fn write(&self, content: &str) -> Result<()> {
        let _guard = self.lock.write();
        write_atomic(&self.path, content)?;
        info!("Wrote Corefile {}", self.path.display());
        Ok(())
    }

    /// Validate `content` and write it
    pub fn save(&self, content: &str) -> Result<()> {
        validate_corefile(content)?;
        self.write(content)
    }

    pub fn validate(&self, content: &str) -> Result<()> {
        validate_corefile(content)
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Diff of the current Corefile against `content` as it would be written
    pub fn preview(&self, content: &str) -> Result<String> {
        let current = match self.read() {
            Ok(current) => current,
            Err(e) if e.is_not_found() => String::new(),
            Err(e) => return Err(e),
        };
        Ok(unified_diff("Corefile", &current, &normalize_content(content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const COREFILE: &str = ".:53 {\n    file /etc/coredns/db.example.com example.com\n    forward . 1.1.1.1\n    log\n}\n";

    #[test]
    fn test_validate_corefile() {
        assert!(validate_corefile(COREFILE).is_ok());
        assert!(validate_corefile("").is_err());
        assert!(validate_corefile(" \n\t").is_err());

        let err = validate_corefile(".:53 {\n    log\n").unwrap_err();
        assert!(err.to_string().contains("1 opening, 0 closing"));
    }

    #[test]
    fn test_save_rejects_invalid_and_keeps_file() {
        let dir = tempdir().unwrap();
        let manager = CorefileManager::new(dir.path().join("Corefile"));
        assert!(!manager.exists());
        assert!(manager.read().unwrap_err().is_not_found());

        manager.save(COREFILE).unwrap();
        assert!(manager.save("}{}").is_err());
        assert_eq!(manager.read().unwrap(), COREFILE);
    }

    #[test]
    fn test_preview() {
        let dir = tempdir().unwrap();
        let manager = CorefileManager::new(dir.path().join("Corefile"));
        manager.write(COREFILE).unwrap();

        assert_eq!(manager.preview(COREFILE).unwrap(), "");
        let diff = manager
            .preview(&COREFILE.replace("1.1.1.1", "9.9.9.9"))
            .unwrap();
        assert!(diff.contains("-    forward . 1.1.1.1\n+    forward . 9.9.9.9\n"));
    }
}
