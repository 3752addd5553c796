//! Filesystem helpers shared by the artifact managers.

use crate::error::{ManagerError, Result};
use crate::validation::is_valid_domain;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, trace};

/// Read an artifact, mapping a missing file to [`ManagerError::NotFound`]
pub(crate) fn read(path: &Path, kind: &str, domain: &str) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            debug!("Read {} for {} ({} bytes)", kind, domain, content.len());
            Ok(content)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(ManagerError::NotFound(format!("{} {}", kind, domain)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Read an artifact, treating a missing file as empty
pub(crate) fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn exists(path: &Path) -> bool {
    path.is_file()
}

pub(crate) fn ensure_absent(path: &Path, kind: &str, domain: &str) -> Result<()> {
    if path.exists() {
        return Err(ManagerError::AlreadyExists(format!("{} {}", kind, domain)));
    }
    Ok(())
}

pub(crate) fn remove(path: &Path, kind: &str, domain: &str) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(ManagerError::NotFound(format!("{} {}", kind, domain)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Domains of the regular files in `dir` named `<prefix><domain><suffix>`.
///
/// Dot-prefixed names (staged temp files among them) and names whose
/// domain part does not validate are skipped. The result is sorted.
pub(crate) fn list_domains(dir: &Path, prefix: &str, suffix: &str) -> Result<Vec<String>> {
    let mut domains = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let Some(domain) = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
        else {
            continue;
        };
        if !is_valid_domain(domain) {
            trace!("Skipping {} in {}", name, dir.display());
            continue;
        }
        domains.push(domain.to_string());
    }

    domains.sort();
    Ok(domains)
}
