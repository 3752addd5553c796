use super::FILE_PREFIX;
use super::codec::{
    HostFile, append_entry, check_entry, default_hosts, parse_entries, remove_entry_line,
};
use crate::artifact;
use crate::atomic::write_atomic;
use crate::config::Config;
use crate::error::Result;
use crate::gslb::FILE_SUFFIX as GSLB_SUFFIX;
use crate::validation::validate_domain;
use crate::zone::constants::FILE_PREFIX as ZONE_PREFIX;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const KIND: &str = "hosts file";

/// How hosts files are named on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostsNaming {
    /// `hosts.<domain>`
    #[default]
    Prefixed,
    /// The bare domain, as older deployments laid them out
    Legacy,
}

pub struct HostsManager {
    dir: PathBuf,
    naming: HostsNaming,
    lock: RwLock<()>,
}

impl HostsManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_naming(dir, HostsNaming::Prefixed)
    }

    pub fn with_naming(dir: impl Into<PathBuf>, naming: HostsNaming) -> Self {
        Self {
            dir: dir.into(),
            naming,
            lock: RwLock::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_naming(&config.hosts_dir, config.hosts_naming)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn naming(&self) -> HostsNaming {
        self.naming
    }

    pub fn file_path(&self, domain: &str) -> Result<PathBuf> {
        validate_domain(domain)?;
        let name = match self.naming {
            HostsNaming::Prefixed => format!("{}{}", FILE_PREFIX, domain),
            HostsNaming::Legacy => domain.to_string(),
        };
        Ok(self.dir.join(name))
    }

    /// Domains with a hosts file, sorted.
    ///
    /// In legacy mode any dotted, valid-domain file name counts, except
    /// zone files, GSLB configs and prefixed hosts files.
    pub fn list(&self) -> Result<Vec<String>> {
        let _guard = self.lock.read();
        let domains = match self.naming {
            HostsNaming::Prefixed => artifact::list_domains(&self.dir, FILE_PREFIX, "")?,
            HostsNaming::Legacy => {
                let mut domains = artifact::list_domains(&self.dir, "", "")?;
                domains.retain(|name| {
                    name.contains('.')
                        && !name.starts_with(ZONE_PREFIX)
                        && !name.starts_with(FILE_PREFIX)
                        && !name.ends_with(GSLB_SUFFIX)
                });
                domains
            }
        };
        debug!("Found {} hosts files in {}", domains.len(), self.dir.display());
        Ok(domains)
    }

    pub fn read(&self, domain: &str) -> Result<HostFile> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.read();
        let raw = artifact::read(&path, KIND, domain)?;

        Ok(HostFile {
            domain: domain.to_string(),
            entries: parse_entries(&raw),
            raw,
        })
    }

    pub fn read_raw(&self, domain: &str) -> Result<String> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.read();
        artifact::read(&path, KIND, domain)
    }

    pub fn write(&self, domain: &str, content: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.write();
        write_atomic(&path, content)?;
        info!("Wrote hosts file for {}", domain);
        Ok(())
    }

    pub fn create(&self, domain: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.write();
        artifact::ensure_absent(&path, KIND, domain)?;
        write_atomic(&path, &default_hosts(domain))?;
        info!("Created hosts file for {}", domain);
        Ok(())
    }

    pub fn delete(&self, domain: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.write();
        artifact::remove(&path, KIND, domain)?;
        info!("Deleted hosts file for {}", domain);
        Ok(())
    }

    pub fn exists(&self, domain: &str) -> bool {
        self.file_path(domain)
            .map(|path| artifact::exists(&path))
            .unwrap_or(false)
    }

    /// Append an entry, creating the file if it does not exist yet
    pub fn add_entry(&self, domain: &str, ip: &str, hostname: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        check_entry(ip, hostname)?;

        let _guard = self.lock.write();
        let current = artifact::read_or_empty(&path)?;
        write_atomic(&path, &append_entry(&current, ip, hostname))?;
        info!("Added hosts entry {} {} to {}", ip, hostname, domain);
        Ok(())
    }

    /// Remove the first entry matching `ip` and `hostname`
    pub fn remove_entry(&self, domain: &str, ip: &str, hostname: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.write();
        let current = artifact::read(&path, KIND, domain)?;
        let updated = remove_entry_line(&current, ip, hostname)?;
        write_atomic(&path, &updated)?;
        info!("Removed hosts entry {} {} from {}", ip, hostname, domain);
        Ok(())
    }
}
