use super::codec::{self, default_config, parse_config, to_yaml};
use super::model::{GslbBackend, GslbConfig, GslbMode, GslbRecord, GslbSummary, invalid_mode};
use super::{FILE_PREFIX, FILE_SUFFIX};
use crate::artifact;
use crate::atomic::write_atomic;
use crate::config::Config;
use crate::error::{ManagerError, Result};
use crate::validation::validate_domain;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const KIND: &str = "GSLB config";

/// GSLB YAML configs (`db.<domain>.yml`) in one directory
pub struct GslbManager {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl GslbManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.gslb_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, domain: &str) -> Result<PathBuf> {
        validate_domain(domain)?;
        Ok(self
            .dir
            .join(format!("{}{}{}", FILE_PREFIX, domain, FILE_SUFFIX)))
    }

    /// Summaries of every config, sorted by domain. A config that cannot
    /// be read or parsed is listed with zero counts.
    pub fn list(&self) -> Result<Vec<GslbSummary>> {
        let _guard = self.lock.read();
        let domains = artifact::list_domains(&self.dir, FILE_PREFIX, FILE_SUFFIX)?;
        debug!("Found {} GSLB configs in {}", domains.len(), self.dir.display());

        Ok(domains
            .iter()
            .map(|domain| match self.read_locked(domain) {
                Ok(config) => GslbSummary::of(domain, &config),
                Err(e) => {
                    warn!("Listing unreadable GSLB config {}: {}", domain, e);
                    GslbSummary::unreadable(domain)
                }
            })
            .collect())
    }

    pub fn read(&self, domain: &str) -> Result<GslbConfig> {
        validate_domain(domain)?;
        let _guard = self.lock.read();
        self.read_locked(domain)
    }

    pub fn read_raw(&self, domain: &str) -> Result<String> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.read();
        artifact::read(&path, KIND, domain)
    }

    /// Serialise and write `config`. Structural rules are not enforced
    /// here; see [`codec::validate_config`].
    pub fn write(&self, domain: &str, config: &GslbConfig) -> Result<()> {
        validate_domain(domain)?;
        let _guard = self.lock.write();
        self.write_locked(domain, config)?;
        info!("Wrote GSLB config for {}", domain);
        Ok(())
    }

    /// Validate raw YAML and write it as given
    pub fn write_raw(&self, domain: &str, content: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        codec::validate_raw(content)?;
        let _guard = self.lock.write();
        write_atomic(&path, content)?;
        info!("Wrote raw GSLB config for {}", domain);
        Ok(())
    }

    pub fn create(&self, domain: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.write();
        artifact::ensure_absent(&path, KIND, domain)?;
        self.write_locked(domain, &default_config(domain))?;
        info!("Created GSLB config for {}", domain);
        Ok(())
    }

    pub fn delete(&self, domain: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.write();
        artifact::remove(&path, KIND, domain)?;
        info!("Deleted GSLB config for {}", domain);
        Ok(())
    }

    pub fn exists(&self, domain: &str) -> bool {
        self.file_path(domain)
            .map(|path| artifact::exists(&path))
            .unwrap_or(false)
    }

    /// Add an empty record; backends are added separately
    pub fn add_record(
        &self,
        domain: &str,
        name: &str,
        mode: GslbMode,
        record_ttl: i64,
        scrape_interval: &str,
    ) -> Result<()> {
        check_mode(&mode)?;
        if name.trim().is_empty() {
            return Err(ManagerError::Validation(
                "record name cannot be empty".to_string(),
            ));
        }
        self.modify(domain, |config| {
            config.add_record(name, GslbRecord::new(mode, record_ttl, scrape_interval))
        })?;
        info!("Added GSLB record {} to {}", name, domain);
        Ok(())
    }

    pub fn remove_record(&self, domain: &str, name: &str) -> Result<()> {
        self.modify(domain, |config| config.remove_record(name).map(|_| ()))?;
        info!("Removed GSLB record {} from {}", name, domain);
        Ok(())
    }

    pub fn update_record(
        &self,
        domain: &str,
        name: &str,
        mode: GslbMode,
        record_ttl: i64,
        scrape_interval: &str,
    ) -> Result<()> {
        check_mode(&mode)?;
        self.modify(domain, |config| {
            config.update_record(name, mode, record_ttl, scrape_interval)
        })?;
        info!("Updated GSLB record {} in {}", name, domain);
        Ok(())
    }

    pub fn add_backend(&self, domain: &str, name: &str, backend: GslbBackend) -> Result<()> {
        if backend.address.trim().is_empty() {
            return Err(ManagerError::Validation(
                "backend address cannot be empty".to_string(),
            ));
        }
        let address = backend.address.clone();
        self.modify(domain, |config| config.add_backend(name, backend))?;
        info!("Added backend {} to GSLB record {} in {}", address, name, domain);
        Ok(())
    }

    /// Remove the backend at zero-based `index`
    pub fn remove_backend(&self, domain: &str, name: &str, index: usize) -> Result<()> {
        let removed = self.modify(domain, |config| config.remove_backend(name, index))?;
        info!(
            "Removed backend {} from GSLB record {} in {}",
            removed.address, name, domain
        );
        Ok(())
    }

    pub fn validate_raw(&self, content: &str) -> Result<()> {
        codec::validate_raw(content)
    }

    /// Read, mutate and write back under the write lock. Nothing is
    /// written when `f` fails.
    fn modify<T>(&self, domain: &str, f: impl FnOnce(&mut GslbConfig) -> Result<T>) -> Result<T> {
        validate_domain(domain)?;
        let _guard = self.lock.write();
        let mut config = self.read_locked(domain)?;
        let out = f(&mut config)?;
        self.write_locked(domain, &config)?;
        Ok(out)
    }

    fn read_locked(&self, domain: &str) -> Result<GslbConfig> {
        let path = self.file_path(domain)?;
        let content = artifact::read(&path, KIND, domain)?;
        parse_config(&content)
    }

    fn write_locked(&self, domain: &str, config: &GslbConfig) -> Result<()> {
        let path = self.file_path(domain)?;
        write_atomic(&path, &to_yaml(config)?)?;
        Ok(())
    }
}

fn check_mode(mode: &GslbMode) -> Result<()> {
    match mode {
        GslbMode::Unknown(s) => Err(invalid_mode(s)),
        _ => Ok(()),
    }
}
