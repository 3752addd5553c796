use super::codec::{self, append_record, check_record, default_zone, remove_record_line};
use super::constants::FILE_PREFIX;
use super::record::{Record, RecordType, ZoneFile, fqdn};
use super::serial::try_increment_serial_for;
use crate::artifact;
use crate::atomic::{normalize_content, write_atomic};
use crate::config::Config;
use crate::diff::unified_diff;
use crate::error::{ManagerError, Result};
use crate::gslb::FILE_SUFFIX as GSLB_SUFFIX;
use crate::validation::validate_domain;
use chrono::{Local, NaiveDate};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const KIND: &str = "zone file";

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Zone files (`db.<domain>`) in one directory
pub struct ZoneManager {
    dir: PathBuf,
    /// Serialises read-modify-write sequences on zone files
    lock: RwLock<()>,
    today: fn() -> NaiveDate,
}

impl ZoneManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
            today: local_today,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.zone_dir)
    }

    /// Use `today` instead of the local calendar for serials
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the zone file for `domain`
    pub fn file_path(&self, domain: &str) -> Result<PathBuf> {
        validate_domain(domain)?;
        Ok(self.dir.join(format!("{}{}", FILE_PREFIX, domain)))
    }

    /// Domains with a zone file, sorted. GSLB configs sharing the
    /// directory are not included.
    pub fn list(&self) -> Result<Vec<String>> {
        let _guard = self.lock.read();
        let mut domains = artifact::list_domains(&self.dir, FILE_PREFIX, "")?;
        domains.retain(|d| !d.ends_with(GSLB_SUFFIX));
        debug!("Found {} zone files in {}", domains.len(), self.dir.display());
        Ok(domains)
    }

    /// Read and parse the zone file for `domain`
    pub fn read(&self, domain: &str) -> Result<ZoneFile> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.read();
        let raw = artifact::read(&path, KIND, domain)?;
        let parsed = codec::parse_zone(&raw, domain)?;

        Ok(ZoneFile {
            domain: domain.to_string(),
            records: parsed.records,
            soa: parsed.soa,
            raw,
        })
    }

    pub fn read_raw(&self, domain: &str) -> Result<String> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.read();
        artifact::read(&path, KIND, domain)
    }

    /// Replace the zone file, bumping the SOA serial. The content is not
    /// validated; use [`ZoneManager::save`] for that.
    pub fn write(&self, domain: &str, content: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.write();
        self.write_locked(&path, content)?;
        info!("Wrote zone file for {}", domain);
        Ok(())
    }

    /// Validate `content` and write it
    pub fn save(&self, domain: &str, content: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        codec::validate_zone(domain, content)?;
        let _guard = self.lock.write();
        self.write_locked(&path, content)?;
        info!("Saved zone file for {}", domain);
        Ok(())
    }

    /// Create a zone with a default SOA and apex NS
    pub fn create(&self, domain: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.write();
        artifact::ensure_absent(&path, KIND, domain)?;
        write_atomic(&path, &default_zone(domain, (self.today)()))?;
        info!("Created zone {}", domain);
        Ok(())
    }

    pub fn delete(&self, domain: &str) -> Result<()> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.write();
        artifact::remove(&path, KIND, domain)?;
        info!("Deleted zone {}", domain);
        Ok(())
    }

    /// False for invalid domains as well as missing files
    pub fn exists(&self, domain: &str) -> bool {
        self.file_path(domain)
            .map(|path| artifact::exists(&path))
            .unwrap_or(false)
    }

    /// Append `record` to the zone and bump the serial
    pub fn add_record(&self, domain: &str, record: &Record) -> Result<()> {
        let path = self.file_path(domain)?;
        check_record(record, &fqdn(domain))?;

        let _guard = self.lock.write();
        let current = artifact::read(&path, KIND, domain)?;
        self.write_locked(&path, &append_record(&current, record))?;
        info!(
            "Added {} record {} -> {} to {}",
            record.rtype, record.name, record.value, domain
        );
        Ok(())
    }

    /// Remove the first line holding the given record and bump the serial.
    /// The file is left untouched when nothing matches. Apex NS cannot be
    /// removed.
    pub fn remove_record(
        &self,
        domain: &str,
        name: &str,
        rtype: RecordType,
        value: &str,
    ) -> Result<()> {
        let path = self.file_path(domain)?;
        if rtype == RecordType::Ns && name == "@" {
            return Err(ManagerError::Validation(
                "apex NS records are managed with the zone".to_string(),
            ));
        }
        let _guard = self.lock.write();
        let current = artifact::read(&path, KIND, domain)?;
        let updated = remove_record_line(&current, name, rtype, value, &fqdn(domain))?;
        self.write_locked(&path, &updated)?;
        info!("Removed {} record {} -> {} from {}", rtype, name, value, domain);
        Ok(())
    }

    pub fn validate(&self, domain: &str, content: &str) -> Result<()> {
        validate_domain(domain)?;
        codec::validate_zone(domain, content)
    }

    /// Diff of the current zone file against what writing `content` would
    /// produce. A missing file diffs as empty.
    pub fn preview(&self, domain: &str, content: &str) -> Result<String> {
        let path = self.file_path(domain)?;
        let _guard = self.lock.read();
        let current = artifact::read_or_empty(&path)?;
        let proposed = self.prepare(content)?;
        Ok(unified_diff(
            &format!("{}{}", FILE_PREFIX, domain),
            &current,
            &proposed,
        ))
    }

    /// Normalised content with the serial bumped. Fails, writing nothing,
    /// when the bumped serial would not fit its 32-bit field.
    fn prepare(&self, content: &str) -> Result<String> {
        try_increment_serial_for(&normalize_content(content), (self.today)())
    }

    fn write_locked(&self, path: &Path, content: &str) -> Result<()> {
        write_atomic(path, &self.prepare(content)?)?;
        Ok(())
    }
}
