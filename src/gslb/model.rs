//! GSLB configuration model, as stored in `db.<domain>.yml`.

use crate::error::{ManagerError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Treat an explicit YAML `null` the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A record without a `mode` key fails validation rather than defaulting
fn missing_mode() -> GslbMode {
    GslbMode::Unknown(String::new())
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Backend selection policy.
///
/// Strings outside the known set are kept as [`GslbMode::Unknown`] so a
/// config can be loaded and then rejected with a useful message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GslbMode {
    #[default]
    Failover,
    RoundRobin,
    Random,
    Weighted,
    GeoIp,
    Unknown(String),
}

impl GslbMode {
    pub const VALID: [&'static str; 5] = ["failover", "roundrobin", "random", "weighted", "geoip"];

    pub fn as_str(&self) -> &str {
        match self {
            GslbMode::Failover => "failover",
            GslbMode::RoundRobin => "roundrobin",
            GslbMode::Random => "random",
            GslbMode::Weighted => "weighted",
            GslbMode::GeoIp => "geoip",
            GslbMode::Unknown(s) => s,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, GslbMode::Unknown(_))
    }
}

impl From<String> for GslbMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "failover" => GslbMode::Failover,
            "roundrobin" => GslbMode::RoundRobin,
            "random" => GslbMode::Random,
            "weighted" => GslbMode::Weighted,
            "geoip" => GslbMode::GeoIp,
            _ => GslbMode::Unknown(s),
        }
    }
}

impl From<GslbMode> for String {
    fn from(mode: GslbMode) -> Self {
        match mode {
            GslbMode::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for GslbMode {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        match GslbMode::from(s.to_string()) {
            GslbMode::Unknown(other) => Err(invalid_mode(&other)),
            mode => Ok(mode),
        }
    }
}

impl fmt::Display for GslbMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn invalid_mode_text(mode: &str) -> String {
    format!(
        "invalid mode {:?} (valid: {})",
        mode,
        GslbMode::VALID.join(", ")
    )
}

pub(crate) fn invalid_mode(mode: &str) -> ManagerError {
    ManagerError::Validation(invalid_mode_text(mode))
}

/// Reusable health check template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthcheckProfile {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

/// A backend's health check: a profile name or an inline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HealthcheckRef {
    Named(String),
    Inline(serde_yaml::Value),
}

impl From<&str> for HealthcheckRef {
    fn from(name: &str) -> Self {
        HealthcheckRef::Named(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GslbBackend {
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub weight: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub healthchecks: Vec<HealthcheckRef>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub meta: BTreeMap<String, serde_yaml::Value>,
}

impl GslbBackend {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GslbRecord {
    #[serde(default = "missing_mode")]
    pub mode: GslbMode,
    #[serde(default)]
    pub record_ttl: i64,
    #[serde(default)]
    pub scrape_interval: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub backends: Vec<GslbBackend>,
}

impl GslbRecord {
    pub fn new(mode: GslbMode, record_ttl: i64, scrape_interval: impl Into<String>) -> Self {
        Self {
            mode,
            record_ttl,
            scrape_interval: scrape_interval.into(),
            backends: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GslbConfig {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub healthcheck_profiles: BTreeMap<String, HealthcheckProfile>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub records: BTreeMap<String, GslbRecord>,
}

impl GslbConfig {
    pub fn backend_count(&self) -> usize {
        self.records.values().map(|r| r.backends.len()).sum()
    }

    fn record_mut(&mut self, name: &str) -> Result<&mut GslbRecord> {
        self.records
            .get_mut(name)
            .ok_or_else(|| ManagerError::NotFound(format!("record {:?}", name)))
    }

    pub fn add_record(&mut self, name: &str, record: GslbRecord) -> Result<()> {
        if self.records.contains_key(name) {
            return Err(ManagerError::AlreadyExists(format!("record {:?}", name)));
        }
        self.records.insert(name.to_string(), record);
        Ok(())
    }

    pub fn remove_record(&mut self, name: &str) -> Result<GslbRecord> {
        self.records
            .remove(name)
            .ok_or_else(|| ManagerError::NotFound(format!("record {:?}", name)))
    }

    /// Change a record's settings, keeping its backends
    pub fn update_record(
        &mut self,
        name: &str,
        mode: GslbMode,
        record_ttl: i64,
        scrape_interval: &str,
    ) -> Result<()> {
        let record = self.record_mut(name)?;
        record.mode = mode;
        record.record_ttl = record_ttl;
        record.scrape_interval = scrape_interval.to_string();
        Ok(())
    }

    pub fn add_backend(&mut self, name: &str, backend: GslbBackend) -> Result<()> {
        self.record_mut(name)?.backends.push(backend);
        Ok(())
    }

    /// Remove the backend at `index`, keeping the order of the rest
    pub fn remove_backend(&mut self, name: &str, index: usize) -> Result<GslbBackend> {
        let record = self.record_mut(name)?;
        let len = record.backends.len();
        if index >= len {
            return Err(ManagerError::IndexOutOfRange { index, len });
        }
        Ok(record.backends.remove(index))
    }
}

/// List-view entry for one GSLB config
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GslbSummary {
    pub domain: String,
    pub record_count: usize,
    pub backend_count: usize,
}

impl GslbSummary {
    pub fn of(domain: &str, config: &GslbConfig) -> Self {
        Self {
            domain: domain.to_string(),
            record_count: config.records.len(),
            backend_count: config.backend_count(),
        }
    }

    pub fn unreadable(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            record_count: 0,
            backend_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GslbConfig {
        let mut cfg = GslbConfig::default();
        let mut record = GslbRecord::new(GslbMode::Failover, 30, "10s");
        record.backends.push(GslbBackend::new("10.0.0.1"));
        record.backends.push(GslbBackend::new("10.0.0.2"));
        record.backends.push(GslbBackend::new("10.0.0.3"));
        cfg.records.insert("app.example.com.".to_string(), record);
        cfg
    }

    #[test]
    fn test_mode_strings() {
        assert_eq!(GslbMode::from("roundrobin".to_string()), GslbMode::RoundRobin);
        assert_eq!(
            GslbMode::from("bogus".to_string()),
            GslbMode::Unknown("bogus".to_string())
        );
        assert_eq!(String::from(GslbMode::GeoIp), "geoip");
        assert!("weighted".parse::<GslbMode>().is_ok());
        assert!("Failover".parse::<GslbMode>().is_err());
    }

    #[test]
    fn test_record_mutations() {
        let mut cfg = config();
        let name = "app.example.com.";

        assert!(matches!(
            cfg.add_record(name, GslbRecord::default()),
            Err(ManagerError::AlreadyExists(_))
        ));
        cfg.update_record(name, GslbMode::Weighted, 60, "30s").unwrap();
        assert_eq!(cfg.records[name].mode, GslbMode::Weighted);
        assert_eq!(cfg.records[name].backends.len(), 3);

        assert!(matches!(
            cfg.update_record("nope.", GslbMode::Random, 1, "1s"),
            Err(ManagerError::NotFound(_))
        ));
        assert!(cfg.remove_record(name).is_ok());
        assert!(cfg.records.is_empty());
    }

    #[test]
    fn test_remove_backend_keeps_order() {
        let mut cfg = config();
        let name = "app.example.com.";

        let removed = cfg.remove_backend(name, 1).unwrap();
        assert_eq!(removed.address, "10.0.0.2");
        let left: Vec<&str> = cfg.records[name]
            .backends
            .iter()
            .map(|b| b.address.as_str())
            .collect();
        assert_eq!(left, vec!["10.0.0.1", "10.0.0.3"]);

        assert!(matches!(
            cfg.remove_backend(name, 2),
            Err(ManagerError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_summary_counts() {
        let summary = GslbSummary::of("example.com", &config());
        assert_eq!(summary.record_count, 1);
        assert_eq!(summary.backend_count, 3);
    }
}
