use crate::error::ConfigError;
use crate::hosts::HostsNaming;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the DNS server's Corefile
    pub corefile_path: PathBuf,

    /// Directory holding `db.<domain>` zone files
    pub zone_dir: PathBuf,

    /// Directory holding hosts files
    pub hosts_dir: PathBuf,

    /// Directory holding `db.<domain>.yml` GSLB configs
    pub gslb_dir: PathBuf,

    /// How hosts files are named
    pub hosts_naming: HostsNaming,
}

/// On-disk (TOML) form of [`Config`]. Only the Corefile path is required.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    corefile_path: PathBuf,
    zone_dir: Option<PathBuf>,
    hosts_dir: Option<PathBuf>,
    gslb_dir: Option<PathBuf>,
    #[serde(default)]
    hosts_naming: HostsNaming,
}

impl Config {
    /// Build a config with every directory next to the Corefile
    pub fn new(corefile_path: impl Into<PathBuf>) -> Self {
        let corefile_path = corefile_path.into();
        let dir = parent_dir(&corefile_path);
        Self {
            corefile_path,
            zone_dir: dir.clone(),
            hosts_dir: dir.clone(),
            gslb_dir: dir,
            hosts_naming: HostsNaming::default(),
        }
    }

    /// Load from `COREFILE_PATH`, `ZONE_DIR`, `HOSTS_DIR`, `GSLB_DIR` and
    /// `HOSTS_LEGACY_NAMING`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let corefile_path = get("COREFILE_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::Missing("COREFILE_PATH".to_string()))?;
        let mut config = Self::new(corefile_path);

        // HOSTS_DIR doubles as the zone directory when ZONE_DIR is unset
        if let Some(dir) = get("ZONE_DIR").or_else(|| get("HOSTS_DIR")) {
            config.zone_dir = PathBuf::from(dir);
        }
        config.hosts_dir = get("HOSTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.zone_dir.clone());
        config.gslb_dir = get("GSLB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.zone_dir.clone());

        if let Some(legacy) = get("HOSTS_LEGACY_NAMING") {
            if parse_bool(&legacy, false) {
                config.hosts_naming = HostsNaming::Legacy;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let mut config = Self::new(file.corefile_path);
        if let Some(dir) = file.zone_dir.or_else(|| file.hosts_dir.clone()) {
            config.zone_dir = dir;
        }
        config.hosts_dir = file.hosts_dir.unwrap_or_else(|| config.zone_dir.clone());
        config.gslb_dir = file.gslb_dir.unwrap_or_else(|| config.zone_dir.clone());
        config.hosts_naming = file.hosts_naming;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.corefile_path.file_name().is_none() {
            return Err(ConfigError::InvalidPath(format!(
                "corefile_path {:?}",
                self.corefile_path
            )));
        }
        for (name, dir) in [
            ("zone_dir", &self.zone_dir),
            ("hosts_dir", &self.hosts_dir),
            ("gslb_dir", &self.gslb_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::InvalidPath(name.to_string()));
            }
        }
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_corefile_path_required() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("COREFILE_PATH", "")])),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn test_directories_default_to_corefile_dir() {
        let config = Config::from_lookup(lookup(&[("COREFILE_PATH", "/etc/coredns/Corefile")]))
            .unwrap();
        assert_eq!(config.zone_dir, PathBuf::from("/etc/coredns"));
        assert_eq!(config.hosts_dir, PathBuf::from("/etc/coredns"));
        assert_eq!(config.gslb_dir, PathBuf::from("/etc/coredns"));
        assert_eq!(config.hosts_naming, HostsNaming::Prefixed);

        let config = Config::from_lookup(lookup(&[("COREFILE_PATH", "Corefile")])).unwrap();
        assert_eq!(config.zone_dir, PathBuf::from("."));
    }

    #[test]
    fn test_hosts_dir_fallback() {
        let config = Config::from_lookup(lookup(&[
            ("COREFILE_PATH", "/etc/coredns/Corefile"),
            ("HOSTS_DIR", "/srv/hosts"),
            ("GSLB_DIR", "/srv/gslb"),
            ("HOSTS_LEGACY_NAMING", "yes"),
        ]))
        .unwrap();
        assert_eq!(config.zone_dir, PathBuf::from("/srv/hosts"));
        assert_eq!(config.hosts_dir, PathBuf::from("/srv/hosts"));
        assert_eq!(config.gslb_dir, PathBuf::from("/srv/gslb"));
        assert_eq!(config.hosts_naming, HostsNaming::Legacy);

        let config = Config::from_lookup(lookup(&[
            ("COREFILE_PATH", "/etc/coredns/Corefile"),
            ("ZONE_DIR", "/srv/zones"),
        ]))
        .unwrap();
        assert_eq!(config.hosts_dir, PathBuf::from("/srv/zones"));
        assert_eq!(config.gslb_dir, PathBuf::from("/srv/zones"));
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
corefile_path = "/etc/coredns/Corefile"
zone_dir = "/srv/zones"
hosts_naming = "legacy"
"#,
        )
        .unwrap();
        assert_eq!(config.zone_dir, PathBuf::from("/srv/zones"));
        assert_eq!(config.gslb_dir, PathBuf::from("/srv/zones"));
        assert_eq!(config.hosts_naming, HostsNaming::Legacy);

        assert!(matches!(
            Config::from_toml("zone_dir = \"/srv\""),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            Config::from_toml("corefile_path = \"/c\"\nbogus = 1"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_dirs() {
        let mut config = Config::new("/etc/coredns/Corefile");
        assert!(config.validate().is_ok());
        config.gslb_dir = PathBuf::new();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPath(_))));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE", false));
        assert!(parse_bool("on", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("maybe", true));
        assert!(!parse_bool("maybe", false));
    }
}
