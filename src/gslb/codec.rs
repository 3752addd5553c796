use super::model::{
    GslbBackend, GslbConfig, GslbMode, GslbRecord, HealthcheckProfile, HealthcheckRef,
    invalid_mode_text,
};
use crate::error::{ManagerError, Result};
use crate::zone::record::fqdn;
use std::collections::BTreeMap;
use tracing::trace;

pub const DEFAULT_PROFILE: &str = "http_default";

pub fn parse_config(content: &str) -> Result<GslbConfig> {
    serde_yaml::from_str(content).map_err(|e| ManagerError::Parse(format!("invalid YAML: {}", e)))
}

pub fn to_yaml(config: &GslbConfig) -> Result<String> {
    Ok(serde_yaml::to_string(config)?)
}

/// Check the structural rules every saved config must satisfy
pub fn validate_config(config: &GslbConfig) -> Result<()> {
    if config.records.is_empty() {
        return Err(ManagerError::Validation(
            "GSLB config must contain at least one record".to_string(),
        ));
    }

    for (name, record) in &config.records {
        if !record.mode.is_valid() {
            return Err(ManagerError::Validation(format!(
                "record {:?} has {}",
                name,
                invalid_mode_text(record.mode.as_str())
            )));
        }
        if record.backends.is_empty() {
            return Err(ManagerError::Validation(format!(
                "record {:?} must have at least one backend",
                name
            )));
        }
        for (i, backend) in record.backends.iter().enumerate() {
            if backend.address.trim().is_empty() {
                return Err(ManagerError::Validation(format!(
                    "record {:?} backend {} has no address",
                    name,
                    i + 1
                )));
            }
        }
    }

    trace!("GSLB config valid: {} records", config.records.len());
    Ok(())
}

/// Validate raw YAML as it would be saved
pub fn validate_raw(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ManagerError::Validation(
            "GSLB config cannot be empty".to_string(),
        ));
    }
    validate_config(&parse_config(content)?)
}

/// Starting config for a new domain: one failover record with an HTTP
/// health check
pub fn default_config(domain: &str) -> GslbConfig {
    let params = BTreeMap::from([
        ("port".to_string(), serde_yaml::Value::from(80)),
        ("uri".to_string(), serde_yaml::Value::from("/")),
        ("expected_code".to_string(), serde_yaml::Value::from(200)),
        ("timeout".to_string(), serde_yaml::Value::from("5s")),
    ]);

    let mut record = GslbRecord::new(GslbMode::Failover, 30, "10s");
    record.backends.push(GslbBackend {
        priority: 1,
        healthchecks: vec![HealthcheckRef::from(DEFAULT_PROFILE)],
        ..GslbBackend::new("192.168.1.10")
    });

    GslbConfig {
        healthcheck_profiles: BTreeMap::from([(
            DEFAULT_PROFILE.to_string(),
            HealthcheckProfile {
                kind: "http".to_string(),
                params,
            },
        )]),
        records: BTreeMap::from([(format!("app.{}", fqdn(domain)), record)]),
    }
}

pub fn sorted_record_names(config: &GslbConfig) -> Vec<String> {
    config.records.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
healthcheck_profiles:
  http_default:
    type: http
    params:
      port: 80
records:
  app.example.com.:
    mode: roundrobin
    record_ttl: 30
    scrape_interval: 10s
    backends:
      - address: 10.0.0.1
        weight: 5
        healthchecks: [http_default]
      - address: 10.0.0.2
        disabled: true
        healthchecks:
          - type: tcp
            params: {port: 443}
        meta:
          rack: b2
"#;

    fn validation_message(content: &str) -> String {
        match validate_raw(content) {
            Err(ManagerError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_raw(VALID).is_ok());

        let cfg = parse_config(VALID).unwrap();
        let record = &cfg.records["app.example.com."];
        assert_eq!(record.mode, GslbMode::RoundRobin);
        assert_eq!(record.backends[0].weight, 5);
        assert_eq!(
            record.backends[0].healthchecks,
            vec![HealthcheckRef::Named("http_default".to_string())]
        );
        assert!(matches!(
            record.backends[1].healthchecks[0],
            HealthcheckRef::Inline(_)
        ));
        assert!(record.backends[1].disabled);
    }

    #[test]
    fn test_bogus_mode_rejected() {
        let content = VALID.replace("mode: roundrobin", "mode: bogus");
        let msg = validation_message(&content);
        assert!(msg.contains("app.example.com."), "{}", msg);
        assert!(msg.contains("\"bogus\""), "{}", msg);
    }

    #[test]
    fn test_missing_mode_rejected() {
        let msg = validation_message("records:\n  a.:\n    backends:\n      - address: 1.2.3.4\n");
        assert!(msg.contains("invalid mode"), "{}", msg);
    }

    #[test]
    fn test_zero_backends_rejected() {
        let msg = validation_message("records:\n  a.:\n    mode: failover\n    backends: []\n");
        assert!(msg.contains("at least one backend"));

        let msg = validation_message("records:\n  a.:\n    mode: failover\n");
        assert!(msg.contains("at least one backend"));
    }

    #[test]
    fn test_empty_address_names_backend_position() {
        let content =
            "records:\n  a.:\n    mode: random\n    backends:\n      - address: 1.1.1.1\n      - priority: 2\n";
        let msg = validation_message(content);
        assert!(msg.contains("backend 2 has no address"), "{}", msg);
    }

    #[test]
    fn test_blank_and_empty_configs() {
        assert!(validation_message("  \n").contains("cannot be empty"));
        assert!(validation_message("records: {}\n").contains("at least one record"));
        assert!(validation_message("healthcheck_profiles: {}\n").contains("at least one record"));
        assert!(matches!(
            validate_raw("records: [unclosed"),
            Err(ManagerError::Parse(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let cfg = default_config("example.com");
        assert!(validate_config(&cfg).is_ok());
        assert_eq!(sorted_record_names(&cfg), vec!["app.example.com."]);

        let yaml = to_yaml(&cfg).unwrap();
        assert!(yaml.contains("mode: failover"));
        assert!(yaml.contains("expected_code: 200"));
        assert!(yaml.contains("- http_default"));
        // Zero and empty backend fields are not written
        assert!(!yaml.contains("weight"));
        assert!(!yaml.contains("meta"));

        let back = parse_config(&yaml).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_sorted_record_names() {
        let mut cfg = default_config("example.com");
        let template = cfg.records["app.example.com."].clone();
        cfg.records.insert("web.example.com.".to_string(), template.clone());
        cfg.records.insert("api.example.com.".to_string(), template);
        assert_eq!(
            sorted_record_names(&cfg),
            vec!["api.example.com.", "app.example.com.", "web.example.com."]
        );
    }

    #[test]
    fn test_record_names_in_key_order() {
        let mut cfg = GslbConfig::default();
        for name in ["web.example.com.", "api.example.com.", "mail.example.com."] {
            cfg.add_record(name, GslbRecord::new(GslbMode::Failover, 30, "10s"))
                .unwrap();
        }
        assert_eq!(
            sorted_record_names(&cfg),
            vec!["api.example.com.", "mail.example.com.", "web.example.com."]
        );
    }
}
