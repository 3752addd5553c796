//! Parsing, validation and crash-safe persistence for the files a
//! CoreDNS-style server reads: zone files, hosts files, GSLB YAML configs
//! and the Corefile.

mod artifact;
pub mod atomic;
pub mod config;
pub mod corefile;
pub mod diff;
pub mod error;
pub mod gslb;
pub mod hosts;
pub mod validation;
pub mod zone;

pub use atomic::{normalize_content, write_atomic};
pub use config::Config;
pub use corefile::CorefileManager;
pub use diff::unified_diff;
pub use error::{ConfigError, ManagerError, Result};
pub use gslb::GslbManager;
pub use hosts::HostsManager;
pub use validation::validate_domain;
pub use zone::ZoneManager;
