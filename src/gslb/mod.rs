pub mod codec;
pub mod manager;
pub mod model;

pub use codec::{default_config, sorted_record_names, validate_config, validate_raw};
pub use manager::GslbManager;
pub use model::{
    GslbBackend, GslbConfig, GslbMode, GslbRecord, GslbSummary, HealthcheckProfile,
    HealthcheckRef,
};

/// GSLB configs are named `db.<domain>.yml`
pub const FILE_PREFIX: &str = "db.";
pub const FILE_SUFFIX: &str = ".yml";
