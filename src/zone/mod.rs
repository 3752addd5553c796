pub mod codec;
pub mod manager;
pub mod parser;
pub mod record;
pub mod serial;

pub use codec::{ParsedZone, parse_zone, validate_zone};
pub use manager::ZoneManager;
pub use parser::{RData, ResourceRecord, ZoneParser};
pub use record::{Record, RecordType, SoaData, ZoneFile};

/// Zone constants
pub mod constants {
    /// Default TTL if not specified (1 hour)
    pub const DEFAULT_TTL: u32 = 3600;

    /// Maximum zone file size (10MB)
    pub const MAX_ZONE_FILE_SIZE: usize = 10 * 1024 * 1024;

    /// Upper bound on records a single $GENERATE may expand to
    pub const MAX_GENERATE_RECORDS: u32 = 65_536;

    /// File name prefix for zone files
    pub const FILE_PREFIX: &str = "db.";
}
