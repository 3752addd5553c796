pub mod codec;
pub mod manager;

pub use codec::{HostEntry, HostFile};
pub use manager::{HostsManager, HostsNaming};

/// File name prefix for hosts files in the default naming mode
pub const FILE_PREFIX: &str = "hosts.";
