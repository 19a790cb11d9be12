use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

use crate::types::{InstanceId, InstanceIdError};

/// Activation server configuration, read from `CAMPFIRE_ACTIVATION_*`.
#[derive(Debug, Deserialize)]
pub struct ActivationServerConfig {
    /// Listen address (default: 0.0.0.0:8080)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// The one instance this server may start.
    pub instance_id: String,

    /// Upper bound for a single activation (default: 10)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Platform region passed to the cloud CLI, if not taken from its own config.
    #[serde(default)]
    pub region: Option<String>,
}

impl ActivationServerConfig {
    pub fn instance(&self) -> Result<InstanceId, InstanceIdError> {
        InstanceId::parse(&self.instance_id)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_timeout_seconds() -> u64 {
    10
}
