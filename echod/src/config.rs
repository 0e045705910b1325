use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use serde::{Deserialize, Serialize};

use crate::endpoints::ServiceTags;

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Reported as `type` in diagnostic envelopes
    pub platform: String,
    pub deployment: String,
    pub instance_metadata: instance_metadata::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 3000).into(),
            platform: "rust".to_string(),
            deployment: "aws-ec2".to_string(),
            instance_metadata: instance_metadata::Config::default(),
        }
    }
}

impl Config {
    pub fn service_tags(&self) -> ServiceTags {
        ServiceTags {
            platform: self.platform.clone(),
            deployment: self.deployment.clone(),
        }
    }
}
