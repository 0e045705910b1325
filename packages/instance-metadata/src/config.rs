use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Selects how the machine address is resolved.
///
/// In a config file the strategy is chosen by its `type`:
///
/// ```toml
/// [instance_metadata]
/// type = 'TokenGated'
/// base_url = 'http://169.254.169.254/latest/'
/// timeout = '2s'
/// token_ttl = '6h'
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum Config {
    TokenGated {
        #[serde(default = "default_base_url")]
        base_url: Url,
        #[serde(with = "humantime_serde", default = "default_timeout")]
        timeout: Duration,
        #[serde(with = "humantime_serde", default = "default_token_ttl")]
        token_ttl: Duration,
    },
    Unauthenticated {
        #[serde(default = "default_base_url")]
        base_url: Url,
        #[serde(with = "humantime_serde", default = "default_timeout")]
        timeout: Duration,
    },
    Disabled,
}

impl Default for Config {
    fn default() -> Self {
        Config::TokenGated {
            base_url: default_base_url(),
            timeout: default_timeout(),
            token_ttl: default_token_ttl(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse("http://169.254.169.254/latest/").expect("default base url must be valid")
}

fn default_timeout() -> Duration {
    Duration::from_millis(2000)
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(21600)
}
