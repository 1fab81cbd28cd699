use crate::error::DynResult;
use serde_derive::Deserialize;
use std::path::Path;

/// Settings read from a JSON configuration file. Command line switches
/// override anything given here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Bus driver selection, e.g. "sim:gears=5".
    pub device: Option<String>,
    /// Path of the non-volatile storage file.
    pub nvm: Option<String>,
    /// Serial port to serve, e.g. "/dev/ttyUSB0".
    pub port: Option<String>,
    pub baud: Option<u32>,
    /// "none", "odd" or "even".
    pub parity: Option<String>,
    /// TCP listen address, e.g. "127.0.0.1:5523".
    pub listen: Option<String>,
}

impl GatewayConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> DynResult<GatewayConfig> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
