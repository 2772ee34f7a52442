use fil_trace_api::{Error, Network, Result};
use serde::{Deserialize, Serialize};

/// Maximum depth of nested calls the FVM permits.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Options controlling a trace parser.
/// Missing fields take their default values when read from JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ParserConfig {
    /// Network whose upgrade schedule and address prefix apply.
    pub network: Network,
    /// Calls nested deeper than this are not visited.
    pub max_depth: usize,
    /// Whether to look up short and robust addresses of call participants through the node.
    /// When off, actor types come from the trace alone.
    pub resolve_addresses: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { network: Network::Mainnet, max_depth: MAX_CALL_DEPTH, resolve_addresses: true }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a configuration from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ParserConfig =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
    pub fn with_address_resolution(mut self, enabled: bool) -> Self {
        self.resolve_addresses = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }
        // Levels are recorded as u16.
        if self.max_depth > u16::MAX as usize {
            return Err(Error::Config(format!(
                "max_depth {} exceeds {}",
                self.max_depth,
                u16::MAX
            )));
        }
        Ok(())
    }
}
