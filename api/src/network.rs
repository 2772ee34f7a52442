use std::fmt;
use std::str::FromStr;

use fvm_shared::address::{Address, Payload};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Actor ID of the Ethereum Address Manager, the namespace of `f410` addresses.
pub const EAM_ACTOR_ID: u64 = 10;

/// The Filecoin networks whose protocol upgrade schedule is known.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    #[serde(alias = "calibnet", alias = "testnet")]
    Calibration,
}

impl Network {
    /// The single-character address prefix used when rendering addresses.
    pub fn address_prefix(self) -> char {
        match self {
            Network::Mainnet => 'f',
            Network::Calibration => 't',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Calibration => "calibration",
        }
    }

    /// Renders an address with this network's prefix.
    /// The address library renders with a process-wide network; the prefix is replaced so that
    /// output never depends on that global.
    pub fn format_address(self, addr: &Address) -> String {
        let rendered = addr.to_string();
        let mut out = String::with_capacity(rendered.len());
        out.push(self.address_prefix());
        out.push_str(&rendered[1..]);
        out
    }

    /// Parses an address written with either network prefix.
    pub fn parse_address(self, s: &str) -> Result<Address, Error> {
        parse_address(s)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "calibration" | "calibnet" | "testnet" => Ok(Network::Calibration),
            other => Err(Error::Config(format!("unknown network {}", other))),
        }
    }
}

/// Parses an address string regardless of its network prefix.
pub fn parse_address(s: &str) -> Result<Address, Error> {
    let s = s.trim();
    if s.len() < 2 || !matches!(s.as_bytes()[0], b'f' | b't') {
        return Err(Error::Envelope(format!("invalid address {:?}", s)));
    }
    // Re-prefix with whatever network the address library currently renders with.
    let local = Address::new_id(0).to_string();
    let mut normalized = String::with_capacity(s.len());
    normalized.push_str(&local[..1]);
    normalized.push_str(&s[1..]);
    Address::from_str(&normalized).map_err(|e| Error::Envelope(format!("invalid address {}: {}", s, e)))
}

/// Returns the `0x` Ethereum form of an `f410` address, if it is one.
pub fn eth_address(addr: &Address) -> Option<String> {
    match addr.payload() {
        Payload::Delegated(d) if d.namespace() == EAM_ACTOR_ID && d.subaddress().len() == 20 => {
            Some(format!("0x{}", hex::encode(d.subaddress())))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_network_prefix() {
        let addr = Address::new_id(1234);
        assert_eq!("f01234", Network::Mainnet.format_address(&addr));
        assert_eq!("t01234", Network::Calibration.format_address(&addr));
    }

    #[test]
    fn parses_either_prefix() {
        assert_eq!(Address::new_id(99), parse_address("f099").unwrap());
        assert_eq!(Address::new_id(99), parse_address("t099").unwrap());
        assert!(parse_address("x099").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn eth_address_of_delegated() {
        let addr = Address::new_delegated(EAM_ACTOR_ID, &[0xab; 20]).unwrap();
        assert_eq!(Some(format!("0x{}", "ab".repeat(20))), eth_address(&addr));
        assert_eq!(None, eth_address(&Address::new_id(5)));
    }

    #[test]
    fn network_from_str() {
        assert_eq!(Network::Calibration, "calibnet".parse().unwrap());
        assert_eq!(Network::Mainnet, "Mainnet".parse().unwrap());
        assert!("devnet".parse::<Network>().is_err());
    }
}
