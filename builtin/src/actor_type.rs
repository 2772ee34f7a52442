use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use cid::Cid;
use fil_trace_api::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Multicodec code of the identity hash, used by the code CIDs of actors v0 through v7.
const IDENTITY_HASH: u64 = 0x0;

/// The families of built-in actors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActorType {
    System,
    Init,
    Cron,
    Account,
    Power,
    Miner,
    Market,
    PaymentChannel,
    Multisig,
    Reward,
    VerifiedRegistry,
    Datacap,
    Evm,
    Eam,
    EthAccount,
    Placeholder,
    /// Code not recognised as any built-in actor.
    Unknown,
}

impl ActorType {
    pub const ALL: &'static [ActorType] = &[
        ActorType::System,
        ActorType::Init,
        ActorType::Cron,
        ActorType::Account,
        ActorType::Power,
        ActorType::Miner,
        ActorType::Market,
        ActorType::PaymentChannel,
        ActorType::Multisig,
        ActorType::Reward,
        ActorType::VerifiedRegistry,
        ActorType::Datacap,
        ActorType::Evm,
        ActorType::Eam,
        ActorType::EthAccount,
        ActorType::Placeholder,
    ];

    /// The actor's name in the built-in actors manifest.
    pub fn name(self) -> &'static str {
        match self {
            ActorType::System => "system",
            ActorType::Init => "init",
            ActorType::Cron => "cron",
            ActorType::Account => "account",
            ActorType::Power => "storagepower",
            ActorType::Miner => "storageminer",
            ActorType::Market => "storagemarket",
            ActorType::PaymentChannel => "paymentchannel",
            ActorType::Multisig => "multisig",
            ActorType::Reward => "reward",
            ActorType::VerifiedRegistry => "verifiedregistry",
            ActorType::Datacap => "datacap",
            ActorType::Evm => "evm",
            ActorType::Eam => "eam",
            ActorType::EthAccount => "ethaccount",
            ActorType::Placeholder => "placeholder",
            ActorType::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> ActorType {
        ActorType::ALL.iter().copied().find(|t| t.name() == name).unwrap_or(ActorType::Unknown)
    }

    /// The first actors release that included this actor.
    pub fn introduced_in(self) -> u32 {
        match self {
            ActorType::Datacap => 9,
            ActorType::Evm | ActorType::Eam | ActorType::EthAccount | ActorType::Placeholder => 10,
            _ => 0,
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match ActorType::from_name(s) {
            ActorType::Unknown if s != "unknown" => {
                Err(Error::Config(format!("unrecognized actor type {}", s)))
            }
            t => Ok(t),
        }
    }
}

impl Serialize for ActorType {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ActorType {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The first actors release shipped as a bundle with a manifest.
pub const FIRST_BUNDLED_ACTORS: u32 = 8;

/// Maps actor code CIDs to actor types.
///
/// Code CIDs of actors v0 through v7 embed the actor name (`fil/<version>/<name>`) under the
/// identity hash and are recognised without registration. Later releases ship code in bundles
/// whose CIDs must be registered from the bundle manifest.
#[derive(Clone, Debug, Default)]
pub struct BuiltinActors {
    codes: BTreeMap<Cid, ActorType>,
}

impl BuiltinActors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: Cid, actor: ActorType) {
        self.codes.insert(code, actor);
    }

    /// Registers a bundle manifest of actor names to code CIDs.
    /// Names not recognised as built-in actors are ignored.
    pub fn add_manifest<'a>(&mut self, entries: impl IntoIterator<Item = (&'a str, Cid)>) {
        for (name, code) in entries {
            match ActorType::from_name(name) {
                ActorType::Unknown => log::debug!("ignoring manifest entry {} ({})", name, code),
                t => self.insert(code, t),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The actor type of a code CID, Unknown if it is not a known built-in actor.
    pub fn actor_type(&self, code: &Cid) -> ActorType {
        if let Some(t) = self.codes.get(code) {
            return *t;
        }
        legacy_actor_type(code).unwrap_or(ActorType::Unknown)
    }
}

fn legacy_actor_type(code: &Cid) -> Option<ActorType> {
    if code.hash().code() != IDENTITY_HASH {
        return None;
    }
    let name = std::str::from_utf8(code.hash().digest()).ok()?;
    let mut parts = name.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("fil"), Some(_), Some(actor)) => Some(ActorType::from_name(actor)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn legacy_code(version: u32, actor: ActorType) -> Cid {
    let digest = format!("fil/{}/{}", version, actor.name());
    let mh = cid::multihash::Multihash::wrap(IDENTITY_HASH, digest.as_bytes()).unwrap();
    Cid::new_v1(fvm_shared::IPLD_RAW, mh)
}

#[cfg(test)]
mod tests {
    use fvm_ipld_encoding::DAG_CBOR;

    use super::*;

    #[test]
    fn names_round_trip() {
        for t in ActorType::ALL {
            assert_eq!(*t, t.name().parse::<ActorType>().unwrap());
        }
        assert!("storagewhatever".parse::<ActorType>().is_err());
    }

    #[test]
    fn recognises_legacy_codes() {
        let actors = BuiltinActors::new();
        assert_eq!(ActorType::Miner, actors.actor_type(&legacy_code(2, ActorType::Miner)));
        assert_eq!(ActorType::Multisig, actors.actor_type(&legacy_code(7, ActorType::Multisig)));
    }

    #[test]
    fn manifest_codes() {
        let code = Cid::new_v1(
            DAG_CBOR,
            cid::multihash::Multihash::wrap(0xb220, &[7u8; 32]).unwrap(),
        );
        let mut actors = BuiltinActors::new();
        assert_eq!(ActorType::Unknown, actors.actor_type(&code));
        actors.add_manifest([("evm", code), ("bogus", Cid::default())]);
        assert_eq!(1, actors.len());
        assert_eq!(ActorType::Evm, actors.actor_type(&code));
    }
}
