use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use fvm_shared::clock::ChainEpoch;
use fvm_shared::error::ExitCode;
use serde::{Deserialize, Serialize};

/// Transaction type of synthesized fee records.
pub const FEE_TX_TYPE: &str = "Fee";
/// Method name used when a call's method cannot be resolved or decoded.
pub const UNKNOWN_METHOD: &str = "unknown";

/// A flattened record of one call (or one fee payment) in a tipset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub id: String,
    pub parent_id: String,
    /// Depth of the call below its top-level message. Fee records are level 0.
    pub level: u16,
    pub height: ChainEpoch,
    pub timestamp: u64,
    pub tipset_cid: String,
    pub block_cid: String,
    /// CID of the top-level message this record belongs to.
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    /// Value transferred, in attoFIL.
    pub amount: String,
    pub gas_used: i64,
    pub status: String,
    pub tx_type: String,
    /// JSON encoded metadata: method number, decoded params and return.
    pub metadata: String,
}

impl Transaction {
    pub fn is_success(&self) -> bool {
        self.status == exit_status(ExitCode::OK)
    }

    pub fn is_fee(&self) -> bool {
        self.tx_type == FEE_TX_TYPE
    }

    /// Parses the metadata, returning None if it is not a JSON object.
    pub fn metadata_json(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        match serde_json::from_str(&self.metadata) {
            Ok(serde_json::Value::Object(m)) => Some(m),
            _ => None,
        }
    }
}

/// Human readable name of an exit code, as recorded in a transaction's status.
pub fn exit_status(code: ExitCode) -> String {
    let name = match code.value() {
        0 => "Ok",
        1 => "SysErrSenderInvalid",
        2 => "SysErrSenderStateInvalid",
        4 => "SysErrIllegalInstruction",
        5 => "SysErrInvalidReceiver",
        6 => "SysErrInsufficientFunds",
        7 => "SysErrOutOfGas",
        9 => "SysErrIllegalExitCode",
        10 => "SysErrFatal",
        11 => "SysErrMissingReturn",
        16 => "ErrIllegalArgument",
        17 => "ErrNotFound",
        18 => "ErrForbidden",
        19 => "ErrInsufficientFunds",
        20 => "ErrIllegalState",
        21 => "ErrSerialization",
        22 => "ErrUnhandledMessage",
        23 => "ErrUnspecified",
        24 => "ErrAssertionFailed",
        25 => "ErrReadOnly",
        26 => "ErrNotPayable",
        other => return format!("ExitCode({})", other),
    };
    name.to_string()
}

/// Everything known about an address seen while parsing a tipset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AddressInfo {
    /// ID form (`f0...`), empty if it could not be resolved.
    pub short: String,
    /// Key, actor or delegated form, empty if the actor has none or it could not be resolved.
    pub robust: String,
    /// CID of the actor's code, empty if unknown.
    pub actor_code: String,
    pub actor_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_address: Option<String>,
    /// Message in which the actor was created, if it was created in this tipset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_tx_hash: Option<String>,
}

impl AddressInfo {
    /// Merges in fields this record lacks from another record of the same actor.
    pub fn fill_from(&mut self, other: &AddressInfo) {
        fn fill(dst: &mut String, src: &str) {
            if dst.is_empty() {
                dst.push_str(src);
            }
        }
        fill(&mut self.short, &other.short);
        fill(&mut self.robust, &other.robust);
        fill(&mut self.actor_code, &other.actor_code);
        fill(&mut self.actor_type, &other.actor_type);
        if self.eth_address.is_none() {
            self.eth_address = other.eth_address.clone();
        }
        if self.creation_tx_hash.is_none() {
            self.creation_tx_hash = other.creation_tx_hash.clone();
        }
    }
}

/// Address metadata collected over a parse, keyed by short address.
/// A short address may map to more than one robust form; identical (short, robust) pairs are
/// kept once, the first insertion winning apart from fields it left empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfoMap {
    entries: BTreeMap<String, Vec<AddressInfo>>,
}

impl AddressInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning false if an entry with the same short and robust forms
    /// was already present.
    pub fn insert(&mut self, info: AddressInfo) -> bool {
        let key = if info.short.is_empty() { info.robust.clone() } else { info.short.clone() };
        match self.entries.entry(key) {
            Entry::Vacant(v) => {
                v.insert(vec![info]);
                true
            }
            Entry::Occupied(mut o) => {
                let list = o.get_mut();
                match list.iter_mut().find(|e| e.robust == info.robust) {
                    Some(existing) => {
                        existing.fill_from(&info);
                        false
                    }
                    None => {
                        list.push(info);
                        true
                    }
                }
            }
        }
    }

    pub fn extend(&mut self, other: AddressInfoMap) {
        for info in other.into_entries() {
            self.insert(info);
        }
    }

    /// Entries recorded for a short address.
    pub fn get(&self, short: &str) -> &[AddressInfo] {
        self.entries.get(short).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of entries across all short addresses.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AddressInfo> {
        self.entries.values().flatten()
    }

    pub fn into_entries(self) -> impl Iterator<Item = AddressInfo> {
        self.entries.into_values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(short: &str, robust: &str) -> AddressInfo {
        AddressInfo {
            short: short.to_string(),
            robust: robust.to_string(),
            actor_type: "account".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn identical_pairs_are_deduplicated() {
        let mut map = AddressInfoMap::new();
        assert!(map.insert(info("f01001", "f1abc")));
        assert!(!map.insert(info("f01001", "f1abc")));
        assert_eq!(1, map.len());
    }

    #[test]
    fn differing_robust_forms_are_kept() {
        let mut map = AddressInfoMap::new();
        assert!(map.insert(info("f01001", "f1abc")));
        assert!(map.insert(info("f01001", "f2xyz")));
        assert_eq!(2, map.len());
        assert_eq!(2, map.get("f01001").len());
    }

    #[test]
    fn duplicate_fills_missing_fields() {
        let mut map = AddressInfoMap::new();
        map.insert(AddressInfo { actor_type: String::new(), ..info("f01001", "f1abc") });
        let mut later = info("f01001", "f1abc");
        later.creation_tx_hash = Some("bafy".to_string());
        map.insert(later);
        let stored = &map.get("f01001")[0];
        assert_eq!("account", stored.actor_type);
        assert_eq!(Some("bafy".to_string()), stored.creation_tx_hash);
    }

    #[test]
    fn exit_status_names() {
        assert_eq!("Ok", exit_status(ExitCode::OK));
        assert_eq!("ErrIllegalArgument", exit_status(ExitCode::USR_ILLEGAL_ARGUMENT));
        assert_eq!("SysErrOutOfGas", exit_status(ExitCode::SYS_OUT_OF_GAS));
        assert_eq!("ExitCode(42)", exit_status(ExitCode::new(42)));
    }
}
