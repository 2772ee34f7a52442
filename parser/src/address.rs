use std::collections::HashMap;
use std::sync::Arc;

use fil_trace_api::network::eth_address;
use fil_trace_api::{AddressInfo, Error, Network, Node, TipsetKey};
use fil_trace_builtin::{ActorType, BuiltinActors};
use fvm_shared::address::{Address, Protocol};
use parking_lot::Mutex;
use serde::Serialize;

/// A node lookup that failed while resolving an address.
/// The corresponding field of the resolved [`AddressInfo`] is left empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    pub address: String,
    pub lookup: &'static str,
    pub reason: String,
}

impl From<LookupFailure> for Error {
    fn from(f: LookupFailure) -> Self {
        Error::AddressResolution { address: f.address, lookup: f.lookup, reason: f.reason }
    }
}

/// The outcome of resolving one address: whatever could be resolved, and the lookups that
/// failed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedAddress {
    pub info: AddressInfo,
    pub failures: Vec<LookupFailure>,
}

impl ResolvedAddress {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn actor_type(&self) -> ActorType {
        ActorType::from_name(&self.info.actor_type)
    }
}

/// Resolves addresses to their short and robust forms and actor code, through a node.
///
/// Results are cached per address and tipset. A tipset's entries stay cached until
/// [`AddressResolver::clear_scope`] is called for it, so each lookup is made at most once per
/// address while a tipset is parsed, whether or not it succeeded.
pub struct AddressResolver {
    node: Arc<dyn Node>,
    network: Network,
    actors: Arc<BuiltinActors>,
    cache: Mutex<HashMap<(Address, TipsetKey), AddressInfo>>,
}

impl AddressResolver {
    pub fn new(node: Arc<dyn Node>, network: Network, actors: Arc<BuiltinActors>) -> Self {
        Self { node, network, actors, cache: Mutex::new(HashMap::new()) }
    }

    /// Resolves an address as of a tipset.
    /// Each of the three lookups may fail independently; failures are logged and returned
    /// alongside the partial result. Cached results carry no failures.
    pub fn resolve(&self, addr: &Address, tsk: &TipsetKey) -> ResolvedAddress {
        let key = (*addr, tsk.clone());
        if let Some(info) = self.cache.lock().get(&key) {
            return ResolvedAddress { info: info.clone(), failures: vec![] };
        }

        // The lock is not held across node calls.
        let resolved = self.lookup(addr, tsk);
        self.cache.lock().entry(key).or_insert_with(|| resolved.info.clone());
        resolved
    }

    /// The type of the actor at an address, resolved through the cache.
    pub fn actor_type(&self, addr: &Address, tsk: &TipsetKey) -> ActorType {
        self.resolve(addr, tsk).actor_type()
    }

    /// Drops the cached entries of a tipset.
    pub fn clear_scope(&self, tsk: &TipsetKey) {
        self.cache.lock().retain(|(_, scope), _| scope != tsk);
    }

    /// Number of cached entries, over all tipsets.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    fn lookup(&self, addr: &Address, tsk: &TipsetKey) -> ResolvedAddress {
        let mut failures = Vec::new();
        let mut record = |lookup: &'static str, e: anyhow::Error| {
            let failure = LookupFailure {
                address: self.network.format_address(addr),
                lookup,
                reason: format!("{:#}", e),
            };
            log::warn!("{}", Error::from(failure.clone()));
            failures.push(failure);
        };

        let id = if addr.protocol() == Protocol::ID {
            Some(*addr)
        } else {
            self.node.lookup_id(addr, tsk).unwrap_or_else(|e| {
                record("short", e);
                None
            })
        };
        let robust = if addr.protocol() == Protocol::ID {
            self.node.lookup_robust(addr, tsk).unwrap_or_else(|e| {
                record("robust", e);
                None
            })
        } else {
            Some(*addr)
        };
        let code = self.node.actor_code(id.as_ref().unwrap_or(addr), tsk).unwrap_or_else(|e| {
            record("actor code", e);
            None
        });

        let format = |a: &Option<Address>| a.as_ref().map(|a| self.network.format_address(a));
        let actor_type = match &code {
            Some(c) => self.actors.actor_type(c).name().to_string(),
            None => String::new(),
        };
        let info = AddressInfo {
            short: format(&id).unwrap_or_default(),
            robust: format(&robust).unwrap_or_default(),
            actor_code: code.map(|c| c.to_string()).unwrap_or_default(),
            actor_type,
            eth_address: robust.as_ref().and_then(eth_address),
            creation_tx_hash: None,
        };
        ResolvedAddress { info, failures }
    }
}

#[cfg(test)]
mod tests {
    use fil_trace_api::network::EAM_ACTOR_ID;

    use super::*;
    use crate::node::FakeNode;

    fn resolver(node: FakeNode) -> (AddressResolver, Arc<FakeNode>) {
        let node = Arc::new(node);
        let r = AddressResolver::new(node.clone(), Network::Mainnet, Arc::new(FakeNode::builtin_actors()));
        (r, node)
    }

    #[test]
    fn resolves_both_forms_once_per_scope() {
        let robust = Address::new_actor(b"robust");
        let (r, node) = resolver(FakeNode::new().with_actor(1001, Some(robust), ActorType::Multisig));
        let tsk = TipsetKey::default();

        let first = r.resolve(&robust, &tsk);
        assert!(first.is_complete());
        assert_eq!("f01001", first.info.short);
        assert_eq!(robust.to_string(), first.info.robust);
        assert_eq!(ActorType::Multisig, first.actor_type());

        let calls = node.calls();
        assert_eq!(first.info, r.resolve(&robust, &tsk).info);
        assert_eq!(calls, node.calls());

        r.clear_scope(&tsk);
        assert_eq!(0, r.cached());
        r.resolve(&robust, &tsk);
        assert!(node.calls() > calls);
    }

    #[test]
    fn failures_are_partial() {
        let robust = Address::new_actor(b"robust");
        let (r, _) = resolver(
            FakeNode::new().with_actor(1001, Some(robust), ActorType::Account).with_failing(Address::new_id(1001)),
        );
        let resolved = r.resolve(&Address::new_id(1001), &TipsetKey::default());
        assert_eq!("f01001", resolved.info.short);
        assert_eq!("", resolved.info.robust);
        assert_eq!("", resolved.info.actor_type);
        let lookups: Vec<_> = resolved.failures.iter().map(|f| f.lookup).collect();
        assert_eq!(vec!["robust", "actor code"], lookups);
    }

    #[test]
    fn delegated_address_has_eth_form() {
        let f410 = Address::new_delegated(EAM_ACTOR_ID, &[0xab; 20]).unwrap();
        let (r, _) = resolver(FakeNode::new().with_actor(2000, Some(f410), ActorType::Evm));
        let resolved = r.resolve(&Address::new_id(2000), &TipsetKey::default());
        assert_eq!(Some(format!("0x{}", "ab".repeat(20))), resolved.info.eth_address);
        assert_eq!("evm", resolved.info.actor_type);
    }
}
