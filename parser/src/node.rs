use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use cid::multihash::Multihash;
use cid::Cid;
use fil_trace_api::tipset::{blake2b_256, BLAKE2B_256};
use fil_trace_api::{Node, TipsetKey};
use fil_trace_builtin::{ActorType, BuiltinActors};
use fvm_shared::address::{Address, Protocol};
use fvm_shared::version::NetworkVersion;
use fvm_shared::{ActorID, IPLD_RAW};

/// The code CID a [`FakeNode`] reports for a built-in actor type.
pub fn fake_code(actor: ActorType) -> Cid {
    let digest = blake2b_256(format!("fake/{}", actor.name()).as_bytes());
    // A 32 byte digest always fits a multihash.
    match Multihash::wrap(BLAKE2B_256, &digest) {
        Ok(mh) => Cid::new_v1(IPLD_RAW, mh),
        Err(_) => Cid::default(),
    }
}

/// An implementation of node lookups backed by in-memory state, for tests and offline use.
/// State does not vary by tipset. Every network version from 16 reports the same bundle, made
/// of the [`fake_code`] of each built-in actor type.
#[derive(Debug, Default)]
pub struct FakeNode {
    ids: HashMap<Address, Address>,
    robust: HashMap<ActorID, Address>,
    codes: HashMap<ActorID, Cid>,
    failing: HashSet<Address>,
    calls: AtomicUsize,
}

impl FakeNode {
    /// Returns a new fake node that knows no actors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Code registry matching the codes reported by [`FakeNode::with_actor`].
    pub fn builtin_actors() -> BuiltinActors {
        let mut actors = BuiltinActors::new();
        actors.add_manifest(ActorType::ALL.iter().map(|t| (t.name(), fake_code(*t))));
        actors
    }

    /// Adds an actor of a built-in type, with an optional robust address.
    pub fn with_actor(self, id: ActorID, robust: Option<Address>, actor: ActorType) -> Self {
        self.with_code(id, robust, fake_code(actor))
    }
    /// Adds an actor with an arbitrary code CID.
    pub fn with_code(mut self, id: ActorID, robust: Option<Address>, code: Cid) -> Self {
        if let Some(r) = robust {
            self.ids.insert(r, Address::new_id(id));
            self.robust.insert(id, r);
        }
        self.codes.insert(id, code);
        self
    }
    /// Makes every lookup keyed by this address fail.
    pub fn with_failing(mut self, addr: Address) -> Self {
        self.failing.insert(addr);
        self
    }

    /// Number of lookups made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn begin(&self, addr: &Address) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(addr) {
            return Err(anyhow!("lookup failed for {}", addr));
        }
        Ok(())
    }

    fn id_of(&self, addr: &Address) -> Option<ActorID> {
        match addr.protocol() {
            Protocol::ID => addr.id().ok(),
            _ => self.ids.get(addr).and_then(|a| a.id().ok()),
        }
    }
}

impl Node for FakeNode {
    fn lookup_id(&self, addr: &Address, _tsk: &TipsetKey) -> anyhow::Result<Option<Address>> {
        self.begin(addr)?;
        Ok(self.id_of(addr).map(Address::new_id))
    }

    fn lookup_robust(&self, addr: &Address, _tsk: &TipsetKey) -> anyhow::Result<Option<Address>> {
        self.begin(addr)?;
        Ok(self.id_of(addr).and_then(|id| self.robust.get(&id).copied()))
    }

    fn actor_code(&self, addr: &Address, _tsk: &TipsetKey) -> anyhow::Result<Option<Cid>> {
        self.begin(addr)?;
        Ok(self.id_of(addr).and_then(|id| self.codes.get(&id).copied()))
    }

    fn actor_codes(&self, version: NetworkVersion) -> anyhow::Result<Option<Vec<(String, Cid)>>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if version < NetworkVersion::V16 {
            return Ok(None);
        }
        Ok(Some(ActorType::ALL.iter().map(|t| (t.name().to_string(), fake_code(*t))).collect()))
    }
}
