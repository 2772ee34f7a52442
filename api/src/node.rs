use cid::Cid;
use fvm_shared::address::Address;
use fvm_shared::version::NetworkVersion;

use crate::tipset::TipsetKey;

/// A source of chain state for address and actor lookups, typically a node's RPC API.
/// Lookups are made against the state as of a tipset. Implementations are responsible for any
/// retries; the parser calls each lookup at most once per address per tipset.
pub trait Node: Send + Sync {
    /// Resolves an address to its ID form.
    /// Returns None if the address is not bound to an actor at the tipset.
    fn lookup_id(&self, addr: &Address, tsk: &TipsetKey) -> anyhow::Result<Option<Address>>;

    /// Resolves an address to its robust (key, actor or delegated) form.
    /// Returns None if the actor has no robust address.
    fn lookup_robust(&self, addr: &Address, tsk: &TipsetKey) -> anyhow::Result<Option<Address>>;

    /// Looks up the code CID of the actor bound to an address.
    /// Returns None if no such actor is found.
    fn actor_code(&self, addr: &Address, tsk: &TipsetKey) -> anyhow::Result<Option<Cid>>;

    /// Lists the built-in actor bundle active under a network version, as actor names with
    /// their code CIDs. Returns None if the node has no bundle for the version.
    fn actor_codes(&self, version: NetworkVersion) -> anyhow::Result<Option<Vec<(String, Cid)>>>;
}

impl<N: Node + ?Sized> Node for std::sync::Arc<N> {
    fn lookup_id(&self, addr: &Address, tsk: &TipsetKey) -> anyhow::Result<Option<Address>> {
        (**self).lookup_id(addr, tsk)
    }

    fn lookup_robust(&self, addr: &Address, tsk: &TipsetKey) -> anyhow::Result<Option<Address>> {
        (**self).lookup_robust(addr, tsk)
    }

    fn actor_code(&self, addr: &Address, tsk: &TipsetKey) -> anyhow::Result<Option<Cid>> {
        (**self).actor_code(addr, tsk)
    }

    fn actor_codes(&self, version: NetworkVersion) -> anyhow::Result<Option<Vec<(String, Cid)>>> {
        (**self).actor_codes(version)
    }
}
