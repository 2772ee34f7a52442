use cid::Cid;
use fvm_ipld_encoding::{BytesSer, DAG_CBOR};
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use multihash::Multihash;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Multicodec code of the 256-bit blake2b hash function.
pub const BLAKE2B_256: u64 = 0xb220;

/// Hashes input data using blake2b with 256 bit output.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let hash = blake2b_simd::Params::new().hash_length(32).to_state().update(data).finalize();
    out.copy_from_slice(hash.as_bytes());
    out
}

/// The set of block CIDs that identifies a tipset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipsetKey(#[serde(with = "crate::json::cids")] pub Vec<Cid>);

impl TipsetKey {
    pub fn new(cids: Vec<Cid>) -> Self {
        Self(cids)
    }

    pub fn cids(&self) -> &[Cid] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Computes the tipset's own CID: the blake2b-256 DAG-CBOR CID of the concatenated block
    /// CID bytes, encoded as a CBOR byte string.
    pub fn cid(&self) -> Result<Cid> {
        if self.0.is_empty() {
            return Err(Error::TipsetHash("empty tipset key".to_string()));
        }
        let mut key = Vec::new();
        for c in &self.0 {
            key.extend(c.to_bytes());
        }
        let block = fvm_ipld_encoding::to_vec(&BytesSer(&key))
            .map_err(|e| Error::TipsetHash(e.to_string()))?;
        let digest = Multihash::wrap(BLAKE2B_256, &blake2b_256(&block))
            .map_err(|e| Error::TipsetHash(e.to_string()))?;
        Ok(Cid::new_v1(DAG_CBOR, digest))
    }
}

/// A block within a tipset, with the CIDs of the messages it includes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockInfo {
    #[serde(with = "crate::json::cid")]
    pub cid: Cid,
    #[serde(with = "crate::json::address")]
    pub miner: Address,
    #[serde(with = "crate::json::cids", default)]
    pub messages: Vec<Cid>,
}

/// A tipset with the block-level detail needed to attribute messages to blocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtendedTipset {
    pub key: TipsetKey,
    pub height: ChainEpoch,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub parent_key: TipsetKey,
    #[serde(default)]
    pub blocks: Vec<BlockInfo>,
}

impl ExtendedTipset {
    /// The first block, in tipset order, that includes the message.
    pub fn block_for_message(&self, msg: &Cid) -> Option<&BlockInfo> {
        self.blocks.iter().find(|b| b.messages.contains(msg))
    }

    /// The tipset's CID as a string.
    pub fn cid_string(&self) -> Result<String> {
        self.key.cid().map(|c| c.to_string())
    }
}
