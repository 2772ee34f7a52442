use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An EVM log emitted by a contract, in the node's Ethereum JSON form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub log_index: String,
    #[serde(default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub removed: bool,
}

/// EVM logs of a tipset, keyed by the CID of the message that emitted them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EthLogs(HashMap<String, Vec<EthLog>>);

impl EthLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, msg_cid: impl Into<String>, log: EthLog) {
        self.0.entry(msg_cid.into()).or_default().push(log);
    }

    /// Logs emitted by a message, in emission order.
    pub fn for_message(&self, msg_cid: &str) -> &[EthLog] {
        self.0.get(msg_cid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
