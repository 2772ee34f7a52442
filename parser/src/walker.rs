//! Flattening of execution trace trees into transactions.

use fil_trace_api::transaction::{exit_status, UNKNOWN_METHOD};
use fil_trace_api::{
    build_id, AddressInfoMap, EthLogs, ExecutionTrace, ExtendedTipset, Network, Transaction,
};
use fil_trace_builtin::{
    ActorCodec, ActorType, BuiltinActors, Call, DecodeContext, DecodedCall, MethodResolver,
};
use fvm_shared::address::Address;
use serde::Serialize;
use serde_json::json;

use crate::address::{AddressResolver, LookupFailure};
use crate::config::ParserConfig;

/// Status recorded for calls that carry no receipt.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// A call that was not emitted, along with every call below it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedNode {
    /// CID of the top-level message the call belongs to.
    pub tx_hash: String,
    pub level: u16,
    pub to: String,
    pub method: u64,
    /// Number of calls dropped, including this one.
    pub calls: usize,
    pub reason: String,
}

/// Everything the walker produces for a tipset.
#[derive(Clone, Debug, Default)]
pub struct WalkOutput {
    pub transactions: Vec<Transaction>,
    pub addresses: AddressInfoMap,
    pub skipped: Vec<SkippedNode>,
    pub address_failures: Vec<LookupFailure>,
}

/// Identifies the tipset and message a trace belongs to.
#[derive(Clone, Copy, Debug)]
pub struct TraceScope<'a> {
    pub tipset: &'a ExtendedTipset,
    pub tipset_cid: &'a str,
    pub block_cid: &'a str,
    pub msg_cid: &'a str,
    pub eth_logs: &'a EthLogs,
}

/// An emitted call along with its metadata.
struct Visited {
    tx: Transaction,
    decoded: DecodedCall,
    invokes_contract: bool,
}

/// Walks execution traces, naming and decoding every call.
pub struct TraceWalker<'a> {
    pub config: &'a ParserConfig,
    pub methods: &'a MethodResolver,
    pub codec: &'a dyn ActorCodec,
    pub actors: &'a BuiltinActors,
    pub addresses: &'a AddressResolver,
}

impl TraceWalker<'_> {
    /// Appends the transactions of one trace tree to the output, in pre-order: each call
    /// followed by its subcalls in the order they were made.
    ///
    /// Subcalls of a failed call, and of a call with no receipt, are not visited: whatever
    /// they did was reverted. A call that fails to decode is dropped with its subtree, since
    /// its children would refer to a parent that was never emitted. Dropped calls are
    /// reported in `skipped`. The message's EVM logs are attached to its top-most
    /// InvokeContract call, the first one in walk order among the shallowest. Returns the ID of
    /// the root transaction, if it was emitted.
    pub fn walk(
        &self,
        scope: &TraceScope,
        parent_id: &str,
        root: &ExecutionTrace,
        out: &mut WalkOutput,
    ) -> Option<String> {
        let mut root_id = None;
        let mut index = 0usize;
        // Level and position of the call the EVM logs go to, with its metadata.
        let mut logs_target: Option<(u16, usize, DecodedCall)> = None;
        let mut stack: Vec<(&ExecutionTrace, u16, String)> = vec![(root, 0, parent_id.to_string())];
        while let Some((node, level, parent)) = stack.pop() {
            if level as usize >= self.config.max_depth {
                self.skip(scope, node, level, format!("exceeds max depth {}", self.config.max_depth), out);
                continue;
            }
            let Visited { tx, decoded, invokes_contract } = match self.visit(scope, node, level, &parent, index, out) {
                Some(v) => v,
                None => continue,
            };
            index += 1;
            if invokes_contract && logs_target.as_ref().map_or(true, |(l, _, _)| level < *l) {
                logs_target = Some((level, out.transactions.len(), decoded));
            }
            if level == 0 {
                root_id = Some(tx.id.clone());
            }
            if node.is_success() {
                stack.extend(node.subcalls.iter().rev().map(|c| (c, level + 1, tx.id.clone())));
            }
            out.transactions.push(tx);
        }
        let logs = scope.eth_logs.for_message(scope.msg_cid);
        if let Some((_, pos, mut decoded)) = logs_target.filter(|_| !logs.is_empty()) {
            decoded.insert("EthLogs", json!(logs));
            out.transactions[pos].metadata = decoded.to_json_string();
        }
        root_id
    }

    fn visit(
        &self,
        scope: &TraceScope,
        node: &ExecutionTrace,
        level: u16,
        parent_id: &str,
        index: usize,
        out: &mut WalkOutput,
    ) -> Option<Visited> {
        let network = self.config.network;
        let height = scope.tipset.height;
        let msg = &node.msg;

        let receiver = if self.config.resolve_addresses {
            self.record_address(scope, &msg.from, out);
            self.record_address(scope, &msg.to, out)
        } else {
            ActorType::Unknown
        };
        let actor = node.invoked_code().map(|c| self.actors.actor_type(c)).unwrap_or(receiver);

        let receipt = match node.receipt() {
            Ok(r) => r,
            Err(e) => {
                log::debug!("{} in {}", e, scope.msg_cid);
                let gas_used = node.msg_rct.as_ref().and_then(|r| r.gas_used).unwrap_or_default();
                let metadata = DecodedCall::raw(msg.method, &msg.params, &[]);
                let tx = self.transaction(
                    scope,
                    node,
                    level,
                    parent_id,
                    index,
                    UNKNOWN_METHOD,
                    UNKNOWN_STATUS.to_string(),
                    gas_used,
                    &metadata,
                );
                return Some(Visited { tx, decoded: metadata, invokes_contract: false });
            }
        };

        let method = self.methods.method_name(actor, msg.method, network, height).unwrap_or_else(|e| {
            log::debug!("{}; call to {} left undecoded", e, msg.to);
            UNKNOWN_METHOD.to_string()
        });
        let ctx = DecodeContext {
            network,
            version: self.methods.registry().resolve(network, height),
            height,
            tx_cid: scope.msg_cid,
        };
        let call = Call {
            actor,
            method_num: msg.method,
            method: &method,
            params: &msg.params,
            ret: receipt.return_bytes,
        };
        let decoded = match self.codec.decode(&ctx, &call) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("dropping call in {}: {}", scope.msg_cid, e);
                self.skip(scope, node, level, e.to_string(), out);
                return None;
            }
        };
        if let Some(created) = &decoded.created_address {
            out.addresses.insert(created.clone());
        }
        let tx = self.transaction(
            scope,
            node,
            level,
            parent_id,
            index,
            &method,
            exit_status(receipt.exit_code),
            receipt.gas_used,
            &decoded,
        );
        Some(Visited { tx, decoded, invokes_contract: call.is_contract_invocation() })
    }

    /// Resolves a participant address into the map, returning its actor type.
    fn record_address(&self, scope: &TraceScope, addr: &Address, out: &mut WalkOutput) -> ActorType {
        let resolved = self.addresses.resolve(addr, &scope.tipset.key);
        let actor = resolved.actor_type();
        out.address_failures.extend(resolved.failures);
        if !resolved.info.short.is_empty() || !resolved.info.robust.is_empty() {
            out.addresses.insert(resolved.info);
        }
        actor
    }

    fn skip(&self, scope: &TraceScope, node: &ExecutionTrace, level: u16, reason: String, out: &mut WalkOutput) {
        out.skipped.push(SkippedNode {
            tx_hash: scope.msg_cid.to_string(),
            level,
            to: self.config.network.format_address(&node.msg.to),
            method: node.msg.method,
            calls: node.call_count(),
            reason,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn transaction(
        &self,
        scope: &TraceScope,
        node: &ExecutionTrace,
        level: u16,
        parent_id: &str,
        index: usize,
        method: &str,
        status: String,
        gas_used: i64,
        decoded: &DecodedCall,
    ) -> Transaction {
        let network: Network = self.config.network;
        let index = index.to_string();
        let id = build_id(&[scope.tipset_cid, scope.block_cid, scope.msg_cid, parent_id, method, index.as_str()]);
        Transaction {
            id,
            parent_id: parent_id.to_string(),
            level,
            height: scope.tipset.height,
            timestamp: scope.tipset.timestamp,
            tipset_cid: scope.tipset_cid.to_string(),
            block_cid: scope.block_cid.to_string(),
            tx_hash: scope.msg_cid.to_string(),
            from: network.format_address(&node.msg.from),
            to: network.format_address(&node.msg.to),
            amount: node.msg.value.atto().to_string(),
            gas_used,
            status,
            tx_type: method.to_string(),
            metadata: decoded.to_json_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fil_trace_api::trace::{MessageTrace, ReturnTrace};
    use fil_trace_api::{EthLog, TipsetKey};
    use fil_trace_builtin::BuiltinCodec;
    use fvm_shared::econ::TokenAmount;
    use fvm_shared::error::ExitCode;

    use super::*;
    use crate::node::FakeNode;

    struct Fixture {
        config: ParserConfig,
        methods: MethodResolver,
        codec: BuiltinCodec,
        actors: BuiltinActors,
        addresses: AddressResolver,
        tipset: ExtendedTipset,
        logs: EthLogs,
    }

    impl Fixture {
        fn new(config: ParserConfig) -> Self {
            let node = FakeNode::new()
                .with_actor(100, Some(Address::new_actor(b"sender")), ActorType::Account)
                .with_actor(200, Some(Address::new_actor(b"msig")), ActorType::Multisig)
                .with_actor(300, None, ActorType::Evm);
            let actors = FakeNode::builtin_actors();
            Self {
                addresses: AddressResolver::new(Arc::new(node), config.network, Arc::new(actors.clone())),
                config,
                methods: MethodResolver::default(),
                codec: BuiltinCodec::default(),
                actors,
                tipset: ExtendedTipset {
                    key: TipsetKey::default(),
                    height: 4_000_000,
                    timestamp: 1,
                    parent_key: TipsetKey::default(),
                    blocks: vec![],
                },
                logs: EthLogs::new(),
            }
        }

        fn walk(&self, root: &ExecutionTrace) -> WalkOutput {
            let walker = TraceWalker {
                config: &self.config,
                methods: &self.methods,
                codec: &self.codec,
                actors: &self.actors,
                addresses: &self.addresses,
            };
            let scope = TraceScope {
                tipset: &self.tipset,
                tipset_cid: "bafyts",
                block_cid: "bafyblock",
                msg_cid: "bafymsg",
                eth_logs: &self.logs,
            };
            let mut out = WalkOutput::default();
            walker.walk(&scope, "bafyts", root, &mut out);
            out
        }
    }

    fn call(to: u64, method: u64, params: Vec<u8>, code: Option<u32>, subcalls: Vec<ExecutionTrace>) -> ExecutionTrace {
        ExecutionTrace {
            msg: MessageTrace {
                from: Address::new_id(100),
                to: Address::new_id(to),
                value: TokenAmount::from_atto(1),
                method,
                params,
                params_codec: 0,
                gas_limit: None,
                read_only: None,
            },
            msg_rct: code.map(|c| ReturnTrace {
                exit_code: Some(ExitCode::new(c)),
                r#return: vec![],
                return_codec: 0,
                gas_used: Some(10),
            }),
            invoked_actor: None,
            subcalls,
            error: None,
        }
    }

    #[test]
    fn levels_follow_depth() {
        let f = Fixture::new(ParserConfig::new());
        let tree = call(200, 0, vec![], Some(0), vec![call(100, 0, vec![], Some(0), vec![call(200, 0, vec![], Some(0), vec![])])]);
        let out = f.walk(&tree);
        let levels: Vec<_> = out.transactions.iter().map(|t| t.level).collect();
        assert_eq!(vec![0, 1, 2], levels);
        assert_eq!("bafyts", out.transactions[0].parent_id);
        assert_eq!(out.transactions[0].id, out.transactions[1].parent_id);
        assert_eq!(out.transactions[1].id, out.transactions[2].parent_id);
        assert_eq!(2, out.addresses.len());
    }

    #[test]
    fn missing_receipt_is_degraded() {
        let f = Fixture::new(ParserConfig::new());
        let tree = call(200, 2, vec![0x80], None, vec![call(100, 0, vec![], Some(0), vec![])]);
        let out = f.walk(&tree);
        assert_eq!(1, out.transactions.len());
        let tx = &out.transactions[0];
        assert_eq!(UNKNOWN_METHOD, tx.tx_type);
        assert_eq!(UNKNOWN_STATUS, tx.status);
        assert_eq!("f0100", tx.from);
        assert_eq!("f0200", tx.to);
        assert_eq!("1", tx.amount);
        assert_eq!(r#"{"MethodNum":2,"Params":"gA==","Return":null}"#, tx.metadata);
    }

    #[test]
    fn decode_failure_drops_subtree() {
        let f = Fixture::new(ParserConfig::new());
        // AddSigner params that are not CBOR.
        let bad = call(200, 5, vec![0xff], Some(0), vec![call(100, 0, vec![], Some(0), vec![])]);
        let tree = call(200, 0, vec![], Some(0), vec![bad, call(100, 0, vec![], Some(0), vec![])]);
        let out = f.walk(&tree);
        assert_eq!(2, out.transactions.len());
        assert_eq!(1, out.skipped.len());
        assert_eq!(2, out.skipped[0].calls);
        assert_eq!(1, out.skipped[0].level);
    }

    #[test]
    fn depth_limit_is_reported() {
        let f = Fixture::new(ParserConfig::new().with_max_depth(2));
        let tree = call(200, 0, vec![], Some(0), vec![call(100, 0, vec![], Some(0), vec![call(200, 0, vec![], Some(0), vec![])])]);
        let out = f.walk(&tree);
        assert_eq!(2, out.transactions.len());
        assert_eq!(1, out.skipped.len());
        assert_eq!(2, out.skipped[0].level);
    }

    #[test]
    fn unknown_actor_keeps_call() {
        let f = Fixture::new(ParserConfig::new().with_address_resolution(false));
        let tree = call(300, 7, vec![0x80], Some(0), vec![]);
        let out = f.walk(&tree);
        assert_eq!(1, out.transactions.len());
        assert_eq!(UNKNOWN_METHOD, out.transactions[0].tx_type);
        assert!(out.addresses.is_empty());
        assert_eq!(r#"{"MethodNum":7,"Params":"gA==","Return":null}"#, out.transactions[0].metadata);
    }

    #[test]
    fn eth_logs_go_to_topmost_invoke_contract() {
        const INVOKE: u64 = 3844450837;
        let mut f = Fixture::new(ParserConfig::new());
        f.logs.insert("bafymsg", EthLog { address: "0x01".into(), ..Default::default() });
        f.logs.insert("other", EthLog { address: "0x02".into(), ..Default::default() });
        // The shallowest invocation comes after a deeper one in walk order.
        let nested = call(200, 0, vec![], Some(0), vec![call(300, INVOKE, vec![], Some(0), vec![])]);
        let tree = call(200, 0, vec![], Some(0), vec![nested, call(300, INVOKE, vec![], Some(0), vec![])]);
        let out = f.walk(&tree);
        let types: Vec<_> = out.transactions.iter().map(|t| t.tx_type.as_str()).collect();
        assert_eq!(vec!["Send", "Send", "InvokeContract", "InvokeContract"], types);

        let with_logs: Vec<_> = out
            .transactions
            .iter()
            .map(|t| t.metadata_json().map(|m| m.contains_key("EthLogs")).unwrap_or(false))
            .collect();
        assert_eq!(vec![false, false, false, true], with_logs);
        let metadata = out.transactions[3].metadata_json().unwrap();
        assert_eq!(1, metadata["EthLogs"].as_array().unwrap().len());
        assert_eq!("0x01", metadata["EthLogs"][0]["address"]);
        let keys: Vec<_> = metadata.keys().map(String::as_str).collect();
        assert_eq!(vec!["MethodNum", "Params", "Return", "EthLogs"], keys);
    }

    #[test]
    fn no_logs_without_invoke_contract() {
        let mut f = Fixture::new(ParserConfig::new());
        f.logs.insert("bafymsg", EthLog { address: "0x01".into(), ..Default::default() });
        let out = f.walk(&call(200, 0, vec![], Some(0), vec![]));
        assert!(!out.transactions[0].metadata.contains("EthLogs"));
    }
}
