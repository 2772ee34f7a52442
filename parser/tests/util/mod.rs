#![allow(dead_code)]

use std::sync::Arc;

use cid::multihash::Multihash;
use cid::Cid;
use fil_trace_api::tipset::{blake2b_256, BLAKE2B_256};
use fil_trace_api::trace::{Message, MessageGasCost, MessageTrace, Receipt, ReturnTrace};
use fil_trace_api::{BlockInfo, ExecutionTrace, ExtendedTipset, InvocResult, TipsetKey};
use fil_trace_builtin::ActorType;
use fil_trace_parser::{FakeNode, ParserConfig, TraceParser};
use fvm_ipld_encoding::DAG_CBOR;
use fvm_shared::address::Address;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;
use fvm_shared::MethodNum;

pub const SENDER: u64 = 100;
pub const MULTISIG: u64 = 200;
pub const MINER: u64 = 1000;
/// A height at which network version 22 is active on mainnet.
pub const HEIGHT: i64 = 3_900_000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A deterministic CID derived from a label.
pub fn cid(label: &str) -> Cid {
    match Multihash::wrap(BLAKE2B_256, &blake2b_256(label.as_bytes())) {
        Ok(mh) => Cid::new_v1(DAG_CBOR, mh),
        Err(e) => panic!("bad multihash: {}", e),
    }
}

/// A node knowing an account sender and a multisig, both with robust addresses, and a miner.
pub fn node() -> FakeNode {
    FakeNode::new()
        .with_actor(SENDER, Some(Address::new_actor(b"sender")), ActorType::Account)
        .with_actor(MULTISIG, Some(Address::new_actor(b"multisig")), ActorType::Multisig)
        .with_actor(MINER, None, ActorType::Miner)
}

pub fn parser(node: FakeNode) -> TraceParser {
    parser_with(node, ParserConfig::new())
}

pub fn parser_with(node: FakeNode, config: ParserConfig) -> TraceParser {
    TraceParser::builder(Arc::new(node))
        .with_config(config)
        .with_actors(FakeNode::builtin_actors())
        .build()
        .unwrap()
}

/// A single-block tipset including the given messages.
pub fn tipset(messages: Vec<Cid>) -> ExtendedTipset {
    ExtendedTipset {
        key: TipsetKey::new(vec![cid("block")]),
        height: HEIGHT,
        timestamp: 1_700_000_000,
        parent_key: TipsetKey::new(vec![cid("parent")]),
        blocks: vec![BlockInfo { cid: cid("block"), miner: Address::new_id(MINER), messages }],
    }
}

/// A call from the sender, with a receipt carrying the exit code.
pub fn call(to: u64, method: MethodNum, exit: ExitCode, subcalls: Vec<ExecutionTrace>) -> ExecutionTrace {
    ExecutionTrace {
        msg: MessageTrace {
            from: Address::new_id(SENDER),
            to: Address::new_id(to),
            value: TokenAmount::from_atto(10),
            method,
            params: vec![],
            params_codec: 0,
            gas_limit: None,
            read_only: None,
        },
        msg_rct: Some(ReturnTrace {
            exit_code: Some(exit),
            r#return: vec![],
            return_codec: 0,
            gas_used: Some(100),
        }),
        invoked_actor: None,
        subcalls,
        error: None,
    }
}

/// A top-level message result with the given trace and total gas cost.
pub fn invocation(msg_cid: Cid, trace: ExecutionTrace, total_cost: u64) -> InvocResult {
    let exit_code = trace.msg_rct.as_ref().and_then(|r| r.exit_code).unwrap_or(ExitCode::OK);
    InvocResult {
        msg_cid,
        msg: Some(Message {
            version: 0,
            to: trace.msg.to,
            from: trace.msg.from,
            nonce: 1,
            value: trace.msg.value.clone(),
            gas_limit: 10_000,
            gas_fee_cap: TokenAmount::from_atto(5),
            gas_premium: TokenAmount::from_atto(1),
            method: trace.msg.method,
            params: trace.msg.params.clone(),
        }),
        msg_rct: Some(Receipt { exit_code, r#return: vec![], gas_used: 1_000 }),
        gas_cost: Some(MessageGasCost {
            miner_tip: TokenAmount::from_atto(total_cost / 2),
            base_fee_burn: TokenAmount::from_atto(total_cost - total_cost / 2),
            total_cost: TokenAmount::from_atto(total_cost),
            ..Default::default()
        }),
        execution_trace: Some(trace),
        error: String::new(),
        duration: 10,
    }
}
