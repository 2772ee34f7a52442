use std::borrow::Cow;

use cid::Cid;
use fvm_shared::address::Address;
use fvm_shared::bigint::Zero;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;
use fvm_shared::{ActorID, MethodNum};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The output of a node's compute-state call for one tipset: the resulting state root and one
/// invocation result per message applied, in application order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComputeStateOutput {
    #[serde(with = "crate::json::opt_cid", default)]
    pub root: Option<Cid>,
    #[serde(deserialize_with = "crate::json::null_as_default", default)]
    pub trace: Vec<InvocResult>,
}

/// The result of applying a single top-level message.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocResult {
    #[serde(with = "crate::json::cid")]
    pub msg_cid: Cid,
    #[serde(default)]
    pub msg: Option<Message>,
    #[serde(default)]
    pub msg_rct: Option<Receipt>,
    #[serde(default)]
    pub gas_cost: Option<MessageGasCost>,
    #[serde(default)]
    pub execution_trace: Option<ExecutionTrace>,
    #[serde(deserialize_with = "crate::json::null_as_default", default)]
    pub error: String,
    #[serde(default)]
    pub duration: u64,
}

impl InvocResult {
    /// Total cost charged to the sender, zero when the node reported no gas cost.
    pub fn total_cost(&self) -> TokenAmount {
        self.gas_cost.as_ref().map(|g| g.total_cost.clone()).unwrap_or_else(TokenAmount::zero)
    }

    /// Gas used by the top-level message, from its receipt.
    pub fn gas_used(&self) -> i64 {
        self.msg_rct.as_ref().map(|r| r.gas_used).unwrap_or_default()
    }

    /// The execution trace tree for this message.
    /// When the node recorded no trace (the message failed before execution started), a
    /// single-node trace is synthesized from the message and its receipt.
    pub fn trace(&self) -> Option<Cow<'_, ExecutionTrace>> {
        if let Some(trace) = &self.execution_trace {
            return Some(Cow::Borrowed(trace));
        }
        let msg = self.msg.as_ref()?;
        Some(Cow::Owned(ExecutionTrace {
            msg: MessageTrace {
                from: msg.from,
                to: msg.to,
                value: msg.value.clone(),
                method: msg.method,
                params: msg.params.clone(),
                params_codec: 0,
                gas_limit: Some(msg.gas_limit),
                read_only: None,
            },
            msg_rct: self.msg_rct.as_ref().map(|r| ReturnTrace {
                exit_code: Some(r.exit_code),
                r#return: r.r#return.clone(),
                return_codec: 0,
                gas_used: Some(r.gas_used),
            }),
            invoked_actor: None,
            subcalls: Vec::new(),
            error: (!self.error.is_empty()).then(|| self.error.clone()),
        }))
    }
}

/// A top-level chain message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(default)]
    pub version: u64,
    #[serde(with = "crate::json::address")]
    pub to: Address,
    #[serde(with = "crate::json::address")]
    pub from: Address,
    #[serde(default)]
    pub nonce: u64,
    #[serde(with = "crate::json::token")]
    pub value: TokenAmount,
    #[serde(default)]
    pub gas_limit: u64,
    #[serde(with = "crate::json::token")]
    pub gas_fee_cap: TokenAmount,
    #[serde(with = "crate::json::token")]
    pub gas_premium: TokenAmount,
    #[serde(default)]
    pub method: MethodNum,
    #[serde(with = "crate::json::bytes", default)]
    pub params: Vec<u8>,
}

/// The receipt of a top-level message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Receipt {
    #[serde(serialize_with = "serialize_exit_code", deserialize_with = "deserialize_exit_code")]
    pub exit_code: ExitCode,
    #[serde(with = "crate::json::bytes", default)]
    pub r#return: Vec<u8>,
    #[serde(default)]
    pub gas_used: i64,
}

fn serialize_exit_code<S: serde::Serializer>(c: &ExitCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u32(c.value())
}

fn deserialize_exit_code<'de, D: serde::Deserializer<'de>>(d: D) -> Result<ExitCode, D::Error> {
    Ok(ExitCode::new(u32::deserialize(d)?))
}

/// The breakdown of what a message's gas cost the sender, and where it went.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageGasCost {
    #[serde(with = "crate::json::opt_cid", default)]
    pub message: Option<Cid>,
    #[serde(with = "crate::json::token")]
    pub gas_used: TokenAmount,
    #[serde(with = "crate::json::token")]
    pub base_fee_burn: TokenAmount,
    #[serde(with = "crate::json::token")]
    pub over_estimation_burn: TokenAmount,
    #[serde(with = "crate::json::token")]
    pub miner_penalty: TokenAmount,
    #[serde(with = "crate::json::token")]
    pub miner_tip: TokenAmount,
    #[serde(with = "crate::json::token")]
    pub refund: TokenAmount,
    #[serde(with = "crate::json::token")]
    pub total_cost: TokenAmount,
}

/// Free stack below which a recursive pass over a trace switches to a fresh segment.
const STACK_RED_ZONE: usize = 64 * 1024;
/// Size of each stack segment allocated for deep traces.
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// A trace of an actor method invocation and everything it invoked in turn.
/// The tree is rooted at the top-level message; subcalls are in the order they were made.
///
/// Traces nest as deep as the VM's call depth limit. Dropping is iterative and cloning grows the
/// stack on demand, so neither overflows on deep trees.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionTrace {
    pub msg: MessageTrace,
    #[serde(default)]
    pub msg_rct: Option<ReturnTrace>,
    #[serde(default)]
    pub invoked_actor: Option<ActorTrace>,
    #[serde(deserialize_with = "crate::json::null_as_default", default)]
    pub subcalls: Vec<ExecutionTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionTrace {
    /// The call's receipt. A receipt without an exit code is treated as absent.
    pub fn receipt(&self) -> crate::Result<CallReceipt<'_>> {
        let missing = || Error::MissingReceipt { to: self.msg.to.to_string(), method: self.msg.method };
        let rct = self.msg_rct.as_ref().ok_or_else(missing)?;
        Ok(CallReceipt {
            exit_code: rct.exit_code.ok_or_else(missing)?,
            return_bytes: &rct.r#return,
            gas_used: rct.gas_used.unwrap_or_default(),
        })
    }

    /// Whether the call completed successfully. Calls without a receipt did not.
    pub fn is_success(&self) -> bool {
        self.receipt().map(|r| r.exit_code.is_success()).unwrap_or(false)
    }

    /// The code CID of the invoked actor, when the node recorded it.
    pub fn invoked_code(&self) -> Option<&Cid> {
        self.invoked_actor.as_ref().map(|a| &a.state.code)
    }

    /// Number of calls in this tree, including the root.
    pub fn call_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.subcalls.iter());
        }
        count
    }

    /// One line per call, indented by depth.
    pub fn format(&self) -> String {
        let mut lines = Vec::new();
        let mut stack = vec![(0usize, self)];
        while let Some((depth, node)) = stack.pop() {
            let code = node
                .receipt()
                .map(|r| r.exit_code.value().to_string())
                .unwrap_or_else(|_| "-".to_string());
            lines.push(format!(
                "{}{} -> {} method {} value {} exit {}",
                "  ".repeat(depth),
                node.msg.from,
                node.msg.to,
                node.msg.method,
                node.msg.value.atto(),
                code
            ));
            stack.extend(node.subcalls.iter().rev().map(|s| (depth + 1, s)));
        }
        lines.iter().join("\n")
    }
}

impl Clone for ExecutionTrace {
    fn clone(&self) -> Self {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || ExecutionTrace {
            msg: self.msg.clone(),
            msg_rct: self.msg_rct.clone(),
            invoked_actor: self.invoked_actor.clone(),
            subcalls: self.subcalls.clone(),
            error: self.error.clone(),
        })
    }
}

impl Drop for ExecutionTrace {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.subcalls);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.subcalls);
        }
    }
}

/// The message of a single call within a trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageTrace {
    #[serde(with = "crate::json::address")]
    pub from: Address,
    #[serde(with = "crate::json::address")]
    pub to: Address,
    #[serde(with = "crate::json::token")]
    pub value: TokenAmount,
    #[serde(default)]
    pub method: MethodNum,
    #[serde(with = "crate::json::bytes", default)]
    pub params: Vec<u8>,
    #[serde(default)]
    pub params_codec: u64,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    #[serde(default)]
    pub read_only: Option<bool>,
}

/// The outcome of a single call within a trace, as recorded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReturnTrace {
    #[serde(with = "crate::json::opt_exit_code", default)]
    pub exit_code: Option<ExitCode>,
    #[serde(with = "crate::json::bytes", default)]
    pub r#return: Vec<u8>,
    #[serde(default)]
    pub return_codec: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<i64>,
}

/// A validated view of a call's receipt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallReceipt<'a> {
    pub exit_code: ExitCode,
    pub return_bytes: &'a [u8],
    pub gas_used: i64,
}

/// The actor that received a call, as it was when invoked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActorTrace {
    pub id: ActorID,
    pub state: ActorTraceState,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActorTraceState {
    #[serde(with = "crate::json::cid")]
    pub code: Cid,
    #[serde(with = "crate::json::opt_address", default)]
    pub delegated_address: Option<Address>,
}
