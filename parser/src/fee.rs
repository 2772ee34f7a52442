use fil_trace_api::transaction::{exit_status, FEE_TX_TYPE};
use fil_trace_api::{build_id, InvocResult, Network, Transaction};
use fvm_shared::address::Address;
use fvm_shared::error::ExitCode;
use fvm_shared::ActorID;
use serde_json::{json, Map, Value};

use crate::walker::TraceScope;

/// Actor receiving burnt fees.
pub const BURNT_FUNDS_ACTOR_ID: ActorID = 99;

/// Builds the fee record of a top-level message: what the sender paid for gas, split between
/// the block miner and the burnt funds actor.
/// Returns None for messages that cost nothing. The record sits beside the message's call
/// tree, sharing the root call's parent.
pub fn fee_transaction(
    network: Network,
    scope: &TraceScope,
    parent_id: &str,
    miner: Option<&Address>,
    result: &InvocResult,
) -> Option<Transaction> {
    let total = result.total_cost();
    if total.is_zero() {
        return None;
    }
    let cost = result.gas_cost.clone().unwrap_or_default();
    let from = match (&result.msg, &result.execution_trace) {
        (Some(m), _) => network.format_address(&m.from),
        (None, Some(t)) => network.format_address(&t.msg.from),
        (None, None) => String::new(),
    };
    let miner = miner.map(|m| network.format_address(m)).unwrap_or_default();
    let burn = network.format_address(&Address::new_id(BURNT_FUNDS_ACTOR_ID));

    let mut metadata = Map::new();
    metadata.insert(
        "MinerFee".to_string(),
        json!({ "MinerAddress": miner, "Amount": cost.miner_tip.atto().to_string() }),
    );
    metadata.insert(
        "OverEstimationBurnFee".to_string(),
        json!({ "BurnAddress": burn, "Amount": cost.over_estimation_burn.atto().to_string() }),
    );
    metadata.insert(
        "BurnFee".to_string(),
        json!({ "BurnAddress": burn, "Amount": cost.base_fee_burn.atto().to_string() }),
    );
    if let Some(msg) = &result.msg {
        metadata.insert("GasUsed".to_string(), json!(result.gas_used()));
        metadata.insert("GasLimit".to_string(), json!(msg.gas_limit));
        metadata.insert("GasFeeCap".to_string(), json!(msg.gas_fee_cap.atto().to_string()));
        metadata.insert("GasPremium".to_string(), json!(msg.gas_premium.atto().to_string()));
    }

    let id = build_id(&[scope.tipset_cid, scope.block_cid, scope.msg_cid, parent_id, FEE_TX_TYPE]);
    Some(Transaction {
        id,
        parent_id: parent_id.to_string(),
        level: 0,
        height: scope.tipset.height,
        timestamp: scope.tipset.timestamp,
        tipset_cid: scope.tipset_cid.to_string(),
        block_cid: scope.block_cid.to_string(),
        tx_hash: scope.msg_cid.to_string(),
        from,
        to: miner,
        amount: total.atto().to_string(),
        gas_used: result.gas_used(),
        // Gas is charged whether or not the message succeeded.
        status: exit_status(ExitCode::OK),
        tx_type: FEE_TX_TYPE.to_string(),
        metadata: Value::Object(metadata).to_string(),
    })
}
