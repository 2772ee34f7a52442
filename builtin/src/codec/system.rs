use cid::Cid;
use fil_trace_api::network::eth_address;
use fil_trace_api::{AddressInfo, Result};
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::{strict_bytes, RawBytes};
use fvm_shared::address::Address;
use fvm_shared::bigint::bigint_ser::{self, BigIntDe};
use fvm_shared::bigint::BigInt;
use fvm_shared::econ::TokenAmount;
use fvm_shared::smooth::FilterEstimate;
use fvm_shared::MethodNum;
use serde_json::json;

use super::{b64, smoothed, token, Call, DecodeContext, DecodedCall};
use crate::actor_type::BuiltinActors;

#[derive(Debug, Deserialize_tuple)]
struct InitConstructorParams {
    network_name: String,
}

#[derive(Debug, Deserialize_tuple)]
struct ExecParams {
    code_cid: Cid,
    constructor_params: RawBytes,
}

#[derive(Debug, Deserialize_tuple)]
struct Exec4Params {
    code_cid: Cid,
    constructor_params: RawBytes,
    #[serde(with = "strict_bytes")]
    subaddress: Vec<u8>,
}

#[derive(Debug, Deserialize_tuple)]
pub(super) struct ExecReturn {
    pub id_address: Address,
    pub robust_address: Address,
}

pub(super) fn decode_init(
    ctx: &DecodeContext,
    actors: &BuiltinActors,
    method: &str,
    call: &Call,
    out: &mut DecodedCall,
) -> Result<()> {
    match method {
        "Constructor" => {
            if let Some(p) = call.params::<InitConstructorParams>()? {
                out.set_params(json!({ "NetworkName": p.network_name }));
            }
        }
        "Exec" | "Exec4" => {
            let code = if method == "Exec" {
                call.params::<ExecParams>()?.map(|p| {
                    out.set_params(json!({
                        "CodeCid": p.code_cid.to_string(),
                        "ConstructorParams": b64(p.constructor_params.bytes()),
                    }));
                    p.code_cid
                })
            } else {
                call.params::<Exec4Params>()?.map(|p| {
                    out.set_params(json!({
                        "CodeCid": p.code_cid.to_string(),
                        "ConstructorParams": b64(p.constructor_params.bytes()),
                        "SubAddress": b64(&p.subaddress),
                    }));
                    p.code_cid
                })
            };
            if let Some(r) = call.ret::<ExecReturn>()? {
                out.set_return(json!({
                    "IDAddress": ctx.address(&r.id_address),
                    "RobustAddress": ctx.address(&r.robust_address),
                }));
                let actor_type = code.map(|c| actors.actor_type(&c).name().to_string()).unwrap_or_default();
                out.created_address = Some(created(ctx, &r, code, actor_type));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Address info of an actor created through the init actor.
pub(super) fn created(ctx: &DecodeContext, r: &ExecReturn, code: Option<Cid>, actor_type: String) -> AddressInfo {
    AddressInfo {
        short: ctx.network.format_address(&r.id_address),
        robust: ctx.network.format_address(&r.robust_address),
        actor_code: code.map(|c| c.to_string()).unwrap_or_default(),
        actor_type,
        eth_address: eth_address(&r.robust_address),
        creation_tx_hash: Some(ctx.tx_cid.to_string()),
    }
}

#[derive(Debug, Deserialize_tuple)]
struct CronEntry {
    receiver: Address,
    method_num: MethodNum,
}

#[derive(Debug, Deserialize_tuple)]
struct CronConstructorParams {
    entries: Vec<CronEntry>,
}

pub(super) fn decode_cron(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    if method == "Constructor" {
        if let Some(p) = call.params::<CronConstructorParams>()? {
            let entries: Vec<_> = p
                .entries
                .iter()
                .map(|e| json!({ "Receiver": ctx.address(&e.receiver), "MethodNum": e.method_num }))
                .collect();
            out.set_params(json!({ "Entries": entries }));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize_tuple)]
struct AwardBlockRewardParams {
    miner: Address,
    penalty: TokenAmount,
    gas_reward: TokenAmount,
    win_count: i64,
}

#[derive(Debug, Deserialize_tuple)]
struct ThisEpochRewardReturnV0 {
    this_epoch_reward: TokenAmount,
    this_epoch_reward_smoothed: FilterEstimate,
    #[serde(with = "bigint_ser")]
    this_epoch_baseline_power: BigInt,
}

#[derive(Debug, Deserialize_tuple)]
struct ThisEpochRewardReturn {
    this_epoch_reward_smoothed: FilterEstimate,
    #[serde(with = "bigint_ser")]
    this_epoch_baseline_power: BigInt,
}

pub(super) fn decode_reward(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "AwardBlockReward" => {
            if let Some(p) = call.params::<AwardBlockRewardParams>()? {
                out.set_params(json!({
                    "Miner": ctx.address(&p.miner),
                    "Penalty": token(&p.penalty),
                    "GasReward": token(&p.gas_reward),
                    "WinCount": p.win_count,
                }));
            }
        }
        "ThisEpochReward" if ctx.version.actors_version() < 2 => {
            if let Some(r) = call.ret::<ThisEpochRewardReturnV0>()? {
                out.set_return(json!({
                    "ThisEpochReward": token(&r.this_epoch_reward),
                    "ThisEpochRewardSmoothed": smoothed(&r.this_epoch_reward_smoothed),
                    "ThisEpochBaselinePower": r.this_epoch_baseline_power.to_string(),
                }));
            }
        }
        "ThisEpochReward" => {
            if let Some(r) = call.ret::<ThisEpochRewardReturn>()? {
                out.set_return(json!({
                    "ThisEpochRewardSmoothed": smoothed(&r.this_epoch_reward_smoothed),
                    "ThisEpochBaselinePower": r.this_epoch_baseline_power.to_string(),
                }));
            }
        }
        "Constructor" | "UpdateNetworkKPI" => {
            if let Some(v) = call.params::<Option<BigIntDe>>()? {
                out.set_params(v.map(|BigIntDe(v)| json!(v.to_string())).unwrap_or_default());
            }
        }
        _ => {}
    }
    Ok(())
}
