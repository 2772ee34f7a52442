use cid::Cid;
use fil_trace_api::network::{eth_address, EAM_ACTOR_ID};
use fil_trace_api::{AddressInfo, Result};
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::{strict_bytes, BytesDe, RawBytes};
use fvm_shared::address::Address;
use fvm_shared::econ::TokenAmount;
use fvm_shared::ActorID;
use serde_json::{json, Value};

use super::{token, Call, DecodeContext, DecodedCall};
use crate::actor_type::ActorType;

#[derive(Debug, Deserialize_tuple)]
struct ConstructorParams {
    #[serde(with = "strict_bytes")]
    creator: [u8; 20],
    initcode: RawBytes,
}

#[derive(Debug, Deserialize_tuple)]
struct DelegateCallParams {
    code: Cid,
    #[serde(with = "strict_bytes")]
    input: Vec<u8>,
    #[serde(with = "strict_bytes")]
    caller: [u8; 20],
    value: TokenAmount,
}

fn eth_hex(bytes: &[u8]) -> Value {
    Value::String(format!("0x{}", hex::encode(bytes)))
}

/// EVM input and output travel either as a CBOR byte string or as raw bytes.
fn evm_bytes(bytes: &[u8]) -> Vec<u8> {
    fvm_ipld_encoding::from_slice::<BytesDe>(bytes).map(|b| b.0).unwrap_or_else(|_| bytes.to_vec())
}

pub(super) fn decode_evm(_ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "Constructor" | "Resurrect" => {
            if let Some(p) = call.params::<ConstructorParams>()? {
                out.set_params(json!({ "Creator": eth_hex(&p.creator), "Initcode": eth_hex(p.initcode.bytes()) }));
            }
        }
        "InvokeContract" => {
            if !call.params.is_empty() {
                out.set_params(eth_hex(&evm_bytes(call.params)));
            }
            if !call.ret.is_empty() {
                out.set_return(eth_hex(&evm_bytes(call.ret)));
            }
        }
        "InvokeContractDelegate" => {
            if let Some(p) = call.params::<DelegateCallParams>()? {
                out.set_params(json!({
                    "Code": p.code.to_string(),
                    "Input": eth_hex(&p.input),
                    "Caller": eth_hex(&p.caller),
                    "Value": token(&p.value),
                }));
            }
            if !call.ret.is_empty() {
                out.set_return(eth_hex(&evm_bytes(call.ret)));
            }
        }
        "GetBytecode" => {
            if let Some(code) = call.ret::<Option<Cid>>()? {
                out.set_return(code.map(|c| json!(c.to_string())).unwrap_or_default());
            }
        }
        "GetBytecodeHash" => {
            if let Some(hash) = call.ret::<BytesDe>()? {
                out.set_return(eth_hex(&hash.0));
            }
        }
        "GetStorageAt" => {
            if let Some(key) = call.params::<(BytesDe,)>()? {
                out.set_params(json!({ "StorageKey": eth_hex(&key.0 .0) }));
            }
            if let Some(value) = call.ret::<BytesDe>()? {
                out.set_return(eth_hex(&value.0));
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Deserialize_tuple)]
struct CreateParams {
    #[serde(with = "strict_bytes")]
    initcode: Vec<u8>,
    nonce: u64,
}

#[derive(Debug, Deserialize_tuple)]
struct Create2Params {
    #[serde(with = "strict_bytes")]
    initcode: Vec<u8>,
    #[serde(with = "strict_bytes")]
    salt: [u8; 32],
}

#[derive(Debug, Deserialize_tuple)]
struct CreateReturn {
    actor_id: ActorID,
    robust_address: Option<Address>,
    #[serde(with = "strict_bytes")]
    eth_address: [u8; 20],
}

pub(super) fn decode_eam(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "Create" => {
            if let Some(p) = call.params::<CreateParams>()? {
                out.set_params(json!({ "Initcode": eth_hex(&p.initcode), "Nonce": p.nonce }));
            }
        }
        "Create2" => {
            if let Some(p) = call.params::<Create2Params>()? {
                out.set_params(json!({ "Initcode": eth_hex(&p.initcode), "Salt": eth_hex(&p.salt) }));
            }
        }
        "CreateExternal" => {
            if let Some(initcode) = call.params::<BytesDe>()? {
                out.set_params(json!({ "Initcode": eth_hex(&initcode.0) }));
            }
        }
        _ => return Ok(()),
    }
    if let Some(r) = call.ret::<CreateReturn>()? {
        let id = Address::new_id(r.actor_id);
        let delegated = Address::new_delegated(EAM_ACTOR_ID, &r.eth_address)
            .map_err(|e| call.error(format!("return: {}", e)))?;
        let robust = r.robust_address.unwrap_or(delegated);
        out.set_return(json!({
            "ActorID": r.actor_id,
            "RobustAddress": r.robust_address.as_ref().map(|a| ctx.address(a)),
            "EthAddress": eth_hex(&r.eth_address),
        }));
        out.created_address = Some(AddressInfo {
            short: ctx.network.format_address(&id),
            robust: ctx.network.format_address(&robust),
            actor_code: String::new(),
            actor_type: ActorType::Evm.name().to_string(),
            eth_address: eth_address(&delegated),
            creation_tx_hash: Some(ctx.tx_cid.to_string()),
        });
    }
    Ok(())
}
