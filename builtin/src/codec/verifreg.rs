use fil_actor_verifreg_state::v12::{
    ClaimAllocationsParams, RemoveVerifierParams, SectorAllocationClaims, VerifierParams,
};
use fil_trace_api::Result;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::RawBytes;
use fvm_shared::address::Address;
use fvm_shared::bigint::bigint_ser::{self, BigIntDe};
use fvm_shared::bigint::BigInt;
use fvm_shared::econ::TokenAmount;
use libipld_core::ipld::Ipld;
use serde::Deserialize;
use serde_json::{json, Value};

use super::shapes::ScalarOrSingleton;
use super::{b64, ipld, token, Call, DecodeContext, DecodedCall};

/// Params of UseBytes and RestoreBytes, both retired with actors v9.
#[derive(Debug, Deserialize_tuple)]
struct BytesParams {
    address: Address,
    #[serde(with = "bigint_ser")]
    deal_size: BigInt,
}

/// The claimed space of a ClaimAllocations return: the total, or one entry per sector group.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Claimed {
    Total(BigIntDe),
    Sectors(Vec<ScalarOrSingleton>),
}

/// A ClaimAllocations return in any of its layouts.
#[derive(Debug, Deserialize_tuple)]
struct ClaimAllocationsReturn {
    batch: Ipld,
    claimed: Claimed,
}

impl ClaimAllocationsReturn {
    fn into_json(self) -> Value {
        let (total, sectors) = match self.claimed {
            Claimed::Total(n) => (n.0, vec![]),
            Claimed::Sectors(list) => {
                let sectors: Vec<BigInt> = list.into_iter().map(BigInt::from).collect();
                (sectors.iter().sum(), sectors)
            }
        };
        let sectors: Vec<_> = sectors.iter().map(|s| json!(s.to_string())).collect();
        json!({
            "BatchInfo": ipld::to_json(&self.batch),
            "ClaimedSpace": total.to_string(),
            "SectorClaims": sectors,
        })
    }
}

fn sector_claims(s: &SectorAllocationClaims) -> Value {
    let claims: Vec<_> = s
        .claims
        .iter()
        .map(|c| {
            json!({
                "Client": c.client,
                "AllocationID": c.allocation_id,
                "Data": c.data.to_string(),
                "Size": c.size.0,
            })
        })
        .collect();
    json!({ "Sector": s.sector, "Expiry": s.expiry, "Claims": claims })
}

pub(super) fn decode(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "AddVerifier" | "AddVerifiedClient" => {
            if let Some(p) = call.params::<VerifierParams>()? {
                out.set_params(json!({
                    "Address": ctx.address(&p.address),
                    "Allowance": p.allowance.to_string(),
                }));
            }
        }
        "RemoveVerifier" => {
            if let Some(p) = call.params::<RemoveVerifierParams>()? {
                out.set_params(ctx.address(&p.verifier));
            }
        }
        "UseBytes" | "RestoreBytes" => {
            if let Some(p) = call.params::<BytesParams>()? {
                out.set_params(json!({
                    "Address": ctx.address(&p.address),
                    "DealSize": p.deal_size.to_string(),
                }));
            }
        }
        "ClaimAllocations" => {
            // Claims are grouped by sector since actors v12.
            if ctx.version.actors_version() >= 12 {
                if let Some(p) = call.params::<ClaimAllocationsParams>()? {
                    let sectors: Vec<_> = p.sectors.iter().map(sector_claims).collect();
                    out.set_params(json!({ "Sectors": sectors, "AllOrNothing": p.all_or_nothing }));
                }
            }
            if let Some(r) = call.ret::<ClaimAllocationsReturn>()? {
                out.set_return(r.into_json());
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Deserialize_tuple)]
struct MintParams {
    to: Address,
    amount: TokenAmount,
    operators: Vec<Address>,
}

#[derive(Debug, Deserialize_tuple)]
struct DestroyParams {
    owner: Address,
    amount: TokenAmount,
}

#[derive(Debug, Deserialize_tuple)]
struct TransferParams {
    to: Address,
    amount: TokenAmount,
    operator_data: RawBytes,
}

#[derive(Debug, Deserialize_tuple)]
struct BurnParams {
    amount: TokenAmount,
}

#[derive(Debug, Deserialize_tuple)]
struct AllowanceDeltaParams {
    operator: Address,
    delta: TokenAmount,
}

#[derive(Debug, Deserialize_tuple)]
struct RevokeAllowanceParams {
    operator: Address,
}

#[derive(Debug, Deserialize_tuple)]
struct AllowanceParams {
    owner: Address,
    operator: Address,
}

pub(super) fn decode_datacap(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "Name" | "Symbol" => {
            if let Some(s) = call.ret::<String>()? {
                out.set_return(json!(s));
            }
        }
        "TotalSupply" => {
            if let Some(supply) = call.ret::<TokenAmount>()? {
                out.set_return(token(&supply));
            }
        }
        "Balance" | "BalanceOf" => {
            if let Some(addr) = call.params::<Address>()? {
                out.set_params(ctx.address(&addr));
            }
            if let Some(balance) = call.ret::<TokenAmount>()? {
                out.set_return(token(&balance));
            }
        }
        "Mint" => {
            if let Some(p) = call.params::<MintParams>()? {
                out.set_params(json!({
                    "To": ctx.address(&p.to),
                    "Amount": token(&p.amount),
                    "Operators": ctx.addresses(&p.operators),
                }));
            }
        }
        "Destroy" => {
            if let Some(p) = call.params::<DestroyParams>()? {
                out.set_params(json!({ "Owner": ctx.address(&p.owner), "Amount": token(&p.amount) }));
            }
        }
        "Transfer" => {
            if let Some(p) = call.params::<TransferParams>()? {
                out.set_params(json!({
                    "To": ctx.address(&p.to),
                    "Amount": token(&p.amount),
                    "OperatorData": b64(p.operator_data.bytes()),
                }));
            }
        }
        "Burn" => {
            if let Some(p) = call.params::<BurnParams>()? {
                out.set_params(json!({ "Amount": token(&p.amount) }));
            }
        }
        "IncreaseAllowance" | "DecreaseAllowance" => {
            if let Some(p) = call.params::<AllowanceDeltaParams>()? {
                let key = if method == "IncreaseAllowance" { "Increase" } else { "Decrease" };
                out.set_params(json!({ "Operator": ctx.address(&p.operator), key: token(&p.delta) }));
            }
            if let Some(allowance) = call.ret::<TokenAmount>()? {
                out.set_return(token(&allowance));
            }
        }
        "RevokeAllowance" => {
            if let Some(p) = call.params::<RevokeAllowanceParams>()? {
                out.set_params(json!({ "Operator": ctx.address(&p.operator) }));
            }
            if let Some(old) = call.ret::<TokenAmount>()? {
                out.set_return(token(&old));
            }
        }
        "Allowance" => {
            if let Some(p) = call.params::<AllowanceParams>()? {
                out.set_params(json!({
                    "Owner": ctx.address(&p.owner),
                    "Operator": ctx.address(&p.operator),
                }));
            }
            if let Some(allowance) = call.ret::<TokenAmount>()? {
                out.set_return(token(&allowance));
            }
        }
        _ => {}
    }
    Ok(())
}
