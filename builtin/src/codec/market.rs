use fil_trace_api::Result;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use fvm_shared::deal::DealID;
use fvm_shared::econ::TokenAmount;
use fvm_shared::ActorID;
use serde_json::json;

use super::{shapes, token, Call, DecodeContext, DecodedCall};

#[derive(Debug, Deserialize_tuple)]
struct WithdrawBalanceParams {
    provider_or_client: Address,
    amount: TokenAmount,
}

#[derive(Debug, Deserialize_tuple)]
struct GetBalanceReturn {
    balance: TokenAmount,
    locked: TokenAmount,
}

pub(super) fn decode(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "AddBalance" => {
            if let Some(addr) = call.params::<Address>()? {
                out.set_params(ctx.address(&addr));
            }
        }
        "WithdrawBalance" => {
            if let Some(p) = call.params::<WithdrawBalanceParams>()? {
                out.set_params(json!({
                    "ProviderOrClientAddress": ctx.address(&p.provider_or_client),
                    "Amount": token(&p.amount),
                }));
            }
            if let Some(amount) = call.ret::<shapes::ScalarOrSingleton>()?.map(TokenAmount::from) {
                out.set_return(token(&amount));
            }
        }
        "GetBalance" => {
            if let Some(addr) = call.params::<Address>()? {
                out.set_params(ctx.address(&addr));
            }
            if let Some(r) = call.ret::<GetBalanceReturn>()? {
                out.set_return(json!({ "Balance": token(&r.balance), "Locked": token(&r.locked) }));
            }
        }
        "GetDealClient" | "GetDealProvider" => {
            if let Some(deal) = call.params::<DealID>()? {
                out.set_params(json!(deal));
            }
            if let Some(id) = call.ret::<ActorID>()? {
                out.set_return(json!(id));
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Deserialize_tuple)]
struct PaychConstructorParams {
    from: Address,
    to: Address,
}

pub(super) fn decode_paych(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    if method == "Constructor" {
        if let Some(p) = call.params::<PaychConstructorParams>()? {
            out.set_params(json!({ "From": ctx.address(&p.from), "To": ctx.address(&p.to) }));
        }
    }
    Ok(())
}
