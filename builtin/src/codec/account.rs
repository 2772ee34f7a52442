use fil_trace_api::Result;
use fvm_ipld_encoding::strict_bytes;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use serde_json::json;

use super::{b64, Call, DecodeContext, DecodedCall};

#[derive(Debug, Deserialize_tuple)]
struct AuthenticateMessageParams {
    #[serde(with = "strict_bytes")]
    signature: Vec<u8>,
    #[serde(with = "strict_bytes")]
    message: Vec<u8>,
}

pub(super) fn decode(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "Constructor" => {
            if let Some(addr) = call.params::<Address>()? {
                out.set_params(json!({ "Address": ctx.address(&addr) }));
            }
        }
        "PubkeyAddress" => {
            if let Some(addr) = call.ret::<Address>()? {
                out.set_return(ctx.address(&addr));
            }
        }
        "AuthenticateMessage" => {
            if let Some(p) = call.params::<AuthenticateMessageParams>()? {
                out.set_params(json!({ "Signature": b64(&p.signature), "Message": b64(&p.message) }));
            }
        }
        _ => {}
    }
    Ok(())
}
