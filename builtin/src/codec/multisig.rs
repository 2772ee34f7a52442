use fil_actor_multisig_state::v12::{
    AddSignerParams, ApproveReturn, ChangeNumApprovalsThresholdParams, ConstructorParams, LockBalanceParams,
    ProposeParams, ProposeReturn, RemoveSignerParams, SwapSignerParams, TxnIDParams,
};
use fil_trace_api::Result;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::RawBytes;
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use serde_json::{json, Value};

use super::{b64, token, Call, DecodeContext, DecodedCall};

/// Constructor params before actors v2 added the vesting start epoch.
#[derive(Debug, Deserialize_tuple)]
struct ConstructorParamsV0 {
    signers: Vec<Address>,
    num_approvals_threshold: u64,
    unlock_duration: ChainEpoch,
}

fn inner_return(ret: &RawBytes) -> Value {
    if ret.bytes().is_empty() {
        Value::Null
    } else {
        b64(ret.bytes())
    }
}

pub(super) fn decode(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "Constructor" if ctx.version.actors_version() < 2 => {
            if let Some(p) = call.params::<ConstructorParamsV0>()? {
                out.set_params(json!({
                    "Signers": ctx.addresses(&p.signers),
                    "NumApprovalsThreshold": p.num_approvals_threshold,
                    "UnlockDuration": p.unlock_duration,
                }));
            }
        }
        "Constructor" => {
            if let Some(p) = call.params::<ConstructorParams>()? {
                out.set_params(json!({
                    "Signers": ctx.addresses(&p.signers),
                    "NumApprovalsThreshold": p.num_approvals_threshold,
                    "UnlockDuration": p.unlock_duration,
                    "StartEpoch": p.start_epoch,
                }));
            }
        }
        "Propose" => {
            if let Some(p) = call.params::<ProposeParams>()? {
                out.set_params(json!({
                    "To": ctx.address(&p.to),
                    "Value": token(&p.value),
                    "Method": p.method,
                    "Params": b64(p.params.bytes()),
                }));
            }
            if let Some(r) = call.ret::<ProposeReturn>()? {
                out.set_return(json!({
                    "TxnID": r.txn_id.0,
                    "Applied": r.applied,
                    "Code": r.code.value(),
                    "Ret": inner_return(&r.ret),
                }));
            }
        }
        "Approve" | "Cancel" => {
            if let Some(p) = call.params::<TxnIDParams>()? {
                out.set_params(json!({ "ID": p.id.0, "ProposalHash": b64(&p.proposal_hash) }));
            }
            if method == "Approve" {
                if let Some(r) = call.ret::<ApproveReturn>()? {
                    out.set_return(json!({
                        "Applied": r.applied,
                        "Code": r.code.value(),
                        "Ret": inner_return(&r.ret),
                    }));
                }
            }
        }
        "AddSigner" => {
            if let Some(p) = call.params::<AddSignerParams>()? {
                out.set_params(json!({ "Signer": ctx.address(&p.signer), "Increase": p.increase }));
            }
        }
        "RemoveSigner" => {
            if let Some(p) = call.params::<RemoveSignerParams>()? {
                out.set_params(json!({ "Signer": ctx.address(&p.signer), "Decrease": p.decrease }));
            }
        }
        "SwapSigner" => {
            if let Some(p) = call.params::<SwapSignerParams>()? {
                out.set_params(json!({ "From": ctx.address(&p.from), "To": ctx.address(&p.to) }));
            }
        }
        "ChangeNumApprovalsThreshold" => {
            if let Some(p) = call.params::<ChangeNumApprovalsThresholdParams>()? {
                out.set_params(json!({ "NewThreshold": p.new_threshold }));
            }
        }
        "LockBalance" => {
            if let Some(p) = call.params::<LockBalanceParams>()? {
                out.set_params(json!({
                    "StartEpoch": p.start_epoch,
                    "UnlockDuration": p.unlock_duration,
                    "Amount": token(&p.amount),
                }));
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use fil_trace_api::Network;
    use fvm_ipld_encoding::{BytesSer, RawBytes};
    use fvm_shared::address::Address;
    use fvm_shared::econ::TokenAmount;
    use fvm_shared::error::ExitCode;
    use serde_json::json;

    use super::super::testing::*;
    use super::super::{ActorCodec, Call, DecodeContext};
    use crate::actor_type::ActorType;

    #[test]
    fn propose() {
        let h = Harness::new();
        let params = cbor(&(Address::new_id(7), TokenAmount::from_atto(100), 0u64, RawBytes::new(vec![])));
        let ret = cbor(&(3i64, true, ExitCode::OK, RawBytes::new(vec![])));
        let out = h.decode(ActorType::Multisig, "Propose", &params, &ret).unwrap();
        assert_eq!(&json!({"To": "f07", "Value": "100", "Method": 0, "Params": ""}), out.params());
        assert_eq!(&json!({"TxnID": 3, "Applied": true, "Code": 0, "Ret": null}), out.ret());
    }

    #[test]
    fn approve() {
        let h = Harness::new();
        let params = cbor(&(3i64, BytesSer(&[0xaa])));
        let ret = cbor(&(false, ExitCode::OK, RawBytes::new(vec![])));
        let out = h.decode(ActorType::Multisig, "ApproveExported", &params, &ret).unwrap();
        assert_eq!(&json!({"ID": 3, "ProposalHash": "qg=="}), out.params());
        assert_eq!(&json!(false), &out.ret()["Applied"]);
    }

    #[test]
    fn constructor_layout_follows_actors_version() {
        let h = Harness::new();
        let signers = vec![Address::new_id(1), Address::new_id(2)];
        let old = cbor(&(signers.clone(), 2u64, 0i64));
        let new = cbor(&(signers, 2u64, 0i64, 10i64));

        let v0 = h.registry.version(0).unwrap();
        let ctx = DecodeContext { network: Network::Mainnet, version: v0, height: 1, tx_cid: "bafytx" };
        let call = Call { actor: ActorType::Multisig, method_num: 1, method: "Constructor", params: &old, ret: &[] };
        let out = h.codec.decode(&ctx, &call).unwrap();
        assert_eq!(None, out.params().get("StartEpoch"));

        let out = h.decode(ActorType::Multisig, "Constructor", &new, &[]).unwrap();
        assert_eq!(&json!(10), &out.params()["StartEpoch"]);
        assert_eq!(&json!(["f01", "f02"]), &out.params()["Signers"]);
    }
}
