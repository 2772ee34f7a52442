use fil_trace_api::Result;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::BytesDe;
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use serde_json::{json, Value};

use super::{b64, shapes, token, Call, DecodeContext, DecodedCall};

#[derive(Debug, Deserialize_tuple)]
struct ControlAddressesReturn {
    owner: Address,
    worker: Address,
    control_addresses: Vec<Address>,
}

#[derive(Debug, Deserialize_tuple)]
struct ChangeWorkerAddressParams {
    new_worker: Address,
    new_control_addresses: Vec<Address>,
}

#[derive(Debug, Deserialize_tuple)]
struct ChangePeerIdParams {
    new_id: BytesDe,
}

#[derive(Debug, Deserialize_tuple)]
struct ChangeMultiaddrsParams {
    new_multi_addrs: Vec<BytesDe>,
}

#[derive(Debug, Deserialize_tuple)]
struct WithdrawBalanceParams {
    amount_requested: TokenAmount,
}

#[derive(Debug, Deserialize_tuple)]
struct ChangeBeneficiaryParams {
    new_beneficiary: Address,
    new_quota: TokenAmount,
    new_expiration: ChainEpoch,
}

#[derive(Debug, Deserialize_tuple)]
struct GetOwnerReturn {
    owner: Address,
    proposed: Option<Address>,
}

#[derive(Debug, Deserialize_tuple)]
struct GetPeerIdReturn {
    peer_id: BytesDe,
}

fn multiaddrs(addrs: &[BytesDe]) -> Value {
    Value::Array(addrs.iter().map(|a| b64(&a.0)).collect())
}

pub(super) fn decode(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "ControlAddresses" => {
            if let Some(r) = call.ret::<ControlAddressesReturn>()? {
                out.set_return(json!({
                    "Owner": ctx.address(&r.owner),
                    "Worker": ctx.address(&r.worker),
                    "ControlAddresses": ctx.addresses(&r.control_addresses),
                }));
            }
        }
        "ChangeWorkerAddress" => {
            if let Some(p) = call.params::<ChangeWorkerAddressParams>()? {
                out.set_params(json!({
                    "NewWorker": ctx.address(&p.new_worker),
                    "NewControlAddresses": ctx.addresses(&p.new_control_addresses),
                }));
            }
        }
        "ChangePeerID" => {
            if let Some(p) = call.params::<ChangePeerIdParams>()? {
                out.set_params(json!({ "NewID": b64(&p.new_id.0) }));
            }
        }
        "ChangeMultiaddrs" => {
            if let Some(p) = call.params::<ChangeMultiaddrsParams>()? {
                out.set_params(json!({ "NewMultiaddrs": multiaddrs(&p.new_multi_addrs) }));
            }
        }
        "ChangeOwnerAddress" => {
            if let Some(addr) = call.params::<Address>()? {
                out.set_params(ctx.address(&addr));
            }
        }
        "WithdrawBalance" => {
            if let Some(p) = call.params::<WithdrawBalanceParams>()? {
                out.set_params(json!({ "AmountRequested": token(&p.amount_requested) }));
            }
            if let Some(amount) = call.ret::<shapes::ScalarOrSingleton>()?.map(TokenAmount::from) {
                out.set_return(token(&amount));
            }
        }
        "ChangeBeneficiary" => {
            if let Some(p) = call.params::<ChangeBeneficiaryParams>()? {
                out.set_params(json!({
                    "NewBeneficiary": ctx.address(&p.new_beneficiary),
                    "NewQuota": token(&p.new_quota),
                    "NewExpiration": p.new_expiration,
                }));
            }
        }
        "GetOwner" => {
            if let Some(r) = call.ret::<GetOwnerReturn>()? {
                out.set_return(json!({
                    "Owner": ctx.address(&r.owner),
                    "Proposed": r.proposed.as_ref().map(|a| ctx.address(a)),
                }));
            }
        }
        "GetMultiaddrs" => {
            if let Some(addrs) = call.ret::<shapes::Multiaddrs>()? {
                let addrs: Vec<_> = addrs.into_vec().iter().map(|a| b64(a)).collect();
                out.set_return(json!({ "MultiAddrs": addrs }));
            }
        }
        "GetPeerID" => {
            if let Some(r) = call.ret::<GetPeerIdReturn>()? {
                out.set_return(json!({ "PeerID": b64(&r.peer_id.0) }));
            }
        }
        "GetAvailableBalance" | "InitialPledge" => {
            if let Some(amount) = call.ret::<shapes::ScalarOrSingleton>()?.map(TokenAmount::from) {
                out.set_return(token(&amount));
            }
        }
        "IsControllingAddress" => {
            if let Some(addr) = call.params::<Address>()? {
                out.set_params(ctx.address(&addr));
            }
            if let Some(ok) = call.ret::<bool>()? {
                out.set_return(json!(ok));
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use fvm_ipld_encoding::BytesSer;
    use fvm_shared::address::Address;
    use fvm_shared::econ::TokenAmount;
    use serde_json::json;

    use super::super::testing::*;
    use crate::actor_type::ActorType;

    #[test]
    fn get_multiaddrs_shapes() {
        let h = Harness::new();
        let bare = cbor(&BytesSer(&[7, 8]));
        let nested = cbor(&(vec![BytesSer(&[7, 8])],));
        let a = h.decode(ActorType::Miner, "GetMultiaddrsExported", &[], &bare).unwrap();
        let b = h.decode(ActorType::Miner, "GetMultiaddrsExported", &[], &nested).unwrap();
        assert_eq!(&json!({"MultiAddrs": ["Bwg="]}), a.ret());
        assert_eq!(a.ret(), b.ret());
    }

    #[test]
    fn initial_pledge_is_bare_amount() {
        let h = Harness::new();
        let pledge = TokenAmount::from_atto(5_000u64);
        let out = h.decode(ActorType::Miner, "InitialPledgeExported", &[], &cbor(&pledge)).unwrap();
        assert_eq!(&json!("5000"), out.ret());
    }

    #[test]
    fn control_addresses() {
        let h = Harness::new();
        let ret = cbor(&(Address::new_id(1), Address::new_id(2), vec![Address::new_id(3)]));
        let out = h.decode(ActorType::Miner, "ControlAddresses", &[], &ret).unwrap();
        assert_eq!(&json!({"Owner": "f01", "Worker": "f02", "ControlAddresses": ["f03"]}), out.ret());
    }

    #[test]
    fn get_owner_without_proposal() {
        let h = Harness::new();
        let ret = cbor(&(Address::new_id(9), Option::<Address>::None));
        let out = h.decode(ActorType::Miner, "GetOwnerExported", &[], &ret).unwrap();
        assert_eq!(&json!({"Owner": "f09", "Proposed": null}), out.ret());
    }
}
