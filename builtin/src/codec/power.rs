use fil_actor_power_state::v12::{
    CreateMinerParams, CreateMinerReturn, CurrentTotalPowerReturn, EnrollCronEventParams, MinerConsensusCountReturn,
    MinerCountReturn, MinerRawPowerParams, MinerRawPowerReturn, UpdateClaimedPowerParams, UpdatePledgeTotalParams,
};
use fil_trace_api::Result;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::bigint::{bigint_ser, BigInt};
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::smooth::FilterEstimate;
use serde_json::json;

use super::system::{created, ExecReturn};
use super::{b64, shapes, smoothed, token, Call, DecodeContext, DecodedCall};
use crate::actor_type::ActorType;

/// Since actors v14 the return also carries the pledge ramp schedule.
#[derive(Debug, Deserialize_tuple)]
struct CurrentTotalPowerReturnV14 {
    #[serde(with = "bigint_ser")]
    raw_byte_power: BigInt,
    #[serde(with = "bigint_ser")]
    quality_adj_power: BigInt,
    pledge_collateral: TokenAmount,
    quality_adj_power_smoothed: FilterEstimate,
    ramp_start_epoch: ChainEpoch,
    ramp_duration_epochs: u64,
}

pub(super) fn decode(ctx: &DecodeContext, method: &str, call: &Call, out: &mut DecodedCall) -> Result<()> {
    match method {
        "CreateMiner" => {
            if let Some(p) = call.params::<CreateMinerParams>()? {
                let multiaddrs: Vec<_> = p.multiaddrs.iter().map(|m| b64(&m.0)).collect();
                out.set_params(json!({
                    "Owner": ctx.address(&p.owner),
                    "Worker": ctx.address(&p.worker),
                    "WindowPoStProofType": i64::from(p.window_post_proof_type),
                    "Peer": b64(&p.peer),
                    "Multiaddrs": multiaddrs,
                }));
            }
            if let Some(r) = call.ret::<CreateMinerReturn>()? {
                out.set_return(json!({
                    "IDAddress": ctx.address(&r.id_address),
                    "RobustAddress": ctx.address(&r.robust_address),
                }));
                let exec = ExecReturn { id_address: r.id_address, robust_address: r.robust_address };
                out.created_address = Some(created(ctx, &exec, None, ActorType::Miner.name().to_string()));
            }
        }
        "UpdateClaimedPower" => {
            if let Some(p) = call.params::<UpdateClaimedPowerParams>()? {
                out.set_params(json!({
                    "RawByteDelta": p.raw_byte_delta.to_string(),
                    "QualityAdjustedDelta": p.quality_adjusted_delta.to_string(),
                }));
            }
        }
        "CurrentTotalPower" if ctx.version.actors_version() >= 14 => {
            if let Some(r) = call.ret::<CurrentTotalPowerReturnV14>()? {
                out.set_return(json!({
                    "RawBytePower": r.raw_byte_power.to_string(),
                    "QualityAdjPower": r.quality_adj_power.to_string(),
                    "PledgeCollateral": token(&r.pledge_collateral),
                    "QualityAdjPowerSmoothed": smoothed(&r.quality_adj_power_smoothed),
                    "RampStartEpoch": r.ramp_start_epoch,
                    "RampDurationEpochs": r.ramp_duration_epochs,
                }));
            }
        }
        "CurrentTotalPower" => {
            if let Some(r) = call.ret::<CurrentTotalPowerReturn>()? {
                out.set_return(json!({
                    "RawBytePower": r.raw_byte_power.to_string(),
                    "QualityAdjPower": r.quality_adj_power.to_string(),
                    "PledgeCollateral": token(&r.pledge_collateral),
                    "QualityAdjPowerSmoothed": smoothed(&r.quality_adj_power_smoothed),
                }));
            }
        }
        "NetworkRawPower" => {
            if let Some(power) = call.ret::<shapes::ScalarOrSingleton>()?.map(BigInt::from) {
                out.set_return(json!({ "RawBytePower": power.to_string() }));
            }
        }
        "EnrollCronEvent" => {
            if let Some(p) = call.params::<EnrollCronEventParams>()? {
                out.set_params(json!({ "EventEpoch": p.event_epoch, "Payload": b64(p.payload.bytes()) }));
            }
        }
        "UpdatePledgeTotal" => {
            if let Some(p) = call.params::<UpdatePledgeTotalParams>()? {
                out.set_params(token(&p.pledge_delta));
            }
        }
        "MinerRawPower" => {
            if let Some(p) = call.params::<MinerRawPowerParams>()? {
                out.set_params(json!({ "Miner": p.miner }));
            }
            if let Some(r) = call.ret::<MinerRawPowerReturn>()? {
                out.set_return(json!({
                    "RawBytePower": r.raw_byte_power.to_string(),
                    "MeetsConsensusMinimum": r.meets_consensus_minimum,
                }));
            }
        }
        "MinerCount" => {
            if let Some(r) = call.ret::<MinerCountReturn>()? {
                out.set_return(json!({ "Count": r.miner_count }));
            }
        }
        "MinerConsensusCount" => {
            if let Some(r) = call.ret::<MinerConsensusCountReturn>()? {
                out.set_return(json!({ "Count": r.miner_consensus_count }));
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
    use fvm_shared::bigint::bigint_ser::BigIntSer;
    use fvm_shared::bigint::BigInt;
    use fvm_shared::econ::TokenAmount;
    use serde_json::json;

    use super::super::testing::*;
    use crate::actor_type::ActorType;

    #[test]
    fn create_miner_records_created_address() {
        let h = Harness::new();
        let params = cbor(&(
            Address::new_id(100),
            Address::new_id(101),
            8i64,
            BytesSer(&[1]),
            vec![BytesSer(&[2])],
        ));
        let robust = Address::new_actor(b"miner");
        let ret = cbor(&(Address::new_id(2000), robust));
        let out = h.decode(ActorType::Power, "CreateMiner", &params, &ret).unwrap();
        assert_eq!(&json!(["Ag=="]), &out.params()["Multiaddrs"]);
        let created = out.created_address.unwrap();
        assert_eq!("f02000", created.short);
        assert_eq!("storageminer", created.actor_type);
    }

    #[test]
    fn current_total_power_with_ramp() {
        let h = Harness::new();
        let (raw, qa, zero) = (BigInt::from(10), BigInt::from(20), BigInt::from(0));
        let ret = cbor(&(
            BigIntSer(&raw),
            BigIntSer(&qa),
            TokenAmount::from_atto(5),
            (BigIntSer(&qa), BigIntSer(&zero)),
            100i64,
            50u64,
        ));
        let out = h.decode(ActorType::Power, "CurrentTotalPower", &[], &ret).unwrap();
        assert_eq!(&json!("10"), &out.ret()["RawBytePower"]);
        assert_eq!(&json!({"Position": "20", "Velocity": "0"}), &out.ret()["QualityAdjPowerSmoothed"]);
        assert_eq!(&json!(50), &out.ret()["RampDurationEpochs"]);
    }

    #[test]
    fn network_raw_power_accepts_both_shapes() {
        let h = Harness::new();
        let power = BigInt::from(1u64 << 60);
        let scalar = cbor(&BigIntSer(&power));
        let wrapped = cbor(&(BigIntSer(&power),));
        let a = h.decode(ActorType::Power, "NetworkRawPowerExported", &[], &scalar).unwrap();
        let b = h.decode(ActorType::Power, "NetworkRawPowerExported", &[], &wrapped).unwrap();
        assert_eq!(a.ret(), b.ret());
        assert_eq!(&json!({"RawBytePower": power.to_string()}), a.ret());
    }

    #[test]
    fn counts_and_cron_events() {
        let h = Harness::new();
        let out = h.decode(ActorType::Power, "MinerCountExported", &[], &cbor(&42i64)).unwrap();
        assert_eq!(&json!({"Count": 42}), out.ret());
        let out = h.decode(ActorType::Power, "MinerConsensusCountExported", &[], &cbor(&7i64)).unwrap();
        assert_eq!(&json!({"Count": 7}), out.ret());

        let params = cbor(&(500i64, BytesSer(&[1, 2])));
        let out = h.decode(ActorType::Power, "EnrollCronEvent", &params, &[]).unwrap();
        assert_eq!(&json!({"EventEpoch": 500, "Payload": "AQI="}), out.params());
    }
}
