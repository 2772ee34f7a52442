use std::sync::Arc;

use fil_trace_api::transaction::UNKNOWN_METHOD;
use fil_trace_api::{AddressInfo, Error, Network, Result};
use fvm_ipld_encoding::de::DeserializeOwned;
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::smooth::FilterEstimate;
use fvm_shared::MethodNum;
use libipld_core::ipld::Ipld;
use serde_json::{json, Map, Value};

use crate::actor_type::{ActorType, BuiltinActors};
use crate::version::Version;

pub mod ipld;
pub mod shapes;

mod account;
mod evm;
mod market;
mod miner;
mod multisig;
mod power;
mod system;
mod verifreg;

/// Chain context of the call being decoded.
#[derive(Clone, Copy, Debug)]
pub struct DecodeContext<'a> {
    pub network: Network,
    pub version: &'a Version,
    pub height: ChainEpoch,
    /// CID of the top-level message the call belongs to.
    pub tx_cid: &'a str,
}

impl DecodeContext<'_> {
    pub fn address(&self, addr: &Address) -> Value {
        Value::String(self.network.format_address(addr))
    }

    pub fn addresses(&self, addrs: &[Address]) -> Value {
        Value::Array(addrs.iter().map(|a| self.address(a)).collect())
    }
}

/// The raw inputs of one call.
#[derive(Clone, Copy, Debug)]
pub struct Call<'a> {
    pub actor: ActorType,
    pub method_num: MethodNum,
    pub method: &'a str,
    pub params: &'a [u8],
    pub ret: &'a [u8],
}

impl Call<'_> {
    pub fn error(&self, reason: impl ToString) -> Error {
        Error::decode(self.actor, self.method, reason)
    }

    /// Whether the call enters an EVM contract through InvokeContract.
    pub fn is_contract_invocation(&self) -> bool {
        self.actor == ActorType::Evm && self.method.strip_suffix("Exported").unwrap_or(self.method) == "InvokeContract"
    }

    /// Decodes the params against a schema. Empty params decode to None.
    pub fn params<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.decode_side(self.params, "params")
    }

    /// Decodes the return value against a schema. An empty return decodes to None.
    pub fn ret<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.decode_side(self.ret, "return")
    }

    fn decode_side<T: DeserializeOwned>(&self, bytes: &[u8], side: &str) -> Result<Option<T>> {
        if bytes.is_empty() {
            return Ok(None);
        }
        fvm_ipld_encoding::from_slice(bytes).map(Some).map_err(|e| self.error(format!("{}: {}", side, e)))
    }

    /// Renders the params with the generic decoder.
    pub fn generic_params(&self) -> Result<Value> {
        self.generic_side(self.params, "params")
    }

    /// Renders the return value with the generic decoder.
    pub fn generic_ret(&self) -> Result<Value> {
        self.generic_side(self.ret, "return")
    }

    fn generic_side(&self, bytes: &[u8], side: &str) -> Result<Value> {
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        fvm_ipld_encoding::from_slice::<Ipld>(bytes)
            .map(|v| ipld::to_json(&v))
            .map_err(|e| self.error(format!("{}: {}", side, e)))
    }
}

/// The decoded form of a call: a metadata record and any actor it created.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedCall {
    pub metadata: Map<String, Value>,
    pub created_address: Option<AddressInfo>,
}

impl DecodedCall {
    fn new(method_num: MethodNum) -> Self {
        let mut metadata = Map::new();
        metadata.insert("MethodNum".to_string(), Value::from(method_num));
        metadata.insert("Params".to_string(), Value::Null);
        metadata.insert("Return".to_string(), Value::Null);
        Self { metadata, created_address: None }
    }

    /// Metadata carrying the raw bytes, base64 encoded, for calls that are not decoded.
    pub fn raw(method_num: MethodNum, params: &[u8], ret: &[u8]) -> Self {
        let mut out = Self::new(method_num);
        out.set_params(raw_bytes(params));
        out.set_return(raw_bytes(ret));
        out
    }

    pub fn set_params(&mut self, v: Value) {
        self.metadata.insert("Params".to_string(), v);
    }

    pub fn set_return(&mut self, v: Value) {
        self.metadata.insert("Return".to_string(), v);
    }

    pub fn insert(&mut self, key: &str, v: Value) {
        self.metadata.insert(key.to_string(), v);
    }

    pub fn params(&self) -> &Value {
        self.metadata.get("Params").unwrap_or(&Value::Null)
    }

    pub fn ret(&self) -> &Value {
        self.metadata.get("Return").unwrap_or(&Value::Null)
    }

    /// Fills whichever side a typed decoder left unset: the params with their generic
    /// rendering, the return with the generic decoder.
    fn fill_generic(&mut self, call: &Call, generic_params: Value) -> Result<()> {
        if self.params().is_null() {
            self.set_params(generic_params);
        }
        if self.ret().is_null() && !call.ret.is_empty() {
            self.set_return(call.generic_ret()?);
        }
        Ok(())
    }

    pub fn to_json_string(&self) -> String {
        Value::Object(self.metadata.clone()).to_string()
    }
}

fn raw_bytes(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        Value::String(base64::encode(bytes))
    }
}

pub(crate) fn token(amount: &TokenAmount) -> Value {
    Value::String(amount.atto().to_string())
}

pub(crate) fn b64(bytes: &[u8]) -> Value {
    Value::String(base64::encode(bytes))
}

/// Renders an alpha-beta filter estimate, as carried by reward and power state.
pub(crate) fn smoothed(estimate: &FilterEstimate) -> Value {
    json!({ "Position": estimate.position.to_string(), "Velocity": estimate.velocity.to_string() })
}

/// Decodes the params and return value of actor calls.
pub trait ActorCodec: Send + Sync {
    /// Decodes a call to a method of an actor. The method name is as resolved for the active
    /// protocol version; "unknown" yields the raw bytes. Fails on malformed bytes.
    fn decode(&self, ctx: &DecodeContext, call: &Call) -> Result<DecodedCall>;
}

/// Decoders for the built-in actors.
#[derive(Clone, Debug, Default)]
pub struct BuiltinCodec {
    actors: Arc<BuiltinActors>,
}

impl BuiltinCodec {
    pub fn new(actors: Arc<BuiltinActors>) -> Self {
        Self { actors }
    }

    pub fn actors(&self) -> &BuiltinActors {
        &self.actors
    }
}

impl ActorCodec for BuiltinCodec {
    fn decode(&self, ctx: &DecodeContext, call: &Call) -> Result<DecodedCall> {
        if call.method == UNKNOWN_METHOD {
            return Ok(DecodedCall::raw(call.method_num, call.params, call.ret));
        }
        // Exported methods share their internal counterpart's schema.
        let method = call.method.strip_suffix("Exported").unwrap_or(call.method);
        // Params must be well formed before the return is looked at.
        let generic_params = call.generic_params()?;
        let mut out = DecodedCall::new(call.method_num);
        match call.actor {
            ActorType::Account => account::decode(ctx, method, call, &mut out)?,
            ActorType::Init => system::decode_init(ctx, &self.actors, method, call, &mut out)?,
            ActorType::Cron => system::decode_cron(ctx, method, call, &mut out)?,
            ActorType::Reward => system::decode_reward(ctx, method, call, &mut out)?,
            ActorType::Power => power::decode(ctx, method, call, &mut out)?,
            ActorType::Miner => miner::decode(ctx, method, call, &mut out)?,
            ActorType::Market => market::decode(ctx, method, call, &mut out)?,
            ActorType::PaymentChannel => market::decode_paych(ctx, method, call, &mut out)?,
            ActorType::Multisig => multisig::decode(ctx, method, call, &mut out)?,
            ActorType::VerifiedRegistry => verifreg::decode(ctx, method, call, &mut out)?,
            ActorType::Datacap => verifreg::decode_datacap(ctx, method, call, &mut out)?,
            ActorType::Evm => evm::decode_evm(ctx, method, call, &mut out)?,
            ActorType::Eam => evm::decode_eam(ctx, method, call, &mut out)?,
            ActorType::EthAccount | ActorType::System => {}
            ActorType::Placeholder | ActorType::Unknown => {
                return Ok(DecodedCall::raw(call.method_num, call.params, call.ret));
            }
        }
        out.fill_generic(call, generic_params)?;
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use fvm_ipld_encoding::to_vec;
    use serde::Serialize;

    use super::*;
    use crate::version::VersionRegistry;

    pub struct Harness {
        pub registry: VersionRegistry,
        pub codec: BuiltinCodec,
    }

    impl Harness {
        pub fn new() -> Self {
            Self { registry: VersionRegistry::filecoin(), codec: BuiltinCodec::default() }
        }

        pub fn decode(
            &self,
            actor: ActorType,
            method: &str,
            params: &[u8],
            ret: &[u8],
        ) -> Result<DecodedCall> {
            let ctx = DecodeContext {
                network: Network::Mainnet,
                version: self.registry.latest(),
                height: 5_000_000,
                tx_cid: "bafytx",
            };
            let call = Call { actor, method_num: 2, method, params, ret };
            self.codec.decode(&ctx, &call)
        }
    }

    pub fn cbor<T: Serialize>(v: &T) -> Vec<u8> {
        to_vec(v).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use fvm_ipld_encoding::BytesSer;
    use serde_json::json;

    use super::testing::*;
    use super::*;

    #[test]
    fn unknown_method_is_raw() {
        let h = Harness::new();
        let out = h.decode(ActorType::Miner, "unknown", &[0x80], &[]).unwrap();
        assert_eq!(&json!("gA=="), out.params());
        assert_eq!(&Value::Null, out.ret());
        assert_eq!(Some(&json!(2)), out.metadata.get("MethodNum"));
    }

    #[test]
    fn untyped_method_uses_generic_decoder() {
        let h = Harness::new();
        let params = cbor(&(1u64, BytesSer(&[9])));
        let out = h.decode(ActorType::Market, "CronTick", &params, &[]).unwrap();
        assert_eq!(&json!([1, "CQ=="]), out.params());
    }

    #[test]
    fn malformed_bytes_fail() {
        let h = Harness::new();
        let err = h.decode(ActorType::Market, "CronTick", &[0x82, 0x01], &[]).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn params_decode_before_return() {
        let h = Harness::new();
        // Bad params fail even when the return is well formed.
        let err = h.decode(ActorType::Multisig, "AddSigner", &[0xff], &cbor(&true)).unwrap_err();
        assert!(err.to_string().contains("params"));
        // Params without a schema are checked before a typed return.
        let err = h.decode(ActorType::Miner, "GetMultiaddrsExported", &[0xff], &[0xff]).unwrap_err();
        assert!(err.to_string().contains("params"));
        let err = h.decode(ActorType::Miner, "GetMultiaddrsExported", &[], &[0xff]).unwrap_err();
        assert!(err.to_string().contains("return"));
    }

    #[test]
    fn metadata_keys_are_ordered() {
        let h = Harness::new();
        let out = h.decode(ActorType::System, "Send", &[], &[]).unwrap();
        assert_eq!(r#"{"MethodNum":2,"Params":null,"Return":null}"#, out.to_json_string());
    }
}
