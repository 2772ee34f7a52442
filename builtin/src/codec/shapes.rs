//! Return values whose wire shape differs from the schema of their method.

use fvm_ipld_encoding::BytesDe;
use fvm_shared::bigint::bigint_ser::BigIntDe;
use fvm_shared::bigint::BigInt;
use fvm_shared::econ::TokenAmount;
use serde::Deserialize;

/// A multiaddrs return. Accepts a bare byte string, the tuple form wrapping a list of byte
/// strings, or a flat list. A bare string and a one-element list yield the same single entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Multiaddrs {
    Bare(BytesDe),
    Wrapped((Vec<BytesDe>,)),
    Flat(Vec<BytesDe>),
}

impl Multiaddrs {
    pub fn into_vec(self) -> Vec<Vec<u8>> {
        match self {
            Multiaddrs::Bare(b) => vec![b.0],
            Multiaddrs::Wrapped((list,)) | Multiaddrs::Flat(list) => list.into_iter().map(|b| b.0).collect(),
        }
    }
}

/// A big integer written either bare or as a one-element array wrapping it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScalarOrSingleton {
    Scalar(BigIntDe),
    Singleton((BigIntDe,)),
}

impl From<ScalarOrSingleton> for BigInt {
    fn from(v: ScalarOrSingleton) -> Self {
        match v {
            ScalarOrSingleton::Scalar(n) | ScalarOrSingleton::Singleton((n,)) => n.0,
        }
    }
}

impl From<ScalarOrSingleton> for TokenAmount {
    fn from(v: ScalarOrSingleton) -> Self {
        TokenAmount::from_atto(BigInt::from(v))
    }
}
