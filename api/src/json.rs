//! Serde adapters for the node's JSON conventions.
//!
//! Every adapter branches on `is_human_readable()`: JSON carries addresses as strings, token
//! amounts as decimal strings, bytes as base64 and CIDs as `{"/": "..."}`, while DAG-CBOR
//! carries each value in its native binary form. The same envelope types therefore decode from
//! either encoding.

use std::str::FromStr;

use ::cid::serde::CID_SERDE_PRIVATE_IDENTIFIER;
use ::cid::Cid;
use fvm_ipld_encoding::{BytesDe, BytesSer};
use fvm_shared::address::Address;
use fvm_shared::bigint::BigInt;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::network::parse_address;

pub mod address {
    use super::*;

    pub fn serialize<S: Serializer>(addr: &Address, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.serialize_str(&addr.to_string())
        } else {
            addr.serialize(s)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Address, D::Error> {
        if d.is_human_readable() {
            let s = String::deserialize(d)?;
            parse_address(&s).map_err(de::Error::custom)
        } else {
            Address::deserialize(d)
        }
    }
}

pub mod opt_address {
    use super::*;

    pub fn serialize<S: Serializer>(addr: &Option<Address>, s: S) -> Result<S::Ok, S::Error> {
        match addr {
            Some(a) => super::address::serialize(a, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Address>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::address")] Address);
        let w: Option<Wrapper> = Option::deserialize(d)?;
        Ok(w.map(|Wrapper(a)| a))
    }
}

pub mod token {
    use super::*;

    pub fn serialize<S: Serializer>(amount: &TokenAmount, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.serialize_str(&amount.atto().to_string())
        } else {
            amount.serialize(s)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<TokenAmount, D::Error> {
        if d.is_human_readable() {
            let s = String::deserialize(d)?;
            let atto = BigInt::from_str(&s)
                .map_err(|e| de::Error::custom(format!("invalid token amount {:?}: {}", s, e)))?;
            Ok(TokenAmount::from_atto(atto))
        } else {
            TokenAmount::deserialize(d)
        }
    }
}

/// Byte payloads; `null` decodes as empty.
pub mod bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.serialize_str(&base64::encode(bytes))
        } else {
            BytesSer(bytes).serialize(s)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        if d.is_human_readable() {
            let s: Option<String> = Option::deserialize(d)?;
            match s {
                Some(s) => base64::decode(&s)
                    .map_err(|e| de::Error::custom(format!("invalid base64 payload: {}", e))),
                None => Ok(Vec::new()),
            }
        } else {
            let b: Option<BytesDe> = Option::deserialize(d)?;
            Ok(b.map(|b| b.0).unwrap_or_default())
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CidJson {
    #[serde(rename = "/")]
    inner: String,
}

pub mod cid {
    use super::*;

    pub fn serialize<S: Serializer>(c: &Cid, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            CidJson { inner: c.to_string() }.serialize(s)
        } else {
            c.serialize(s)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Cid, D::Error> {
        if d.is_human_readable() {
            let j = CidJson::deserialize(d)?;
            Cid::try_from(j.inner.as_str())
                .map_err(|e| de::Error::custom(format!("invalid cid {:?}: {}", j.inner, e)))
        } else {
            d.deserialize_newtype_struct(CID_SERDE_PRIVATE_IDENTIFIER, LinkVisitor)
        }
    }

    /// A link is tag 42 over the CID bytes behind a zero multibase prefix. DAG-CBOR decoders
    /// unwrap both; generic CBOR decoders skip the tag and keep the prefix.
    struct LinkVisitor;

    impl<'de> de::Visitor<'de> for LinkVisitor {
        type Value = Cid;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a CID link")
        }

        fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Cid, D::Error> {
            d.deserialize_bytes(self)
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Cid, E> {
            let bytes = match v.split_first() {
                Some((0, rest)) => rest,
                _ => v,
            };
            Cid::try_from(bytes).map_err(|e| E::custom(format!("invalid cid: {}", e)))
        }
    }
}

pub mod opt_cid {
    use super::*;

    pub fn serialize<S: Serializer>(c: &Option<Cid>, s: S) -> Result<S::Ok, S::Error> {
        match c {
            Some(c) => super::cid::serialize(c, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Cid>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::cid")] Cid);
        let w: Option<Wrapper> = Option::deserialize(d)?;
        Ok(w.map(|Wrapper(c)| c))
    }
}

pub mod cids {
    use super::*;

    pub fn serialize<S: Serializer>(cids: &[Cid], s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.collect_seq(cids.iter().map(|c| CidJson { inner: c.to_string() }))
        } else {
            cids.serialize(s)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Cid>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::cid")] Cid);
        let v: Option<Vec<Wrapper>> = Option::deserialize(d)?;
        Ok(v.unwrap_or_default().into_iter().map(|Wrapper(c)| c).collect())
    }
}

/// Exit codes travel as plain integers in both encodings.
pub mod opt_exit_code {
    use super::*;

    pub fn serialize<S: Serializer>(code: &Option<ExitCode>, s: S) -> Result<S::Ok, S::Error> {
        code.map(|c| c.value()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ExitCode>, D::Error> {
        Ok(Option::<u32>::deserialize(d)?.map(ExitCode::new))
    }
}

/// Deserializes `null` as the type's default.
pub fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}
