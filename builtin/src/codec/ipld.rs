//! Rendering of schemaless values as JSON.

use libipld_core::ipld::Ipld;
use serde_json::{Map, Number, Value};

/// Renders an IPLD value as JSON. Byte strings are base64 encoded, links become their CID
/// string and integers outside the 64-bit range become decimal strings.
pub fn to_json(ipld: &Ipld) -> Value {
    match ipld {
        Ipld::Null => Value::Null,
        Ipld::Bool(b) => Value::Bool(*b),
        Ipld::Integer(n) => integer(*n),
        Ipld::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Ipld::String(s) => Value::String(s.clone()),
        Ipld::Bytes(b) => Value::String(base64::encode(b)),
        Ipld::List(items) => Value::Array(items.iter().map(to_json).collect()),
        Ipld::Map(entries) => {
            Value::Object(entries.iter().map(|(k, v)| (k.clone(), to_json(v))).collect::<Map<_, _>>())
        }
        Ipld::Link(c) => Value::String(c.to_string()),
    }
}

fn integer(n: i128) -> Value {
    if let Ok(n) = i64::try_from(n) {
        Value::from(n)
    } else if let Ok(n) = u64::try_from(n) {
        Value::from(n)
    } else {
        Value::String(n.to_string())
    }
}

#[cfg(test)]
mod tests {
    use cid::Cid;
    use fvm_ipld_encoding::{from_slice, to_vec, BytesSer};
    use serde_json::json;

    use super::*;

    fn render(bytes: &[u8]) -> Result<Value, fvm_ipld_encoding::Error> {
        from_slice::<Ipld>(bytes).map(|v| to_json(&v))
    }

    #[test]
    fn renders_values() {
        let bytes = to_vec(&(1u64, -5i64, "hi", true, Option::<u64>::None, BytesSer(&[1, 2, 3]))).unwrap();
        assert_eq!(json!([1, -5, "hi", true, null, "AQID"]), render(&bytes).unwrap());
    }

    #[test]
    fn renders_large_integers() {
        let bytes = to_vec(&(u64::MAX, i64::MIN)).unwrap();
        assert_eq!(json!([u64::MAX, i64::MIN]), render(&bytes).unwrap());
        assert_eq!(json!("-18446744073709551616"), to_json(&Ipld::Integer(-(1i128 << 64))));
    }

    #[test]
    fn renders_cids() {
        let c = Cid::try_from("bafy2bzacea3wsdh6y3a36tb3skempjoxqpuyompjbmfeyf34fi3uy6uue42v4").unwrap();
        let bytes = to_vec(&vec![c]).unwrap();
        assert_eq!(json!([c.to_string()]), render(&bytes).unwrap());
    }

    #[test]
    fn rejects_truncated_and_trailing() {
        let mut bytes = to_vec(&(1u64, "abcdef")).unwrap();
        assert!(render(&bytes[..bytes.len() - 2]).is_err());
        bytes.push(0);
        assert!(render(&bytes).is_err());
        assert!(render(&[]).is_err());
    }

    #[test]
    fn overly_nested_values_fail() {
        let mut bytes = vec![0x81; 1000];
        bytes.push(0x00);
        assert!(render(&bytes).is_err());
        let mut shallow = vec![0x81; 100];
        shallow.push(0x00);
        assert!(render(&shallow).is_ok());
    }
}
