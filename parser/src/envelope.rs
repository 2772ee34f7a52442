use fil_trace_api::{ComputeStateOutput, Error, Result};
use serde::{Deserialize, Deserializer};

/// Encoding of a raw compute-state payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnvelopeFormat {
    Json,
    Cbor,
}

impl EnvelopeFormat {
    /// A payload whose first non-whitespace byte opens a JSON object is JSON; anything else is
    /// taken to be DAG-CBOR.
    pub fn detect(raw: &[u8]) -> Self {
        match raw.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => EnvelopeFormat::Json,
            _ => EnvelopeFormat::Cbor,
        }
    }
}

/// Deserializes the inner value through an adapter that grows the stack as nesting deepens.
struct Stacked<T>(T);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Stacked<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(serde_stacker::Deserializer::new(d)).map(Stacked)
    }
}

/// Decodes the output of a node's compute-state call.
///
/// Neither decoder bounds nesting: traces are as deep as the VM let them get, and the walker
/// decides how much of each tree to emit.
pub fn decode(raw: &[u8]) -> Result<ComputeStateOutput> {
    if raw.is_empty() {
        return Err(Error::Envelope("empty payload".to_string()));
    }
    match EnvelopeFormat::detect(raw) {
        EnvelopeFormat::Json => decode_json(raw).map_err(|e| Error::Envelope(format!("json: {}", e))),
        EnvelopeFormat::Cbor => {
            ciborium::de::from_reader_with_recursion_limit::<Stacked<ComputeStateOutput>, _>(raw, usize::MAX)
                .map(|Stacked(out)| out)
                .map_err(|e| Error::Envelope(format!("cbor: {}", e)))
        }
    }
}

fn decode_json(raw: &[u8]) -> serde_json::Result<ComputeStateOutput> {
    let mut de = serde_json::Deserializer::from_slice(raw);
    de.disable_recursion_limit();
    let Stacked(out) = Stacked::<ComputeStateOutput>::deserialize(&mut de)?;
    de.end()?;
    Ok(out)
}
