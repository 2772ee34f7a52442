use fvm_shared::MethodNum;
use thiserror::Error;

/// Errors raised while decoding a trace.
///
/// Only [`Error::Envelope`] and [`Error::TipsetHash`] abort a whole parse pass. The others are
/// raised by individual lookups and decoders and are handled per node by the trace walker.
#[derive(Debug, Error)]
pub enum Error {
    /// Method number not present in the table of a known actor.
    #[error("unknown method {method} for actor {actor}")]
    UnknownMethod { actor: String, method: MethodNum },
    /// Actor type has no method table in the active protocol version.
    #[error("unknown actor {actor} at network version {version}")]
    UnknownActor { actor: String, version: u32 },
    /// Malformed params or return bytes.
    #[error("failed to decode {actor}.{method}: {reason}")]
    Decode { actor: String, method: String, reason: String },
    /// An execution trace node carries no receipt.
    #[error("missing receipt for call to {to} method {method}")]
    MissingReceipt { to: String, method: MethodNum },
    /// One of the short/robust/actor-code lookups failed.
    #[error("failed to resolve {lookup} for {address}: {reason}")]
    AddressResolution { address: String, lookup: &'static str, reason: String },
    /// The outer compute-state envelope could not be decoded.
    #[error("failed to decode trace envelope: {0}")]
    Envelope(String),
    /// The tipset identifier could not be computed.
    #[error("failed to compute tipset cid: {0}")]
    TipsetHash(String),
    /// Invalid parser or registry configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn decode(actor: impl ToString, method: impl ToString, reason: impl ToString) -> Self {
        Error::Decode {
            actor: actor.to_string(),
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the error aborts the parse pass for the whole tipset.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Envelope(_) | Error::TipsetHash(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
