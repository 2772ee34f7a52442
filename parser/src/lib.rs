//! Flattens Filecoin execution traces into transaction records.
//!
//! A [`TraceParser`] takes the compute-state output of a tipset and walks every message's call
//! tree, naming and decoding each call for the protocol version active at the tipset. It
//! also resolves the addresses involved through a [`Node`](fil_trace_api::Node) and adds a fee
//! record per message.

pub mod address;
pub mod builder;
pub mod config;
pub mod envelope;
pub mod fee;
pub mod node;
pub mod parser;
pub mod walker;

pub use address::{AddressResolver, LookupFailure, ResolvedAddress};
pub use builder::TraceParserBuilder;
pub use config::ParserConfig;
pub use node::FakeNode;
pub use parser::{ParseSession, ParsedTipset, TraceParser};
pub use walker::SkippedNode;
