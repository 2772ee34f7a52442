// The workspace is split the same way the decoding pipeline is:
// * API package holds the data model shared by everything else: the trace envelope, tipset
// descriptor, output records, identifiers and the collaborator traits (node lookups, event
// generators). No knowledge of actor schemas.
// * Builtin package knows the Filecoin built-in actors: protocol versions and their activation
// heights, method tables per actors release, and the per-actor decoders.
// * Parser package walks traces. It resolves addresses through a node, asks the builtin
// package to name and decode every call, and emits the flattened transaction stream.
//
// Callers usually only need the parser; the other packages are re-exported for the types.

pub use fil_trace_api as api;
pub use fil_trace_builtin as builtin;
pub use fil_trace_parser as parser;

pub use fil_trace_parser::{ParserConfig, TraceParser, TraceParserBuilder};
