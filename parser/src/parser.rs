use std::mem;
use std::sync::Arc;

use fil_trace_api::{
    AddressInfoMap, ComputeStateOutput, EthLogs, ExtendedTipset, InvocResult, Node, Result,
    Transaction,
};
use fil_trace_builtin::{ActorCodec, BuiltinActors, MethodResolver};
use serde::Serialize;

use crate::address::{AddressResolver, LookupFailure};
use crate::builder::TraceParserBuilder;
use crate::config::ParserConfig;
use crate::envelope;
use crate::fee::fee_transaction;
use crate::walker::{SkippedNode, TraceScope, TraceWalker, WalkOutput};

/// Everything parsed out of one tipset's traces.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ParsedTipset {
    /// Calls and fee records, message by message. Within a message, calls come in pre-order
    /// followed by the fee record.
    pub transactions: Vec<Transaction>,
    pub addresses: AddressInfoMap,
    /// Calls not emitted, with the reason.
    pub skipped: Vec<SkippedNode>,
    /// Address lookups that failed; the affected addresses are recorded with empty fields.
    pub address_failures: Vec<LookupFailure>,
}

impl From<WalkOutput> for ParsedTipset {
    fn from(out: WalkOutput) -> Self {
        Self {
            transactions: out.transactions,
            addresses: out.addresses,
            skipped: out.skipped,
            address_failures: out.address_failures,
        }
    }
}

/// Turns execution traces into transactions.
/// A parser may be shared between threads; tipsets are parsed independently.
pub struct TraceParser {
    config: ParserConfig,
    methods: MethodResolver,
    codec: Arc<dyn ActorCodec>,
    actors: Arc<BuiltinActors>,
    addresses: AddressResolver,
}

impl TraceParser {
    pub fn builder(node: Arc<dyn Node>) -> TraceParserBuilder {
        TraceParserBuilder::new(node)
    }

    pub(crate) fn new(
        config: ParserConfig,
        methods: MethodResolver,
        codec: Arc<dyn ActorCodec>,
        actors: Arc<BuiltinActors>,
        addresses: AddressResolver,
    ) -> Self {
        Self { config, methods, codec, actors, addresses }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn methods(&self) -> &MethodResolver {
        &self.methods
    }

    pub fn actors(&self) -> &BuiltinActors {
        &self.actors
    }

    pub fn addresses(&self) -> &AddressResolver {
        &self.addresses
    }

    /// Decodes a raw compute-state payload, JSON or DAG-CBOR, and parses it.
    /// Fails if the payload cannot be decoded at all.
    pub fn parse_traces(
        &self,
        raw: &[u8],
        tipset: &ExtendedTipset,
        eth_logs: &EthLogs,
    ) -> Result<ParsedTipset> {
        let output = envelope::decode(raw)?;
        self.parse(&output, tipset, eth_logs)
    }

    /// Parses every message of a tipset's compute-state output.
    /// Only a tipset that cannot be identified fails the pass; problems with individual calls
    /// are reported in the result.
    pub fn parse(
        &self,
        output: &ComputeStateOutput,
        tipset: &ExtendedTipset,
        eth_logs: &EthLogs,
    ) -> Result<ParsedTipset> {
        let mut session = self.session(tipset)?;
        for result in &output.trace {
            session.parse_message(result, eth_logs);
        }
        Ok(session.finish())
    }

    /// Begins parsing a tipset message by message. Address lookups are cached for the
    /// lifetime of the session.
    pub fn session<'a>(&'a self, tipset: &'a ExtendedTipset) -> Result<ParseSession<'a>> {
        let tipset_cid = tipset.cid_string()?;
        log::debug!("parsing tipset {} at height {}", tipset_cid, tipset.height);
        Ok(ParseSession { parser: self, tipset, tipset_cid, out: WalkOutput::default() })
    }

    fn walker(&self) -> TraceWalker<'_> {
        TraceWalker {
            config: &self.config,
            methods: &self.methods,
            codec: self.codec.as_ref(),
            actors: &self.actors,
            addresses: &self.addresses,
        }
    }
}

/// Parsing of one tipset in progress.
pub struct ParseSession<'a> {
    parser: &'a TraceParser,
    tipset: &'a ExtendedTipset,
    tipset_cid: String,
    out: WalkOutput,
}

impl ParseSession<'_> {
    pub fn tipset_cid(&self) -> &str {
        &self.tipset_cid
    }

    /// Appends the calls of one top-level message, then its fee record.
    pub fn parse_message(&mut self, result: &InvocResult, eth_logs: &EthLogs) {
        let msg_cid = result.msg_cid.to_string();
        let block = self.tipset.block_for_message(&result.msg_cid);
        let block_cid = match block {
            Some(b) => b.cid.to_string(),
            None => {
                log::debug!("message {} not found in any block of {}", msg_cid, self.tipset_cid);
                String::new()
            }
        };
        let scope = TraceScope {
            tipset: self.tipset,
            tipset_cid: &self.tipset_cid,
            block_cid: &block_cid,
            msg_cid: &msg_cid,
            eth_logs,
        };

        match result.trace() {
            Some(trace) => {
                self.parser.walker().walk(&scope, &self.tipset_cid, &trace, &mut self.out);
            }
            None => {
                log::warn!("message {} has neither trace nor message", msg_cid);
                self.out.skipped.push(SkippedNode {
                    tx_hash: msg_cid.clone(),
                    level: 0,
                    to: String::new(),
                    method: 0,
                    calls: 0,
                    reason: "no execution trace".to_string(),
                });
            }
        }

        let miner = block.map(|b| &b.miner);
        if let Some(fee) =
            fee_transaction(self.parser.config.network, &scope, &self.tipset_cid, miner, result)
        {
            self.out.transactions.push(fee);
        }
    }

    /// Returns everything parsed so far.
    pub fn finish(mut self) -> ParsedTipset {
        mem::take(&mut self.out).into()
    }
}

impl Drop for ParseSession<'_> {
    fn drop(&mut self) {
        self.parser.addresses.clear_scope(&self.tipset.key);
    }
}
