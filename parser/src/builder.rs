use std::sync::Arc;

use fil_trace_api::{Network, Node, Result};
use fil_trace_builtin::{
    ActorCodec, BuiltinActors, BuiltinCodec, MethodResolver, VersionRegistry, FIRST_BUNDLED_ACTORS,
};

use crate::address::AddressResolver;
use crate::config::ParserConfig;
use crate::parser::TraceParser;

/// A factory for trace parsers.
/// The node is required. Everything else defaults to mainnet with the Filecoin protocol
/// versions, the actor bundles the node reports for them, and the built-in actor decoders.
pub struct TraceParserBuilder {
    node: Arc<dyn Node>,
    config: ParserConfig,
    registry: Option<VersionRegistry>,
    actors: Option<BuiltinActors>,
    codec: Option<Arc<dyn ActorCodec>>,
}

impl TraceParserBuilder {
    pub fn new(node: Arc<dyn Node>) -> Self {
        Self {
            node,
            config: ParserConfig::default(),
            registry: None,
            actors: None,
            codec: None,
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.config.network = network;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Replaces the protocol version table.
    pub fn with_registry(mut self, registry: VersionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the code CIDs of the built-in actors, from which call targets are typed, in place
    /// of the bundles reported by the node.
    pub fn with_actors(mut self, actors: BuiltinActors) -> Self {
        self.actors = Some(actors);
        self
    }

    /// Replaces the built-in actor decoders.
    pub fn with_codec(mut self, codec: Arc<dyn ActorCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Builds the parser, failing if the configuration is invalid.
    pub fn build(self) -> Result<TraceParser> {
        self.config.validate()?;
        let methods = MethodResolver::new(self.registry.unwrap_or_default());
        let actors = match self.actors {
            Some(a) => a,
            None => bundled_actors(&*self.node, methods.registry()),
        };
        let actors = Arc::new(actors);
        let codec = match self.codec {
            Some(c) => c,
            None => Arc::new(BuiltinCodec::new(actors.clone())),
        };
        let addresses = AddressResolver::new(self.node, self.config.network, actors.clone());
        log::debug!(
            "trace parser for {} with {} protocol versions and {} actor codes",
            self.config.network,
            methods.registry().versions().len(),
            actors.len()
        );
        Ok(TraceParser::new(self.config, methods, codec, actors, addresses))
    }
}

/// Registers the bundle of every protocol version that ships one, as reported by the node.
/// A version whose bundle cannot be fetched is left out.
fn bundled_actors(node: &dyn Node, registry: &VersionRegistry) -> BuiltinActors {
    let mut actors = BuiltinActors::new();
    for version in registry.versions().iter().filter(|v| v.actors_version() >= FIRST_BUNDLED_ACTORS) {
        match node.actor_codes(version.network_version()) {
            Ok(Some(codes)) => actors.add_manifest(codes.iter().map(|(name, code)| (name.as_str(), *code))),
            Ok(None) => log::debug!("node has no actor bundle for network version {}", version.ordinal()),
            Err(e) => log::warn!("failed to list actor codes for network version {}: {}", version.ordinal(), e),
        }
    }
    actors
}

#[cfg(test)]
mod tests {
    use fil_trace_builtin::ActorType;

    use super::*;
    use crate::node::{fake_code, FakeNode};

    #[test]
    fn defaults_to_mainnet() {
        let parser = TraceParserBuilder::new(Arc::new(FakeNode::new())).build().unwrap();
        assert_eq!(Network::Mainnet, parser.config().network);
        assert_eq!(VersionRegistry::filecoin().latest(), parser.methods().registry().latest());
    }

    #[test]
    fn actors_default_to_node_bundles() {
        let node = Arc::new(FakeNode::new());
        let parser = TraceParserBuilder::new(node.clone()).build().unwrap();
        for t in ActorType::ALL {
            assert_eq!(*t, parser.actors().actor_type(&fake_code(*t)));
        }
        let bundled = VersionRegistry::filecoin()
            .versions()
            .iter()
            .filter(|v| v.actors_version() >= FIRST_BUNDLED_ACTORS)
            .count();
        assert_eq!(bundled, node.calls());

        // Explicit actors skip the node.
        let node = Arc::new(FakeNode::new());
        TraceParserBuilder::new(node.clone()).with_actors(BuiltinActors::new()).build().unwrap();
        assert_eq!(0, node.calls());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let built = TraceParserBuilder::new(Arc::new(FakeNode::new())).with_max_depth(0).build();
        assert!(built.is_err());
    }
}
