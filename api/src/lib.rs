pub mod error;
pub mod events;
pub mod evm;
pub mod ids;
pub mod json;
pub mod network;
pub mod node;
pub mod tipset;
pub mod trace;
pub mod transaction;

pub use error::{Error, Result};
pub use events::EventGenerator;
pub use evm::{EthLog, EthLogs};
pub use ids::build_id;
pub use network::Network;
pub use node::Node;
pub use tipset::{BlockInfo, ExtendedTipset, TipsetKey};
pub use trace::{ComputeStateOutput, ExecutionTrace, InvocResult};
pub use transaction::{AddressInfo, AddressInfoMap, Transaction};
