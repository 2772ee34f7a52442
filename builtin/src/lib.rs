//! Knowledge of the Filecoin built-in actors: which protocol version is active at a height,
//! what each method number means in that version, and how to decode call parameters and
//! return values.

pub mod actor_type;
pub mod codec;
pub mod methods;
pub mod version;

pub use actor_type::{ActorType, BuiltinActors, FIRST_BUNDLED_ACTORS};
pub use codec::{ActorCodec, BuiltinCodec, Call, DecodeContext, DecodedCall};
pub use methods::{MethodResolver, MethodTable};
pub use version::{Version, VersionRegistry};
