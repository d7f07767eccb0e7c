//! The in-memory data engine: key namespace, stored value types, stream IDs,
//! and the typed operations dispatch hands off to.

pub mod error;
pub mod store;
pub mod streamid;
pub mod value;

pub use error::{EngineError, EngineResult};
pub use store::Store;
pub use streamid::StreamId;
pub use value::StoredValue;
