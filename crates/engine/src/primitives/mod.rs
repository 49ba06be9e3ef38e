//! Primitives exposed by the fabric
//!
//! - `kv`: dotted-key values per scope
//! - `vector`: embeddings with similarity search
//! - `history`: queries over the event log

pub mod history;
pub mod kv;
pub mod vector;

pub use history::{HistoryFilter, HistoryPage};
pub use kv::KvStore;
pub use vector::{VectorHit, VectorStore};
