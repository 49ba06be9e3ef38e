//! Vector store primitive
//!
//! Embeddings partitioned by scope, searched by similarity. Each scope has
//! its own [`VectorIndex`]; the first vector stored in a scope fixes the
//! dimension for every later one.

mod distance;
mod index;
mod store;

pub use distance::similarity;
pub use index::VectorIndex;
pub use store::VectorStore;

use fabric_core::VectorMetadata;
use serde::{Deserialize, Serialize};

/// One similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    /// Key of the matching vector
    pub key: String,
    /// Similarity score, higher is closer
    pub score: f32,
    /// Metadata stored with the vector
    pub metadata: VectorMetadata,
}
