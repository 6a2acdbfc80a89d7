//! Vector Store Implementations
//!
//! `VectorStore` is a uniform k-NN + payload-filter interface with three
//! backends: a local file-backed HNSW index (the reference behavior) and two
//! remote cluster-backed alternatives.
//!
//! ## Available Implementations
//!
//! | Implementation | Role | Description |
//! |-----------------|------|-------------|
//! | [`EdgeVecVectorStore`] | Local HNSW | File-backed, single-process, reference semantics |
//! | [`QdrantVectorStore`] | Cluster A | Point-collection with native payload filtering |
//! | [`MilvusVectorStore`] | Cluster B | Columnar vector collection |

#[cfg(feature = "vectorstore-edgevec")]
pub mod edgevec;
#[cfg(feature = "vectorstore-milvus")]
pub mod milvus;
#[cfg(feature = "vectorstore-qdrant")]
pub mod qdrant;

#[cfg(feature = "vectorstore-edgevec")]
pub use edgevec::{EdgeVecConfig, EdgeVecVectorStore, HnswConfig};
#[cfg(feature = "vectorstore-milvus")]
pub use milvus::MilvusVectorStore;
#[cfg(feature = "vectorstore-qdrant")]
pub use qdrant::QdrantVectorStore;
