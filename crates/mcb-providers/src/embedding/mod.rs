//! Embedding Client Implementations
//!
//! Converts query/catalog text into dense vectors (and, via `infer`, NSFW
//! scores) for the search and sync pipelines.
//!
//! ## Available Implementations
//!
//! | Implementation | Role | Description |
//! |-----------------|------|-------------|
//! | [`GpuEmbeddingClient`] | Remote | HTTP client for the `gpu_endpoint` inference service |
//! | [`FastEmbedClient`] | Local (optional) | ONNX-backed local embedder, no NSFW scoring |
//! | [`FallbackEmbeddingClient`] | Composite | Local-first, falls back to remote on local failure |

#[cfg(feature = "embedding-fastembed")]
pub mod fastembed;
pub mod fallback;
pub mod remote;

#[cfg(feature = "embedding-fastembed")]
pub use fastembed::FastEmbedClient;
pub use fallback::FallbackEmbeddingClient;
pub use remote::GpuEmbeddingClient;
