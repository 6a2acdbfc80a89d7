//! # MCB
//!
//! Hybrid semantic and keyword search over a catalog of media references.
//! This crate is a thin facade: it re-exports the domain, infrastructure,
//! and server layers under one public API and hosts the binary entry point
//! (see `main.rs`).
//!
//! ## Architecture
//!
//! - `domain` - ports, value objects, and domain errors (`mcb-domain`)
//! - `infrastructure` - config, DI bootstrap, auth, sync-status, logging (`mcb-infrastructure`)
//! - `server` - CLI and HTTP API (`mcb-server`)

/// Domain layer - ports, value objects, and domain errors.
pub mod domain {
    pub use mcb_domain::*;
}

/// Server layer - CLI parsing and the HTTP API.
pub mod server {
    pub use mcb_server::*;
}

/// Infrastructure layer - config, DI bootstrap, auth, sync-status, logging.
pub mod infrastructure {
    pub use mcb_infrastructure::*;
}

pub use domain::*;
pub use server::run;
