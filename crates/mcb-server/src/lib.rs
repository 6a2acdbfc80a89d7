//! # MCB search server
//!
//! HTTP API and CLI entry points over the hybrid semantic + keyword search
//! pipeline: a `search-server` daemon serving `/search`, `/search_keyword`,
//! `/torrent_files`, `/tmdb_latest`, `/tmdb_detail`, `/sync_status`, and
//! `/auth/*`, plus `sync`, `enrich-tmdb`, `enrich-tpdb`, and
//! `bitmagnet-setup` maintenance subcommands.
//!
//! ## Architecture
//!
//! This crate is the outermost layer: it depends on domain contracts,
//! application orchestration, and the infrastructure bootstrap context,
//! but contains no adapter implementations of its own.
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`cli::Cli`] | Top-level CLI surface (clap) |
//! | [`http::rocket`] | Builds the configured Rocket instance |

pub mod cli;
pub mod http;

pub use cli::{Cli, Command};

/// Run the CLI: parse arguments, initialize logging, dispatch to the
/// selected subcommand. Every subcommand initializes structured logging
/// before doing anything else, per the external-interfaces contract.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    cli::run().await
}
