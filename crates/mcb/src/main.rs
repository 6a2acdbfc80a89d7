//! Binary entry point.
//!
//! Lives in the `mcb` facade crate to avoid a doc-output filename collision
//! with a library crate of the same name (cargo issue #6313). All argument
//! parsing and subcommand dispatch live in `mcb-server`'s CLI module.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    mcb_server::run().await
}
