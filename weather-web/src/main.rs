//! Binary crate for the `weather-web` server.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and wiring configuration
//! - HTTP routing and form handling
//! - HTML views and one-shot user notices

use clap::Parser;

mod app;
mod cli;
mod error;
mod handlers;
mod notice;
mod views;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
