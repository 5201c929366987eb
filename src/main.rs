mod cli;
mod commands;
mod config;
mod error;
mod finder;
mod identity;
mod model;
mod portable;
mod store;

use anyhow::Result;

fn main() -> Result<()> {
    match cli::run() {
        Err(err) if is_cancelled(&err) => std::process::exit(0),
        other => other,
    }
}

// Giving up on locating DOSBox quits quietly.
fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<error::Error>(),
            Some(error::Error::DosboxLocationCancelled)
        )
    })
}
