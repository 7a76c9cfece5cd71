//! kbridge CLI entry point
//!
//! This binary demonstrates encoding, storing and querying facts.

mod cli;

use std::process;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
