//! # thumbhash CLI
//!
//! Command-line front end for the placeholder pipeline.
//!
//! ## Usage
//! ```bash
//! thumbhash hash photo.jpg
//! thumbhash --root ~/storage generate --limit 500
//! ```

mod cli;

use thumbhash_pipeline::Result;

fn main() -> Result<()> {
    cli::run()
}
