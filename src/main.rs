// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # mcelf
//!
//! Composes a single multi-core ELF image out of several per-core ELF inputs, each
//! destined for a distinct CPU on a heterogeneous system-on-chip.
//!

//==================================================================================================
// Configuration
//==================================================================================================

#![deny(clippy::all)]

//==================================================================================================
// Externs
//==================================================================================================

// Must come first.
#[macro_use]
extern crate log;

//==================================================================================================
// Imports
//==================================================================================================

use ::anyhow::Result;
use ::mcelf::{
    logging,
    Args,
};
use ::std::env;

//==================================================================================================
// Standalone Functions
//==================================================================================================

fn main() -> Result<()> {
    logging::initialize();

    let args: Args = Args::parse(env::args().collect())?;

    if let Err(e) = args.run() {
        error!("mcelf: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
