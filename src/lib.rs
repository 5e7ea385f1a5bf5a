// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Multicore ELF Composer
//!
//! Composes a single multi-core ELF image out of several per-core ELF inputs (and
//! optional static shared objects), each destined for a distinct CPU on a
//! heterogeneous system-on-chip.
//!

//==================================================================================================
// Lint Exceptions
//==================================================================================================

#![allow(clippy::too_many_arguments)]

//==================================================================================================
// Externs
//==================================================================================================

#[macro_use]
extern crate log;

//==================================================================================================
// Modules
//==================================================================================================

pub mod args;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod note;
pub mod orchestrator;
pub mod reader;
pub mod segment;
pub mod writer;
pub mod xlat;

//==================================================================================================
// Exports
//==================================================================================================

pub use crate::{
    args::Args,
    error::ComposerError,
    orchestrator::{
        GenerateConfig,
        InputKind,
        Orchestrator,
    },
};
