// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Logging
//!
//! This module initializes the process-wide logger.
//!

//==================================================================================================
// Imports
//==================================================================================================

use ::flexi_logger::Logger;

//==================================================================================================
// Standalone Functions
//==================================================================================================

///
/// # Description
///
/// Initializes the logger, honoring the `RUST_LOG` environment variable and defaulting
/// to `info` when it is unset. If initialization fails, the program panics, since no
/// meaningful diagnostics could be produced afterwards anyway.
///
pub fn initialize() {
    Logger::try_with_env_or_str("info")
        .expect("failed to parse RUST_LOG")
        .log_to_stdout()
        .start()
        .expect("failed to start logger");
}
