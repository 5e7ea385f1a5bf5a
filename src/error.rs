// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Errors
//!
//! This module defines the typed errors that the composition pipeline can raise. Every
//! public function still returns `anyhow::Result`, so callers are free to mix these with
//! ordinary I/O and JSON errors via `?`; [`ComposerError`] exists so the *kind* of a
//! fatal failure is inspectable rather than being reduced to a formatted string.
//!

//==================================================================================================
// Imports
//==================================================================================================

use ::std::{
    fmt,
    path::PathBuf,
};

//==================================================================================================
// Structures
//==================================================================================================

/// Fatal, typed errors produced by the composition pipeline.
#[derive(Debug)]
pub enum ComposerError {
    /// An input path could not be opened or parsed as ELF, or its core-id was not a
    /// valid unsigned integer.
    BadInput {
        /// Offending path.
        path:   PathBuf,
        /// Human-readable reason.
        reason: String,
    },
    /// The donor ELF header is too short or carries an unrecognized class byte.
    BadHeader {
        /// Offending path.
        path:        PathBuf,
        /// The class byte that was found, if the header was long enough to contain
        /// one.
        found_class: Option<u8>,
    },
    /// An address range argument (`--xip`, accept/ignore range) was malformed.
    BadRange {
        /// Range start.
        start: u64,
        /// Range end.
        end:   u64,
    },
    /// The translation JSON could not be parsed, or a core-id indexed past the end of
    /// the `cores` table.
    BadTranslation {
        /// Offending path.
        path:   PathBuf,
        /// Human-readable reason.
        reason: String,
    },
    /// Two adjacent segments overlap (negative gap) during merge.
    OverlappingSegments {
        /// Merger's virtual address.
        a_vaddr:   u64,
        /// Merger's end address (`vaddr + filesz`).
        a_end:     u64,
        /// Mergee's virtual address.
        b_vaddr:   u64,
        /// Merger's context core-id.
        a_context: Option<u32>,
        /// Mergee's context core-id.
        b_context: Option<u32>,
    },
    /// The output file could not be written.
    WriteError {
        /// Offending path.
        path:   PathBuf,
        /// Human-readable reason.
        reason: String,
    },
}

//==================================================================================================
// Implementations
//==================================================================================================

impl fmt::Display for ComposerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadInput { path, reason } => {
                write!(f, "bad input {:?}: {}", path, reason)
            },
            Self::BadHeader { path, found_class } => {
                write!(
                    f,
                    "bad ELF header in {:?}: class byte {:?} is not 1 or 2 (or file too short)",
                    path, found_class
                )
            },
            Self::BadRange { start, end } => {
                write!(f, "bad range [{:#x}, {:#x}]: end must be greater than start", start, end)
            },
            Self::BadTranslation { path, reason } => {
                write!(f, "bad translation table {:?}: {}", path, reason)
            },
            Self::OverlappingSegments {
                a_vaddr,
                a_end,
                b_vaddr,
                a_context,
                b_context,
            } => {
                write!(
                    f,
                    "overlapping segments: [{:#x}, {:#x}) (context={:?}) overlaps segment \
                     starting at {:#x} (context={:?})",
                    a_vaddr, a_end, a_context, b_vaddr, b_context
                )
            },
            Self::WriteError { path, reason } => {
                write!(f, "failed to write {:?}: {}", path, reason)
            },
        }
    }
}

impl std::error::Error for ComposerError {}
