// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Configuration
//!
//! This module provides various configuration parameters.
//!

/// Default name of the program.
pub const PROGRAM_NAME: &str = "mcelf";

/// Reserved core-id that marks an input as a static shared object rather than a
/// per-core image. Distinct from any value a real core-id can take.
pub const SSO_CORE_ID: u32 = u32::MAX;

/// Default merge tolerance, in bytes, when `-t` is not supplied.
pub const DEFAULT_TOL_LIMIT: u64 = 0;

/// Suffix appended to the configured output path for the in-range image produced by
/// `--xip`.
pub const XIP_SUFFIX: &str = "_xip";

/// Name of the vendor-identity note. Trailing space is the note's terminator slot; see
/// `note::namesz`.
pub const NOTE_NAME_VENDOR: &str = "Texas Instruments ";
/// Name of the segment-map note.
pub const NOTE_NAME_SEGMENT_MAP: &str = "Segment Map ";
/// Name of the entry-points note.
pub const NOTE_NAME_ENTRY_POINTS: &str = "Entry Points ";

/// Note type constant for the vendor-identity note.
pub const NOTE_TYPE_VENDOR: u32 = 0xAAAA_5555;
/// Note type constant for the segment-map note.
pub const NOTE_TYPE_SEGMENT_MAP: u32 = 0xBBBB_7777;
/// Note type constant for the entry-points note.
pub const NOTE_TYPE_ENTRY_POINTS: u32 = 0xCCCC_9999;
/// Note type constant shared by the custom note and the run-status note.
pub const NOTE_TYPE_CUSTOM: u32 = 0xDEAD_C0DE;

/// Name used for the orchestrator-filled run-status note when `--run-status-note` is
/// set.
pub const NOTE_NAME_RUN_STATUS: &str = "Run Status";

/// `PT_LOAD` program-header type.
pub const PT_LOAD: u32 = 1;
/// `PT_NOTE` program-header type.
pub const PT_NOTE: u32 = 4;

/// `e_ident[EI_CLASS]` value for 32-bit objects.
pub const ELFCLASS32: u8 = 1;
/// `e_ident[EI_CLASS]` value for 64-bit objects.
pub const ELFCLASS64: u8 = 2;

/// `e_ident[EI_DATA]` value for little-endian objects.
pub const ELFDATA2LSB: u8 = 1;
/// `e_ident[EI_DATA]` value for big-endian objects.
pub const ELFDATA2MSB: u8 = 2;

/// Index of the class byte within `e_ident`.
pub const EI_CLASS: usize = 4;
/// Index of the data-encoding byte within `e_ident`.
pub const EI_DATA: usize = 5;
/// Length of `e_ident`.
pub const EI_NIDENT: usize = 16;
