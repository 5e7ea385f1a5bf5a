// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Arguments
//!
//! This module provides utilities for parsing command-line arguments that were supplied to the
//! program.
//!

//==================================================================================================
// Imports
//==================================================================================================

use crate::{
    config,
    error::ComposerError,
    orchestrator::{
        GenerateConfig,
        InputKind,
        Orchestrator,
    },
    segment::AddrRange,
};
use ::anyhow::Result;
use ::std::{
    env,
    path::PathBuf,
    process,
};

//==================================================================================================
// Public Structures
//==================================================================================================

///
/// # Description
///
/// Parsed command-line arguments, ready to drive one (or, in XIP mode, two) calls to
/// [`Orchestrator::generate`].
///
pub struct Args {
    /// Collected inputs.
    orchestrator: Orchestrator,
    /// Parameters for the composition run.
    config:       GenerateConfig,
    /// When set, `generate_xip` is used instead of `generate`.
    xip:          Option<AddrRange>,
}

//==================================================================================================
// Implementations
//==================================================================================================

impl Args {
    /// Command-line option for printing the help message.
    const OPT_HELP: &'static str = "-help";
    /// Command-line option for a per-core input.
    const OPT_CORE_IMG: &'static str = "--core-img";
    /// Command-line option for a static shared object input.
    const OPT_SSO: &'static str = "--sso";
    /// Command-line option to enable/disable segment merging.
    const OPT_MERGE_SEGMENTS: &'static str = "--merge-segments";
    /// Command-line option for the merge tolerance.
    const OPT_TOL_LIMIT: &'static str = "-t";
    /// Command-line option to ignore context when merging.
    const OPT_IGNORE_CONTEXT: &'static str = "--ignore-context";
    /// Command-line option for the XIP partition range.
    const OPT_XIP: &'static str = "--xip";
    /// Command-line option for the address-translation table.
    const OPT_XLAT: &'static str = "--xlat";
    /// Command-line option for the segment split ceiling.
    const OPT_MAX_SEGMENT_SIZE: &'static str = "--max-segment-size";
    /// Command-line option for a custom note.
    const OPT_CUSTOM_NOTE: &'static str = "--custom-note";
    /// Command-line option to add a run-status note.
    const OPT_RUN_STATUS_NOTE: &'static str = "--run-status-note";
    /// Command-line option to log the final segment table before writing.
    const OPT_DUMP_SEGMENTS: &'static str = "--dump-segments";
    /// Command-line option for the output path.
    const OPT_OUTPUT: &'static str = "-o";

    ///
    /// # Description
    ///
    /// Parses the command-line arguments that were passed to the program.
    ///
    /// # Returns
    ///
    /// Upon successful completion, this function returns the collected inputs, the
    /// generation parameters, and, in XIP mode, the partition range. Otherwise, it
    /// returns an error.
    ///
    pub fn parse(args: Vec<String>) -> Result<Self> {
        trace!("parse(): args={:?}", args);

        let mut orchestrator: Orchestrator = Orchestrator::new();
        let mut max_segment_size: Option<u64> = None;
        let mut segmerge: bool = false;
        let mut tol_limit: u64 = config::DEFAULT_TOL_LIMIT;
        let mut ignore_context: bool = false;
        let mut xlat_path: Option<PathBuf> = None;
        let mut custom_note: Option<(String, Vec<u8>)> = None;
        let mut add_run_status_note: bool = false;
        let mut dump_segments: bool = false;
        let mut output_path: Option<PathBuf> = None;
        let mut xip: Option<AddrRange> = None;

        let mut i: usize = 1;
        while i < args.len() {
            match args[i].as_str() {
                Self::OPT_HELP => {
                    Self::usage();
                    process::exit(0);
                },
                Self::OPT_CORE_IMG if i + 1 < args.len() => {
                    let (core_id, path) = parse_core_img(&args[i + 1])?;
                    orchestrator.add_input(core_id, path, InputKind::Elf);
                    i += 1;
                },
                Self::OPT_SSO if i + 1 < args.len() => {
                    orchestrator.add_input(config::SSO_CORE_ID, PathBuf::from(&args[i + 1]), InputKind::Sso);
                    i += 1;
                },
                Self::OPT_MERGE_SEGMENTS if i + 1 < args.len() => {
                    segmerge = parse_bool(&args[i + 1])?;
                    i += 1;
                },
                Self::OPT_TOL_LIMIT if i + 1 < args.len() => {
                    tol_limit = args[i + 1].parse::<u64>().map_err(|e| {
                        anyhow::anyhow!("invalid tolerance '{}': {}", args[i + 1], e)
                    })?;
                    i += 1;
                },
                Self::OPT_IGNORE_CONTEXT if i + 1 < args.len() => {
                    ignore_context = parse_bool(&args[i + 1])?;
                    i += 1;
                },
                Self::OPT_XIP if i + 1 < args.len() => {
                    xip = Some(parse_range(&args[i + 1])?);
                    i += 1;
                },
                Self::OPT_XLAT if i + 1 < args.len() => {
                    xlat_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                },
                Self::OPT_MAX_SEGMENT_SIZE if i + 1 < args.len() => {
                    max_segment_size = Some(parse_int(&args[i + 1]).map_err(|e| {
                        anyhow::anyhow!("invalid segment size '{}': {}", args[i + 1], e)
                    })?);
                    i += 1;
                },
                Self::OPT_CUSTOM_NOTE if i + 1 < args.len() => {
                    custom_note = Some(parse_custom_note(&args[i + 1])?);
                    i += 1;
                },
                Self::OPT_RUN_STATUS_NOTE => {
                    add_run_status_note = true;
                },
                Self::OPT_DUMP_SEGMENTS => {
                    dump_segments = true;
                },
                Self::OPT_OUTPUT if i + 1 < args.len() => {
                    output_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                },
                _ => {
                    Self::usage();
                    let reason: String = format!("invalid argument {}", args[i]);
                    error!("parse(): {}", reason);
                    anyhow::bail!(reason);
                },
            }

            i += 1;
        }

        let output_path: PathBuf = match output_path {
            Some(path) => path,
            None => {
                Self::usage();
                anyhow::bail!("output path is missing");
            },
        };

        let config: GenerateConfig = GenerateConfig {
            max_segment_size,
            segmerge,
            tol_limit,
            ignore_context,
            xlat_path,
            custom_note,
            add_run_status_note,
            ignore_range: None,
            accept_range: None,
            output_path,
            dump_segments,
        };

        Ok(Self {
            orchestrator,
            config,
            xip,
        })
    }

    ///
    /// # Description
    ///
    /// Runs the configured composition: a single `generate()` call, or a pair of
    /// complementary calls when `--xip` was supplied.
    ///
    /// # Errors
    ///
    /// Returns any error the orchestrator raises.
    ///
    pub fn run(self) -> Result<()> {
        match self.xip {
            Some(xip) => self.orchestrator.generate_xip(self.config, xip)?,
            None => self.orchestrator.generate(&self.config)?,
        }
        Ok(())
    }

    ///
    /// # Description
    ///
    /// Prints program usage.
    ///
    pub fn usage() {
        eprintln!(
            "Usage: {} {} <coreid>:<path> [{} <path>] [{} true|false] [{} <bytes>] \
             [{} true|false] [{} <start>:<end>] [{} <path>] [{} <bytes>] \
             [{} <name>:<hex>] [{}] [{}] {} <output>",
            env::args().next().unwrap_or(config::PROGRAM_NAME.to_string()),
            Self::OPT_CORE_IMG,
            Self::OPT_SSO,
            Self::OPT_MERGE_SEGMENTS,
            Self::OPT_TOL_LIMIT,
            Self::OPT_IGNORE_CONTEXT,
            Self::OPT_XIP,
            Self::OPT_XLAT,
            Self::OPT_MAX_SEGMENT_SIZE,
            Self::OPT_CUSTOM_NOTE,
            Self::OPT_RUN_STATUS_NOTE,
            Self::OPT_DUMP_SEGMENTS,
            Self::OPT_OUTPUT,
        );
    }
}

//==================================================================================================
// Standalone Functions
//==================================================================================================

fn parse_core_img(arg: &str) -> Result<(u32, PathBuf)> {
    let (core_id_str, path_str) = arg
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("malformed --core-img argument '{}', expected <coreid>:<path>", arg))?;

    let core_id: u32 = core_id_str.parse::<u32>().map_err(|_| ComposerError::BadInput {
        path:   PathBuf::from(path_str),
        reason: format!("core-id '{}' is not a valid unsigned integer", core_id_str),
    })?;

    Ok((core_id, PathBuf::from(path_str)))
}

fn parse_bool(arg: &str) -> Result<bool> {
    match arg {
        "true" => Ok(true),
        "false" => Ok(false),
        other => anyhow::bail!("expected 'true' or 'false', got '{}'", other),
    }
}

fn parse_int(arg: &str) -> Result<u64, std::num::ParseIntError> {
    match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => arg.parse::<u64>(),
    }
}

fn parse_range(arg: &str) -> Result<AddrRange> {
    let (start_str, end_str) = arg
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("malformed range argument '{}', expected <start>:<end>", arg))?;

    let start: u64 = parse_int(start_str).map_err(|e| anyhow::anyhow!("invalid range start '{}': {}", start_str, e))?;
    let end: u64 = parse_int(end_str).map_err(|e| anyhow::anyhow!("invalid range end '{}': {}", end_str, e))?;

    Ok(AddrRange::new(start, end)?)
}

fn parse_custom_note(arg: &str) -> Result<(String, Vec<u8>)> {
    let (name, hex) = arg
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("malformed --custom-note argument '{}', expected <name>:<hex-bytes>", arg))?;

    if !hex.is_ascii() {
        anyhow::bail!("custom note hex payload '{}' contains non-ASCII characters", hex);
    }
    if hex.len() % 2 != 0 {
        anyhow::bail!("custom note hex payload '{}' has an odd number of digits", hex);
    }

    let mut bytes: Vec<u8> = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let byte_str: &str = std::str::from_utf8(chunk).expect("chunk is ASCII, checked above");
        let byte: u8 = u8::from_str_radix(byte_str, 16)
            .map_err(|e| anyhow::anyhow!("invalid hex byte '{}': {}", byte_str, e))?;
        bytes.push(byte);
    }

    Ok((name.to_string(), bytes))
}

//==================================================================================================
// Tests
//==================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_core_img_splits_coreid_and_path() {
        let (core_id, path) = parse_core_img("2:/tmp/core2.elf").unwrap();
        assert_eq!(core_id, 2);
        assert_eq!(path, PathBuf::from("/tmp/core2.elf"));
    }

    #[test]
    fn parse_core_img_rejects_non_numeric_coreid() {
        assert!(parse_core_img("x:/tmp/core.elf").is_err());
    }

    #[test]
    fn parse_range_accepts_hex_and_rejects_bad_order() {
        let range = parse_range("0x1000:0x2000").unwrap();
        assert_eq!(range.start, 0x1000);
        assert_eq!(range.end, 0x2000);
        assert!(parse_range("0x2000:0x1000").is_err());
    }

    #[test]
    fn parse_custom_note_decodes_hex_payload() {
        let (name, bytes) = parse_custom_note("Build:deadbeef").unwrap();
        assert_eq!(name, "Build");
        assert_eq!(bytes, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn parse_custom_note_rejects_odd_length_hex() {
        assert!(parse_custom_note("Build:abc").is_err());
    }

    #[test]
    fn full_parse_builds_config_from_minimal_arguments() {
        let args: Vec<String> = vec![
            "mcelf".to_string(),
            "--core-img".to_string(),
            "0:/tmp/in.elf".to_string(),
            "-o".to_string(),
            "/tmp/out.elf".to_string(),
        ];
        let parsed: Args = Args::parse(args).unwrap();
        assert_eq!(parsed.config.output_path, PathBuf::from("/tmp/out.elf"));
        assert_eq!(parsed.config.tol_limit, config::DEFAULT_TOL_LIMIT);
        assert!(!parsed.config.segmerge);
        assert!(parsed.xip.is_none());
    }

    #[test]
    fn full_parse_rejects_missing_output() {
        let args: Vec<String> =
            vec!["mcelf".to_string(), "--core-img".to_string(), "0:/tmp/in.elf".to_string()];
        assert!(Args::parse(args).is_err());
    }
}
