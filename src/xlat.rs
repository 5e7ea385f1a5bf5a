// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Address Translator
//!
//! Maps a `(core-id, cpu-local-address)` pair to an SoC-global address via a
//! JSON-described region table, loaded once per run.
//!

//==================================================================================================
// Imports
//==================================================================================================

use crate::error::ComposerError;
use ::std::path::Path;

//==================================================================================================
// Structures
//==================================================================================================

/// One contiguous region mapping a CPU-local range onto an SoC-global base address.
#[derive(Debug, Clone, Copy)]
struct Region {
    /// First CPU-local address covered by this region.
    cpu_local_addr: u64,
    /// SoC-global address that `cpu_local_addr` maps to.
    soc_addr:       u64,
    /// Number of bytes covered by this region.
    region_size:    u64,
}

/// Per-core, ordered region tables loaded from a translation JSON file. Lookup is
/// positional: the translation JSON's `cores` object is keyed by decorative labels,
/// and a segment's numeric core-id indexes into the ordered *values* of that object,
/// not into the labels themselves.
#[derive(Debug)]
pub struct Translator {
    /// `table[core_id]` is the ordered region list for that core-id; an absent index
    /// (core-id beyond the table, e.g. the SSO sentinel) means passthrough.
    table: Vec<Vec<Region>>,
}

//==================================================================================================
// Implementations
//==================================================================================================

impl Translator {
    ///
    /// # Description
    ///
    /// Loads and parses a translation JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::BadTranslation`] if the file cannot be read, is not
    /// valid JSON, does not contain a `cores` object, or any region's hex fields are
    /// malformed.
    ///
    pub fn load(path: &Path) -> Result<Self, ComposerError> {
        let text: String = std::fs::read_to_string(path).map_err(|e| ComposerError::BadTranslation {
            path:   path.to_path_buf(),
            reason: format!("failed to read file: {}", e),
        })?;

        let root: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ComposerError::BadTranslation {
                path:   path.to_path_buf(),
                reason: format!("invalid JSON: {}", e),
            })?;

        let cores = root
            .get("cores")
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| ComposerError::BadTranslation {
                path:   path.to_path_buf(),
                reason: "missing top-level \"cores\" object".to_string(),
            })?;

        let mut table: Vec<Vec<Region>> = Vec::with_capacity(cores.len());
        for (label, core_val) in cores.iter() {
            let infos = core_val
                .get("info")
                .and_then(serde_json::Value::as_array)
                .ok_or_else(|| ComposerError::BadTranslation {
                    path:   path.to_path_buf(),
                    reason: format!("core {:?} is missing an \"info\" array", label),
                })?;

            let mut regions: Vec<Region> = Vec::with_capacity(infos.len());
            for info in infos {
                regions.push(parse_region(path, label, info)?);
            }
            table.push(regions);
        }

        trace!("Translator::load(): loaded {} core(s) from {:?}", table.len(), path);

        Ok(Self { table })
    }

    ///
    /// # Description
    ///
    /// Translates a CPU-local address for `core_id` into an SoC-global address. If
    /// `core_id` has no entry in the table, or no region for that core-id covers
    /// `addr`, the address is returned unchanged (passthrough).
    ///
    pub fn translate(&self, core_id: u32, addr: u64) -> u64 {
        let Some(regions) = self.table.get(core_id as usize) else {
            return addr;
        };

        for region in regions {
            if addr >= region.cpu_local_addr && addr < region.cpu_local_addr + region.region_size {
                return region.soc_addr + (addr - region.cpu_local_addr);
            }
        }

        addr
    }
}

fn parse_region(
    path: &Path,
    label: &str,
    info: &serde_json::Value,
) -> Result<Region, ComposerError> {
    let cpu_local_addr: u64 = parse_hex_field(path, label, info, "cpulocaladdr")?;
    let soc_addr: u64 = parse_hex_field(path, label, info, "socaddr")?;
    let region_size: u64 = parse_hex_field(path, label, info, "regionsize")?;

    Ok(Region {
        cpu_local_addr,
        soc_addr,
        region_size,
    })
}

fn parse_hex_field(
    path: &Path,
    label: &str,
    info: &serde_json::Value,
    field: &str,
) -> Result<u64, ComposerError> {
    let bad = |reason: String| -> ComposerError {
        ComposerError::BadTranslation {
            path: path.to_path_buf(),
            reason,
        }
    };

    let raw: &str = info
        .get(field)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| bad(format!("core {:?}: missing string field {:?}", label, field)))?;

    let digits: &str = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);

    u64::from_str_radix(digits, 16)
        .map_err(|e| bad(format!("core {:?}: field {:?} value {:?} is not hex: {}", label, field, raw, e)))
}

//==================================================================================================
// Tests
//==================================================================================================
