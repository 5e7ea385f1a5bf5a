// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # ELF Writer
//!
//! Assembles the final segment list and a donor ELF header into a complete ELF byte
//! stream and writes it to disk in a single syscall.
//!

//==================================================================================================
// Imports
//==================================================================================================

use crate::{
    codec::{
        Codec,
        ElfHeaderFields,
    },
    error::ComposerError,
    segment::Segment,
};
use ::std::path::Path;

//==================================================================================================
// Standalone Functions
//==================================================================================================

///
/// # Description
///
/// Computes file offsets for `segments` (NOTE first, then every `PT_LOAD` in final
/// order), updates `header`'s `e_phoff`/`e_phnum`/`e_shoff`/`e_shnum`/`e_shstrndx`, and
/// writes the header, program-header table, and segment payloads to `path` in one
/// `File::create` + `write_all` call.
///
/// # Errors
///
/// Returns [`ComposerError::WriteError`] if `path` cannot be created or written.
///
pub fn write_elf(
    codec: &Codec,
    mut header: ElfHeaderFields,
    segments: &[Segment],
    path: &Path,
) -> Result<(), ComposerError> {
    let phnum: usize = segments.len();
    let pht_start: u64 = codec.elf_header_size() as u64;
    let payload_start: u64 = pht_start + (phnum * codec.program_header_size()) as u64;

    header.e_phoff = pht_start;
    header.e_phnum = phnum as u16;
    header.e_shoff = 0;
    header.e_shnum = 0;
    header.e_shstrndx = 0;

    let mut offsets: Vec<u64> = Vec::with_capacity(phnum);
    let mut offset: u64 = payload_start;
    for seg in segments {
        offsets.push(offset);
        offset += seg.header.p_filesz;
    }

    let mut bytes: Vec<u8> = Vec::with_capacity(offset as usize);
    bytes.extend(codec.encode_elf_header(&header));

    for (seg, &off) in segments.iter().zip(offsets.iter()) {
        let mut phdr = seg.header;
        phdr.p_offset = off;
        bytes.extend(codec.encode_program_header(&phdr));
    }

    for seg in segments {
        bytes.extend(&seg.data);
    }

    debug!(
        "write_elf(): {:?}: {} segment(s), {} byte(s)",
        path,
        phnum,
        bytes.len()
    );

    std::fs::write(path, &bytes).map_err(|e| ComposerError::WriteError {
        path:   path.to_path_buf(),
        reason: e.to_string(),
    })?;

    info!("wrote {} segment(s) to {:?}", phnum, path);

    Ok(())
}

//==================================================================================================
// Tests
//==================================================================================================
