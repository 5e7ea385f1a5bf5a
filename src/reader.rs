// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # ELF Reader
//!
//! Parses an input ELF file's header and `PT_LOAD` program headers, pairing each one
//! with the bytes it covers in the file. Section headers and every other segment type
//! are ignored; this crate only ever reads what it needs to re-emit.
//!

//==================================================================================================
// Imports
//==================================================================================================

use crate::{
    codec::{
        self,
        Codec,
        ElfHeaderFields,
        ProgramHeaderFields,
    },
    config,
    error::ComposerError,
};
use ::std::path::Path;

//==================================================================================================
// Structures
//==================================================================================================

/// One `PT_LOAD` segment read out of an input file, paired with its file-image bytes.
#[derive(Debug)]
pub struct LoadSegment {
    /// Parsed program header fields, as found in the input.
    pub header: ProgramHeaderFields,
    /// The `p_filesz` bytes this segment covers in the input file.
    pub data:   Vec<u8>,
}

/// An ELF file parsed far enough to drive the composition pipeline: its class,
/// endianness, full file header, and `PT_LOAD` segments.
#[derive(Debug)]
pub struct InputImage {
    /// Class and endianness sniffed from this input's `e_ident`.
    pub codec:    Codec,
    /// The input's file header, verbatim. When this input is picked as the output
    /// donor, every field survives into the output except the ones `writer::write_elf`
    /// recomputes (`e_phoff`, `e_phnum`, `e_shoff`, `e_shnum`, `e_shstrndx`).
    pub header:   ElfHeaderFields,
    /// Every `PT_LOAD` segment with a non-zero `p_filesz`, in program-header order.
    pub segments: Vec<LoadSegment>,
}

//==================================================================================================
// Implementations
//==================================================================================================

impl InputImage {
    ///
    /// # Description
    ///
    /// Reads an ELF file and extracts its entry point and loadable segments.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::BadInput`] if the file cannot be read, and
    /// [`ComposerError::BadHeader`] if its `e_ident` does not describe a recognized
    /// class/endianness pair or its header/program-header table is truncated.
    ///
    pub fn read(path: &Path) -> Result<Self, ComposerError> {
        let bytes: Vec<u8> = std::fs::read(path).map_err(|e| ComposerError::BadInput {
            path:   path.to_path_buf(),
            reason: format!("failed to read file: {}", e),
        })?;

        let (class, endian) = codec::sniff_class_endian(&bytes).map_err(|e| retag_path(e, path))?;
        let codec: Codec = Codec::new(class, endian);

        let ehdr: ElfHeaderFields = codec.decode_elf_header(&bytes).map_err(|e| retag_path(e, path))?;

        let mut segments: Vec<LoadSegment> = Vec::new();
        for i in 0..ehdr.e_phnum as usize {
            let off: usize = ehdr.e_phoff as usize + i * codec.program_header_size();
            let end: usize = off + codec.program_header_size();
            let raw: &[u8] = bytes.get(off..end).ok_or_else(|| ComposerError::BadHeader {
                path:        path.to_path_buf(),
                found_class: Some(bytes[config::EI_CLASS]),
            })?;

            let phdr: ProgramHeaderFields = codec.decode_program_header(raw).map_err(|e| retag_path(e, path))?;

            if phdr.p_type != config::PT_LOAD || phdr.p_filesz == 0 {
                continue;
            }

            let data_off: usize = phdr.p_offset as usize;
            let data_end: usize = data_off + phdr.p_filesz as usize;
            let data: Vec<u8> = bytes
                .get(data_off..data_end)
                .ok_or_else(|| ComposerError::BadInput {
                    path:   path.to_path_buf(),
                    reason: format!(
                        "segment {} data range [{:#x}, {:#x}) exceeds file length {:#x}",
                        i,
                        data_off,
                        data_end,
                        bytes.len()
                    ),
                })?
                .to_vec();

            segments.push(LoadSegment { header: phdr, data });
        }

        trace!(
            "InputImage::read(): {:?}: class={:?} endian={:?} entry={:#x} segments={}",
            path,
            codec.class(),
            codec.endian(),
            ehdr.e_entry,
            segments.len()
        );

        Ok(Self {
            codec,
            header: ehdr,
            segments,
        })
    }
}

/// Rewrites a [`ComposerError`]'s path field to `path`, so lower-level codec errors
/// (which don't know which file they came from) can be reported with the right path.
fn retag_path(err: ComposerError, path: &Path) -> ComposerError {
    match err {
        ComposerError::BadHeader { found_class, .. } => ComposerError::BadHeader {
            path: path.to_path_buf(),
            found_class,
        },
        ComposerError::BadInput { reason, .. } => ComposerError::BadInput {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    }
}

//==================================================================================================
// Tests
//==================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{
        ElfClass,
        Endian,
    };

    fn build_minimal_elf(class: ElfClass, endian: Endian) -> Vec<u8> {
        let codec: Codec = Codec::new(class, endian);
        let ehdr_size: usize = codec.elf_header_size();
        let phdr_size: usize = codec.program_header_size();

        let data: Vec<u8> = vec![0xAA; 16];
        let data_off: u64 = (ehdr_size + phdr_size) as u64;

        let mut e_ident: [u8; config::EI_NIDENT] = [0; config::EI_NIDENT];
        e_ident[0] = 0x7f;
        e_ident[1] = b'E';
        e_ident[2] = b'L';
        e_ident[3] = b'F';
        e_ident[config::EI_CLASS] = match class {
            ElfClass::Class32 => config::ELFCLASS32,
            ElfClass::Class64 => config::ELFCLASS64,
        };
        e_ident[config::EI_DATA] = match endian {
            Endian::Little => config::ELFDATA2LSB,
            Endian::Big => config::ELFDATA2MSB,
        };

        let ehdr = ElfHeaderFields {
            e_ident,
            e_type: 2,
            e_machine: 0x28,
            e_version: 1,
            e_entry: 0x1000,
            e_phoff: ehdr_size as u64,
            e_shoff: 0,
            e_flags: 0,
            e_ehsize: ehdr_size as u16,
            e_phentsize: phdr_size as u16,
            e_phnum: 1,
            e_shentsize: 0,
            e_shnum: 0,
            e_shstrndx: 0,
        };

        let phdr = ProgramHeaderFields {
            p_type: config::PT_LOAD,
            p_flags: 0b101,
            p_offset: data_off,
            p_vaddr: 0x1000,
            p_paddr: 0x1000,
            p_filesz: data.len() as u64,
            p_memsz: data.len() as u64,
            p_align: 4,
        };

        let mut bytes: Vec<u8> = codec.encode_elf_header(&ehdr);
        bytes.extend(codec.encode_program_header(&phdr));
        bytes.extend(&data);
        bytes
    }

    #[test]
    fn read_parses_single_load_segment() {
        let bytes: Vec<u8> = build_minimal_elf(ElfClass::Class32, Endian::Little);
        let path: std::path::PathBuf = std::env::temp_dir().join(format!("mcelf-reader-test-{}", std::process::id()));
        std::fs::write(&path, &bytes).unwrap();

        let image: InputImage = InputImage::read(&path).unwrap();
        assert_eq!(image.header.e_entry, 0x1000);
        assert_eq!(image.segments.len(), 1);
        assert_eq!(image.segments[0].data, vec![0xAA; 16]);
        assert_eq!(image.segments[0].header.p_vaddr, 0x1000);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn read_skips_non_load_and_zero_filesz_segments() {
        let codec: Codec = Codec::new(ElfClass::Class64, Endian::Big);
        let ehdr_size: usize = codec.elf_header_size();
        let phdr_size: usize = codec.program_header_size();

        let mut e_ident: [u8; config::EI_NIDENT] = [0; config::EI_NIDENT];
        e_ident[0] = 0x7f;
        e_ident[1] = b'E';
        e_ident[2] = b'L';
        e_ident[3] = b'F';
        e_ident[config::EI_CLASS] = config::ELFCLASS64;
        e_ident[config::EI_DATA] = config::ELFDATA2MSB;

        let ehdr = ElfHeaderFields {
            e_ident,
            e_type: 2,
            e_machine: 0xb7,
            e_version: 1,
            e_entry: 0x4000_0000,
            e_phoff: ehdr_size as u64,
            e_shoff: 0,
            e_flags: 0,
            e_ehsize: ehdr_size as u16,
            e_phentsize: phdr_size as u16,
            e_phnum: 2,
            e_shentsize: 0,
            e_shnum: 0,
            e_shstrndx: 0,
        };

        let note_phdr = ProgramHeaderFields {
            p_type: config::PT_NOTE,
            p_flags: 0,
            p_offset: 0,
            p_vaddr: 0,
            p_paddr: 0,
            p_filesz: 0,
            p_memsz: 0,
            p_align: 1,
        };
        let zero_load_phdr = ProgramHeaderFields {
            p_type: config::PT_LOAD,
            p_flags: 0b110,
            p_offset: 0,
            p_vaddr: 0x2000,
            p_paddr: 0x2000,
            p_filesz: 0,
            p_memsz: 0x1000,
            p_align: 4,
        };

        let mut bytes: Vec<u8> = codec.encode_elf_header(&ehdr);
        bytes.extend(codec.encode_program_header(&note_phdr));
        bytes.extend(codec.encode_program_header(&zero_load_phdr));

        let path: std::path::PathBuf = std::env::temp_dir().join(format!("mcelf-reader-test2-{}", std::process::id()));
        std::fs::write(&path, &bytes).unwrap();

        let image: InputImage = InputImage::read(&path).unwrap();
        assert!(image.segments.is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn read_rejects_truncated_file() {
        let path: std::path::PathBuf = std::env::temp_dir().join(format!("mcelf-reader-test3-{}", std::process::id()));
        std::fs::write(&path, [0x7fu8, b'E', b'L', b'F']).unwrap();

        let err = InputImage::read(&path).unwrap_err();
        assert!(matches!(err, ComposerError::BadHeader { .. }));

        std::fs::remove_file(&path).ok();
    }
}
