// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Binary Codec
//!
//! Bit-exact serialization of ELF headers, program headers, and NOTE records for both
//! 32-bit and 64-bit, little- and big-endian variants.
//!
//! Per the endianness/class abstraction design note, this lifts the source's
//! field-by-field `islittle`/`is64` conditionals into a single [`Codec`] value, selected
//! once at pipeline entry, whose methods dispatch on class/endianness exactly once each
//! rather than per field.
//!

//==================================================================================================
// Imports
//==================================================================================================

use crate::{
    config,
    error::ComposerError,
};

//==================================================================================================
// Enumerations
//==================================================================================================

/// ELF word-size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    /// 32-bit object (`ELFCLASS32`).
    Class32,
    /// 64-bit object (`ELFCLASS64`).
    Class64,
}

impl ElfClass {
    /// Size, in bytes, of the ELF file header for this class.
    pub fn elf_header_size(self) -> usize {
        match self {
            Self::Class32 => 52,
            Self::Class64 => 64,
        }
    }

    /// Size, in bytes, of a program-header entry for this class.
    pub fn program_header_size(self) -> usize {
        match self {
            Self::Class32 => 32,
            Self::Class64 => 56,
        }
    }
}

/// Byte order of the enclosing ELF image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// `ELFDATA2LSB`.
    Little,
    /// `ELFDATA2MSB`.
    Big,
}

//==================================================================================================
// Structures
//==================================================================================================

/// Decoded or to-be-encoded ELF file header. Address-sized fields are carried as `u64`
/// regardless of class and truncated to `u32` on encode for [`ElfClass::Class32`].
#[derive(Debug, Clone)]
pub struct ElfHeaderFields {
    /// `e_ident`, copied verbatim from the donor input.
    pub e_ident:     [u8; config::EI_NIDENT],
    /// Object file type.
    pub e_type:      u16,
    /// Required machine architecture type.
    pub e_machine:   u16,
    /// Object file version.
    pub e_version:   u32,
    /// Entry point virtual address.
    pub e_entry:     u64,
    /// Program header table file offset.
    pub e_phoff:     u64,
    /// Section header table file offset.
    pub e_shoff:     u64,
    /// Processor-specific flags.
    pub e_flags:     u32,
    /// Size of this header, in bytes.
    pub e_ehsize:    u16,
    /// Size of a program-header entry, in bytes.
    pub e_phentsize: u16,
    /// Number of program-header entries.
    pub e_phnum:     u16,
    /// Size of a section-header entry, in bytes.
    pub e_shentsize: u16,
    /// Number of section-header entries.
    pub e_shnum:     u16,
    /// Section name string table index.
    pub e_shstrndx:  u16,
}

/// Decoded or to-be-encoded program-header entry. Address-sized fields are carried as
/// `u64` regardless of class.
#[derive(Debug, Clone, Copy)]
pub struct ProgramHeaderFields {
    /// Segment type (`PT_LOAD`, `PT_NOTE`, ...).
    pub p_type:   u32,
    /// Segment flags (read/write/execute).
    pub p_flags:  u32,
    /// Offset of the segment's first byte in the file.
    pub p_offset: u64,
    /// Virtual address of the segment's first byte.
    pub p_vaddr:  u64,
    /// Physical address of the segment's first byte.
    pub p_paddr:  u64,
    /// Number of bytes the segment occupies in the file.
    pub p_filesz: u64,
    /// Number of bytes the segment occupies in memory.
    pub p_memsz:  u64,
    /// Alignment of the segment.
    pub p_align:  u64,
}

/// Binary codec bound to one output class and endianness.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    class:  ElfClass,
    endian: Endian,
}

//==================================================================================================
// Implementations
//==================================================================================================

impl Codec {
    /// Builds a codec for the given class and endianness.
    pub fn new(class: ElfClass, endian: Endian) -> Self {
        Self { class, endian }
    }

    /// Returns the class this codec encodes/decodes.
    pub fn class(&self) -> ElfClass {
        self.class
    }

    /// Returns the endianness this codec encodes/decodes.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Size, in bytes, of an ELF file header.
    pub fn elf_header_size(&self) -> usize {
        self.class.elf_header_size()
    }

    /// Size, in bytes, of a program-header entry.
    pub fn program_header_size(&self) -> usize {
        self.class.program_header_size()
    }

    fn put_u16(&self, buf: &mut Vec<u8>, v: u16) {
        match self.endian {
            Endian::Little => buf.extend_from_slice(&v.to_le_bytes()),
            Endian::Big => buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    fn put_u32(&self, buf: &mut Vec<u8>, v: u32) {
        match self.endian {
            Endian::Little => buf.extend_from_slice(&v.to_le_bytes()),
            Endian::Big => buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    fn put_u64(&self, buf: &mut Vec<u8>, v: u64) {
        match self.endian {
            Endian::Little => buf.extend_from_slice(&v.to_le_bytes()),
            Endian::Big => buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    /// Encodes an address-sized field, truncating to `u32` for [`ElfClass::Class32`].
    fn put_addr(&self, buf: &mut Vec<u8>, v: u64) {
        match self.class {
            ElfClass::Class32 => self.put_u32(buf, v as u32),
            ElfClass::Class64 => self.put_u64(buf, v),
        }
    }

    fn get_u16(&self, bytes: &[u8], off: usize) -> u16 {
        let a: [u8; 2] = bytes[off..off + 2].try_into().expect("slice is 2 bytes");
        match self.endian {
            Endian::Little => u16::from_le_bytes(a),
            Endian::Big => u16::from_be_bytes(a),
        }
    }

    fn get_u32(&self, bytes: &[u8], off: usize) -> u32 {
        let a: [u8; 4] = bytes[off..off + 4].try_into().expect("slice is 4 bytes");
        match self.endian {
            Endian::Little => u32::from_le_bytes(a),
            Endian::Big => u32::from_be_bytes(a),
        }
    }

    fn get_u64(&self, bytes: &[u8], off: usize) -> u64 {
        let a: [u8; 8] = bytes[off..off + 8].try_into().expect("slice is 8 bytes");
        match self.endian {
            Endian::Little => u64::from_le_bytes(a),
            Endian::Big => u64::from_be_bytes(a),
        }
    }

    fn get_addr(&self, bytes: &[u8], off: usize) -> (u64, usize) {
        match self.class {
            ElfClass::Class32 => (self.get_u32(bytes, off) as u64, 4),
            ElfClass::Class64 => (self.get_u64(bytes, off), 8),
        }
    }

    /// Encodes an ELF file header into its bit-exact on-disk representation.
    pub fn encode_elf_header(&self, fields: &ElfHeaderFields) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::with_capacity(self.elf_header_size());
        buf.extend_from_slice(&fields.e_ident);
        self.put_u16(&mut buf, fields.e_type);
        self.put_u16(&mut buf, fields.e_machine);
        self.put_u32(&mut buf, fields.e_version);
        self.put_addr(&mut buf, fields.e_entry);
        self.put_addr(&mut buf, fields.e_phoff);
        self.put_addr(&mut buf, fields.e_shoff);
        self.put_u32(&mut buf, fields.e_flags);
        self.put_u16(&mut buf, fields.e_ehsize);
        self.put_u16(&mut buf, fields.e_phentsize);
        self.put_u16(&mut buf, fields.e_phnum);
        self.put_u16(&mut buf, fields.e_shentsize);
        self.put_u16(&mut buf, fields.e_shnum);
        self.put_u16(&mut buf, fields.e_shstrndx);
        debug_assert_eq!(buf.len(), self.elf_header_size());
        buf
    }

    /// Decodes an ELF file header from raw bytes. The class and endianness used are
    /// this codec's, not sniffed from `e_ident` again; use [`sniff_class_endian`]
    /// first to pick the right codec.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::BadHeader`] if `bytes` is shorter than the header size.
    pub fn decode_elf_header(&self, bytes: &[u8]) -> Result<ElfHeaderFields, ComposerError> {
        let size: usize = self.elf_header_size();
        if bytes.len() < size {
            return Err(ComposerError::BadHeader {
                path:        std::path::PathBuf::new(),
                found_class: bytes.get(config::EI_CLASS).copied(),
            });
        }

        let mut e_ident: [u8; config::EI_NIDENT] = [0u8; config::EI_NIDENT];
        e_ident.copy_from_slice(&bytes[0..config::EI_NIDENT]);

        let mut off: usize = config::EI_NIDENT;
        let e_type: u16 = self.get_u16(bytes, off);
        off += 2;
        let e_machine: u16 = self.get_u16(bytes, off);
        off += 2;
        let e_version: u32 = self.get_u32(bytes, off);
        off += 4;
        let (e_entry, adv) = self.get_addr(bytes, off);
        off += adv;
        let (e_phoff, adv) = self.get_addr(bytes, off);
        off += adv;
        let (e_shoff, adv) = self.get_addr(bytes, off);
        off += adv;
        let e_flags: u32 = self.get_u32(bytes, off);
        off += 4;
        let e_ehsize: u16 = self.get_u16(bytes, off);
        off += 2;
        let e_phentsize: u16 = self.get_u16(bytes, off);
        off += 2;
        let e_phnum: u16 = self.get_u16(bytes, off);
        off += 2;
        let e_shentsize: u16 = self.get_u16(bytes, off);
        off += 2;
        let e_shnum: u16 = self.get_u16(bytes, off);
        off += 2;
        let e_shstrndx: u16 = self.get_u16(bytes, off);

        Ok(ElfHeaderFields {
            e_ident,
            e_type,
            e_machine,
            e_version,
            e_entry,
            e_phoff,
            e_shoff,
            e_flags,
            e_ehsize,
            e_phentsize,
            e_phnum,
            e_shentsize,
            e_shnum,
            e_shstrndx,
        })
    }

    /// Encodes a program-header entry. Class32 places `p_flags` after `p_memsz`;
    /// class64 places `p_flags` immediately after `p_type`.
    pub fn encode_program_header(&self, fields: &ProgramHeaderFields) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::with_capacity(self.program_header_size());
        match self.class {
            ElfClass::Class32 => {
                self.put_u32(&mut buf, fields.p_type);
                self.put_addr(&mut buf, fields.p_offset);
                self.put_addr(&mut buf, fields.p_vaddr);
                self.put_addr(&mut buf, fields.p_paddr);
                self.put_addr(&mut buf, fields.p_filesz);
                self.put_addr(&mut buf, fields.p_memsz);
                self.put_u32(&mut buf, fields.p_flags);
                self.put_addr(&mut buf, fields.p_align);
            },
            ElfClass::Class64 => {
                self.put_u32(&mut buf, fields.p_type);
                self.put_u32(&mut buf, fields.p_flags);
                self.put_addr(&mut buf, fields.p_offset);
                self.put_addr(&mut buf, fields.p_vaddr);
                self.put_addr(&mut buf, fields.p_paddr);
                self.put_addr(&mut buf, fields.p_filesz);
                self.put_addr(&mut buf, fields.p_memsz);
                self.put_addr(&mut buf, fields.p_align);
            },
        }
        debug_assert_eq!(buf.len(), self.program_header_size());
        buf
    }

    /// Decodes a program-header entry.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::BadHeader`] if `bytes` is shorter than the entry size.
    pub fn decode_program_header(
        &self,
        bytes: &[u8],
    ) -> Result<ProgramHeaderFields, ComposerError> {
        let size: usize = self.program_header_size();
        if bytes.len() < size {
            return Err(ComposerError::BadHeader {
                path:        std::path::PathBuf::new(),
                found_class: None,
            });
        }

        let fields: ProgramHeaderFields = match self.class {
            ElfClass::Class32 => {
                let mut off: usize = 0;
                let p_type: u32 = self.get_u32(bytes, off);
                off += 4;
                let (p_offset, adv) = self.get_addr(bytes, off);
                off += adv;
                let (p_vaddr, adv) = self.get_addr(bytes, off);
                off += adv;
                let (p_paddr, adv) = self.get_addr(bytes, off);
                off += adv;
                let (p_filesz, adv) = self.get_addr(bytes, off);
                off += adv;
                let (p_memsz, adv) = self.get_addr(bytes, off);
                off += adv;
                let p_flags: u32 = self.get_u32(bytes, off);
                off += 4;
                let (p_align, _) = self.get_addr(bytes, off);
                ProgramHeaderFields {
                    p_type,
                    p_flags,
                    p_offset,
                    p_vaddr,
                    p_paddr,
                    p_filesz,
                    p_memsz,
                    p_align,
                }
            },
            ElfClass::Class64 => {
                let mut off: usize = 0;
                let p_type: u32 = self.get_u32(bytes, off);
                off += 4;
                let p_flags: u32 = self.get_u32(bytes, off);
                off += 4;
                let (p_offset, adv) = self.get_addr(bytes, off);
                off += adv;
                let (p_vaddr, adv) = self.get_addr(bytes, off);
                off += adv;
                let (p_paddr, adv) = self.get_addr(bytes, off);
                off += adv;
                let (p_filesz, adv) = self.get_addr(bytes, off);
                off += adv;
                let (p_memsz, adv) = self.get_addr(bytes, off);
                off += adv;
                let (p_align, _) = self.get_addr(bytes, off);
                ProgramHeaderFields {
                    p_type,
                    p_flags,
                    p_offset,
                    p_vaddr,
                    p_paddr,
                    p_filesz,
                    p_memsz,
                    p_align,
                }
            },
        };

        Ok(fields)
    }

    /// Encodes a `u32` in this codec's endianness. Exposed for the note builder, which
    /// shares the enclosing ELF's byte order but has no notion of class.
    pub fn encode_u32(&self, v: u32) -> [u8; 4] {
        match self.endian {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        }
    }

    /// Encodes a `u64` in this codec's endianness. Exposed for the note builder's
    /// entry-point descriptors on [`ElfClass::Class64`] outputs.
    pub fn encode_u64(&self, v: u64) -> [u8; 8] {
        match self.endian {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        }
    }
}

//==================================================================================================
// Standalone Functions
//==================================================================================================

///
/// # Description
///
/// Sniffs the ELF class and endianness out of a raw `e_ident` prefix, without assuming
/// either is already known. This is the first thing done on any donor file, before a
/// [`Codec`] can be constructed to decode the rest of the header.
///
/// # Errors
///
/// Returns [`ComposerError::BadHeader`] if `bytes` has fewer than
/// [`config::EI_DATA`]` + 1` bytes, or if the class byte is not in `{1, 2}`.
///
pub fn sniff_class_endian(bytes: &[u8]) -> Result<(ElfClass, Endian), ComposerError> {
    if bytes.len() <= config::EI_DATA {
        return Err(ComposerError::BadHeader {
            path:        std::path::PathBuf::new(),
            found_class: bytes.get(config::EI_CLASS).copied(),
        });
    }

    let class: ElfClass = match bytes[config::EI_CLASS] {
        config::ELFCLASS32 => ElfClass::Class32,
        config::ELFCLASS64 => ElfClass::Class64,
        other => {
            return Err(ComposerError::BadHeader {
                path:        std::path::PathBuf::new(),
                found_class: Some(other),
            });
        },
    };

    let endian: Endian = match bytes[config::EI_DATA] {
        config::ELFDATA2MSB => Endian::Big,
        _ => Endian::Little,
    };

    Ok((class, endian))
}

//==================================================================================================
// Tests
//==================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(class: ElfClass) -> ElfHeaderFields {
        let mut e_ident: [u8; config::EI_NIDENT] = [0u8; config::EI_NIDENT];
        e_ident[0..4].copy_from_slice(b"\x7fELF");
        e_ident[config::EI_CLASS] = match class {
            ElfClass::Class32 => config::ELFCLASS32,
            ElfClass::Class64 => config::ELFCLASS64,
        };
        e_ident[config::EI_DATA] = config::ELFDATA2LSB;

        ElfHeaderFields {
            e_ident,
            e_type: 2,
            e_machine: 0xab,
            e_version: 1,
            e_entry: 0x1000,
            e_phoff: 0,
            e_shoff: 0,
            e_flags: 0,
            e_ehsize: class.elf_header_size() as u16,
            e_phentsize: class.program_header_size() as u16,
            e_phnum: 3,
            e_shentsize: 0,
            e_shnum: 0,
            e_shstrndx: 0,
        }
    }

    #[test]
    fn elf_header_round_trips_for_every_class_and_endianness() {
        for class in [ElfClass::Class32, ElfClass::Class64] {
            for endian in [Endian::Little, Endian::Big] {
                let codec: Codec = Codec::new(class, endian);
                let fields: ElfHeaderFields = sample_header(class);
                let bytes: Vec<u8> = codec.encode_elf_header(&fields);
                assert_eq!(bytes.len(), class.elf_header_size());

                let decoded: ElfHeaderFields = codec.decode_elf_header(&bytes).unwrap();
                assert_eq!(decoded.e_type, fields.e_type);
                assert_eq!(decoded.e_entry, fields.e_entry);
                assert_eq!(decoded.e_phnum, fields.e_phnum);
                assert_eq!(decoded.e_ident, fields.e_ident);
            }
        }
    }

    #[test]
    fn program_header_round_trips_with_class_specific_flags_placement() {
        for class in [ElfClass::Class32, ElfClass::Class64] {
            for endian in [Endian::Little, Endian::Big] {
                let codec: Codec = Codec::new(class, endian);
                let fields: ProgramHeaderFields = ProgramHeaderFields {
                    p_type:   config::PT_LOAD,
                    p_flags:  0b101,
                    p_offset: 0x40,
                    p_vaddr:  0x1000,
                    p_paddr:  0x1000,
                    p_filesz: 0x100,
                    p_memsz:  0x100,
                    p_align:  0x1000,
                };
                let bytes: Vec<u8> = codec.encode_program_header(&fields);
                assert_eq!(bytes.len(), class.program_header_size());

                let decoded: ProgramHeaderFields = codec.decode_program_header(&bytes).unwrap();
                assert_eq!(decoded.p_type, fields.p_type);
                assert_eq!(decoded.p_flags, fields.p_flags);
                assert_eq!(decoded.p_vaddr, fields.p_vaddr);
                assert_eq!(decoded.p_filesz, fields.p_filesz);
            }
        }
    }

    #[test]
    fn decode_elf_header_rejects_short_buffers() {
        let codec: Codec = Codec::new(ElfClass::Class64, Endian::Little);
        let err = codec.decode_elf_header(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, ComposerError::BadHeader { .. }));
    }

    #[test]
    fn sniff_rejects_invalid_class_byte() {
        let mut bytes: [u8; 16] = [0u8; 16];
        bytes[config::EI_CLASS] = 7;
        let err = sniff_class_endian(&bytes).unwrap_err();
        assert!(matches!(err, ComposerError::BadHeader { found_class: Some(7), .. }));
    }

    #[test]
    fn sniff_detects_big_endian() {
        let mut bytes: [u8; 16] = [0u8; 16];
        bytes[config::EI_CLASS] = config::ELFCLASS64;
        bytes[config::EI_DATA] = config::ELFDATA2MSB;
        let (class, endian) = sniff_class_endian(&bytes).unwrap();
        assert_eq!(class, ElfClass::Class64);
        assert_eq!(endian, Endian::Big);
    }
}
