// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Multicore Orchestrator
//!
//! Drives the full composition pipeline: collect inputs, classify the output
//! class/endianness, split, sort, merge, translate, synthesize the NOTE segment, then
//! write. XIP mode runs the pipeline twice with complementary range filters.
//!

//==================================================================================================
// Imports
//==================================================================================================

use crate::{
    codec::{
        Codec,
        ElfClass,
        ElfHeaderFields,
    },
    config,
    error::ComposerError,
    note,
    reader::InputImage,
    segment::{
        self,
        AddrRange,
        Segment,
    },
    writer,
    xlat::Translator,
};
use ::std::path::PathBuf;

//==================================================================================================
// Structures
//==================================================================================================

/// What kind of image an input path represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A regular per-core ELF executable.
    Elf,
    /// A static shared object, auto-assigned [`config::SSO_CORE_ID`].
    Sso,
}

/// One collected input, awaiting `generate()`.
struct Input {
    core_id: u32,
    path:    PathBuf,
}

/// Parameters for one `generate()` run. A single [`Orchestrator`] with a fixed set of
/// inputs can be driven through `generate()` more than once (XIP mode does exactly
/// this, with complementary range filters).
pub struct GenerateConfig {
    /// Splits load segments larger than this many bytes; `None`/`Some(0)` disables
    /// splitting.
    pub max_segment_size:    Option<u64>,
    /// Whether to merge adjacent segments after sorting.
    pub segmerge:            bool,
    /// Maximum gap, in bytes, between two segments that still allows merging them.
    pub tol_limit:           u64,
    /// When set, segments from different inputs can merge into one another.
    pub ignore_context:      bool,
    /// Optional path to a translation JSON; when set, addresses are rewritten after
    /// merging.
    pub xlat_path:           Option<PathBuf>,
    /// Optional `(name, bytes)` pair added as a custom note.
    pub custom_note:         Option<(String, Vec<u8>)>,
    /// When set, an orchestrator-filled run-status note is appended.
    pub add_run_status_note: bool,
    /// Segments outside this range are dropped.
    pub ignore_range:        Option<AddrRange>,
    /// Segments outside this range are dropped (the complement of `ignore_range`).
    pub accept_range:        Option<AddrRange>,
    /// Destination path for the composite image.
    pub output_path:         PathBuf,
    /// Logs the final segment table at `info` level before writing.
    pub dump_segments:       bool,
}

/// Collects inputs and drives one or more composition runs against them.
pub struct Orchestrator {
    inputs: Vec<Input>,
}

//==================================================================================================
// Implementations
//==================================================================================================

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Builds an orchestrator with no inputs.
    pub fn new() -> Self {
        Self { inputs: Vec::new() }
    }

    /// Registers one input. `core_id` should be [`config::SSO_CORE_ID`] for
    /// [`InputKind::Sso`] inputs; the caller (`args::parse`) is responsible for that
    /// assignment.
    pub fn add_input(&mut self, core_id: u32, path: PathBuf, _kind: InputKind) {
        self.inputs.push(Input { core_id, path });
    }

    ///
    /// # Description
    ///
    /// Runs the full composition pipeline once and writes the result to
    /// `config.output_path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ComposerError`] if any input cannot be read or parsed, the
    /// translation table cannot be loaded, or segments overlap during merge.
    ///
    pub fn generate(&self, config: &GenerateConfig) -> Result<(), ComposerError> {
        debug!("generate(): state=Collecting, inputs={}", self.inputs.len());

        let mut images: Vec<(u32, InputImage)> = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let image: InputImage = InputImage::read(&input.path)?;
            images.push((input.core_id, image));
        }

        debug!("generate(): state=Classified");
        let (donor_codec, donor_header, entry_points) = classify(&images);

        debug!("generate(): state=Splitting");
        let mut segments: Vec<Segment> = Vec::new();
        for (core_id, image) in images {
            for load in image.segments {
                if segment::passes_range_filter(
                    load.header.p_vaddr,
                    config.accept_range.as_ref(),
                    config.ignore_range.as_ref(),
                ) {
                    segments.push(Segment::from_load_segment(core_id, load));
                }
            }
        }
        segments = segment::split(segments, config.max_segment_size);

        debug!("generate(): state=Sorting, segments={}", segments.len());
        segments = segment::sort_by_vaddr(segments);

        debug!("generate(): state=Merging");
        segments = segment::merge(segments, config.segmerge, config.tol_limit, config.ignore_context)?;

        debug!("generate(): state=Translating");
        if let Some(xlat_path) = &config.xlat_path {
            let translator: Translator = Translator::load(xlat_path)?;
            segment::translate_addresses(&mut segments, &translator);
        }

        debug!("generate(): state=Noting");
        let run_status: Option<(String, Vec<u8>)> = if config.add_run_status_note {
            Some((config::NOTE_NAME_RUN_STATUS.to_string(), vec![1u8]))
        } else {
            None
        };
        let note_payload: Vec<u8> = note::build_note_segment(
            &donor_codec,
            &segment::context_ids(&segments),
            &entry_points,
            config.custom_note.as_ref(),
            run_status.as_ref(),
        );

        let mut final_list: Vec<Segment> = Vec::with_capacity(segments.len() + 1);
        final_list.push(Segment::note_segment(note_payload));
        final_list.extend(segments);

        if config.dump_segments {
            for (i, seg) in final_list.iter().enumerate() {
                info!(
                    "segment[{}]: vaddr={:#x} filesz={:#x} context={:?}",
                    i, seg.header.p_vaddr, seg.header.p_filesz, seg.context
                );
            }
        }

        debug!("generate(): state=Writing, output={:?}", config.output_path);
        writer::write_elf(&donor_codec, donor_header, &final_list, &config.output_path)?;

        debug!("generate(): state=Done");
        Ok(())
    }

    ///
    /// # Description
    ///
    /// Runs `generate()` twice with complementary range filters derived from `xip`:
    /// once accepting only `xip` (written to `<output>_xip`) and once ignoring `xip`
    /// (written to `config.output_path` unchanged).
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::generate`].
    ///
    pub fn generate_xip(&self, mut config: GenerateConfig, xip: AddrRange) -> Result<(), ComposerError> {
        let base_output: PathBuf = config.output_path.clone();

        config.ignore_range = Some(xip);
        config.accept_range = None;
        config.output_path = base_output.clone();
        self.generate(&config)?;

        let mut xip_path: std::ffi::OsString = base_output.into_os_string();
        xip_path.push(config::XIP_SUFFIX);

        config.ignore_range = None;
        config.accept_range = Some(xip);
        config.output_path = PathBuf::from(xip_path);
        self.generate(&config)
    }
}

/// Picks the donor header/codec (first class64 input, else the first input) and
/// collects every input's `(core_id, e_entry)` pair. The donor's header is carried
/// forward verbatim; [`writer::write_elf`] only ever overwrites the offset/count
/// fields it recomputes.
fn classify(images: &[(u32, InputImage)]) -> (Codec, ElfHeaderFields, Vec<(u32, u64)>) {
    let donor_idx: usize = images
        .iter()
        .position(|(_, image)| image.codec.class() == ElfClass::Class64)
        .unwrap_or(0);

    let (_, donor_image) = &images[donor_idx];
    let donor_codec: Codec = donor_image.codec;
    let donor_header: ElfHeaderFields = donor_image.header.clone();

    let entry_points: Vec<(u32, u64)> =
        images.iter().map(|(core_id, image)| (*core_id, image.header.e_entry)).collect();

    (donor_codec, donor_header, entry_points)
}

//==================================================================================================
// Tests
//==================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{
        Endian,
        ProgramHeaderFields,
    };

    fn write_sample_elf(path: &std::path::Path, class: ElfClass, entry: u64, vaddr: u64, filesz: u64) {
        let codec: Codec = Codec::new(class, Endian::Little);
        let mut e_ident: [u8; config::EI_NIDENT] = [0u8; config::EI_NIDENT];
        e_ident[0..4].copy_from_slice(b"\x7fELF");
        e_ident[config::EI_CLASS] = match class {
            ElfClass::Class32 => config::ELFCLASS32,
            ElfClass::Class64 => config::ELFCLASS64,
        };
        e_ident[config::EI_DATA] = config::ELFDATA2LSB;

        let ehdr = ElfHeaderFields {
            e_ident,
            e_type: 2,
            e_machine: 0x28,
            e_version: 1,
            e_entry: entry,
            e_phoff: codec.elf_header_size() as u64,
            e_shoff: 0,
            e_flags: 0,
            e_ehsize: codec.elf_header_size() as u16,
            e_phentsize: codec.program_header_size() as u16,
            e_phnum: 1,
            e_shentsize: 0,
            e_shnum: 0,
            e_shstrndx: 0,
        };
        let data_off: u64 = codec.elf_header_size() as u64 + codec.program_header_size() as u64;
        let phdr = ProgramHeaderFields {
            p_type: config::PT_LOAD,
            p_flags: 0b101,
            p_offset: data_off,
            p_vaddr: vaddr,
            p_paddr: vaddr,
            p_filesz: filesz,
            p_memsz: filesz,
            p_align: 4,
        };
        let mut bytes: Vec<u8> = codec.encode_elf_header(&ehdr);
        bytes.extend(codec.encode_program_header(&phdr));
        bytes.extend(vec![0x42u8; filesz as usize]);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn generate_writes_a_valid_composite_with_note_segment_first() {
        let dir: PathBuf = std::env::temp_dir();
        let input_path: PathBuf = dir.join(format!("mcelf-orch-test-in-{}", std::process::id()));
        let output_path: PathBuf = dir.join(format!("mcelf-orch-test-out-{}", std::process::id()));
        write_sample_elf(&input_path, ElfClass::Class32, 0x1000, 0x1000, 16);

        let mut orch: Orchestrator = Orchestrator::new();
        orch.add_input(0, input_path.clone(), InputKind::Elf);

        let config: GenerateConfig = GenerateConfig {
            max_segment_size: None,
            segmerge: false,
            tol_limit: 0,
            ignore_context: false,
            xlat_path: None,
            custom_note: None,
            add_run_status_note: false,
            ignore_range: None,
            accept_range: None,
            output_path: output_path.clone(),
            dump_segments: false,
        };
        orch.generate(&config).unwrap();

        let codec: Codec = Codec::new(ElfClass::Class32, Endian::Little);
        let bytes: Vec<u8> = std::fs::read(&output_path).unwrap();
        let header: ElfHeaderFields = codec.decode_elf_header(&bytes).unwrap();
        assert_eq!(header.e_phnum, 2);

        let pht_start: usize = codec.elf_header_size();
        let note_phdr: ProgramHeaderFields =
            codec.decode_program_header(&bytes[pht_start..pht_start + codec.program_header_size()]).unwrap();
        assert_eq!(note_phdr.p_type, config::PT_NOTE);

        std::fs::remove_file(&input_path).ok();
        std::fs::remove_file(&output_path).ok();
    }

    #[test]
    fn generate_picks_class64_donor_when_mixed() {
        let dir: PathBuf = std::env::temp_dir();
        let in32: PathBuf = dir.join(format!("mcelf-orch-mix32-{}", std::process::id()));
        let in64: PathBuf = dir.join(format!("mcelf-orch-mix64-{}", std::process::id()));
        let output_path: PathBuf = dir.join(format!("mcelf-orch-mix-out-{}", std::process::id()));
        write_sample_elf(&in32, ElfClass::Class32, 0x1000, 0x1000, 8);
        write_sample_elf(&in64, ElfClass::Class64, 0x2000, 0x8000, 8);

        let mut orch: Orchestrator = Orchestrator::new();
        orch.add_input(0, in32.clone(), InputKind::Elf);
        orch.add_input(1, in64.clone(), InputKind::Elf);

        let config: GenerateConfig = GenerateConfig {
            max_segment_size: None,
            segmerge: false,
            tol_limit: 0,
            ignore_context: false,
            xlat_path: None,
            custom_note: None,
            add_run_status_note: false,
            ignore_range: None,
            accept_range: None,
            output_path: output_path.clone(),
            dump_segments: false,
        };
        orch.generate(&config).unwrap();

        let bytes: Vec<u8> = std::fs::read(&output_path).unwrap();
        assert_eq!(bytes[config::EI_CLASS], config::ELFCLASS64);

        std::fs::remove_file(&in32).ok();
        std::fs::remove_file(&in64).ok();
        std::fs::remove_file(&output_path).ok();
    }
}
