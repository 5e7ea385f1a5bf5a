// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Segment Engine
//!
//! Transforms the raw `PT_LOAD` segments pulled out of every input into the final
//! segment list fed to the writer: range-filter, split oversize segments, sort by
//! virtual address, merge adjacent segments under tolerance/context rules, then rewrite
//! addresses through the translation table.
//!

//==================================================================================================
// Imports
//==================================================================================================

use crate::{
    codec::ProgramHeaderFields,
    config,
    error::ComposerError,
    reader::LoadSegment,
    xlat::Translator,
};

//==================================================================================================
// Structures
//==================================================================================================

/// One segment carried through the pipeline: a program-header entry, the bytes it
/// covers, and the core-id that produced it (`None` only for the synthesized NOTE
/// segment).
#[derive(Debug, Clone)]
pub struct Segment {
    /// Program-header fields, updated in place as the segment moves through the
    /// pipeline (split, merge, translate, then offset assignment in `writer`).
    pub header:  ProgramHeaderFields,
    /// File-image bytes; always `header.p_filesz` bytes long.
    pub data:    Vec<u8>,
    /// Originating core-id, or `None` for the NOTE segment.
    pub context: Option<u32>,
}

impl Segment {
    /// Builds a segment from one input's parsed `PT_LOAD` entry.
    pub fn from_load_segment(core_id: u32, load: LoadSegment) -> Self {
        Self {
            header:  load.header,
            data:    load.data,
            context: Some(core_id),
        }
    }

    /// Builds the synthesized NOTE segment carrying `data`.
    pub fn note_segment(data: Vec<u8>) -> Self {
        let len: u64 = data.len() as u64;
        Self {
            header: ProgramHeaderFields {
                p_type:   config::PT_NOTE,
                p_flags:  0,
                p_offset: 0,
                p_vaddr:  0,
                p_paddr:  0,
                p_filesz: len,
                p_memsz:  len,
                p_align:  0,
            },
            data,
            context: None,
        }
    }
}

/// A fully-closed `[start, end]` address interval used by the range filter and XIP
/// partitioning.
#[derive(Debug, Clone, Copy)]
pub struct AddrRange {
    /// First address included in the range.
    pub start: u64,
    /// Last address included in the range.
    pub end:   u64,
}

impl AddrRange {
    ///
    /// # Description
    ///
    /// Builds a range, rejecting a non-positive span.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::BadRange`] if `end <= start`.
    ///
    pub fn new(start: u64, end: u64) -> Result<Self, ComposerError> {
        if end <= start {
            return Err(ComposerError::BadRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether `addr` lies within `[start, end]`, both ends included.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr <= self.end
    }
}

//==================================================================================================
// Standalone Functions
//==================================================================================================

///
/// # Description
///
/// Whether a segment at `vaddr` passes the configured accept/ignore range filters. A
/// segment passes iff it is inside `accept` (when configured) and outside `ignore`
/// (when configured).
///
pub fn passes_range_filter(vaddr: u64, accept: Option<&AddrRange>, ignore: Option<&AddrRange>) -> bool {
    let accepted: bool = accept.map_or(true, |r| r.contains(vaddr));
    let not_ignored: bool = ignore.map_or(true, |r| !r.contains(vaddr));
    accepted && not_ignored
}

///
/// # Description
///
/// Splits every segment larger than `max_segment_size` into fixed-size chunks. A `None`
/// or zero ceiling leaves `segments` untouched.
///
pub fn split(segments: Vec<Segment>, max_segment_size: Option<u64>) -> Vec<Segment> {
    let ceiling: u64 = match max_segment_size {
        Some(s) if s > 0 => s,
        _ => return segments,
    };

    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        let total: u64 = seg.header.p_filesz;
        if total <= ceiling {
            out.push(seg);
            continue;
        }

        let chunk_count: u64 = (total + ceiling - 1) / ceiling;
        for k in 0..chunk_count {
            let off: u64 = k * ceiling;
            let chunk_len: u64 = std::cmp::min(ceiling, total - off);
            let data: Vec<u8> = seg.data[off as usize..(off + chunk_len) as usize].to_vec();

            out.push(Segment {
                header: ProgramHeaderFields {
                    p_type:   seg.header.p_type,
                    p_flags:  seg.header.p_flags,
                    p_offset: 0,
                    p_vaddr:  seg.header.p_vaddr + off,
                    p_paddr:  seg.header.p_paddr + off,
                    p_filesz: chunk_len,
                    p_memsz:  chunk_len,
                    p_align:  if k == 0 { seg.header.p_align } else { 1 },
                },
                data,
                context: seg.context,
            });
        }
    }

    out
}

///
/// # Description
///
/// Stable sort of `segments` by ascending `p_vaddr`.
///
pub fn sort_by_vaddr(mut segments: Vec<Segment>) -> Vec<Segment> {
    segments.sort_by_key(|s| s.header.p_vaddr);
    segments
}

///
/// # Description
///
/// Greedily merges adjacent segments left-to-right. Two adjacent segments merge iff the
/// gap between them is non-negative, at most `tol_limit`, their addresses differ, and
/// either `ignore_context` is set or their contexts match. A negative gap (the segments
/// overlap) is always fatal, independent of the other conditions.
///
/// # Errors
///
/// Returns [`ComposerError::OverlappingSegments`] as soon as an overlapping adjacent
/// pair is found in the sorted list.
///
pub fn merge(
    segments: Vec<Segment>,
    segmerge: bool,
    tol_limit: u64,
    ignore_context: bool,
) -> Result<Vec<Segment>, ComposerError> {
    if !segmerge || segments.len() <= 1 {
        return Ok(segments);
    }

    let mut iter = segments.into_iter();
    let mut merged: Vec<Segment> = Vec::new();
    let mut current: Segment = iter.next().expect("length checked above");

    for candidate in iter {
        if is_mergeable(&current, &candidate, tol_limit, ignore_context)? {
            current = merge_two(current, candidate);
        } else {
            merged.push(current);
            current = candidate;
        }
    }
    merged.push(current);

    Ok(merged)
}

fn is_mergeable(a: &Segment, b: &Segment, tol_limit: u64, ignore_context: bool) -> Result<bool, ComposerError> {
    let a_end: i128 = a.header.p_vaddr as i128 + a.header.p_filesz as i128;
    let gap: i128 = b.header.p_vaddr as i128 - a_end;

    if gap < 0 {
        return Err(ComposerError::OverlappingSegments {
            a_vaddr:   a.header.p_vaddr,
            a_end:     a.header.p_vaddr + a.header.p_filesz,
            b_vaddr:   b.header.p_vaddr,
            a_context: a.context,
            b_context: b.context,
        });
    }

    let addr_ok: bool = gap <= tol_limit as i128 && b.header.p_vaddr != a.header.p_vaddr;
    let context_ok: bool = ignore_context || a.context == b.context;

    Ok(addr_ok && context_ok)
}

fn merge_two(mut a: Segment, b: Segment) -> Segment {
    let pad: u64 = b.header.p_vaddr - (a.header.p_vaddr + a.header.p_filesz);

    a.data.extend(std::iter::repeat(0u8).take(pad as usize));
    a.data.extend(b.data);

    a.header.p_align = a.header.p_align.max(b.header.p_align);
    a.header.p_filesz = a.header.p_filesz + pad + b.header.p_filesz;
    a.header.p_memsz = a.header.p_filesz;

    a
}

///
/// # Description
///
/// Rewrites every non-NOTE segment's `p_vaddr`/`p_paddr` through `translator`, using
/// each segment's context core-id.
///
pub fn translate_addresses(segments: &mut [Segment], translator: &Translator) {
    for seg in segments.iter_mut() {
        if let Some(core_id) = seg.context {
            seg.header.p_vaddr = translator.translate(core_id, seg.header.p_vaddr);
            seg.header.p_paddr = translator.translate(core_id, seg.header.p_paddr);
        }
    }
}

/// Collects each segment's full `u32` context core-id, in list order, for the
/// segment-map note; truncation to `u8` happens in the note builder itself. The NOTE
/// segment (context `None`) is never part of this list, since it is built before this
/// is called.
pub fn context_ids(segments: &[Segment]) -> Vec<u32> {
    segments.iter().filter_map(|s| s.context).collect()
}

//==================================================================================================
// Tests
//==================================================================================================
