// Copyright(c) The Maintainers of Nanvix.
// Licensed under the MIT License.

//!
//! # Note Builder
//!
//! Serializes the vendor, segment-map, entry-points, custom, and run-status notes into
//! a single `PT_NOTE` payload. Byte-exact layout is taken from the note names used by
//! the original image-generation tool this crate's semantics were distilled from:
//! every name carries a trailing space that is counted in `namesz` as the note's
//! terminator slot.
//!

//==================================================================================================
// Imports
//==================================================================================================

use crate::{
    codec::Codec,
    config,
};

//==================================================================================================
// Standalone Functions
//==================================================================================================

/// Number of padding bytes needed to bring `len` up to a 4-byte boundary.
fn pad_len(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

/// Builds one note record: `namesz | descsz | type | name (padded) | desc (padded)`.
fn build_note_record(codec: &Codec, name: &str, note_type: u32, desc: &[u8]) -> Vec<u8> {
    let name_bytes: &[u8] = name.as_bytes();
    let namesz: u32 = name_bytes.len() as u32;
    let descsz: u32 = desc.len() as u32;

    let mut out: Vec<u8> = Vec::with_capacity(12 + name_bytes.len() + desc.len() + 8);
    out.extend_from_slice(&codec.encode_u32(namesz));
    out.extend_from_slice(&codec.encode_u32(descsz));
    out.extend_from_slice(&codec.encode_u32(note_type));
    out.extend_from_slice(name_bytes);
    out.extend(std::iter::repeat(0u8).take(pad_len(name_bytes.len())));
    out.extend_from_slice(desc);
    out.extend(std::iter::repeat(0u8).take(pad_len(desc.len())));
    out
}

/// Builds the vendor-identity note (empty descriptor).
fn vendor_note(codec: &Codec) -> Vec<u8> {
    build_note_record(codec, config::NOTE_NAME_VENDOR, config::NOTE_TYPE_VENDOR, &[])
}

/// Builds the segment-map note: one `u8` core-id per final loadable segment, in order.
/// Core-ids wider than a byte (including the SSO sentinel) are truncated here only;
/// every other use of a core-id keeps the full `u32`.
fn segment_map_note(codec: &Codec, segment_core_ids: &[u32]) -> Vec<u8> {
    let desc: Vec<u8> = segment_core_ids.iter().map(|&c| c as u8).collect();
    build_note_record(codec, config::NOTE_NAME_SEGMENT_MAP, config::NOTE_TYPE_SEGMENT_MAP, &desc)
}

/// Builds the entry-points note: a packed array of `(core_id: u32, entry: address-sized)`
/// pairs, one per input, in insertion order.
fn entry_points_note(codec: &Codec, entry_points: &[(u32, u64)]) -> Vec<u8> {
    let mut desc: Vec<u8> = Vec::with_capacity(entry_points.len() * 8);
    for (core_id, entry) in entry_points {
        desc.extend_from_slice(&codec.encode_u32(*core_id));
        match codec.class() {
            crate::codec::ElfClass::Class32 => {
                desc.extend_from_slice(&codec.encode_u32(*entry as u32));
            },
            crate::codec::ElfClass::Class64 => {
                desc.extend_from_slice(&codec.encode_u64(*entry));
            },
        }
    }
    build_note_record(codec, config::NOTE_NAME_ENTRY_POINTS, config::NOTE_TYPE_ENTRY_POINTS, &desc)
}

/// Builds a custom-or-run-status note: `name` gets a trailing space appended before
/// `namesz` is computed, exactly like the four built-in notes.
fn named_opaque_note(codec: &Codec, name: &str, data: &[u8]) -> Vec<u8> {
    let name_with_terminator: String = format!("{} ", name);
    build_note_record(codec, &name_with_terminator, config::NOTE_TYPE_CUSTOM, data)
}

///
/// # Description
///
/// Builds the full `PT_NOTE` payload: vendor, segment-map, entry-points, then an
/// optional caller-supplied custom note, then an optional orchestrator-filled
/// run-status note, concatenated in that order.
///
/// # Parameters
///
/// - `codec`: selects the output class/endianness for the entry-point descriptors and
///   the endianness of every note header field.
/// - `segment_core_ids`: the core-id (merger's, for merged segments) of every final
///   loadable segment, in final order.
/// - `entry_points`: one `(core_id, e_entry)` pair per input, in insertion order.
/// - `custom_note`: an optional caller-supplied `(name, bytes)` pair.
/// - `run_status`: an optional orchestrator-filled `(name, bytes)` pair, built
///   separately from `custom_note` so a run can carry both at once.
///
pub fn build_note_segment(
    codec: &Codec,
    segment_core_ids: &[u32],
    entry_points: &[(u32, u64)],
    custom_note: Option<&(String, Vec<u8>)>,
    run_status: Option<&(String, Vec<u8>)>,
) -> Vec<u8> {
    let mut payload: Vec<u8> = Vec::new();
    payload.extend(vendor_note(codec));
    payload.extend(segment_map_note(codec, segment_core_ids));
    payload.extend(entry_points_note(codec, entry_points));
    if let Some((name, data)) = custom_note {
        payload.extend(named_opaque_note(codec, name, data));
    }
    if let Some((name, data)) = run_status {
        payload.extend(named_opaque_note(codec, name, data));
    }
    payload
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

    #[test]
    fn vendor_note_has_byte_exact_namesz_and_padding() {
        let codec: Codec = Codec::new(ElfClass::Class32, Endian::Little);
        let note: Vec<u8> = vendor_note(&codec);

        // "Texas Instruments " is 18 bytes, already a multiple of... 18 % 4 == 2, so 2
        // bytes of padding follow; descsz is 0 with no padding.
        let namesz: u32 = u32::from_le_bytes(note[0..4].try_into().unwrap());
        let descsz: u32 = u32::from_le_bytes(note[4..8].try_into().unwrap());
        let note_type: u32 = u32::from_le_bytes(note[8..12].try_into().unwrap());
        assert_eq!(namesz, 18);
        assert_eq!(descsz, 0);
        assert_eq!(note_type, config::NOTE_TYPE_VENDOR);
        assert_eq!(note.len(), 12 + 18 + 2);
        assert_eq!(&note[12..30], config::NOTE_NAME_VENDOR.as_bytes());
    }

    #[test]
    fn segment_map_note_holds_one_byte_per_segment() {
        let codec: Codec = Codec::new(ElfClass::Class32, Endian::Little);
        let note: Vec<u8> = segment_map_note(&codec, &[0, 1, 0]);
        let descsz: u32 = u32::from_le_bytes(note[4..8].try_into().unwrap());
        assert_eq!(descsz, 3);
    }

    #[test]
    fn entry_points_note_uses_address_sized_entries() {
        let codec32: Codec = Codec::new(ElfClass::Class32, Endian::Little);
        let note32: Vec<u8> = entry_points_note(&codec32, &[(0, 0x1000), (1, 0x2000)]);
        let descsz32: u32 = u32::from_le_bytes(note32[4..8].try_into().unwrap());
        assert_eq!(descsz32, 2 * (4 + 4));

        let codec64: Codec = Codec::new(ElfClass::Class64, Endian::Little);
        let note64: Vec<u8> = entry_points_note(&codec64, &[(0, 0x1000), (1, 0x2000)]);
        let descsz64: u32 = u32::from_le_bytes(note64[4..8].try_into().unwrap());
        assert_eq!(descsz64, 2 * (4 + 8));
    }

    #[test]
    fn custom_note_name_gets_trailing_space_counted_in_namesz() {
        let codec: Codec = Codec::new(ElfClass::Class32, Endian::Little);
        let note: Vec<u8> = named_opaque_note(&codec, "Build Info", &[1, 2, 3, 4]);
        let namesz: u32 = u32::from_le_bytes(note[0..4].try_into().unwrap());
        // "Build Info " is 11 bytes, including the appended space.
        assert_eq!(namesz, 11);
        let note_type: u32 = u32::from_le_bytes(note[8..12].try_into().unwrap());
        assert_eq!(note_type, config::NOTE_TYPE_CUSTOM);
    }

    #[test]
    fn full_note_segment_concatenates_in_fixed_order() {
        let codec: Codec = Codec::new(ElfClass::Class32, Endian::Little);
        let payload: Vec<u8> = build_note_segment(
            &codec,
            &[0],
            &[(0, 0x1000)],
            Some(&("Build".to_string(), vec![0xAA])),
            Some(&(config::NOTE_NAME_RUN_STATUS.to_string(), vec![0x01])),
        );

        let vendor: Vec<u8> = vendor_note(&codec);
        assert_eq!(&payload[0..vendor.len()], &vendor[..]);
    }
}
