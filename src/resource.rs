//! Named-resource table discovery
//!
//! The resource partition ("Part 5") holds two parallel tables: a ROCK26
//! offset table whose entries are trusted ground truth, and a 108-byte
//! metadata table carrying names, dimensions, and a second copy of each
//! offset. Some firmware builds ship the metadata table shifted by a few
//! indices relative to ROCK26; the shift is recovered by statistical
//! voting over the leading entries.

use std::collections::BTreeMap;

use bytemuck::{pod_read_unaligned, Pod, Zeroable};
use log::{debug, info};

use crate::{
    error::Error,
    image::{read_u32, FirmwareImage, RESOURCE_PARTITION},
};

/// Header magic of the trusted offset table.
pub const ROCK26_MAGIC: &[u8] = b"ROCK26IMAGERES";

/// Entry count field, relative to the header start.
const ROCK26_COUNT_OFFSET: usize = 16;
/// First entry, relative to the header start.
const ROCK26_ENTRIES_OFFSET: usize = 32;
const ROCK26_ENTRY_LEN: usize = 16;

/// Size of one metadata table entry.
pub const METADATA_ENTRY_LEN: usize = 108;

/// On-disk ROCK26 entry. Only the offset field is meaningful here.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, packed)]
struct RawRock26Entry {
    head: [u8; 12],
    offset: u32,
}

/// On-disk metadata entry. The head and tail bytes are opaque.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, packed)]
struct RawMetadataEntry {
    head: [u8; 20],
    offset: u32,
    width: u32,
    height: u32,
    name: [u8; 64],
    tail: [u8; 12],
}

/// One parsed metadata entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub index: usize,
    pub offset: u32,
    pub width: u32,
    pub height: u32,
    pub name: String,
}

/// Which branch produced a [`ShiftDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftSource {
    /// Majority consensus over the leading ROCK26 entries.
    Voted,
    /// No bucket got a vote; the first ROCK26 offset was matched directly.
    AnchorFallback,
    /// Nothing matched at all; the tables are assumed aligned.
    Default,
}

/// The detected index shift between the metadata table and ROCK26.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftDecision {
    pub shift: i32,
    pub first_valid_index: usize,
    pub votes: BTreeMap<i32, u32>,
    pub source: ShiftSource,
}

/// Both resource tables located inside the Part-5 slice.
#[derive(Debug)]
pub struct ResourceTables<'a> {
    /// The whole resource partition; metadata offsets index into this.
    pub part5: &'a [u8],
    /// Offsets read from the ROCK26 table, in entry order.
    pub rock26_offsets: Vec<u32>,
    /// Parsed metadata entries, in table order.
    pub metadata: Vec<MetadataEntry>,
    /// Start of the metadata table inside `part5`.
    pub table_start: usize,
}

impl<'a> ResourceTables<'a> {
    /// Locates both tables inside the firmware's resource partition.
    pub fn locate(firmware: &'a FirmwareImage) -> Result<Self, Error> {
        let partition = firmware.partition(RESOURCE_PARTITION)?;
        let part5 = &firmware.data()[partition.range(firmware.len())];

        let header = find_rock26(part5).ok_or(Error::TableNotFound)?;
        let rock26_offsets = read_rock26_offsets(part5, header);
        let anchor = *rock26_offsets.first().ok_or(Error::TableNotFound)?;
        info!(
            "ROCK26 table at part5+{header:#x}: {} entries, anchor offset {anchor:#x}",
            rock26_offsets.len()
        );

        let table_start = find_metadata_start(part5, anchor).ok_or(Error::TableNotFound)?;
        let metadata = parse_metadata(part5, table_start);
        info!(
            "metadata table at part5+{table_start:#x}: {} entries",
            metadata.len()
        );

        Ok(ResourceTables {
            part5,
            rock26_offsets,
            metadata,
            table_start,
        })
    }

    /// Recovers the index shift between the two tables.
    pub fn detect_shift(&self) -> ShiftDecision {
        detect_shift(&self.rock26_offsets, &self.metadata)
    }
}

fn find_rock26(part5: &[u8]) -> Option<usize> {
    if part5.len() < ROCK26_MAGIC.len() {
        return None;
    }
    part5
        .windows(ROCK26_MAGIC.len())
        .position(|window| window == ROCK26_MAGIC)
}

fn read_rock26_offsets(part5: &[u8], header: usize) -> Vec<u32> {
    let declared = read_u32(part5, header + ROCK26_COUNT_OFFSET).unwrap_or(0) as usize;
    let first = header + ROCK26_ENTRIES_OFFSET;
    // The count field is occasionally garbage; never read past the slice.
    let available = part5.len().saturating_sub(first) / ROCK26_ENTRY_LEN;
    let count = declared.min(available);

    (0..count)
        .map(|index| {
            let start = first + index * ROCK26_ENTRY_LEN;
            let entry: RawRock26Entry =
                pod_read_unaligned(&part5[start..start + ROCK26_ENTRY_LEN]);
            entry.offset
        })
        .collect()
}

fn read_metadata_entry(part5: &[u8], position: usize) -> Option<RawMetadataEntry> {
    let raw = part5.get(position..position + METADATA_ENTRY_LEN)?;
    Some(pod_read_unaligned(raw))
}

fn entry_name(raw: &RawMetadataEntry) -> String {
    let name = raw.name;
    let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
    String::from_utf8_lossy(&name[..end]).into_owned()
}

fn is_bmp_name(name: &str) -> bool {
    name.len() >= 3 && name.ends_with(".BMP")
}

fn is_safe_name(name: &str) -> bool {
    is_bmp_name(name) && name.chars().all(|c| c.is_ascii_graphic() || c == ' ')
}

/// Finds the metadata table by anchoring on the first ROCK26 offset: the
/// first 4-aligned entry whose offset copy matches the anchor and whose
/// name looks like a bitmap, then as many plausible entries backwards as
/// exist before it.
fn find_metadata_start(part5: &[u8], anchor: u32) -> Option<usize> {
    let mut first_match = None;
    let mut position = 0;
    while position + METADATA_ENTRY_LEN <= part5.len() {
        if let Some(raw) = read_metadata_entry(part5, position) {
            if { raw.offset } == anchor && is_bmp_name(&entry_name(&raw)) {
                first_match = Some(position);
                break;
            }
        }
        position += 4;
    }
    let mut start = first_match?;

    while start >= METADATA_ENTRY_LEN {
        let candidate = start - METADATA_ENTRY_LEN;
        match read_metadata_entry(part5, candidate) {
            Some(raw) if is_safe_name(&entry_name(&raw)) => start = candidate,
            _ => break,
        }
    }
    debug!("metadata table walked back to part5+{start:#x}");
    Some(start)
}

/// Reads consecutive entries until the name field runs out.
fn parse_metadata(part5: &[u8], table_start: usize) -> Vec<MetadataEntry> {
    let mut entries = Vec::new();
    let mut position = table_start;
    while let Some(raw) = read_metadata_entry(part5, position) {
        let name = entry_name(&raw);
        if name.len() < 3 {
            break;
        }
        entries.push(MetadataEntry {
            index: entries.len(),
            offset: raw.offset,
            width: raw.width,
            height: raw.height,
            name,
        });
        position += METADATA_ENTRY_LEN;
    }
    entries
}

/// Votes each candidate shift in `[-3, 3]` by comparing the leading ROCK26
/// offsets against the metadata offset copies. Majority wins, ties break
/// toward the lowest shift, and two fallbacks cover tables too damaged to
/// vote.
pub fn detect_shift(rock26_offsets: &[u32], metadata: &[MetadataEntry]) -> ShiftDecision {
    let leading = &rock26_offsets[..rock26_offsets.len().min(20)];

    let mut votes = BTreeMap::new();
    for (index, &offset) in leading.iter().enumerate() {
        for shift in -3i32..=3 {
            let Some(candidate) = index.checked_add_signed(shift as isize) else {
                continue;
            };
            if metadata.get(candidate).map(|entry| entry.offset) == Some(offset) {
                *votes.entry(shift).or_insert(0u32) += 1;
            }
        }
    }

    let best = votes
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(&shift, _)| shift);

    if let Some(shift) = best {
        let first_valid_index = match shift {
            0 => 0,
            s if s > 0 => 1,
            s => (1 - s).max(1) as usize,
        };
        debug!("shift vote {votes:?} -> {shift} (first valid index {first_valid_index})");
        return ShiftDecision {
            shift,
            first_valid_index,
            votes,
            source: ShiftSource::Voted,
        };
    }

    // No bucket voted. A single-point match on the anchor is the only
    // non-statistical decision allowed.
    if let Some(&anchor) = leading.first() {
        if let Some(found) = metadata.iter().position(|entry| entry.offset == anchor) {
            debug!("shift fallback: anchor matched metadata[{found}]");
            return ShiftDecision {
                shift: found as i32 - 1,
                first_valid_index: 1,
                votes,
                source: ShiftSource::AnchorFallback,
            };
        }
    }

    ShiftDecision {
        shift: 0,
        first_valid_index: 0,
        votes,
        source: ShiftSource::Default,
    }
}
