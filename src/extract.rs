//! Extraction driver
//!
//! Walks the located tables and turns every recoverable asset into a BMP
//! byte stream. Artifacts are fully assembled in memory and handed to an
//! [`ArtifactSink`] one buffer at a time, so a sink write is all-or-nothing
//! at the byte level. Individual codepoints or resources that fail
//! validation are tallied and skipped; only locator failures and sink I/O
//! abort a pass.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    bmp,
    error::Error,
    font::{decoder, FontAddresses, FontLocator, FontTable, LocatorConfig, CELL_BYTES},
    image::{is_uniform, FirmwareImage},
    ranges::UnicodeRange,
    resource::{ResourceTables, ShiftDecision},
};

/// Receives fully assembled artifacts keyed by a relative path.
pub trait ArtifactSink {
    fn emit(&mut self, relative_path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Writes artifacts under a root directory, creating parents on demand.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySink { root: root.into() }
    }
}

impl ArtifactSink for DirectorySink {
    fn emit(&mut self, relative_path: &Path, bytes: &[u8]) -> io::Result<()> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    }
}

/// Collects artifacts in memory instead of touching the filesystem.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub artifacts: Vec<(PathBuf, Vec<u8>)>,
}

impl ArtifactSink for MemorySink {
    fn emit(&mut self, relative_path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.artifacts.push((relative_path.to_path_buf(), bytes.to_vec()));
        Ok(())
    }
}

/// Progress update callbacks
pub trait ProgressCallbacks {
    /// Begin a new extraction phase with `total` candidate items
    fn init(&mut self, phase: &str, total: usize);
    /// Update the current phase
    fn update(&mut self, current: usize);
    /// Finish the current phase
    fn finish(&mut self);
}

/// Callbacks that report nothing.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressCallbacks for NoProgress {
    fn init(&mut self, _phase: &str, _total: usize) {}
    fn update(&mut self, _current: usize) {}
    fn finish(&mut self) {}
}

/// Fill-ratio acceptance bounds for decoded glyphs. Nearly-empty grids are
/// noise; nearly-full grids are usually misaligned reads of non-font data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphFilter {
    pub min_fill: f64,
    pub small_max_fill: f64,
    pub large_max_fill: f64,
}

impl Default for GlyphFilter {
    fn default() -> Self {
        GlyphFilter {
            min_fill: 0.01,
            small_max_fill: 0.95,
            large_max_fill: 0.97,
        }
    }
}

impl GlyphFilter {
    fn accepts(&self, table: FontTable, ratio: f64) -> bool {
        let max = match table {
            FontTable::Small => self.small_max_fill,
            FontTable::Large => self.large_max_fill,
        };
        ratio > self.min_fill && ratio < max
    }
}

/// Everything tunable about a firmware pass. Doubles as the schema of the
/// optional TOML config file accepted by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub locator: LocatorConfig,
    pub filter: GlyphFilter,
}

/// Glyph pass tallies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GlyphStats {
    pub small_emitted: u32,
    pub large_emitted: u32,
    /// Decoded cells rejected by the fill-ratio filter.
    pub rejected: u32,
}

impl GlyphStats {
    pub fn total_emitted(&self) -> u32 {
        self.small_emitted + self.large_emitted
    }
}

/// Resource pass tallies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStats {
    pub emitted: u32,
    pub skipped: u32,
}

/// The outcome of one complete firmware pass.
#[derive(Debug, Clone)]
pub struct FirmwareReport {
    pub addresses: FontAddresses,
    pub shift: ShiftDecision,
    pub glyphs: GlyphStats,
    pub resources: ResourceStats,
}

enum GlyphOutcome {
    Emitted { name: String, bytes: Vec<u8> },
    /// The table does not cover the codepoint, or the cell is blank.
    Absent,
    /// The cell decoded but failed the fill-ratio filter.
    Rejected,
}

/// Drives glyph and resource extraction over one firmware image.
#[derive(Debug)]
pub struct Extractor<'a> {
    firmware: &'a FirmwareImage,
    filter: GlyphFilter,
}

impl<'a> Extractor<'a> {
    pub fn new(firmware: &'a FirmwareImage) -> Self {
        Extractor {
            firmware,
            filter: GlyphFilter::default(),
        }
    }

    pub fn with_filter(firmware: &'a FirmwareImage, filter: GlyphFilter) -> Self {
        Extractor { firmware, filter }
    }

    /// Extracts every decodable glyph in `ranges` from both font tables.
    /// Artifacts land under `<TABLE>/<range_dir>/0xADDR_Hxx_U+XXXX.bmp`.
    pub fn extract_glyphs(
        &self,
        addresses: &FontAddresses,
        ranges: &[UnicodeRange],
        sink: &mut dyn ArtifactSink,
        progress: &mut dyn ProgressCallbacks,
    ) -> Result<GlyphStats, Error> {
        let mut stats = GlyphStats::default();

        for table in [FontTable::Small, FontTable::Large] {
            for range in ranges {
                let dir = PathBuf::from(table.to_string()).join(range.directory_name());
                progress.init(&format!("{table} {}", range.directory_name()), range.count());

                let mut emitted = 0u32;
                for (step, codepoint) in range.codepoints().enumerate() {
                    progress.update(step + 1);
                    match self.decode_glyph(addresses, table, codepoint) {
                        GlyphOutcome::Emitted { name, bytes } => {
                            sink.emit(&dir.join(name), &bytes)?;
                            emitted += 1;
                        }
                        GlyphOutcome::Absent => {}
                        GlyphOutcome::Rejected => stats.rejected += 1,
                    }
                }
                progress.finish();

                if emitted > 0 {
                    debug!("{table} {}: {emitted} glyphs", range.directory_name());
                }
                match table {
                    FontTable::Small => stats.small_emitted += emitted,
                    FontTable::Large => stats.large_emitted += emitted,
                }
            }
        }
        Ok(stats)
    }

    fn decode_glyph(
        &self,
        addresses: &FontAddresses,
        table: FontTable,
        codepoint: u32,
    ) -> GlyphOutcome {
        let Some(addr) = addresses.cell_addr(table, codepoint) else {
            return GlyphOutcome::Absent;
        };
        let Some(cell) = self.firmware.get(addr, table.stride()) else {
            return GlyphOutcome::Absent;
        };
        // Erased or zero-filled cells carry no glyph.
        if is_uniform(cell) {
            return GlyphOutcome::Absent;
        }
        let Some(lookup) = addresses.lookup(self.firmware, codepoint) else {
            return GlyphOutcome::Absent;
        };
        let Ok(pixels) = <[u8; CELL_BYTES]>::try_from(&cell[..CELL_BYTES]) else {
            return GlyphOutcome::Absent;
        };

        let grid = decoder::decode(&pixels, lookup);
        if !self.filter.accepts(table, grid.fill_ratio()) {
            return GlyphOutcome::Rejected;
        }

        GlyphOutcome::Emitted {
            name: format!("0x{addr:06X}_H{lookup:02X}_U+{codepoint:04X}.bmp"),
            bytes: bmp::monochrome_bmp(&grid),
        }
    }

    /// Extracts every color resource described by the metadata table,
    /// honoring the detected index shift. The resource at index `i` takes
    /// its name from entry `i`, its pixel offset from entry `i + shift`,
    /// and its dimensions from entry `i + 1`; that pairing is how the
    /// firmware's own reader works, not an off-by-one.
    pub fn extract_resources(
        &self,
        tables: &ResourceTables<'_>,
        decision: &ShiftDecision,
        sink: &mut dyn ArtifactSink,
        progress: &mut dyn ProgressCallbacks,
    ) -> Result<ResourceStats, Error> {
        let mut stats = ResourceStats::default();
        let metadata = &tables.metadata;

        let end = metadata
            .len()
            .saturating_sub(usize::from(decision.shift > 0));
        let first = decision.first_valid_index.min(end);
        progress.init("resources", end - first);

        for (step, index) in (first..end).enumerate() {
            progress.update(step + 1);
            let entry = &metadata[index];

            let offset = match index
                .checked_add_signed(decision.shift as isize)
                .and_then(|shifted| metadata.get(shifted))
            {
                Some(source) => source.offset as usize,
                None => {
                    stats.skipped += 1;
                    continue;
                }
            };
            let (width, height) = metadata
                .get(index + 1)
                .map_or((entry.width, entry.height), |next| (next.width, next.height));

            if offset == 0
                || offset >= tables.part5.len()
                || width == 0
                || width > 10_000
                || height == 0
                || height > 10_000
            {
                debug!(
                    "skipping resource {index} '{}': offset {offset:#x}, {width}x{height}",
                    entry.name
                );
                stats.skipped += 1;
                continue;
            }

            let pixel_bytes = width as usize * height as usize * 2;
            let raw_end = offset.saturating_add(pixel_bytes).min(tables.part5.len());
            let raw = &tables.part5[offset..raw_end];

            let bytes = bmp::rgb565_to_bmp(raw, width as i32, height as i32)?;
            let file_name = sanitize_resource_name(&entry.name);
            sink.emit(Path::new(&file_name), &bytes)?;
            stats.emitted += 1;
        }
        progress.finish();
        Ok(stats)
    }
}

/// Runs the full pipeline over one firmware image: locate fonts, extract
/// glyphs, locate resource tables, extract resources.
pub fn run(
    firmware: &FirmwareImage,
    config: &ExtractConfig,
    ranges: &[UnicodeRange],
    sink: &mut dyn ArtifactSink,
    progress: &mut dyn ProgressCallbacks,
) -> Result<FirmwareReport, Error> {
    let locator = FontLocator::with_config(firmware, config.locator.clone());
    let addresses = locator.detect()?;
    addresses.confidence.ensure_acceptable()?;

    let extractor = Extractor::with_filter(firmware, config.filter.clone());
    let glyphs = extractor.extract_glyphs(&addresses, ranges, sink, progress)?;

    let tables = ResourceTables::locate(firmware)?;
    let shift = tables.detect_shift();
    let resources = extractor.extract_resources(&tables, &shift, sink, progress)?;

    Ok(FirmwareReport {
        addresses,
        shift,
        glyphs,
        resources,
    })
}

/// Makes a metadata name filesystem-safe: path separators and anything
/// outside the safe punctuation set become underscores, and the `.bmp`
/// suffix is guaranteed.
pub fn sanitize_resource_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_ascii_alphanumeric() => c,
            '.' | '_' | '-' | '(' | ')' | ',' | ' ' => c,
            _ => '_',
        })
        .collect();
    if !out.to_ascii_lowercase().ends_with(".bmp") {
        out.push_str(".bmp");
    }
    out
}
