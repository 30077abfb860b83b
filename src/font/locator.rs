//! Heuristic font-table locator
//!
//! The SMALL table base is stored in two config words in the image header
//! and is fully reliable. The LARGE table moves between firmware builds,
//! so its base is recovered by scoring windows of the firmware partition
//! for runs of valid cell footer signatures at the 33-byte cell stride,
//! then progressively narrowing the search around the best candidates.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{Confidence, FontAddresses, FontTable, LOOKUP_TABLE_ADDR};
use crate::{
    error::Error,
    image::{is_uniform, FirmwareImage, FONT_PARTITION},
};

/// Header offset of the two config words encoding the SMALL table base.
const SMALL_BASE_CONFIG: usize = 0x78;

/// Footer values that terminate a streak unconditionally.
const INVALID_FOOTERS: [u8; 2] = [0x00, 0xFF];

/// Tuning knobs for the LARGE base search. The defaults are empirical
/// values from known HiFiEC builds; the footer set in particular is a
/// likelihood model, not a format law.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Byte values accepted as cell footer signatures.
    pub footer_signatures: Vec<u8>,
    /// Scoring window size, in 33-byte cells.
    pub window_cells: usize,
    /// Refinement stops once the window step drops to this many bytes.
    pub min_stride: usize,
    /// How many consecutive unrecognized footers a streak survives.
    pub max_anomalies: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        LocatorConfig {
            footer_signatures: vec![0x90, 0x8F, 0x89, 0x8B, 0x8D, 0x8E, 0x8C],
            window_cells: 20902,
            min_stride: 100,
            max_anomalies: 5,
        }
    }
}

/// Scans a firmware image for the font tables.
#[derive(Debug)]
pub struct FontLocator<'a> {
    firmware: &'a FirmwareImage,
    config: LocatorConfig,
}

/// Longest footer streak found in one window, and where it starts.
#[derive(Debug, Clone, Copy)]
struct WindowScore {
    score: usize,
    first_addr: usize,
}

impl<'a> FontLocator<'a> {
    pub fn new(firmware: &'a FirmwareImage) -> Self {
        FontLocator {
            firmware,
            config: LocatorConfig::default(),
        }
    }

    pub fn with_config(firmware: &'a FirmwareImage, config: LocatorConfig) -> Self {
        FontLocator { firmware, config }
    }

    /// Recovers both table bases and the validation report.
    ///
    /// The returned addresses may still be low-confidence; callers decide
    /// whether to abort via [`Confidence::is_acceptable`].
    pub fn detect(&self) -> Result<FontAddresses, Error> {
        let small_base = self.detect_small_base()?;
        info!("SMALL base from config words: {small_base:#08x}");

        let Some(large_base) = self.search_large_base()? else {
            return Err(Error::LocatorLowConfidence {
                small: self.sample_cells(small_base as usize, FontTable::Small),
                large: 0,
            });
        };
        info!("LARGE base candidate: {large_base:#08x}");

        let large_base = large_base as u32;
        let confidence = Confidence {
            small_font_valid: self.sample_cells(small_base as usize, FontTable::Small),
            large_font_valid: self.sample_cells(large_base as usize, FontTable::Large),
            movw_0042_count: self.movw_census(),
        };
        debug!("validation: {confidence:?}");

        Ok(FontAddresses {
            small_base,
            large_base,
            lookup_table: LOOKUP_TABLE_ADDR,
            confidence,
        })
    }

    /// The SMALL base is split across two little-endian config words.
    fn detect_small_base(&self) -> Result<u32, Error> {
        let low = self.firmware.read_u16(SMALL_BASE_CONFIG)?;
        let high = self.firmware.read_u16(SMALL_BASE_CONFIG + 2)?;
        Ok((u32::from(high) << 16) | u32::from(low))
    }

    /// Windowed interval scoring with progressive refinement over the
    /// firmware partition. Returns the start of the best footer streak
    /// seen in any round.
    fn search_large_base(&self) -> Result<Option<usize>, Error> {
        let stride = FontTable::Large.stride();
        let partition = self.firmware.partition(FONT_PARTITION)?;
        let search = partition.range(self.firmware.len());
        debug!(
            "searching LARGE base in {:#08x}..{:#08x}",
            search.start, search.end
        );

        let window_size = self.config.window_cells * stride;
        let mut current_stride = window_size / 2;
        let mut regions = vec![search.clone()];
        let mut alignment = None;
        let mut best: Option<WindowScore> = None;
        let mut round = 0u32;

        while current_stride > self.config.min_stride && !regions.is_empty() {
            round += 1;
            let mut results = Vec::new();

            for region in &regions {
                let mut window_start = region.start;
                while window_start < region.end {
                    let window_end = (window_start + window_size).min(self.firmware.len());
                    let scored = self.score_window(window_start, window_end, alignment);
                    if best.is_none_or(|b| scored.score > b.score) {
                        best = Some(scored);
                    }
                    results.push(scored);
                    window_start += current_stride;
                }
            }

            results.sort_by(|a, b| b.score.cmp(&a.score));
            results.truncate(5);
            debug!(
                "round {round}: stride {current_stride}, best streak {}",
                results.first().map_or(0, |w| w.score)
            );

            if alignment.is_none() {
                if let Some(top) = results.first() {
                    alignment = Some(top.first_addr % stride);
                    debug!("grid alignment fixed: addr % {stride} == {}", top.first_addr % stride);
                }
            }

            // Next round rescans a band of cells around each candidate.
            let extend = (current_stride / stride + 1) * stride;
            regions = results
                .iter()
                .map(|w| {
                    let start = w.first_addr.saturating_sub(extend).max(search.start);
                    let end = (w.first_addr + extend).min(search.end);
                    start..end
                })
                .collect();

            current_stride = (current_stride / 2).max(self.config.min_stride);
        }

        Ok(best.map(|w| w.first_addr))
    }

    /// Walks `[start, end)` at the cell stride reading the footer byte of
    /// each candidate cell, and tracks the longest streak of plausible
    /// footers. A streak tolerates a few unrecognized values in a row but
    /// an erased-flash byte (0x00/0xFF) closes it immediately.
    fn score_window(&self, start: usize, end: usize, alignment: Option<usize>) -> WindowScore {
        let data = self.firmware.data();
        let stride = FontTable::Large.stride();
        let footer_offset = stride - 1;

        let mut best_len = 0usize;
        let mut best_start = start;
        let mut current_len = 0usize;
        let mut current_start = start;
        let mut anomalies = 0u32;

        let mut close = |len: &mut usize, start: usize, best_len: &mut usize, best_start: &mut usize| {
            if *len > *best_len {
                *best_len = *len;
                *best_start = start;
            }
            *len = 0;
        };

        let mut addr = start;
        while addr < end {
            if addr + footer_offset >= data.len() {
                break;
            }
            if let Some(required) = alignment {
                if addr % stride != required {
                    addr += stride;
                    continue;
                }
            }

            let footer = data[addr + footer_offset];
            if INVALID_FOOTERS.contains(&footer) {
                close(&mut current_len, current_start, &mut best_len, &mut best_start);
                anomalies = 0;
            } else if self.config.footer_signatures.contains(&footer) {
                if current_len == 0 {
                    current_start = addr;
                }
                current_len += 1;
                anomalies = 0;
            } else {
                anomalies += 1;
                if anomalies <= self.config.max_anomalies {
                    if current_len == 0 {
                        current_start = addr;
                    }
                    current_len += 1;
                } else {
                    close(&mut current_len, current_start, &mut best_len, &mut best_start);
                    anomalies = 0;
                }
            }

            addr += stride;
        }
        close(&mut current_len, current_start, &mut best_len, &mut best_start);

        WindowScore {
            score: best_len,
            first_addr: best_start,
        }
    }

    /// Counts sample cells at the head of a table that hold neither
    /// erased-flash fill nor zeroes. Probes U+0041..U+0043 for SMALL and
    /// U+4E00..U+4E02 for LARGE.
    fn sample_cells(&self, base: usize, table: FontTable) -> u8 {
        let stride = table.stride();
        let mut valid = 0;
        for index in 0..3 {
            let offset = match table {
                FontTable::Small => 0x41 + index,
                FontTable::Large => index,
            };
            let addr = base + offset * stride;
            if let Some(cell) = self.firmware.get(addr, stride) {
                if !is_uniform(cell) {
                    valid += 1;
                }
            }
        }
        valid
    }

    /// Counts `MOVW #0x0042` Thumb-2 signatures across the whole image.
    /// The glyph renderer loads the 33-byte stride with this instruction,
    /// so the count is a cheap cross-check on the firmware family.
    fn movw_census(&self) -> u32 {
        let data = self.firmware.data();
        let mut count = 0;
        for i in 0..data.len().saturating_sub(6) {
            if data[i] == 0xF2 && data[i + 1] == 0x40 && data[i + 4] == 0x42 {
                count += 1;
            }
        }
        count
    }
}
