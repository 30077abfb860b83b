//! V8 glyph cell decoder
//!
//! Every cell holds 16 little-endian words, one per pixel row. The lookup
//! byte selects between a word-wise read path and a byte-cycle path with
//! two swap stages; the firmware's blitter consumes the same flags, so the
//! branch structure below mirrors the hardware contract rather than any
//! simplified equivalent. Decoding is total: any 32-byte cell yields a
//! well-formed grid.

use super::{PixelGrid, CELL_BYTES, GLYPH_HEIGHT};

/// Lookup-byte flag: read each row as one 16-bit word.
const FLAG_BITS: u8 = 1 << 3;
/// Lookup-byte flag: swap the two bus half-cycles.
const FLAG_HW_SWAP: u8 = 1 << 4;
/// Lookup-byte flag: swap bytes within the row word.
const FLAG_BYTE_SWAP: u8 = 1 << 5;

/// Decodes one font cell under the given lookup configuration byte.
pub fn decode(cell: &[u8; CELL_BYTES], lookup: u8) -> PixelGrid {
    let bits = lookup & FLAG_BITS != 0;
    let hw_swap = lookup & FLAG_HW_SWAP != 0;
    let byte_swap = lookup & FLAG_BYTE_SWAP != 0;

    let mut rows = [0u16; GLYPH_HEIGHT];
    for (row, pair) in rows.iter_mut().zip(cell.chunks_exact(2)) {
        let (b0, b1) = (pair[0], pair[1]);

        let mut word = if bits {
            let mut val = u16::from_le_bytes([b0, b1]);
            if byte_swap {
                val = val.swap_bytes();
            }
            val
        } else {
            let (mut cycle1, mut cycle2) = if hw_swap == byte_swap { (b1, b0) } else { (b0, b1) };
            if byte_swap {
                std::mem::swap(&mut cycle1, &mut cycle2);
            }
            if hw_swap {
                std::mem::swap(&mut cycle1, &mut cycle2);
            }
            u16::from(cycle2) | (u16::from(cycle1) << 8)
        };

        // The word path with byte_swap already produced display order;
        // every other combination still needs the final swap.
        if !(bits && byte_swap) {
            word = word.swap_bytes();
        }

        *row = word;
    }

    PixelGrid::from_rows(rows)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::font::GLYPH_WIDTH;

    fn counting_cell() -> [u8; CELL_BYTES] {
        std::array::from_fn(|i| i as u8)
    }

    #[test]
    fn always_16_rows_of_15_pixels() {
        // Odd b1 bytes set bit 0 of every decoded word, so the dead bit is
        // live in the data and must be dropped from pixel space.
        let cell: [u8; CELL_BYTES] = std::array::from_fn(|i| (i as u8) | 1);
        for lookup in [0x00, 0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38, 0xFF] {
            let grid = decode(&cell, lookup);
            for y in 0..GLYPH_HEIGHT {
                // Under every swap mode the two stages cancel into display
                // order: b0 in the high byte, b1 in the low byte.
                let (b0, b1) = (cell[2 * y] as u16, cell[2 * y + 1] as u16);
                let word = (b0 << 8) | b1;
                assert_eq!(grid.row_word(y), word, "lookup {lookup:#04x}, row {y}");

                // Exactly 15 pixels per row: every set bit surfaces except
                // bit 0.
                let set: u32 = (0..GLYPH_WIDTH).map(|x| u32::from(grid.pixel(x, y))).sum();
                assert_eq!(set, word.count_ones() - 1, "lookup {lookup:#04x}, row {y}");
            }
        }
    }

    #[test]
    fn counting_cell_reference_vector() {
        // With all flags clear, row i decodes to (b0 << 8) | b1.
        let grid = decode(&counting_cell(), 0x00);
        for y in 0..GLYPH_HEIGHT {
            let (b0, b1) = (2 * y as u16, 2 * y as u16 + 1);
            assert_eq!(grid.row_word(y), (b0 << 8) | b1);
        }
    }

    #[test]
    fn word_path_matches_cycle_path_on_reference_cell() {
        // The cell used for the shipped reference vectors decodes
        // identically under lookup 0x00 and 0x08.
        let cell = counting_cell();
        assert_eq!(decode(&cell, 0x00), decode(&cell, 0x08));
    }

    #[test]
    fn word_path_is_byte_swap_stable() {
        // With the word-read flag set, the byte-swap flag cancels out: the
        // inner swap and the skipped display swap are the same operation.
        let cell: [u8; CELL_BYTES] = std::array::from_fn(|i| (i as u8).wrapping_mul(37) ^ 0x5A);
        let plain = decode(&cell, FLAG_BITS);
        let swapped = decode(&cell, FLAG_BITS | FLAG_BYTE_SWAP);
        assert_eq!(plain, swapped);
        for y in 0..GLYPH_HEIGHT {
            let (b0, b1) = (cell[2 * y] as u16, cell[2 * y + 1] as u16);
            assert_eq!(plain.row_word(y), (b0 << 8) | b1);
        }
    }

    #[test]
    fn unrelated_lookup_bits_are_ignored() {
        let cell = counting_cell();
        assert_eq!(decode(&cell, 0x00), decode(&cell, 0x07));
        assert_eq!(decode(&cell, 0x00), decode(&cell, 0xC0));
    }
}
