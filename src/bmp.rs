//! BMP byte-stream writers
//!
//! Two flavors are produced: 16-bpp BI_BITFIELDS images for RGB565 color
//! resources, and 1-bpp paletted images for font glyphs. Both writers
//! assemble the complete file in memory and are total over well-formed
//! input; the only error path is a non-positive dimension.

use bytemuck::{bytes_of, Pod, Zeroable};

use crate::{
    error::Error,
    font::{PixelGrid, GLYPH_HEIGHT, GLYPH_WIDTH},
};

/// Length of the color header: file header + BITMAPINFOHEADER + 3 masks.
pub const RGB565_HEADER_LEN: usize = 14 + 40 + 12;
/// Length of the glyph header: file header + BITMAPINFOHEADER + 2 palette
/// entries.
pub const MONO_HEADER_LEN: usize = 14 + 40 + 8;

/// RGB565 channel masks, red/green/blue order.
const BITFIELD_MASKS: [u32; 3] = [0xF800, 0x07E0, 0x001F];

const BI_BITFIELDS: u32 = 3;
/// 72 DPI expressed in pixels per meter.
const PPM_72DPI: i32 = 2835;

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C, packed)]
struct FileHeader {
    magic: [u8; 2],
    file_size: u32,
    reserved: u32,
    pixel_offset: u32,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C, packed)]
struct InfoHeader {
    header_size: u32,
    width: i32,
    height: i32,
    planes: u16,
    bit_count: u16,
    compression: u32,
    image_size: u32,
    x_ppm: i32,
    y_ppm: i32,
    colors_used: u32,
    colors_important: u32,
}

/// Row stride bookkeeping for a 16-bpp image: `(source, padded, padding)`
/// byte counts, where the padded stride is the source stride rounded up to
/// a 4-byte boundary.
pub fn stride_info(width: usize) -> (usize, usize, usize) {
    let src = width * 2;
    let dst = (src + 3) & !3;
    (src, dst, dst - src)
}

/// Swaps each 2-byte pair in `data`. RGB565 pixels are stored in the
/// firmware with their bytes reversed relative to what BMP readers expect.
/// A trailing odd byte is copied through unchanged.
pub fn swap_byte_pairs(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut chunks = data.chunks_exact(2);
    for pair in &mut chunks {
        out.push(pair[1]);
        out.push(pair[0]);
    }
    out.extend_from_slice(chunks.remainder());
    out
}

/// Builds the 66-byte header of a 16-bpp BI_BITFIELDS image. The height is
/// written negated: rows follow in top-down order.
pub fn rgb565_header(width: i32, height: i32) -> Vec<u8> {
    let (_, dst, _) = stride_info(width as usize);
    let image_size = (dst * height as usize) as u32;

    let file = FileHeader {
        magic: *b"BM",
        file_size: RGB565_HEADER_LEN as u32 + image_size,
        reserved: 0,
        pixel_offset: RGB565_HEADER_LEN as u32,
    };
    let info = InfoHeader {
        header_size: 40,
        width,
        height: -height,
        planes: 1,
        bit_count: 16,
        compression: BI_BITFIELDS,
        image_size,
        x_ppm: PPM_72DPI,
        y_ppm: PPM_72DPI,
        colors_used: 0,
        colors_important: 0,
    };

    let mut header = Vec::with_capacity(RGB565_HEADER_LEN);
    header.extend_from_slice(bytes_of(&file));
    header.extend_from_slice(bytes_of(&info));
    for mask in BITFIELD_MASKS {
        header.extend_from_slice(&mask.to_le_bytes());
    }
    header
}

/// Transcodes raw RGB565 pixel data into a complete BMP byte stream.
///
/// `raw` holds `width * height` 2-byte pixels; short input is zero-padded
/// and excess bytes are ignored.
pub fn rgb565_to_bmp(raw: &[u8], width: i32, height: i32) -> Result<Vec<u8>, Error> {
    if width <= 0 || height <= 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    let pixel_bytes = width as usize * height as usize * 2;
    let mut pixels = raw[..raw.len().min(pixel_bytes)].to_vec();
    pixels.resize(pixel_bytes, 0);
    let pixels = swap_byte_pairs(&pixels);

    let (src, dst, padding) = stride_info(width as usize);
    let mut out = rgb565_header(width, height);
    out.reserve(dst * height as usize);
    for row in pixels.chunks_exact(src) {
        out.extend_from_slice(row);
        out.extend(std::iter::repeat(0u8).take(padding));
    }
    Ok(out)
}

/// Writes a glyph as a 1-bpp two-color BMP: white background, black ink,
/// rows bottom-up, bits MSB-first with zero fill in the final byte of each
/// row.
pub fn monochrome_bmp(grid: &PixelGrid) -> Vec<u8> {
    let row_bytes = GLYPH_WIDTH.div_ceil(32) * 4;
    let image_size = (row_bytes * GLYPH_HEIGHT) as u32;

    let file = FileHeader {
        magic: *b"BM",
        file_size: MONO_HEADER_LEN as u32 + image_size,
        reserved: 0,
        pixel_offset: MONO_HEADER_LEN as u32,
    };
    let info = InfoHeader {
        header_size: 40,
        width: GLYPH_WIDTH as i32,
        height: GLYPH_HEIGHT as i32,
        planes: 1,
        bit_count: 1,
        compression: 0,
        image_size,
        x_ppm: PPM_72DPI,
        y_ppm: PPM_72DPI,
        colors_used: 2,
        colors_important: 2,
    };

    let mut out = Vec::with_capacity(MONO_HEADER_LEN + image_size as usize);
    out.extend_from_slice(bytes_of(&file));
    out.extend_from_slice(bytes_of(&info));
    // BGRA palette: index 0 is white, index 1 is black.
    out.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0x00]);
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    for y in (0..GLYPH_HEIGHT).rev() {
        let mut current = 0u8;
        let mut bits = 0;
        let mut written = 0;
        for x in 0..GLYPH_WIDTH {
            current = (current << 1) | u8::from(grid.pixel(x, y));
            bits += 1;
            if bits == 8 {
                out.push(current);
                written += 1;
                current = 0;
                bits = 0;
            }
        }
        if bits > 0 {
            out.push(current << (8 - bits));
            written += 1;
        }
        out.extend(std::iter::repeat(0u8).take(row_bytes - written));
    }
    out
}
