//! End-to-end extraction against a synthesized firmware image.

use std::path::PathBuf;

use hifirip::{
    error::Error,
    extract::{self, ExtractConfig, MemorySink, NoProgress},
    image::FirmwareImage,
    ranges::UnicodeRange,
};

const IMAGE_LEN: usize = 0xA_0000;
const SMALL_BASE: usize = 0x8_4000;
const FONT_PARTITION_OFFSET: usize = 0x9_0000;
const LARGE_BASE: usize = FONT_PARTITION_OFFSET + 10 * 33;
const PART5_OFFSET: usize = 0x1_0000;

/// Builds a firmware image with:
/// - SMALL cells for U+0041..U+0043 and a LARGE table of 300 cells,
/// - a resource partition whose metadata table is shifted by +1 against
///   the ROCK26 offsets.
fn build_firmware() -> Vec<u8> {
    let mut data = vec![0u8; IMAGE_LEN];

    // SMALL base config words: 0x0008_4000.
    data[0x78..0x7C].copy_from_slice(&[0x00, 0x40, 0x08, 0x00]);
    // Font partition.
    data[0x80..0x84].copy_from_slice(&(FONT_PARTITION_OFFSET as u32).to_le_bytes());
    data[0x84..0x88].copy_from_slice(&0x1_0000u32.to_le_bytes());
    // Resource partition.
    data[0x14C..0x150].copy_from_slice(&(PART5_OFFSET as u32).to_le_bytes());
    data[0x150..0x154].copy_from_slice(&0x8000u32.to_le_bytes());

    // SMALL glyphs for A, B, C.
    for codepoint in 0x41..=0x43 {
        let cell = SMALL_BASE + codepoint * 32;
        data[cell..cell + 32].fill(0x3C);
    }

    // LARGE table: 300 cells of pixel data with valid footers.
    for index in 0..300 {
        let cell = LARGE_BASE + index * 33;
        data[cell..cell + 32].fill(0x3C);
        data[cell + 32] = 0x90;
    }

    // Metadata table at part5+0x100, one entry ahead of ROCK26.
    let entries: [(u32, u32, u32, &str); 3] = [
        (0x0000, 8, 2, "PAD.BMP"),
        (0x5000, 4, 2, "MENU.BMP"),
        (0x5100, 4, 2, "ICON.BMP"),
    ];
    for (index, (offset, width, height, name)) in entries.iter().enumerate() {
        let base = PART5_OFFSET + 0x100 + index * 108;
        data[base + 20..base + 24].copy_from_slice(&offset.to_le_bytes());
        data[base + 24..base + 28].copy_from_slice(&width.to_le_bytes());
        data[base + 28..base + 32].copy_from_slice(&height.to_le_bytes());
        data[base + 32..base + 32 + name.len()].copy_from_slice(name.as_bytes());
    }

    // ROCK26 table at part5+0x4000.
    let rock = PART5_OFFSET + 0x4000;
    data[rock..rock + 14].copy_from_slice(b"ROCK26IMAGERES");
    data[rock + 16..rock + 20].copy_from_slice(&2u32.to_le_bytes());
    for (index, offset) in [0x5000u32, 0x5100].iter().enumerate() {
        let base = rock + 32 + index * 16 + 12;
        data[base..base + 4].copy_from_slice(&offset.to_le_bytes());
    }

    // Pixels for the one extractable resource (offset 0x5100, 4x2).
    for i in 0..16 {
        data[PART5_OFFSET + 0x5100 + i] = i as u8;
    }

    data
}

fn test_ranges() -> Vec<UnicodeRange> {
    vec![
        UnicodeRange::new("Latin", 0x41, 0x43),
        UnicodeRange::new("CJK", 0x4E00, 0x4E02),
    ]
}

#[test]
fn full_pipeline_recovers_all_planted_assets() {
    let firmware = FirmwareImage::new(build_firmware());
    let mut sink = MemorySink::default();

    let report = extract::run(
        &firmware,
        &ExtractConfig::default(),
        &test_ranges(),
        &mut sink,
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(report.addresses.small_base, SMALL_BASE as u32);
    assert_eq!(report.addresses.large_base, LARGE_BASE as u32);
    assert_eq!(report.addresses.lookup_table, 0x8_0000);
    assert!(report.addresses.confidence.is_acceptable());

    assert_eq!(report.shift.shift, 1);
    assert_eq!(report.shift.first_valid_index, 1);

    assert_eq!(report.glyphs.small_emitted, 3);
    assert_eq!(report.glyphs.large_emitted, 3);
    assert_eq!(report.resources.emitted, 1);

    // 3 + 3 glyphs plus one color resource.
    assert_eq!(sink.artifacts.len(), 7);

    let small_a = SMALL_BASE + 0x41 * 32;
    let glyph_path = PathBuf::from("SMALL")
        .join("U+0041-0043_Latin")
        .join(format!("0x{small_a:06X}_H00_U+0041.bmp"));
    let glyph = sink
        .artifacts
        .iter()
        .find(|(path, _)| path == &glyph_path)
        .map(|(_, bytes)| bytes)
        .expect("SMALL glyph for U+0041 missing");
    assert_eq!(glyph.len(), 126);
    assert_eq!(&glyph[..2], b"BM");
    // Every decoded row of the 0x3C pattern packs to 3C 3C 00 00.
    assert_eq!(&glyph[62..66], &[0x3C, 0x3C, 0x00, 0x00]);

    let resource = sink
        .artifacts
        .iter()
        .find(|(path, _)| path == &PathBuf::from("MENU.BMP"))
        .map(|(_, bytes)| bytes)
        .expect("MENU.BMP missing");
    // 66-byte header plus two 8-byte rows for a 4x2 image.
    assert_eq!(resource.len(), 82);
    // First row carries the shifted entry's pixels, byte-pair swapped.
    assert_eq!(&resource[66..74], &[1, 0, 3, 2, 5, 4, 7, 6]);

    let large_first = PathBuf::from("LARGE")
        .join("U+4E00-4E02_CJK")
        .join(format!("0x{LARGE_BASE:06X}_H00_U+4E00.bmp"));
    assert!(sink.artifacts.iter().any(|(path, _)| path == &large_first));
}

#[test]
fn rerunning_the_pipeline_is_deterministic() {
    let firmware = FirmwareImage::new(build_firmware());

    let mut first = MemorySink::default();
    let mut second = MemorySink::default();
    let config = ExtractConfig::default();
    let ranges = test_ranges();

    extract::run(&firmware, &config, &ranges, &mut first, &mut NoProgress).unwrap();
    extract::run(&firmware, &config, &ranges, &mut second, &mut NoProgress).unwrap();

    assert_eq!(first.artifacts, second.artifacts);
}

#[test]
fn gutted_font_tables_abort_with_low_confidence() {
    let mut data = build_firmware();
    // Blank out the SMALL sample cells.
    for codepoint in 0x41..=0x43 {
        let cell = SMALL_BASE + codepoint * 32;
        data[cell..cell + 32].fill(0x00);
    }
    let firmware = FirmwareImage::new(data);
    let mut sink = MemorySink::default();

    let result = extract::run(
        &firmware,
        &ExtractConfig::default(),
        &test_ranges(),
        &mut sink,
        &mut NoProgress,
    );

    assert!(matches!(
        result,
        Err(Error::LocatorLowConfidence { small: 0, large: 3 })
    ));
    assert!(sink.artifacts.is_empty());
}

#[test]
fn directory_sink_materializes_the_layout() {
    use hifirip::extract::{ArtifactSink, DirectorySink};

    let firmware = FirmwareImage::new(build_firmware());
    let out = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(out.path().join("V1.0"));

    extract::run(
        &firmware,
        &ExtractConfig::default(),
        &test_ranges(),
        &mut sink,
        &mut NoProgress,
    )
    .unwrap();

    let small_a = SMALL_BASE + 0x41 * 32;
    let glyph = out
        .path()
        .join("V1.0/SMALL/U+0041-0043_Latin")
        .join(format!("0x{small_a:06X}_H00_U+0041.bmp"));
    assert!(glyph.is_file());
    assert_eq!(std::fs::read(&glyph).unwrap().len(), 126);
    assert!(out.path().join("V1.0/MENU.BMP").is_file());

    // Sinks are reusable after a pass.
    sink.emit(std::path::Path::new("extra.bin"), &[1, 2, 3]).unwrap();
    assert!(out.path().join("V1.0/extra.bin").is_file());
}

mod cli {
    use assert_cmd::Command;

    use super::build_firmware;

    fn write_firmware(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("HIFIEC10.IMG");
        std::fs::write(&path, build_firmware()).unwrap();
        path
    }

    #[test]
    fn scan_info_reports_detected_addresses() {
        let dir = tempfile::tempdir().unwrap();
        let firmware = write_firmware(dir.path());

        let mut cmd = Command::cargo_bin("hifirip").unwrap();
        let assert = cmd.arg("scan-info").arg(&firmware).assert().success();

        let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
        assert!(stdout.contains("SMALL"));
        assert!(stdout.contains("0x084000"));
        assert!(stdout.contains("0x09014a"));
        assert!(stdout.contains("shift +1"));
    }

    #[test]
    fn extract_writes_versioned_tree() {
        let dir = tempfile::tempdir().unwrap();
        let firmware = write_firmware(dir.path());
        let out = dir.path().join("out");

        let mut cmd = Command::cargo_bin("hifirip").unwrap();
        cmd.arg("extract")
            .arg(&firmware)
            .arg("-o")
            .arg(&out)
            .arg("--version-name")
            .arg("V3.1.0")
            .arg("--range")
            .arg("Latin:0x41:0x43")
            .arg("--range")
            .arg("CJK:0x4E00:0x4E02")
            .assert()
            .success();

        assert!(out.join("V3.1.0/MENU.BMP").is_file());
        let latin_dir = out.join("V3.1.0/SMALL/U+0041-0043_Latin");
        assert_eq!(std::fs::read_dir(&latin_dir).unwrap().count(), 3);
    }
}
