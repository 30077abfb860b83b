//! CLI utilities for the hifirip binary
//!
//! No stability guaranties apply

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::Args;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result, WrapErr};

use crate::{
    extract::{
        DirectorySink, ExtractConfig, Extractor, FirmwareReport, GlyphStats, ProgressCallbacks,
        ResourceStats,
    },
    font::{FontAddresses, FontLocator},
    image::FirmwareImage,
    ranges::{default_ranges, UnicodeRange},
    resource::{ResourceTables, ShiftDecision, ShiftSource},
};

#[derive(Debug, Args)]
pub struct ImageArgs {
    /// Firmware image (HIFIEC*.IMG) to analyze
    pub firmware: PathBuf,

    /// TOML file overriding locator tuning and glyph filters
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Directory that receives the extracted assets
    #[arg(short = 'o', long, default_value = "extracted")]
    pub out: PathBuf,

    /// Subdirectory name for this firmware; defaults to the name of the
    /// directory containing the image
    #[arg(long)]
    pub version_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct RangeArgs {
    /// Unicode range to extract, as name:start_hex:end_hex. May be given
    /// multiple times; defaults to the full script catalogue
    #[arg(long = "range", value_name = "RANGE")]
    pub ranges: Vec<UnicodeRange>,
}

impl RangeArgs {
    fn resolve(self) -> Vec<UnicodeRange> {
        if self.ranges.is_empty() {
            default_ranges()
        } else {
            self.ranges
        }
    }
}

/// Detects all tables and prints the confidence report without extracting
/// anything. Exits non-zero when the addresses cannot be trusted.
pub fn scan_info(image: ImageArgs) -> Result<()> {
    let (firmware, config) = load_image(&image)?;

    let locator = FontLocator::with_config(&firmware, config.locator);
    let addresses = locator.detect()?;
    print_addresses(&addresses);

    let tables = ResourceTables::locate(&firmware)?;
    let shift = tables.detect_shift();
    println!(
        "Resource tables: {} ROCK26 entries, {} metadata entries, {}",
        tables.rock26_offsets.len(),
        tables.metadata.len(),
        describe_shift(&shift),
    );

    addresses.confidence.ensure_acceptable()?;
    Ok(())
}

/// Full pipeline: glyphs plus color resources.
pub fn extract(image: ImageArgs, output: OutputArgs, ranges: RangeArgs) -> Result<()> {
    let (firmware, config) = load_image(&image)?;
    let version = version_name(&image, &output);
    let mut sink = DirectorySink::new(output.out.join(&version));
    let mut progress = CliProgress::default();

    let report = crate::extract::run(
        &firmware,
        &config,
        &ranges.resolve(),
        &mut sink,
        &mut progress,
    )?;

    print_addresses(&report.addresses);
    print_report(&version, &report);
    Ok(())
}

/// Glyph extraction only.
pub fn fonts(image: ImageArgs, output: OutputArgs, ranges: RangeArgs) -> Result<()> {
    let (firmware, config) = load_image(&image)?;
    let version = version_name(&image, &output);

    let locator = FontLocator::with_config(&firmware, config.locator);
    let addresses = locator.detect()?;
    print_addresses(&addresses);
    addresses.confidence.ensure_acceptable()?;

    let mut sink = DirectorySink::new(output.out.join(&version));
    let mut progress = CliProgress::default();
    let extractor = Extractor::with_filter(&firmware, config.filter);
    let stats = extractor.extract_glyphs(&addresses, &ranges.resolve(), &mut sink, &mut progress)?;

    print_summary(&version, Some(&stats), None);
    Ok(())
}

/// Color resource extraction only.
pub fn resources(image: ImageArgs, output: OutputArgs) -> Result<()> {
    let (firmware, config) = load_image(&image)?;
    let version = version_name(&image, &output);

    let tables = ResourceTables::locate(&firmware)?;
    let shift = tables.detect_shift();
    println!("{}", describe_shift(&shift));

    let mut sink = DirectorySink::new(output.out.join(&version));
    let mut progress = CliProgress::default();
    let extractor = Extractor::with_filter(&firmware, config.filter);
    let stats = extractor.extract_resources(&tables, &shift, &mut sink, &mut progress)?;

    print_summary(&version, None, Some(&stats));
    Ok(())
}

fn load_image(args: &ImageArgs) -> Result<(FirmwareImage, ExtractConfig)> {
    let firmware = FirmwareImage::from_file(&args.firmware)
        .wrap_err_with(|| format!("Failed to read firmware image {}", args.firmware.display()))?;
    println!(
        "Firmware: {} ({} bytes)",
        args.firmware.display(),
        firmware.len()
    );

    let config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&raw)
                .into_diagnostic()
                .wrap_err("Failed to parse config file")?
        }
        None => ExtractConfig::default(),
    };
    Ok((firmware, config))
}

/// The output subdirectory for one firmware. Firmware collections keep one
/// image per version directory, so the parent directory name is the best
/// default label.
fn version_name(image: &ImageArgs, output: &OutputArgs) -> String {
    if let Some(name) = &output.version_name {
        return name.clone();
    }
    image
        .firmware
        .parent()
        .and_then(Path::file_name)
        .or_else(|| image.firmware.file_stem())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "firmware".to_string())
}

fn print_addresses(addresses: &FontAddresses) {
    let confidence = &addresses.confidence;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Table", "Address", "Validation"]);
    table.add_row(vec![
        "SMALL".to_string(),
        format!("{:#08x}", addresses.small_base),
        format!("{}/3 sample cells", confidence.small_font_valid),
    ]);
    table.add_row(vec![
        "LARGE".to_string(),
        format!("{:#08x}", addresses.large_base),
        format!("{}/3 sample cells", confidence.large_font_valid),
    ]);
    table.add_row(vec![
        "LOOKUP".to_string(),
        format!("{:#08x}", addresses.lookup_table),
        format!("MOVW #0x0042 x{} (expect ~12)", confidence.movw_0042_count),
    ]);
    println!("{table}");
}

fn print_report(version: &str, report: &FirmwareReport) {
    println!("{}", describe_shift(&report.shift));
    print_summary(version, Some(&report.glyphs), Some(&report.resources));
}

fn print_summary(version: &str, glyphs: Option<&GlyphStats>, resources: Option<&ResourceStats>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Asset", "Emitted", "Skipped"]);
    if let Some(glyphs) = glyphs {
        table.add_row(vec![
            "SMALL glyphs".to_string(),
            glyphs.small_emitted.to_string(),
            String::new(),
        ]);
        table.add_row(vec![
            "LARGE glyphs".to_string(),
            glyphs.large_emitted.to_string(),
            glyphs.rejected.to_string(),
        ]);
    }
    if let Some(resources) = resources {
        table.add_row(vec![
            "Color resources".to_string(),
            resources.emitted.to_string(),
            resources.skipped.to_string(),
        ]);
    }
    println!("Extraction summary for {version}:");
    println!("{table}");
}

fn describe_shift(shift: &ShiftDecision) -> String {
    let source = match shift.source {
        ShiftSource::Voted => format!("voted {:?}", shift.votes),
        ShiftSource::AnchorFallback => "anchor fallback".to_string(),
        ShiftSource::Default => "no match, assuming aligned".to_string(),
    };
    format!(
        "Metadata shift {:+} ({source}), first valid index {}",
        shift.shift, shift.first_valid_index
    )
}

/// Progress callbacks rendered as an indicatif bar.
#[derive(Debug, Default)]
pub struct CliProgress {
    bar: Option<ProgressBar>,
}

impl ProgressCallbacks for CliProgress {
    fn init(&mut self, phase: &str, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        bar.set_message(phase.to_string());
        self.bar = Some(bar);
    }

    fn update(&mut self, current: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(current as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
