use clap::{Args, Parser, Subcommand};
use hifirip::{
    cli::{self, ImageArgs, OutputArgs, RangeArgs},
    logging::initialize_logger,
};
use log::{debug, LevelFilter};
use miette::Result;

#[derive(Debug, Parser)]
#[clap(about, version, propagate_version = true)]
struct Cli {
    #[clap(subcommand)]
    subcommand: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect the font and resource tables and report confidence without
    /// extracting anything
    ScanInfo(ScanInfoArgs),
    /// Extract font glyphs and color resources
    Extract(ExtractArgs),
    /// Extract font glyphs only
    Fonts(ExtractArgs),
    /// Extract color resources only
    Resources(ResourcesArgs),
}

#[derive(Debug, Args)]
struct ScanInfoArgs {
    #[clap(flatten)]
    image: ImageArgs,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    #[clap(flatten)]
    image: ImageArgs,
    #[clap(flatten)]
    output: OutputArgs,
    #[clap(flatten)]
    ranges: RangeArgs,
}

#[derive(Debug, Args)]
struct ResourcesArgs {
    #[clap(flatten)]
    image: ImageArgs,
    #[clap(flatten)]
    output: OutputArgs,
}

fn main() -> Result<()> {
    miette::set_panic_hook();
    initialize_logger(LevelFilter::Info);

    // Attempt to parse any provided comand-line arguments, or print the help
    // message and terminate if the invocation is not correct.
    let args = Cli::parse().subcommand;
    debug!("{:#?}", args);

    // Execute the correct action based on the provided subcommand and its
    // associated arguments.
    match args {
        Commands::ScanInfo(args) => cli::scan_info(args.image),
        Commands::Extract(args) => cli::extract(args.image, args.output, args.ranges),
        Commands::Fonts(args) => cli::fonts(args.image, args.output, args.ranges),
        Commands::Resources(args) => cli::resources(args.image, args.output),
    }
}
