//! Inject edited page images back into a scanned PDF.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use console::style;

use pdfscan_cli::commands::inject::{self, InjectArgs};
use pdfscan_cli::effects;

/// Replace page images of a PDF with files named `<name> p<NNN>.<ext>`
///
/// The page number is taken from the file name. Each replacement is resized
/// to the original image size, the document is saved incrementally and the
/// used files are moved to the trash.
#[derive(Parser)]
#[command(name = "pdfscan-inject")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    args: InjectArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    pdfscan_cli::init_logging(cli.verbose)?;
    let config = pdfscan_cli::load_config(cli.config.as_deref())?;

    let mut effects = effects::for_run(cli.args.dry);
    inject::run(&cli.args, &config, effects.as_mut())?;
    Ok(())
}
