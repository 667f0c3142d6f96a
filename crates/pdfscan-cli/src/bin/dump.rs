//! Extract the page images of a scanned PDF.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use console::style;

use pdfscan_cli::commands::dump::{self, DumpArgs};
use pdfscan_cli::effects;

/// Write every page image of a PDF next to it as `<name> p<NNN>.<ext>`
#[derive(Parser)]
#[command(name = "pdfscan-dump")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    args: DumpArgs,
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
    dump::run(&cli.args, &config, effects.as_mut())?;
    Ok(())
}
