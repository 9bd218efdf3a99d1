use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use log::debug;

use sha256_report::logging;
use sha256_report::report::write_table_report;

#[derive(Parser, Debug)]
#[command(name = "sha256-to-table")]
#[command(about = "Create a nice table report from calculated SHA256 checksums")]
struct Cli {
    /// Original SHA256 report
    #[arg(long)]
    sha256report: PathBuf,

    /// Table report destination
    report: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    debug!("Command line arguments: {:?}", cli);

    let status = write_table_report(&cli.sha256report, &cli.report)?;
    println!("{}", status.green());
    Ok(())
}
