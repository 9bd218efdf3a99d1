use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use log::debug;

use sha256_report::collector::{collect, CollectOptions};
use sha256_report::logging;

#[derive(Parser, Debug)]
#[command(name = "remote-sha256")]
#[command(about = "Calculate the checksum of remote files to make sure they are not tampered")]
struct Cli {
    /// SSH retry override
    #[arg(long, default_value_t = 10)]
    retries: u32,

    /// Name of the remote server with the files
    #[arg(long)]
    server: String,

    /// Remote path with files that will get their sha256 calculated
    #[arg(long)]
    remotepath: String,

    /// Report destination
    report: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    debug!("Command line arguments: {:?}", cli);

    let options = CollectOptions {
        server: cli.server,
        remote_path: cli.remotepath,
        report: cli.report,
        retries: cli.retries,
    };
    let status = collect(&options)?;
    println!("{}", status.green());
    Ok(())
}
