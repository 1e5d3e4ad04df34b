use anyhow::Result;
use clap::Parser;
use stamp_gate::cli;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        error!("{:#}", err);
        eprintln!("stamp-gate: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
