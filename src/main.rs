use anyhow::Context;
use clap::Parser;
use flo2d_processor::cli::{Args, setup_logging};
use flo2d_processor::processor::Flo2dProcessor;
use std::process;

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    if let Err(error) = run(&args) {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = args.to_config().context("Invalid arguments")?;
    Flo2dProcessor::new(config)
        .with_progress(!args.quiet)
        .process()
        .context("FLO-2D processing failed")?;
    Ok(())
}
