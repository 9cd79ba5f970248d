use std::process::ExitCode;
use clap::Parser;
use log::{error, info};
use peripheral_scout::app::args::Args;
use peripheral_scout::{init_logging, run};

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = init_logging(args.verbose) {
        eprintln!("Failed to initialize logging: {}", err);
        return ExitCode::FAILURE;
    }
    info!(concat!("Peripheral Scout ", env!("CARGO_PKG_VERSION")));

    match run(args) {
        Err(err) => {
            error!("Unexpected error: {}", err);
            ExitCode::FAILURE
        },
        Ok(_) => ExitCode::SUCCESS,
    }
}
