mod args;
mod tabulate;

use clap::Parser;
use log::{info, LevelFilter};

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();

    info!("args {:?}", args);

    if let Err(e) = tabulate::run_vote(&args) {
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}
