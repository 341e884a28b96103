use clap::{Parser, Subcommand};
use log::LevelFilter;
use pitc::cmd::{rate::RateCommand, report::ReportCommand};

#[derive(Parser, Debug)]
#[command(name = "pitc", version, about)]
struct Cli {
    /// Log matching steps and rate lookups
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print tax report tables for broker exports
    Report(ReportCommand),
    /// Print the exchange rate applied to a transaction date
    Rate(RateCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Rate(rate) => rate.exec(),
    }
}

/// Warnings are shown by default; `RUST_LOG` overrides the filter.
fn init_logger(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}
