mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::amortize::AmortizeArgs;
use commands::basis::BasisArgs;
use commands::sensitivity::SensitivityArgs;
use commands::valuation::ValuationArgs;

/// Acquisition valuation and deal-structuring calculations
#[derive(Parser)]
#[command(
    name = "dval",
    version,
    about = "Acquisition valuation and deal-structuring calculations",
    long_about = "A CLI for valuing small-business acquisitions with decimal precision. \
                  Projects cash flow under bank and seller-note financing, values the \
                  exit (MOIC, IRR) and sweeps any two assumptions into a sensitivity grid."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log calculation detail to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Value an acquisition: debt service, projection, exit returns
    Valuation(ValuationArgs),
    /// Two-way sensitivity grid over any pair of inputs
    Sensitivity(SensitivityArgs),
    /// Level-payment amortization schedule for a single loan
    Amortize(AmortizeArgs),
    /// Resolve a purchase price from listing figures and map to inputs
    Basis(BasisArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose {
        "deal_valuation_core=debug,deal_valuation_cli=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so --output stays machine readable.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Valuation(args) => commands::valuation::run_valuation(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Amortize(args) => commands::amortize::run_amortize(args),
        Commands::Basis(args) => commands::basis::run_basis(args),
        Commands::Version => {
            println!("dval {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
