pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "woundrx",
    about = "Woundrx operator CLI",
    long_about = "Operate the wound care recommendation engine: migrations, demo data, config inspection, readiness checks and one-off recommendations.",
    after_help = "Examples:\n  woundrx doctor --json\n  woundrx seed\n  woundrx recommend --context request.json --role provider --pricing"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demonstration wound product catalog and recommendation rules")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, AI endpoint readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Generate recommendations for a context JSON file")]
    Recommend {
        #[arg(long, value_name = "FILE", help = "Path to a recommendation context JSON file")]
        context: PathBuf,
        #[arg(long, help = "Caller role used for pricing visibility")]
        role: Option<String>,
        #[arg(long, help = "Request pricing (only shown for pricing-enabled roles)")]
        pricing: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Recommend { context, role, pricing } => {
            commands::recommend::run(commands::recommend::RecommendArgs {
                context_path: context,
                role,
                show_pricing: pricing,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
