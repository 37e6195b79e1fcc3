pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::quote::QuoteArgs;
use crate::commands::recommend::RecommendArgs;

#[derive(Debug, Parser)]
#[command(
    name = "quotewise",
    about = "Quotewise license quote CLI",
    long_about = "Build license quotes, preview recommendations, and inspect Quotewise runtime readiness.",
    after_help = "Examples:\n  quotewise quote --company Acme --team-size 10 --enterprise 7 --cascade 3\n  quotewise recommend --team-size 20 --proprietary-code 100 --completion-importance 5 --multi-repo --languages 7+\n  quotewise doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the quote wizard from flags and print the issued quote record")]
    Quote(QuoteArgs),
    #[command(about = "Recommend an Enterprise/Cascade split from questionnaire answers")]
    Recommend(RecommendArgs),
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, template, wkhtmltopdf and CRM credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Quote(args) => commands::quote::run(&args),
        Command::Recommend(args) => commands::recommend::run(&args),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
