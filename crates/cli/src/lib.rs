pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "repairdesk",
    about = "Repairdesk operator CLI",
    long_about = "Evaluate service cases offline, replay demo scenarios, inspect business rules and configuration, and apply migrations.",
    after_help = "Examples:\n  repairdesk evaluate --file case.json\n  repairdesk scenarios\n  repairdesk rules --path config/business_rules.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run a service case JSON file through the decision workflow")]
    Evaluate {
        #[arg(long, help = "Path to a service case JSON document")]
        file: PathBuf,
        #[arg(long, help = "Rule book to evaluate against (defaults to rules.path)")]
        rules: Option<PathBuf>,
    },
    #[command(about = "Replay the demo scenarios and check their expected outcomes")]
    Scenarios,
    #[command(about = "Summarize the business rule book")]
    Rules {
        #[arg(long, help = "Rule book path (defaults to rules.path)")]
        path: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Evaluate { file, rules } => commands::evaluate::run(&file, rules),
        Command::Scenarios => commands::scenarios::run(),
        Command::Rules { path } => commands::rules::run(path),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Migrate => commands::migrate::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
