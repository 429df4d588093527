use anyhow::Result;

use popular_drug_ratings::cli::Command;
use popular_drug_ratings::{handle_once, handle_schedule, interpret};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::Schedule { cron, limit } => handle_schedule(cron.as_deref(), *limit),
        Command::Once { limit } => handle_once(*limit),
    }
}
