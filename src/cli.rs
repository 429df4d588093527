use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Hourly rating report for the most viewed drugs")]
pub struct Cli {
    /// Command (defaults to `schedule`)
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Report on a cron schedule until terminated
    Schedule {
        /// Cron expression with a seconds field (defaults to the top of every hour)
        #[arg(long)]
        cron: Option<String>,
        /// How many of the most viewed drugs to report
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Report once and exit
    Once {
        /// How many of the most viewed drugs to report
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Schedule {
            cron: None,
            limit: None,
        }
    }
}
