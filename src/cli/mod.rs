pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "riskctl")]
#[command(about = "RiskWorks admin CLI - direct database management for the risk register")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "User account management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Populate the register with sample data for demos")]
    Seed {
        #[arg(long, default_value_t = 8, help = "Number of sample risks to create")]
        risks: usize,
    },

    #[command(about = "Write .env entries for a deployment target")]
    Env {
        #[arg(long, value_enum)]
        target: commands::env::EnvTarget,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;

    match cli.command {
        Commands::User { cmd } => commands::user::handle(cmd, format).await,
        Commands::Seed { risks } => commands::seed::handle(risks, format).await,
        Commands::Env { target } => commands::env::handle(target, format),
    }
}
