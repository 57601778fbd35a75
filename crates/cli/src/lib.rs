pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tembea",
    about = "Tembea operator CLI",
    long_about = "Apply migrations, inspect configuration and seed the super admins of a Tembea deployment.",
    after_help = "Examples:\n  tembea migrate\n  tembea config\n  SUPER_ADMIN_EMAIL=ops@andela.com SUPER_ADMIN_SLACK_ID=U123 tembea bootstrap-admins"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Create the configured super admins and grant them the Super Admin role")]
    BootstrapAdmins,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
        Command::BootstrapAdmins => commands::bootstrap_admins::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
