pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use invoicedesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};

use crate::commands::submit::SubmitArgs;

#[derive(Debug, Parser)]
#[command(
    name = "invoicedesk",
    about = "Buyer invoice desk CLI",
    long_about = "List a buyer's invoices and submit selected ones for admin approval.",
    after_help = "Examples:\n  invoicedesk login --token <TOKEN>\n  invoicedesk list --pending\n  invoicedesk submit --id 7 --id 8\n  invoicedesk doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Read configuration from this file (must exist)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override api.base_url")]
    api_base_url: Option<String>,
    #[arg(long, global = true, help = "Override session.credentials_path")]
    credentials: Option<PathBuf>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Store an auth token issued by the login page")]
    Login {
        #[arg(long, help = "Bearer token to store")]
        token: String,
        #[arg(long, help = "Role reported by the login page (defaults to session.default_user_type)")]
        user_type: Option<String>,
    },
    #[command(about = "Clear stored credentials")]
    Logout,
    #[command(about = "Report whether a session is stored and for which role")]
    Whoami,
    #[command(about = "Fetch and show the current invoice listing")]
    List {
        #[arg(long, help = "Show only invoices pending approval")]
        pending: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Request admin approval for selected invoices")]
    Submit {
        #[arg(long = "id", value_name = "ID", help = "Invoice id to submit (repeatable)")]
        ids: Vec<i64>,
        #[arg(long, conflicts_with = "ids", help = "Submit every listed invoice")]
        all: bool,
        #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
        yes: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, stored credentials, and API reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                api_base_url: self.api_base_url.clone(),
                credentials_path: self.credentials.clone(),
                log_level: self.log_level.clone(),
                log_format: None,
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    // A config error is reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        if let Err(error) = logging::init_logging(&config) {
            eprintln!("{error}");
        }
    }

    let result = match cli.command {
        Command::Login { token, user_type } => commands::session::login(&options, &token, user_type),
        Command::Logout => commands::session::logout(&options),
        Command::Whoami => commands::session::whoami(&options),
        Command::List { pending, json } => commands::list::run(&options, pending, json),
        Command::Submit { ids, all, yes, json } => {
            commands::submit::run(&options, &SubmitArgs { ids, all, assume_yes: yes, json })
        }
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn submit_accepts_repeated_ids() {
        let cli = Cli::try_parse_from(["invoicedesk", "submit", "--id", "7", "--id", "9", "--yes"])
            .expect("arguments should parse");
        match cli.command {
            Command::Submit { ids, all, yes, json } => {
                assert_eq!(ids, vec![7, 9]);
                assert!(!all);
                assert!(yes);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn submit_rejects_ids_combined_with_all() {
        assert!(Cli::try_parse_from(["invoicedesk", "submit", "--id", "7", "--all"]).is_err());
    }

    #[test]
    fn global_overrides_feed_load_options() {
        let cli = Cli::try_parse_from([
            "invoicedesk",
            "list",
            "--api-base-url",
            "https://sales.example",
            "--credentials",
            "/tmp/session.toml",
        ])
        .expect("arguments should parse");

        let options = cli.load_options();
        assert_eq!(options.overrides.api_base_url.as_deref(), Some("https://sales.example"));
        assert!(options.overrides.credentials_path.is_some());
        assert!(!options.require_file);
    }
}
