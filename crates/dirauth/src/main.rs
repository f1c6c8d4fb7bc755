use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dirauth_core::{AuthConfig, AuthError, AuthSession, DirectoryEntry};

/// Exit status when the directory rejects the user's credentials.
const EXIT_DENIED: u8 = 1;
/// Exit status when the directory could not be reached or misbehaved.
const EXIT_UNAVAILABLE: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "dirauth",
    version,
    about = "Check LDAP credentials and look up directory entries"
)]
struct Cli {
    /// Path to config file (default: ~/.config/dirauth/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// LDAP host:port or URL (overrides config)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Search base DN (overrides config)
    #[arg(short, long)]
    base_dn: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate a user (bind as admin, find the user, bind as the user)
    Auth {
        username: String,

        /// Password (default: $DIRAUTH_PASSWORD, then an interactive prompt)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Search below the base DN with a raw LDAP filter
    Search {
        filter: String,

        /// Attributes to return (default: all user attributes)
        attributes: Vec<String>,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single user's entry
    Attrs {
        username: String,

        /// Attributes to return (default: all user attributes)
        attributes: Vec<String>,

        /// Print the entry as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("dirauth=info".parse()?)
                .add_directive("dirauth_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(AuthConfig::default_path);
    debug!("Loading config from {}", config_path.display());
    let config = AuthConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?
        .with_overrides(cli.host, cli.base_dn)?;

    info!("Using directory {}", config.host());
    let session = AuthSession::new(config);

    match cli.command {
        Command::Auth { username, password } => {
            let password = resolve_password(password)?;
            report_auth(&username, session.authenticate(&username, &password).await)
        }
        Command::Search {
            filter,
            attributes,
            json,
        } => {
            let attrs: Vec<&str> = attributes.iter().map(String::as_str).collect();
            match session.search_attributes(&filter, &attrs).await {
                Ok(entries) => {
                    print_entries(&entries, json)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report_error(&e)),
            }
        }
        Command::Attrs {
            username,
            attributes,
            json,
        } => {
            let attrs: Vec<&str> = attributes.iter().map(String::as_str).collect();
            match session.get_attributes(&username, &attrs).await {
                Ok(entry) => {
                    print_entries(std::slice::from_ref(&entry), json)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report_error(&e)),
            }
        }
    }
}

/// Password precedence: CLI arg > env var > interactive prompt.
fn resolve_password(cli_password: Option<String>) -> Result<String> {
    if let Some(pw) = cli_password {
        return Ok(pw);
    }
    if let Ok(pw) = std::env::var("DIRAUTH_PASSWORD") {
        return Ok(pw);
    }
    rpassword::read_password_from_tty(Some("Password: ")).context("reading password")
}

fn report_auth(username: &str, result: Result<(), AuthError>) -> Result<ExitCode> {
    match result {
        Ok(()) => {
            println!("{}: authenticated", username);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_error(&e)),
    }
}

fn report_error(err: &AuthError) -> ExitCode {
    eprintln!("Error: {}", err);
    ExitCode::from(exit_status(err))
}

fn exit_status(err: &AuthError) -> u8 {
    if err.is_credential_failure() {
        EXIT_DENIED
    } else {
        EXIT_UNAVAILABLE
    }
}

fn print_entries(entries: &[DirectoryEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
    } else {
        for entry in entries {
            print!("{}", entry.pretty(2));
        }
    }
    Ok(())
}
