//! Command-line interface.

use std::io::{self, BufRead};

use clap::{Parser, Subcommand, ValueEnum};

use crate::error::{AppError, Result};
use crate::services::auth_service::{validate_password, AuthService};

/// Personnel, warehouse and task tracking server
#[derive(Parser, Debug)]
#[command(name = "crewdesk", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Print the bcrypt hash of a password, e.g. for seeding users by hand
    HashPassword {
        /// Password to hash; read from the first line of stdin when omitted
        password: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}

/// Hash a password given on the command line or stdin.
pub fn hash_password(password: Option<&str>) -> Result<String> {
    let password = match password {
        Some(password) => password.to_string(),
        None => {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        return Err(AppError::Validation("No password given".into()));
    }
    validate_password(&password)?;
    AuthService::hash_password(&password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["crewdesk"]).unwrap();
        assert_eq!(cli.command(), &Command::Serve);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_hash_password_subcommand() {
        let cli =
            Cli::try_parse_from(["crewdesk", "hash-password", "s3cret!", "--log-format", "json"])
                .unwrap();
        assert_eq!(
            cli.command(),
            &Command::HashPassword {
                password: Some("s3cret!".into())
            }
        );
        assert_eq!(cli.log_format, LogFormat::Json);

        let hash = hash_password(Some("s3cret!")).unwrap();
        assert!(AuthService::verify_password("s3cret!", &hash).unwrap());
        assert!(hash_password(Some("abc")).is_err());
    }
}
