//! Command-line interface for the decision tracker.

mod commands;

use clap::{Parser, Subcommand};

/// Decision Tracker - record decisions and evaluate them against their goals
#[derive(Parser)]
#[command(name = "decision-tracker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (default)
    Serve,

    /// Create default config file
    #[command(alias = "init")]
    InitConfig,

    /// Create an administrator account.
    /// The password is read from DECISION_TRACKER_ADMIN_PASSWORD.
    CreateAdmin {
        /// Username of the new administrator
        username: String,
        /// Email address of the new administrator
        email: String,
    },
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["decision-tracker"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn create_admin_takes_username_and_email() {
        let cli =
            Cli::try_parse_from(["decision-tracker", "create-admin", "root", "root@example.com"])
                .unwrap();
        match cli.command {
            Some(Commands::CreateAdmin { username, email }) => {
                assert_eq!(username, "root");
                assert_eq!(email, "root@example.com");
            }
            _ => panic!("expected create-admin"),
        }
    }

    #[test]
    fn create_admin_requires_email() {
        assert!(Cli::try_parse_from(["decision-tracker", "create-admin", "root"]).is_err());
    }
}
