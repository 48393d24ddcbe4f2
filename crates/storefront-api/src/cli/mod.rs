//! CLI command definitions for the `sfront` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod token;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run and administer the Storefront support chat service.
#[derive(Parser)]
#[command(name = "sfront", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "STOREFRONT_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Port to listen on (defaults to `server.port` in config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to `server.host` in config.toml).
        #[arg(long)]
        host: Option<String>,
    },

    /// Manage API tokens.
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Issue a token for a user. The token is printed once.
    Issue {
        /// User id the token authenticates as.
        #[arg(long)]
        user_id: i64,

        /// Role granted to the token (admin or customer).
        #[arg(long)]
        role: storefront_types::principal::Role,

        /// Free-form label to recognise the token later.
        #[arg(long, default_value = "default")]
        label: String,
    },

    /// Revoke a token by id or unique id prefix.
    Revoke {
        /// Token id, or a unique prefix of it.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_token_issue() {
        let cli = Cli::try_parse_from([
            "sfront", "token", "issue", "--user-id", "7", "--role", "admin",
        ])
        .unwrap();
        match cli.command {
            Commands::Token {
                action: TokenCommand::Issue { user_id, role, label },
            } => {
                assert_eq!(user_id, 7);
                assert_eq!(role, storefront_types::principal::Role::Admin);
                assert_eq!(label, "default");
            }
            _ => panic!("expected token issue"),
        }
    }

    #[test]
    fn test_serve_flags_are_optional() {
        let cli = Cli::try_parse_from(["sfront", "serve", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Serve { port: None, host: None }));
    }

    #[test]
    fn test_rejects_unknown_role() {
        assert!(
            Cli::try_parse_from(["sfront", "token", "issue", "--user-id", "1", "--role", "root"])
                .is_err()
        );
    }
}
