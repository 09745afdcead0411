//! CLI argument definitions for the RAG-&-Rock client.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// RAG-&-Rock: chat with your documents through a retrieval-augmented backend.
#[derive(Parser, Debug)]
#[command(name = "ragrock", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Backend origin, e.g. http://127.0.0.1:8000.
    #[arg(short = 'u', long = "api-url", global = true)]
    pub api_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start an interactive chat session.
    Chat {
        /// Scope the session to one document id.
        #[arg(long = "file")]
        file: Option<i64>,

        /// Comma-separated keyword filter.
        #[arg(long = "keywords")]
        keywords: Option<String>,

        /// Number of passages to retrieve (1-20).
        #[arg(short = 'k', long = "k")]
        k: Option<String>,
    },

    /// List uploaded documents.
    Files,

    /// Upload a document (.pdf, .txt, .doc, .docx, .md).
    Upload { path: PathBuf },

    /// Delete a document by id.
    Delete { id: i64 },

    /// Show backend health.
    Health,

    /// Administrative operations.
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },

    /// Log in and store the access token.
    Login {
        #[arg(long = "username")]
        username: Option<String>,
    },

    /// Create an account.
    Register {
        #[arg(long = "username")]
        username: Option<String>,
    },

    /// Forget the stored access token.
    Logout,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Delete every document and chat on the backend.
    ClearAll {
        /// Admin secret sent in the `admin-token` header.
        #[arg(long = "token", env = "RAGROCK_ADMIN_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Skip the confirmation prompt.
        #[arg(long = "yes")]
        yes: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > RAGROCK_CONFIG env var > platform default (~/.ragrock/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("RAGROCK_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the backend origin.
    ///
    /// Priority: --api-url flag > RAGROCK_API_URL env var > config file value > default.
    pub fn resolve_base_url(&self, config_url: &str) -> String {
        if let Some(ref url) = self.api_url {
            return url.clone();
        }
        if let Ok(url) = std::env::var("RAGROCK_API_URL") {
            if !url.trim().is_empty() {
                return url;
            }
        }
        if !config_url.trim().is_empty() {
            return config_url.to_string();
        }
        DEFAULT_BASE_URL.to_string()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".ragrock").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".ragrock").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_chat_with_scope() {
        let args = parse(&["ragrock", "chat", "--file", "3", "--keywords", "a, b", "-k", "8"]);
        assert_eq!(
            args.command,
            Command::Chat {
                file: Some(3),
                keywords: Some("a, b".to_string()),
                k: Some("8".to_string()),
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["ragrock", "files", "--api-url", "http://10.0.0.5:8000", "-l", "debug"]);
        assert_eq!(args.command, Command::Files);
        assert_eq!(args.resolve_base_url("http://ignored"), "http://10.0.0.5:8000");
        assert_eq!(args.resolve_log_level("warn"), "debug");
    }

    #[test]
    fn test_admin_clear_all_flags() {
        let args = parse(&["ragrock", "admin", "clear-all", "--token", "s3cret", "--yes"]);
        assert_eq!(
            args.command,
            Command::Admin {
                action: AdminCommand::ClearAll {
                    token: Some("s3cret".to_string()),
                    yes: true,
                }
            }
        );
    }

    #[test]
    fn test_upload_and_delete_arguments() {
        let args = parse(&["ragrock", "upload", "docs/guide.pdf"]);
        assert_eq!(
            args.command,
            Command::Upload {
                path: PathBuf::from("docs/guide.pdf")
            }
        );

        let args = parse(&["ragrock", "delete", "42"]);
        assert_eq!(args.command, Command::Delete { id: 42 });

        assert!(CliArgs::try_parse_from(["ragrock", "delete", "abc"]).is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(CliArgs::try_parse_from(["ragrock"]).is_err());
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let args = parse(&["ragrock", "--config", "/tmp/ragrock.toml", "health"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/ragrock.toml"));
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = parse(&["ragrock", "logout"]);
        assert_eq!(args.resolve_log_level("info"), "info");
    }
}
