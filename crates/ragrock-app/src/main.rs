//! RAG-&-Rock application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Install tracing (stderr, so chat output stays clean)
//! 3. Load stored credentials and build the HTTP client
//! 4. Run the requested command, or the interactive chat session

mod cli;
mod repl;

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ragrock_client::{ApiClient, CredentialStore};
use ragrock_core::config::RagConfig;
use ragrock_core::error::RagError;

use cli::{AdminCommand, CliArgs, Command};
use repl::ChatSession;

/// Print `label` and read one trimmed line from stdin.
fn prompt(label: &str) -> std::io::Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_username(given: Option<String>) -> std::io::Result<String> {
    match given {
        Some(username) => Ok(username),
        None => prompt("Username: "),
    }
}

async fn run_command(
    command: Command,
    config: &RagConfig,
    client: Arc<ApiClient>,
    credentials: Arc<CredentialStore>,
) -> Result<(), RagError> {
    match command {
        Command::Chat { file, keywords, k } => {
            let mut session = ChatSession::new(Arc::clone(&client), &config.chat);
            if let Some(keywords) = keywords {
                session.scope_mut().set_keywords(keywords);
            }
            if let Some(k) = k {
                session.scope_mut().set_k_input(&k);
            }
            session.refresh_files().await;
            if file.is_some() {
                session.select(file);
            }
            repl::run(session).await?;
        }

        Command::Files => {
            let files = client.list_files().await?;
            if files.is_empty() {
                println!("No documents uploaded yet.");
            }
            for file in &files {
                println!("{}", repl::format_file(file, false));
            }
        }

        Command::Upload { path } => {
            let uploaded = client.upload_file(&path).await?;
            println!("Uploaded {} (id {})", uploaded.filename, uploaded.id);
        }

        Command::Delete { id } => {
            client.delete_file(id).await?;
            println!("Deleted file {}", id);
        }

        Command::Health => {
            let health = client.health().await?;
            println!("status: {}", health.status);
            let components = [
                ("db", &health.db),
                ("vectorstore", &health.vectorstore),
                ("llm", &health.llm),
            ];
            for (name, component) in components {
                let Some(component) = component else {
                    continue;
                };
                let mut line = format!("  {}: {}", name, if component.ok { "ok" } else { "down" });
                if let Some(ref model) = component.model {
                    line.push_str(&format!(" ({})", model));
                }
                if let Some(ref msg) = component.msg {
                    line.push_str(&format!(" - {}", msg));
                }
                println!("{}", line);
            }
            if !health.is_healthy() {
                return Err(RagError::Api(format!("backend is {}", health.status)));
            }
        }

        Command::Admin {
            action: AdminCommand::ClearAll { token, yes },
        } => {
            let token = match token {
                Some(token) => token,
                None => prompt("Admin token: ")?,
            };
            if !yes {
                let answer = prompt(
                    "This deletes ALL documents and chats on the backend. Type 'yes' to continue: ",
                )?;
                if answer != "yes" {
                    println!("Aborted.");
                    return Ok(());
                }
            }
            let result = client.admin_clear_all(&token).await?;
            println!(
                "Cleared {} files and {} chats ({}).",
                result.files_deleted, result.chats_deleted, result.status
            );
        }

        Command::Login { username } => {
            let username = prompt_username(username)?;
            let password = prompt("Password: ")?;
            let signed_in = client.sign_in(&credentials, &username, &password).await?;
            println!("Logged in as {}", signed_in.username);
        }

        Command::Register { username } => {
            let username = prompt_username(username)?;
            let password = prompt("Password: ")?;
            let signed_in = client
                .register_and_sign_in(&credentials, &username, &password)
                .await?;
            println!("Account {} created, logged in.", signed_in.username);
        }

        Command::Logout => {
            credentials.logout()?;
            println!("Logged out.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Load errors are reported once tracing is up.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match RagConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (RagConfig::default(), Some(e)),
    };

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting RAG-&-Rock v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid config, using defaults")
        }
        Some(_) => tracing::debug!(path = %config_file.display(), "No config file, using defaults"),
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
    }

    config.server.base_url = args.resolve_base_url(&config.server.base_url);

    // Session.
    let credentials = Arc::new(CredentialStore::from_config(&config.auth));
    if let Err(e) = credentials.init() {
        tracing::warn!(
            path = %credentials.path().display(),
            error = %e,
            "Ignoring unreadable credentials"
        );
    }

    // HTTP client.
    let client = Arc::new(ApiClient::from_config(&config.server, credentials.clone())?);
    tracing::info!(base_url = %client.base_url(), "API client ready");

    if let Err(e) = run_command(args.command, &config, client, credentials).await {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
