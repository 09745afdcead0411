//! Interactive chat session on stdin/stdout.
//!
//! Plain lines are questions. Lines starting with `/` edit the scope or
//! manage documents; see `HELP`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use ragrock_chat::{
    ChatError, DocumentLibrary, Message, Role, ScopeState, SessionController, SubmitOutcome,
};
use ragrock_client::ApiClient;
use ragrock_core::config::ChatConfig;
use ragrock_core::types::FileListItem;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /file ID | /file all   scope questions to one document or to all
  /keywords TEXT         comma-separated keyword filter (empty to clear)
  /k N                   number of passages to retrieve (1-20)
  /files                 list documents
  /upload PATH           upload a document
  /delete ID             delete a document
  /admin-clear TOKEN     delete every document and chat on the backend
  /clear                 clear this conversation
  /help                  show this help
  /quit                  leave";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Ask(String),
    File(Option<i64>),
    Keywords(String),
    K(String),
    Files,
    Upload(PathBuf),
    Delete(i64),
    AdminClear(String),
    Clear,
    Help,
    Quit,
    /// Malformed command, with a usage hint.
    Invalid(String),
}

/// Classify a line of input.
pub fn parse_line(line: &str) -> LineCommand {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return LineCommand::Ask(line.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "file" => match rest {
            "all" | "" => LineCommand::File(None),
            id => match id.parse::<i64>() {
                Ok(id) => LineCommand::File(Some(id)),
                Err(_) => LineCommand::Invalid("usage: /file ID | /file all".to_string()),
            },
        },
        "keywords" => LineCommand::Keywords(rest.to_string()),
        "k" => LineCommand::K(rest.to_string()),
        "files" => LineCommand::Files,
        "upload" if !rest.is_empty() => LineCommand::Upload(PathBuf::from(rest)),
        "upload" => LineCommand::Invalid("usage: /upload PATH".to_string()),
        "delete" => match rest.parse::<i64>() {
            Ok(id) => LineCommand::Delete(id),
            Err(_) => LineCommand::Invalid("usage: /delete ID".to_string()),
        },
        "admin-clear" => LineCommand::AdminClear(rest.to_string()),
        "clear" => LineCommand::Clear,
        "help" => LineCommand::Help,
        "quit" | "exit" => LineCommand::Quit,
        other => LineCommand::Invalid(format!("unknown command /{} (try /help)", other)),
    }
}

/// Render an upload time like "2024-05-01 10:00", or as received if it
/// does not parse.
pub fn format_upload_time(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// One row of the document list.
pub fn format_file(file: &FileListItem, selected: bool) -> String {
    let marker = if selected { '*' } else { ' ' };
    let mut line = format!(
        "{} [{}] {}  ({})",
        marker,
        file.id,
        file.filename,
        format_upload_time(&file.upload_time)
    );
    if let Some(pages) = file.metadata().pages() {
        line.push_str(&format!(", {} pages", pages));
    }
    line
}

/// A transcript entry as printed to the terminal.
pub fn format_message(message: &Message) -> String {
    let speaker = match message.role() {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    match message.source_label() {
        Some(label) => format!("{}> {}\n    [{}]", speaker, message.content(), label),
        None => format!("{}> {}", speaker, message.content()),
    }
}

/// Scope line shown after scope changes.
fn format_scope(scope: &ScopeState, library: &DocumentLibrary<ApiClient>) -> String {
    let target = match (scope.selected_file_id(), library.selected(scope)) {
        (Some(_), Some(file)) => file.filename.clone(),
        (Some(id), None) => format!("file {}", id),
        (None, _) => "all documents".to_string(),
    };
    let keywords = match scope.keyword_text().trim() {
        "" => String::new(),
        text => format!(", keywords: {}", text),
    };
    format!("scope: {}{}, k = {}", target, keywords, scope.k())
}

/// State of one interactive session.
pub struct ChatSession {
    client: Arc<ApiClient>,
    controller: SessionController<ApiClient>,
    library: DocumentLibrary<ApiClient>,
    scope: ScopeState,
}

impl ChatSession {
    pub fn new(client: Arc<ApiClient>, config: &ChatConfig) -> Self {
        Self {
            controller: SessionController::new(Arc::clone(&client))
                .with_stale_policy(config.stale_responses),
            library: DocumentLibrary::new(Arc::clone(&client)),
            scope: ScopeState::new(config.default_k),
            client,
        }
    }

    pub fn scope_mut(&mut self) -> &mut ScopeState {
        &mut self.scope
    }

    /// Load the document list, reporting failures inline.
    pub async fn refresh_files(&mut self) {
        if let Err(e) = self.library.refresh(&mut self.scope).await {
            println!("Could not load file list: {}", e);
        }
    }

    pub fn select(&mut self, file_id: Option<i64>) {
        match self.library.select(file_id, &mut self.scope) {
            Ok(()) => println!("{}", format_scope(&self.scope, &self.library)),
            Err(e) => println!("{}", e),
        }
    }

    fn print_files(&self) {
        let files = self.library.files();
        if files.is_empty() {
            println!("No documents uploaded yet.");
            return;
        }
        let selected = self.scope.selected_file_id();
        for file in files {
            println!("{}", format_file(file, selected == Some(file.id)));
        }
    }

    async fn ask(&mut self, question: &str) {
        let outcome = self.controller.submit(question, self.scope.snapshot()).await;
        match outcome {
            SubmitOutcome::Answered { message_id, .. } | SubmitOutcome::Failed { message_id, .. } => {
                let reply = self
                    .controller
                    .with_transcript(|t| t.iter().find(|m| m.id() == message_id).cloned());
                if let Some(reply) = reply {
                    println!("{}", format_message(&reply));
                }
            }
            SubmitOutcome::Rejected(ChatError::EmptyQuestion) | SubmitOutcome::Discarded => {}
            SubmitOutcome::Rejected(e) => println!("{}", e),
        }
    }

    async fn upload(&mut self, path: &std::path::Path) {
        match self.client.upload_file(path).await {
            Ok(uploaded) => {
                println!("Uploaded {} (id {})", uploaded.filename, uploaded.id);
                if let Err(e) = self.library.on_uploaded(&uploaded, &mut self.scope).await {
                    println!("Could not load file list: {}", e);
                }
                println!("{}", format_scope(&self.scope, &self.library));
            }
            Err(e) => println!("Upload failed: {}", e),
        }
    }

    async fn delete(&mut self, file_id: i64) {
        match self.library.delete(file_id, &mut self.scope).await {
            Ok(()) => {
                println!("Deleted file {}", file_id);
                println!("{}", format_scope(&self.scope, &self.library));
            }
            Err(e) => println!("Delete failed: {}", e),
        }
    }

    /// Wipe the backend, then reset the local list, scope and transcript.
    async fn admin_clear(&mut self, token: &str) {
        match self.client.admin_clear_all(token).await {
            Ok(result) => {
                self.library.reset(&mut self.scope);
                self.controller.clear();
                println!(
                    "Cleared {} files and {} chats.",
                    result.files_deleted, result.chats_deleted
                );
            }
            Err(e) => println!("Clear all failed: {}", e),
        }
    }

    /// Apply one command. Returns `false` when the session should end.
    ///
    /// `AdminClear` is expected to be confirmed by the caller.
    pub async fn handle(&mut self, command: LineCommand) -> bool {
        match command {
            LineCommand::Ask(question) => self.ask(&question).await,
            LineCommand::File(file_id) => self.select(file_id),
            LineCommand::Keywords(text) => {
                self.scope.set_keywords(text);
                println!("{}", format_scope(&self.scope, &self.library));
            }
            LineCommand::K(raw) => {
                let k = self.scope.set_k_input(&raw);
                match raw.trim().parse::<i64>() {
                    Ok(value) if value > 0 => {
                        println!("{}", format_scope(&self.scope, &self.library))
                    }
                    _ => println!("Invalid k {:?}, keeping {}", raw, k),
                }
            }
            LineCommand::Files => {
                self.refresh_files().await;
                self.print_files();
            }
            LineCommand::Upload(path) => self.upload(&path).await,
            LineCommand::Delete(id) => self.delete(id).await,
            LineCommand::AdminClear(token) => self.admin_clear(&token).await,
            LineCommand::Clear => {
                self.controller.clear();
                println!("Conversation cleared.");
            }
            LineCommand::Help => println!("{}", HELP),
            LineCommand::Invalid(hint) => println!("{}", hint),
            LineCommand::Quit => return false,
        }
        true
    }
}

/// Read lines from stdin until EOF or `/quit`.
pub async fn run(mut session: ChatSession) -> std::io::Result<()> {
    println!("{}", format_scope(&session.scope, &session.library));
    println!("Type a question, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = parse_line(&line);

        if let LineCommand::AdminClear(ref token) = command {
            if token.is_empty() {
                println!("usage: /admin-clear TOKEN");
                continue;
            }
            println!("This deletes ALL documents and chats on the backend. Type 'yes' to continue:");
            let confirmed = lines.next_line().await?;
            if confirmed.as_deref().map(str::trim) != Some("yes") {
                println!("Aborted.");
                continue;
            }
        }

        if !session.handle(command).await {
            break;
        }
    }
    tracing::debug!(messages = session.controller.len(), "Chat session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragrock_chat::MessageIdGenerator;
    use ragrock_core::types::Citation;
    use serde_json::json;

    #[test]
    fn test_plain_text_is_a_question() {
        assert_eq!(
            parse_line("  what is in chapter 2?"),
            LineCommand::Ask("  what is in chapter 2?".to_string())
        );
        assert_eq!(parse_line(""), LineCommand::Ask(String::new()));
    }

    #[test]
    fn test_file_command() {
        assert_eq!(parse_line("/file 12"), LineCommand::File(Some(12)));
        assert_eq!(parse_line("/file all"), LineCommand::File(None));
        assert_eq!(parse_line("/file"), LineCommand::File(None));
        assert!(matches!(parse_line("/file twelve"), LineCommand::Invalid(_)));
    }

    #[test]
    fn test_scope_commands_keep_raw_text() {
        assert_eq!(
            parse_line("/keywords  alpha, beta "),
            LineCommand::Keywords("alpha, beta".to_string())
        );
        assert_eq!(parse_line("/keywords"), LineCommand::Keywords(String::new()));
        assert_eq!(parse_line("/k abc"), LineCommand::K("abc".to_string()));
    }

    #[test]
    fn test_document_commands() {
        assert_eq!(
            parse_line("/upload ./docs/guide.pdf"),
            LineCommand::Upload(PathBuf::from("./docs/guide.pdf"))
        );
        assert!(matches!(parse_line("/upload"), LineCommand::Invalid(_)));
        assert_eq!(parse_line("/delete 4"), LineCommand::Delete(4));
        assert!(matches!(parse_line("/delete"), LineCommand::Invalid(_)));
        assert_eq!(
            parse_line("/admin-clear s3cret"),
            LineCommand::AdminClear("s3cret".to_string())
        );
    }

    #[test]
    fn test_session_commands() {
        assert_eq!(parse_line("/clear"), LineCommand::Clear);
        assert_eq!(parse_line("/files"), LineCommand::Files);
        assert_eq!(parse_line("/help"), LineCommand::Help);
        assert_eq!(parse_line("/quit"), LineCommand::Quit);
        assert_eq!(parse_line("/exit"), LineCommand::Quit);
        assert!(matches!(parse_line("/bogus"), LineCommand::Invalid(ref m) if m.contains("/bogus")));
    }

    #[test]
    fn test_format_upload_time() {
        assert_eq!(format_upload_time("2024-05-01T10:00:00"), "2024-05-01 10:00");
        assert_eq!(format_upload_time("2024-05-01T10:00:00.123456"), "2024-05-01 10:00");
        assert_eq!(format_upload_time("yesterday"), "yesterday");
    }

    #[test]
    fn test_format_file_with_and_without_pages() {
        let mut file = FileListItem {
            id: 3,
            filename: "guide.pdf".to_string(),
            upload_time: "2024-05-01T10:00:00".to_string(),
            file_metadata: json!("{\"pages\": 12}"),
        };
        assert_eq!(
            format_file(&file, true),
            "* [3] guide.pdf  (2024-05-01 10:00), 12 pages"
        );

        file.file_metadata = json!("not-json");
        assert_eq!(format_file(&file, false), "  [3] guide.pdf  (2024-05-01 10:00)");
    }

    #[test]
    fn test_format_message() {
        let mut ids = MessageIdGenerator::new();
        let question = Message::user(ids.next_id(), "hi", None);
        assert_eq!(format_message(&question), "you> hi");

        let answer = Message::assistant(
            ids.next_id(),
            "hello",
            None,
            vec![Citation(json!({"page": 1})), Citation(json!({"page": 2}))],
        );
        assert_eq!(format_message(&answer), "assistant> hello\n    [2 sources]");
    }
}
