//! File handler: the model plans one operation, the workspace applies it.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use switchyard_llm::{ChatMessage, LlmProvider};

use crate::config::HandlerConfig;
use crate::conversation::{Role, Turn};
use crate::error::{CoreError, CoreResult};
use crate::handler::{Handler, HandlerError};
use crate::handlers::llm::handler_error;
use crate::routing::KeywordConfidence;

const OPERATION_FORMAT: &str = "Reply with one JSON object and nothing else, in one of these shapes:\n\
{\"operation\": \"list\", \"path\": \"<directory>\"}\n\
{\"operation\": \"read\", \"path\": \"<file>\"}\n\
{\"operation\": \"write\", \"path\": \"<file>\", \"content\": \"<text>\"}\n\
{\"operation\": \"append\", \"path\": \"<file>\", \"content\": \"<text>\"}\n\
{\"operation\": \"delete\", \"path\": \"<file>\"}\n\
Paths are relative to the workspace root; use \".\" for the root itself.";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum FileOperation {
    List {
        #[serde(default)]
        path: Option<String>,
    },
    Read {
        path: String,
    },
    Write {
        path: String,
        content: String,
    },
    Append {
        path: String,
        content: String,
    },
    Delete {
        path: String,
    },
}

impl FileOperation {
    /// Parse a model reply, tolerating code fences and surrounding prose.
    pub fn parse(reply: &str) -> Result<Self, HandlerError> {
        let start = reply.find('{');
        let end = reply.rfind('}');
        let json = match (start, end) {
            (Some(start), Some(end)) if start < end => &reply[start..=end],
            _ => {
                return Err(HandlerError::Execution(
                    "could not interpret the file request".to_string(),
                ))
            }
        };
        serde_json::from_str(json).map_err(|error| {
            HandlerError::Execution(format!("could not interpret the file request: {error}"))
        })
    }
}

/// A directory tree that file operations cannot leave.
#[derive(Debug, Clone)]
pub struct FileWorkspace {
    root: PathBuf,
}

impl FileWorkspace {
    /// Open `root`, creating it if needed.
    pub fn open(root: &Path) -> CoreResult<Self> {
        fs::create_dir_all(root).map_err(|error| {
            CoreError::Internal(format!(
                "failed to create workspace {}: {error}",
                root.display()
            ))
        })?;
        let root = root.canonicalize().map_err(|error| {
            CoreError::Internal(format!(
                "failed to resolve workspace {}: {error}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a relative path into the workspace. Absolute paths, `..` and
    /// symlinks that lead outside the root are rejected.
    fn resolve(&self, relative: &str) -> Result<PathBuf, HandlerError> {
        let relative = relative.trim();
        let path = Path::new(relative);
        let escapes = path.is_absolute()
            || path
                .components()
                .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(HandlerError::Execution(format!(
                "'{relative}' is outside the workspace"
            )));
        }

        let joined = self.root.join(path);
        if let Ok(resolved) = joined.canonicalize() {
            if !resolved.starts_with(&self.root) {
                return Err(HandlerError::Execution(format!(
                    "'{relative}' is outside the workspace"
                )));
            }
        }
        Ok(joined)
    }

    pub fn apply(&self, operation: &FileOperation) -> Result<String, HandlerError> {
        match operation {
            FileOperation::List { path } => self.list(path.as_deref().unwrap_or(".")),
            FileOperation::Read { path } => self.read(path),
            FileOperation::Write { path, content } => self.write(path, content),
            FileOperation::Append { path, content } => self.append(path, content),
            FileOperation::Delete { path } => self.delete(path),
        }
    }

    fn list(&self, relative: &str) -> Result<String, HandlerError> {
        let dir = self.resolve(relative)?;
        if !dir.is_dir() {
            return Err(HandlerError::Execution(format!(
                "'{relative}' is not a directory"
            )));
        }
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|error| io_error("list", relative, error))? {
            let entry = entry.map_err(|error| io_error("list", relative, error))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let metadata = entry
                .metadata()
                .map_err(|error| io_error("list", relative, error))?;
            if metadata.is_dir() {
                dirs.push(name);
            } else {
                files.push((name, metadata.len()));
            }
        }
        if dirs.is_empty() && files.is_empty() {
            return Ok(format!("Directory '{relative}' is empty."));
        }
        dirs.sort();
        files.sort();

        let mut lines = vec![format!("Contents of '{relative}':")];
        if !dirs.is_empty() {
            lines.push("Directories:".to_string());
            lines.extend(dirs.iter().map(|name| format!("  {name}/")));
        }
        if !files.is_empty() {
            lines.push("Files:".to_string());
            lines.extend(
                files
                    .iter()
                    .map(|(name, size)| format!("  {name} ({size} bytes)")),
            );
        }
        Ok(lines.join("\n"))
    }

    fn read(&self, relative: &str) -> Result<String, HandlerError> {
        let path = self.existing_file(relative)?;
        let content =
            fs::read_to_string(&path).map_err(|error| io_error("read", relative, error))?;
        Ok(format!("Successfully read file '{relative}':\n\n{content}"))
    }

    fn write(&self, relative: &str, content: &str) -> Result<String, HandlerError> {
        let path = self.writable(relative)?;
        fs::write(&path, content).map_err(|error| io_error("write", relative, error))?;
        Ok(format!(
            "Successfully wrote {} characters to '{relative}'.",
            content.chars().count()
        ))
    }

    fn append(&self, relative: &str, content: &str) -> Result<String, HandlerError> {
        let path = self.writable(relative)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|error| io_error("append to", relative, error))?;
        file.write_all(content.as_bytes())
            .map_err(|error| io_error("append to", relative, error))?;
        Ok(format!(
            "Successfully appended {} characters to '{relative}'.",
            content.chars().count()
        ))
    }

    fn delete(&self, relative: &str) -> Result<String, HandlerError> {
        let path = self.existing_file(relative)?;
        fs::remove_file(&path).map_err(|error| io_error("delete", relative, error))?;
        Ok(format!("Successfully deleted file '{relative}'."))
    }

    fn existing_file(&self, relative: &str) -> Result<PathBuf, HandlerError> {
        let path = self.resolve(relative)?;
        if !path.exists() {
            return Err(HandlerError::Execution(format!(
                "file '{relative}' does not exist"
            )));
        }
        if !path.is_file() {
            return Err(HandlerError::Execution(format!("'{relative}' is not a file")));
        }
        Ok(path)
    }

    fn writable(&self, relative: &str) -> Result<PathBuf, HandlerError> {
        let path = self.resolve(relative)?;
        if path == self.root || path.is_dir() {
            return Err(HandlerError::Execution(format!("'{relative}' is a directory")));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| io_error("create", relative, error))?;
        }
        Ok(path)
    }
}

fn io_error(action: &str, relative: &str, error: std::io::Error) -> HandlerError {
    HandlerError::Execution(format!("failed to {action} '{relative}': {error}"))
}

/// Handler that performs list, read, write, append and delete inside a
/// [`FileWorkspace`]. The model only chooses the operation.
pub struct FileHandler {
    config: HandlerConfig,
    keywords: KeywordConfidence,
    workspace: FileWorkspace,
    planner: Arc<dyn LlmProvider>,
}

impl FileHandler {
    pub fn new(
        config: HandlerConfig,
        workspace: FileWorkspace,
        planner: Arc<dyn LlmProvider>,
    ) -> Self {
        let keywords = KeywordConfidence::new(config.keywords.iter().cloned());
        Self {
            config,
            keywords,
            workspace,
            planner,
        }
    }

    pub fn workspace(&self) -> &FileWorkspace {
        &self.workspace
    }

    fn messages(&self, request: &str, history: &[Turn]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(format!(
            "{}\n\n{OPERATION_FORMAT}",
            self.config.system_prompt
        )));
        messages.extend(history.iter().map(|turn| match turn.role {
            Role::User => ChatMessage::user(turn.content.as_str()),
            Role::Assistant => ChatMessage::assistant(turn.content.as_str()),
        }));
        messages.push(ChatMessage::user(request));
        messages
    }
}

#[async_trait]
impl Handler for FileHandler {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    fn capabilities(&self) -> Vec<String> {
        self.config.capabilities.clone()
    }

    async fn execute(&self, request: &str, history: &[Turn]) -> Result<String, HandlerError> {
        let reply = self
            .planner
            .complete(&self.messages(request, history))
            .await
            .map_err(handler_error)?;
        let operation = FileOperation::parse(&reply)?;
        tracing::info!(handler = %self.config.name, ?operation, "applying file operation");
        self.workspace.apply(&operation)
    }

    fn confidence(&self, request: &str) -> Option<f64> {
        self.keywords.score(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerKind;
    use crate::handlers::llm::testing::EchoProvider;
    use tempfile::tempdir;

    fn workspace() -> (tempfile::TempDir, FileWorkspace) {
        let dir = tempdir().expect("tempdir");
        let workspace = FileWorkspace::open(dir.path()).expect("workspace");
        (dir, workspace)
    }

    fn files_config() -> HandlerConfig {
        HandlerConfig {
            name: "file_operations".to_string(),
            description: "Works with files in the workspace".to_string(),
            capabilities: vec!["read files".to_string()],
            system_prompt: "You manage files.".to_string(),
            keywords: vec!["file".to_string()],
            kind: HandlerKind::Files,
            root: None,
        }
    }

    #[test]
    fn parses_fenced_operations() {
        let reply = "```json\n{\"operation\": \"write\", \"path\": \"notes.txt\", \"content\": \"hi\"}\n```";
        assert_eq!(
            FileOperation::parse(reply).expect("operation"),
            FileOperation::Write {
                path: "notes.txt".to_string(),
                content: "hi".to_string(),
            }
        );
        assert_eq!(
            FileOperation::parse("{\"operation\": \"list\"}").expect("operation"),
            FileOperation::List { path: None }
        );
    }

    #[test]
    fn unparseable_reply_is_an_execution_error() {
        for reply in ["sure, I will read it", "{\"operation\": \"chmod\", \"path\": \"a\"}"] {
            assert!(matches!(
                FileOperation::parse(reply),
                Err(HandlerError::Execution(_))
            ));
        }
    }

    #[test]
    fn write_append_read_delete() {
        let (_dir, workspace) = workspace();
        let write = FileOperation::Write {
            path: "notes/today.txt".to_string(),
            content: "milk".to_string(),
        };
        assert_eq!(
            workspace.apply(&write).expect("write"),
            "Successfully wrote 4 characters to 'notes/today.txt'."
        );
        workspace
            .apply(&FileOperation::Append {
                path: "notes/today.txt".to_string(),
                content: ", eggs".to_string(),
            })
            .expect("append");

        let read = workspace
            .apply(&FileOperation::Read {
                path: "notes/today.txt".to_string(),
            })
            .expect("read");
        assert!(read.ends_with("milk, eggs"));

        workspace
            .apply(&FileOperation::Delete {
                path: "notes/today.txt".to_string(),
            })
            .expect("delete");
        assert!(!workspace.root().join("notes/today.txt").exists());
    }

    #[test]
    fn list_shows_directories_then_files() {
        let (_dir, workspace) = workspace();
        fs::create_dir(workspace.root().join("docs")).expect("mkdir");
        fs::write(workspace.root().join("a.txt"), "abc").expect("write");

        let listing = workspace
            .apply(&FileOperation::List { path: None })
            .expect("list");
        assert_eq!(
            listing,
            "Contents of '.':\nDirectories:\n  docs/\nFiles:\n  a.txt (3 bytes)"
        );

        let empty = workspace
            .apply(&FileOperation::List {
                path: Some("docs".to_string()),
            })
            .expect("list");
        assert_eq!(empty, "Directory 'docs' is empty.");
    }

    #[test]
    fn paths_outside_the_root_are_rejected() {
        let (dir, workspace) = workspace();
        let outside = dir.path().parent().expect("parent").join("outside.txt");

        for path in ["../outside.txt", "notes/../../outside.txt", "/etc/passwd"] {
            let err = workspace
                .apply(&FileOperation::Write {
                    path: path.to_string(),
                    content: "x".to_string(),
                })
                .unwrap_err();
            assert!(
                matches!(&err, HandlerError::Execution(msg) if msg.contains("outside the workspace")),
                "{path}: {err}"
            );
        }
        assert!(!outside.exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_cannot_escape_the_root() {
        let outside = tempdir().expect("outside");
        fs::write(outside.path().join("secret.txt"), "hidden").expect("write");
        let (_dir, workspace) = workspace();
        std::os::unix::fs::symlink(outside.path(), workspace.root().join("link")).expect("symlink");

        let err = workspace
            .apply(&FileOperation::Read {
                path: "link/secret.txt".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, HandlerError::Execution(msg) if msg.contains("outside the workspace")));
    }

    #[test]
    fn missing_files_are_reported() {
        let (_dir, workspace) = workspace();
        let err = workspace
            .apply(&FileOperation::Read {
                path: "nope.txt".to_string(),
            })
            .unwrap_err();
        assert_eq!(
            err,
            HandlerError::Execution("file 'nope.txt' does not exist".to_string())
        );
    }

    #[tokio::test]
    async fn execute_applies_the_planned_operation() {
        let (_dir, workspace) = workspace();
        let provider = Arc::new(EchoProvider::replying(
            "{\"operation\": \"write\", \"path\": \"todo.txt\", \"content\": \"call mom\"}",
        ));
        let handler = FileHandler::new(files_config(), workspace, provider.clone());

        let output = handler
            .execute("save 'call mom' to todo.txt", &[Turn::user("hello")])
            .await
            .expect("execute");

        assert_eq!(output, "Successfully wrote 8 characters to 'todo.txt'.");
        let written = fs::read_to_string(handler.workspace().root().join("todo.txt")).expect("read");
        assert_eq!(written, "call mom");

        let seen = provider.seen.lock().expect("seen");
        assert!(seen[0][0].content.starts_with("You manage files."));
        assert!(seen[0][0].content.contains("\"operation\": \"delete\""));
        assert_eq!(seen[0].len(), 3);
    }

    #[tokio::test]
    async fn chatty_plan_fails_without_touching_files() {
        let (_dir, workspace) = workspace();
        let provider = Arc::new(EchoProvider::replying("I can't decide which file you mean."));
        let handler = FileHandler::new(files_config(), workspace, provider);

        let err = handler.execute("tidy up", &[]).await.unwrap_err();
        assert!(matches!(err, HandlerError::Execution(_)));
        let entries = fs::read_dir(handler.workspace().root()).expect("dir").count();
        assert_eq!(entries, 0);
    }
}
