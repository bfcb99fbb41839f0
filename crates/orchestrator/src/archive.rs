//! Conversation archival on reset and exit.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use brain_core::Message;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::OrchestratorError;

/// Stores a finished or interrupted conversation somewhere durable.
#[async_trait]
pub trait HistoryArchive: Send + Sync {
    /// Archive `history` for `session_id`.
    ///
    /// Returns where it went, or `None` when there was nothing to write.
    async fn archive(
        &self,
        session_id: &str,
        history: &[Message],
    ) -> Result<Option<PathBuf>, OrchestratorError>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopArchive;

#[async_trait]
impl HistoryArchive for NoopArchive {
    async fn archive(
        &self,
        _session_id: &str,
        _history: &[Message],
    ) -> Result<Option<PathBuf>, OrchestratorError> {
        Ok(None)
    }
}

/// Writes one Markdown file per archived conversation.
///
/// Files are named `<session>_<yyyyMMdd_HHmmss>.md` in local time, with a
/// `## ROLE` heading per message. An existing file is never overwritten: a
/// name already taken gets a `-1`, `-2`, ... suffix.
#[derive(Debug, Clone)]
pub struct MarkdownArchive {
    dir: PathBuf,
}

impl MarkdownArchive {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_stem(session_id: &str) -> String {
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{}_{}", safe, chrono::Local::now().format("%Y%m%d_%H%M%S"))
    }

    /// Create a new file for `stem`, never reusing an existing one.
    async fn create_unique(&self, stem: &str) -> Result<(PathBuf, fs::File), OrchestratorError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{}.md", stem)
            } else {
                format!("{}-{}.md", stem, attempt)
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Archive file exists, trying next name");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free archive file name for {} after {} attempts", stem, MAX_NAME_ATTEMPTS),
        )
        .into())
    }
}

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Render `history` as Markdown.
pub fn render_markdown(session_id: &str, history: &[Message]) -> String {
    let mut out = format!("# Conversation {}\n", session_id);
    for message in history {
        let _ = write!(out, "\n## {}\n\n", message.role.as_str().to_uppercase());
        if !message.content.is_empty() {
            out.push_str(&message.content);
            out.push('\n');
        }
        if let Some(id) = &message.tool_call_id {
            let _ = writeln!(out, "\n_tool call id: {}_", id);
        }
        for call in &message.tool_calls {
            let _ = writeln!(out, "\n- tool call `{}` ({}): `{}`", call.name, call.id, call.arguments_json);
        }
    }
    out
}

#[async_trait]
impl HistoryArchive for MarkdownArchive {
    async fn archive(
        &self,
        session_id: &str,
        history: &[Message],
    ) -> Result<Option<PathBuf>, OrchestratorError> {
        if history.is_empty() {
            return Ok(None);
        }

        fs::create_dir_all(&self.dir).await?;
        let (path, mut file) = self.create_unique(&Self::file_stem(session_id)).await?;
        file.write_all(render_markdown(session_id, history).as_bytes()).await?;
        file.flush().await?;

        info!(session = %session_id, messages = history.len(), path = %path.display(), "Archived conversation");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::ToolCall;

    fn history() -> Vec<Message> {
        vec![
            Message::user("有哪些套餐？"),
            Message::assistant_with_calls("", vec![ToolCall::new("call_1", "queryAllPlans", "{}")]),
            Message::tool(r#"[{"planName":"畅享59元套餐"}]"#, "call_1"),
            Message::assistant("目前有畅享59元套餐。"),
        ]
    }

    #[test]
    fn test_render_markdown_headings() {
        let text = render_markdown("s1", &history());
        assert!(text.starts_with("# Conversation s1\n"));
        assert_eq!(text.matches("## ").count(), 4);
        assert!(text.contains("## USER\n\n有哪些套餐？"));
        assert!(text.contains("## TOOL"));
        assert!(text.contains("tool call `queryAllPlans` (call_1)"));
    }

    #[tokio::test]
    async fn test_markdown_archive_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = MarkdownArchive::new(dir.path().join("logs"));

        let path = archive.archive("user/42", &history()).await.unwrap().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("user_42_"));
        assert!(name.ends_with(".md"));
        // user_42_ + yyyyMMdd_HHmmss + .md
        assert_eq!(name.len(), "user_42_".len() + 15 + 3);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("目前有畅享59元套餐。"));
    }

    #[tokio::test]
    async fn test_empty_history_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = MarkdownArchive::new(dir.path());
        assert!(archive.archive("s1", &[]).await.unwrap().is_none());
        assert!(NoopArchive.archive("s1", &history()).await.unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_same_second_archives_keep_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = MarkdownArchive::new(dir.path());

        let first = archive.archive("user_42", &history()).await.unwrap().unwrap();
        let second = archive.archive("user_42", &history()[..1]).await.unwrap().unwrap();
        // Sanitizes to the same stem.
        let third = archive.archive("user/42", &history()).await.unwrap().unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
        assert!(std::fs::read_to_string(&first).unwrap().contains("目前有畅享59元套餐。"));
        assert!(!std::fs::read_to_string(&second).unwrap().contains("目前有畅享59元套餐。"));
        assert!(third.exists());
    }
}
