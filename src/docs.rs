//! Markdown documentation stored alongside each project's repository.
//!
//! Layout under the repository root:
//!
//! ```text
//! .claude-ui/
//! ├── project.md            project-wide notes
//! └── tasks/
//!     └── task-<id>.md      per-task plan and progress notes
//! ```
//!
//! Agents read and update these files themselves; the server only reads them
//! to build the context handed to each conversation, and writes them on behalf
//! of the dashboard editors.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

/// Directory (relative to the repository root) holding all dashboard documents.
pub const DOCS_DIR: &str = ".claude-ui";

/// Path of the task document relative to the repository root.
pub fn task_doc_relative_path(task_id: i64) -> String {
    format!("{DOCS_DIR}/tasks/task-{task_id}.md")
}

pub fn project_doc_path(repo_path: &Path) -> PathBuf {
    repo_path.join(DOCS_DIR).join("project.md")
}

pub fn task_doc_path(repo_path: &Path, task_id: i64) -> PathBuf {
    repo_path.join(task_doc_relative_path(task_id))
}

/// Read a document, treating a missing file as empty.
async fn read_doc(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

async fn write_doc(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await
}

pub async fn read_project_doc(repo_path: &Path) -> io::Result<String> {
    read_doc(&project_doc_path(repo_path)).await
}

pub async fn write_project_doc(repo_path: &Path, content: &str) -> io::Result<()> {
    write_doc(&project_doc_path(repo_path), content).await
}

pub async fn read_task_doc(repo_path: &Path, task_id: i64) -> io::Result<String> {
    read_doc(&task_doc_path(repo_path, task_id)).await
}

pub async fn write_task_doc(repo_path: &Path, task_id: i64, content: &str) -> io::Result<()> {
    write_doc(&task_doc_path(repo_path, task_id), content).await
}

/// Concatenate project and task documentation into a system-context block.
///
/// Each document is trimmed; empty documents are left out entirely, so a
/// project without any notes yields an empty string.
pub async fn build_context_prompt(repo_path: &Path, task_id: i64) -> io::Result<String> {
    let project = read_project_doc(repo_path).await?;
    let task = read_task_doc(repo_path, task_id).await?;

    let sections: Vec<String> = [
        ("Project Documentation", project.trim()),
        ("Task Documentation", task.trim()),
    ]
    .into_iter()
    .filter(|(_, body)| !body.is_empty())
    .map(|(title, body)| format!("## {title}\n\n{body}"))
    .collect();

    Ok(sections.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_docs_read_as_empty() {
        let temp = tempdir().unwrap();
        assert_eq!(read_project_doc(temp.path()).await.unwrap(), "");
        assert_eq!(read_task_doc(temp.path(), 3).await.unwrap(), "");
        assert_eq!(build_context_prompt(temp.path(), 3).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_context_prompt_sections() {
        let temp = tempdir().unwrap();
        write_project_doc(temp.path(), "\n  Rust workspace, axum server.  \n")
            .await
            .unwrap();

        let only_project = build_context_prompt(temp.path(), 7).await.unwrap();
        assert_eq!(
            only_project,
            "## Project Documentation\n\nRust workspace, axum server."
        );

        write_task_doc(temp.path(), 7, "- [ ] add login route\n").await.unwrap();
        let both = build_context_prompt(temp.path(), 7).await.unwrap();
        assert_eq!(
            both,
            "## Project Documentation\n\nRust workspace, axum server.\n\n\
             ## Task Documentation\n\n- [ ] add login route"
        );

        assert!(temp.path().join(".claude-ui/tasks/task-7.md").exists());
    }

    #[test]
    fn test_task_doc_path_is_deterministic() {
        assert_eq!(task_doc_relative_path(12), ".claude-ui/tasks/task-12.md");
        assert_eq!(
            task_doc_path(Path::new("/repo"), 12),
            PathBuf::from("/repo/.claude-ui/tasks/task-12.md")
        );
    }
}
