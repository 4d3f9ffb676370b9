use async_trait::async_trait;
use bytes::Bytes;
use forgehook_events::Repository;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git failed for {repo}: {stderr}")]
    Git { repo: String, stderr: String },

    #[error("repository read cancelled")]
    Cancelled,
}

/// Read access to repository contents at a given commit.
#[async_trait]
pub trait RepositoryReader: Send + Sync {
    /// Returns `Ok(None)` when `path` does not exist at `commit`.
    async fn read_file(
        &self,
        repo: &Repository,
        commit: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Bytes>, StorageError>;
}

/// Reads blobs from bare repositories on disk with `git cat-file`.
#[derive(Debug, Clone)]
pub struct GitCliReader {
    root: PathBuf,
}

impl GitCliReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_path(&self, repo: &Repository) -> PathBuf {
        self.root
            .join(repo.owner_name().to_lowercase())
            .join(format!("{}.git", repo.name.to_lowercase()))
    }
}

/// Messages git prints when the object or path is absent.
const NOT_FOUND_MARKERS: &[&str] = &[
    "does not exist",
    "exists on disk, but not in",
    "Not a valid object name",
    "bad revision",
];

#[async_trait]
impl RepositoryReader for GitCliReader {
    async fn read_file(
        &self,
        repo: &Repository,
        commit: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Bytes>, StorageError> {
        let git_dir = self.repo_path(repo);
        debug!("Reading {} at {} from {}", path, commit, git_dir.display());

        let mut command = Command::new("git");
        command
            .arg("--git-dir")
            .arg(&git_dir)
            .arg("cat-file")
            .arg("blob")
            .arg(format!("{commit}:{path}"))
            .kill_on_drop(true);

        // Dropping the output future kills the child.
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StorageError::Cancelled),
            output = command.output() => output?,
        };

        if output.status.success() {
            return Ok(Some(Bytes::from(output.stdout)));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m)) {
            return Ok(None);
        }
        Err(StorageError::Git {
            repo: repo.full_name.clone(),
            stderr: stderr.trim().to_string(),
        })
    }
}

/// In-memory file store keyed by repository full name, commit and path.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: HashMap<(String, String, String), Bytes>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(
        mut self,
        full_name: &str,
        commit: &str,
        path: &str,
        content: impl Into<Bytes>,
    ) -> Self {
        self.files.insert(
            (full_name.to_string(), commit.to_string(), path.to_string()),
            content.into(),
        );
        self
    }
}

#[async_trait]
impl RepositoryReader for MemoryReader {
    async fn read_file(
        &self,
        repo: &Repository,
        commit: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Bytes>, StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        let key = (repo.full_name.clone(), commit.to_string(), path.to_string());
        Ok(self.files.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgehook_events::User;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn repo() -> Repository {
        Repository {
            name: "Repo".to_string(),
            full_name: "Testdata/Repo".to_string(),
            owner: Some(User {
                user_name: "Testdata".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "test")
            .env("GIT_AUTHOR_EMAIL", "test@example.org")
            .env("GIT_COMMITTER_NAME", "test")
            .env("GIT_COMMITTER_EMAIL", "test@example.org")
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    /// Creates `<root>/testdata/repo.git` with one commit holding `.build.yml`.
    fn init_bare_repo(root: &Path) -> String {
        let work = root.join("work");
        std::fs::create_dir_all(&work).unwrap();
        git(&work, &["init", "-q"]);
        std::fs::write(work.join(".build.yml"), "image: alpine/edge\n").unwrap();
        git(&work, &["add", ".build.yml"]);
        git(&work, &["commit", "-q", "-m", "add manifest"]);
        let commit = git(&work, &["rev-parse", "HEAD"]);

        let bare = root.join("testdata").join("repo.git");
        std::fs::create_dir_all(bare.parent().unwrap()).unwrap();
        git(
            root,
            &["clone", "-q", "--bare", work.to_str().unwrap(), bare.to_str().unwrap()],
        );
        commit
    }

    #[test]
    fn test_repo_path_is_lowercased() {
        let reader = GitCliReader::new("/srv/repos");
        assert_eq!(
            reader.repo_path(&repo()),
            PathBuf::from("/srv/repos/testdata/repo.git")
        );
    }

    #[tokio::test]
    async fn test_git_reader_reads_and_misses() {
        let temp_dir = TempDir::new().unwrap();
        let commit = init_bare_repo(temp_dir.path());
        let reader = GitCliReader::new(temp_dir.path());
        let cancel = CancellationToken::new();

        let content = reader
            .read_file(&repo(), &commit, ".build.yml", &cancel)
            .await
            .unwrap();
        assert_eq!(content, Some(Bytes::from_static(b"image: alpine/edge\n")));

        let missing = reader
            .read_file(&repo(), &commit, "non-existing.yml", &cancel)
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_git_reader_observes_cancellation() {
        let temp_dir = TempDir::new().unwrap();
        let reader = GitCliReader::new(temp_dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = reader.read_file(&repo(), "HEAD", ".build.yml", &cancel).await;
        assert!(matches!(result, Err(StorageError::Cancelled)));
    }

    #[tokio::test]
    async fn test_memory_reader() {
        let reader = MemoryReader::new().with_file("Testdata/Repo", "abc", ".build.yml", "x");
        let cancel = CancellationToken::new();
        assert!(reader.read_file(&repo(), "abc", ".build.yml", &cancel).await.unwrap().is_some());
        assert!(reader.read_file(&repo(), "abd", ".build.yml", &cancel).await.unwrap().is_none());
    }
}
