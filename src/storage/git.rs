use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::process::Command;
use tokio::sync::Mutex;

use super::{JsonFileStore, LinkStore, SaveOutcome};
use crate::{config::GitConfig, error::StoreError, models::LinkMap};

const COMMIT_MESSAGE: &str = "Update short links";

/// A [`JsonFileStore`] living in a git checkout.
///
/// `load` hard-resets the checkout to the remote branch first, so local edits
/// that were never pushed are discarded. `save` writes the file, then commits
/// and pushes it. The sequence is not transactional: a crash between the
/// write and the push leaves the two sides diverged until the next save.
///
/// Within one process, loads and saves on the same store (and its clones)
/// take turns on `checkout`, so a pull can never reset the working tree
/// between a save's write and its commit.
#[derive(Debug, Clone)]
pub struct GitSyncStore {
    file: JsonFileStore,
    repo_dir: PathBuf,
    data_file: String,
    remote_url: String,
    branch: String,
    author_name: String,
    author_email: String,
    /// `Authorization` header value, passed to git through the environment.
    auth_header: Option<String>,
    /// Held across pull+read and write+commit+push.
    checkout: Arc<Mutex<()>>,
}

impl GitSyncStore {
    pub fn new(config: &GitConfig) -> Self {
        let auth_header = config.token.as_deref().map(|token| {
            basic_auth_header(config.username.as_deref().unwrap_or("x-access-token"), token)
        });

        Self {
            file: JsonFileStore::new(config.repo_dir.join(&config.data_file)),
            repo_dir: config.repo_dir.clone(),
            data_file: config.data_file.clone(),
            remote_url: config.remote_url.clone(),
            branch: config.branch.clone(),
            author_name: config.author_name.clone(),
            author_email: config.author_email.clone(),
            auth_header,
            checkout: Arc::new(Mutex::new(())),
        }
    }

    fn is_checkout(&self) -> bool {
        self.repo_dir.join(".git").exists()
    }

    /// Clone on first use, otherwise fetch and hard-reset to the remote branch.
    async fn pull(&self) -> Result<(), StoreError> {
        if !self.is_checkout() {
            if let Some(parent) = self.repo_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let dir = self.repo_dir.to_string_lossy();
            self.run(None, &["clone", self.remote_url.as_str(), dir.as_ref()])
                .await?;
            tracing::info!("Cloned link repository into {}", self.repo_dir.display());
        } else {
            self.run(Some(&self.repo_dir), &["fetch", "origin"]).await?;
        }

        let target = format!("origin/{}", self.branch);
        self.run(Some(&self.repo_dir), &["reset", "--hard", target.as_str()])
            .await?;
        Ok(())
    }

    /// Commit the mapping file and push it. A no-op commit is skipped.
    async fn push(&self) -> Result<(), StoreError> {
        if !self.is_checkout() {
            return Err(StoreError::Git {
                command: "push".into(),
                message: format!("{} is not a git checkout", self.repo_dir.display()),
            });
        }

        let dir = Some(self.repo_dir.as_path());
        self.run(dir, &["config", "user.email", self.author_email.as_str()]).await?;
        self.run(dir, &["config", "user.name", self.author_name.as_str()]).await?;
        self.run(dir, &["add", self.data_file.as_str()]).await?;

        // Exit status 0 means the index matches HEAD.
        let unchanged = self
            .output(dir, &["diff", "--cached", "--quiet"])
            .await?
            .status
            .success();
        if unchanged {
            tracing::debug!("Link mapping unchanged; nothing to commit");
        } else {
            self.run(dir, &["commit", "-m", COMMIT_MESSAGE]).await?;
        }

        let refspec = format!("HEAD:{}", self.branch);
        self.run(dir, &["push", "origin", refspec.as_str()]).await?;
        Ok(())
    }

    /// Run git and require a zero exit status.
    async fn run(&self, cwd: Option<&Path>, args: &[&str]) -> Result<(), StoreError> {
        let output = self.output(cwd, args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(StoreError::Git {
                command: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }

    async fn output(&self, cwd: Option<&Path>, args: &[&str]) -> Result<Output, StoreError> {
        let mut cmd = Command::new("git");
        if let Some(dir) = cwd {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");

        if let Some(header) = &self.auth_header {
            cmd.env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                .env("GIT_CONFIG_VALUE_0", header);
        }

        cmd.output().await.map_err(|e| StoreError::Git {
            command: args.join(" "),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl LinkStore for GitSyncStore {
    async fn load(&self) -> LinkMap {
        let _checkout = self.checkout.lock().await;
        if let Err(e) = self.pull().await {
            tracing::warn!("Pull from link repository failed: {}; using local checkout", e);
        }
        self.file.load().await
    }

    async fn save(&self, links: &LinkMap) -> Result<SaveOutcome, StoreError> {
        let _checkout = self.checkout.lock().await;
        self.file.write(links).await?;

        match self.push().await {
            Ok(()) => Ok(SaveOutcome::PersistedAndSynced),
            Err(e) => {
                tracing::warn!("Push to link repository failed: {}", e);
                Ok(SaveOutcome::PersistedLocally {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn describe(&self) -> String {
        format!(
            "git checkout {} (branch {}, file {}, credential {})",
            self.repo_dir.display(),
            self.branch,
            self.data_file,
            if self.auth_header.is_some() { "set" } else { "none" }
        )
    }
}

fn basic_auth_header(username: &str, token: &str) -> String {
    format!("Authorization: Basic {}", STANDARD.encode(format!("{username}:{token}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkRecord;

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .status()
            .expect("spawn git");
        assert!(status.success(), "git {args:?} failed");
    }

    /// A bare repository whose HEAD points at `main`.
    fn bare_remote(root: &Path) -> PathBuf {
        let remote = root.join("remote.git");
        std::fs::create_dir_all(&remote).unwrap();
        git(&remote, &["init", "--bare", "--quiet"]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        remote
    }

    fn config(remote: &Path, repo_dir: PathBuf) -> GitConfig {
        GitConfig {
            remote_url: remote.to_string_lossy().into_owned(),
            branch: "main".into(),
            repo_dir,
            data_file: "short_links.json".into(),
            username: None,
            token: None,
            author_name: "qrlink test".into(),
            author_email: "test@qrlink.invalid".into(),
        }
    }

    fn sample() -> LinkMap {
        let mut links = LinkMap::new();
        links.insert(
            "blog".into(),
            LinkRecord {
                short_url: "126ac9".into(),
                destination_url: "https://example.com/posts".into(),
                qr_code_base64: None,
            },
        );
        links
    }

    #[test]
    fn auth_header_is_basic_credentials() {
        assert_eq!(basic_auth_header("bob", "tok"), "Authorization: Basic Ym9iOnRvaw==");
    }

    #[test]
    fn description_never_contains_the_token() {
        let mut cfg = config(Path::new("/srv/links.git"), PathBuf::from("data"));
        cfg.token = Some("supersecret".into());
        let store = GitSyncStore::new(&cfg);
        let text = store.describe();
        assert!(!text.contains("supersecret"));
        assert!(text.contains("credential set"));
    }

    #[tokio::test]
    async fn save_pushes_and_a_fresh_checkout_sees_it() {
        if !git_available() {
            eprintln!("git not installed; skipping");
            return;
        }
        let root = tempfile::tempdir().unwrap();
        let remote = bare_remote(root.path());

        let writer = GitSyncStore::new(&config(&remote, root.path().join("writer")));
        // Remote has no branch yet: the reset fails and the load degrades to empty.
        assert!(writer.load().await.is_empty());
        assert_eq!(
            writer.save(&sample()).await.unwrap(),
            SaveOutcome::PersistedAndSynced
        );

        let reader = GitSyncStore::new(&config(&remote, root.path().join("reader")));
        assert_eq!(reader.load().await, sample());

        // Saving identical content has nothing to commit but still syncs.
        assert_eq!(
            reader.save(&sample()).await.unwrap(),
            SaveOutcome::PersistedAndSynced
        );
    }

    #[tokio::test]
    async fn load_discards_unpushed_local_edits() {
        if !git_available() {
            eprintln!("git not installed; skipping");
            return;
        }
        let root = tempfile::tempdir().unwrap();
        let remote = bare_remote(root.path());

        let store = GitSyncStore::new(&config(&remote, root.path().join("checkout")));
        store.load().await;
        store.save(&sample()).await.unwrap();

        std::fs::write(root.path().join("checkout").join("short_links.json"), b"{}").unwrap();
        assert_eq!(store.load().await, sample());
    }

    #[tokio::test]
    async fn unreachable_remote_still_persists_locally() {
        if !git_available() {
            eprintln!("git not installed; skipping");
            return;
        }
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist.git");
        let store = GitSyncStore::new(&config(&missing, root.path().join("checkout")));

        assert!(store.load().await.is_empty());
        let outcome = store.save(&sample()).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::PersistedLocally { .. }));
        assert!(outcome.warning().is_some());

        // The local file is readable even though the pull keeps failing.
        assert_eq!(store.load().await, sample());
    }

    #[tokio::test]
    async fn concurrent_loads_never_drop_a_save() {
        if !git_available() {
            eprintln!("git not installed; skipping");
            return;
        }
        let root = tempfile::tempdir().unwrap();
        let remote = bare_remote(root.path());
        let store = Arc::new(GitSyncStore::new(&config(&remote, root.path().join("checkout"))));
        store.load().await;

        let mut links = LinkMap::new();
        for round in 0..10 {
            links.insert(
                format!("p{round}"),
                LinkRecord {
                    short_url: crate::shortcode::short_code(&format!("p{round}")),
                    destination_url: format!("https://example.com/{round}"),
                    qr_code_base64: None,
                },
            );

            let reader = Arc::clone(&store);
            let loads = tokio::spawn(async move {
                for _ in 0..4 {
                    reader.load().await;
                }
            });
            let outcome = store.save(&links).await.unwrap();
            loads.await.unwrap();

            assert_eq!(outcome, SaveOutcome::PersistedAndSynced, "round {round}");
        }

        let fresh = GitSyncStore::new(&config(&remote, root.path().join("fresh")));
        assert_eq!(fresh.load().await, links);
    }
}
