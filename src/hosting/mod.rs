//! The source-control forge that collected articles are submitted to.
//!
//! Submission steps (branch, file, pull request) are best effort: a failure
//! is logged by the implementation and reported as `None`. Maintenance
//! operations propagate their errors, because `clean` must never delete the
//! fork on the strength of a listing that failed.

pub mod github;

use crate::error::Result;

pub use github::GitHubClient;

pub trait Hosting {
    /// Create `name` from the tip of the base branch; the new ref's URL.
    async fn create_branch(&self, name: &str) -> Option<String>;

    /// Commit `content` at `path` on `branch`; the file's web URL.
    async fn create_file(&self, branch: &str, path: &str, content: &str, message: &str) -> Option<String>;

    /// Open a pull request from `branch` against upstream; its web URL.
    async fn create_pull_request(&self, branch: &str, title: &str) -> Option<String>;

    /// Web URLs of this collector's open pull requests.
    async fn list_open_pull_requests(&self) -> Result<Vec<String>>;

    async fn delete_repository(&self) -> Result<()>;

    /// Fork upstream again; the new clone URL.
    async fn fork_repository(&self) -> Result<String>;

    /// First upstream file that cites `url` as its source.
    async fn search_first_match(&self, url: &str) -> Result<Option<String>>;
}

/// Where a collected article lives in the translation repository.
pub fn submission_path(category: &str, filename: &str) -> String {
    format!("sources/{category}/{filename}")
}

/// Commit message and pull request title of a collected article.
pub fn submission_title(category: &str, filename: &str) -> String {
    format!("[手动选题][{category}]: {filename}")
}
