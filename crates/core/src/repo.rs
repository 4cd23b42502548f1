use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_BRANCH: &str = "main";

static REPO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"github\.com/([^/\s?#]+)/([^/\s?#]+)(?:/tree/([^/\s?#]+))?")
        .expect("repository url pattern")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

pub fn parse_repo_url(url: &str) -> Option<RepoRef> {
    let caps = REPO_URL.captures(url.trim())?;
    let owner = caps.get(1)?.as_str().to_string();
    let raw_repo = caps.get(2)?.as_str();
    let repo = raw_repo.strip_suffix(".git").unwrap_or(raw_repo).to_string();
    if repo.is_empty() {
        return None;
    }
    let branch = caps
        .get(3)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    Some(RepoRef {
        owner,
        repo,
        branch,
    })
}

pub fn choose_branch(wanted: &str, branches: &[String]) -> Result<String> {
    branches
        .iter()
        .find(|b| b.as_str() == wanted)
        .or_else(|| branches.first())
        .cloned()
        .ok_or_else(|| Error::BranchLoad {
            branch: wanted.to_string(),
            reason: "repository has no branches".into(),
        })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    Commit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
        }
    }
}

// Non-2xx answers must come back as errors: `RepoNotFound` for branches,
// `BranchLoad` for trees and `FileFetch` for contents.
#[allow(async_fn_in_trait)]
pub trait RepoApi: Send + Sync {
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>>;
    async fn list_tree(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<TreeEntry>>;
    async fn fetch_file_content(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Result<String>;
}
