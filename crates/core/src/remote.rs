use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::local::PER_FILE_LIMIT;
use crate::repo::{parse_repo_url, EntryKind, RepoApi, RepoRef, TreeEntry};
use crate::selection::{SelectedFile, Selection};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileState {
    // checked, no fetch handed out yet
    Pending,
    // checked, fetch in flight
    Fetching,
    Included,
    Excluded,
}

impl FileState {
    pub fn is_checked(self) -> bool {
        !matches!(self, FileState::Excluded)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEntry {
    pub path: String,
    pub state: FileState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchPlan {
    pub epoch: u64,
    pub paths: Vec<String>,
}

impl FetchPlan {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[derive(Debug)]
pub struct Fetched {
    pub epoch: u64,
    pub path: String,
    pub result: Result<String>,
}

#[derive(Debug)]
pub enum Applied {
    Stored,
    // Result belongs to a superseded epoch or an unchecked path.
    Stale,
    Failed(Error),
}

#[derive(Debug, Default)]
pub struct RemoteCollector {
    repo: Option<RepoRef>,
    branches: Vec<String>,
    entries: Vec<RemoteEntry>,
    selection: Selection,
    epoch: u64,
}

impl RemoteCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn repo(&self) -> Option<&RepoRef> {
        self.repo.as_ref()
    }

    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    pub fn entries(&self) -> &[RemoteEntry] {
        &self.entries
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn state_of(&self, path: &str) -> Option<FileState> {
        self.entries.iter().find(|e| e.path == path).map(|e| e.state)
    }

    fn reset(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.entries.clear();
        self.selection.clear();
    }

    pub fn begin_load(&mut self, url: &str) -> Result<RepoRef> {
        let parsed = parse_repo_url(url).ok_or_else(|| Error::InvalidUrl(url.to_string()))?;
        self.reset();
        self.branches.clear();
        self.repo = Some(parsed.clone());
        info!(target: "core::remote", "loading {}/{} epoch={}", parsed.owner, parsed.repo, self.epoch);
        Ok(parsed)
    }

    pub fn set_branches(&mut self, epoch: u64, branches: Vec<String>, active: &str) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.branches = branches;
        if let Some(r) = &mut self.repo {
            r.branch = active.to_string();
        }
        true
    }

    // Installs a fresh listing. Only blobs are kept, all checked. Returns
    // the fetch plan, or `None` when the listing is stale.
    pub fn set_tree(&mut self, epoch: u64, tree: Vec<TreeEntry>) -> Option<FetchPlan> {
        if epoch != self.epoch {
            debug!(target: "core::remote", "dropping stale tree epoch={} current={}", epoch, self.epoch);
            return None;
        }
        self.selection.clear();
        self.entries = tree
            .into_iter()
            .filter(|e| e.kind == EntryKind::Blob)
            .map(|e| RemoteEntry {
                path: e.path,
                state: FileState::Pending,
            })
            .collect();
        Some(self.take_plan())
    }

    // Makes `branch` active. Previous entries and selection are discarded;
    // the caller re-lists the tree under the returned epoch.
    pub fn switch_branch(&mut self, branch: &str) -> Option<(RepoRef, u64)> {
        self.repo.as_ref()?;
        self.reset();
        let repo = self.repo.as_mut()?;
        repo.branch = branch.to_string();
        info!(target: "core::remote", "switch branch {} epoch={}", branch, self.epoch);
        Some((repo.clone(), self.epoch))
    }

    pub fn toggle(&mut self, path: &str) -> Option<FetchPlan> {
        let entry = self.entries.iter_mut().find(|e| e.path == path)?;
        if entry.state.is_checked() {
            entry.state = FileState::Excluded;
            self.selection.remove(path);
            None
        } else {
            entry.state = FileState::Fetching;
            Some(FetchPlan {
                epoch: self.epoch,
                paths: vec![path.to_string()],
            })
        }
    }

    pub fn set_all(&mut self, checked: bool) -> FetchPlan {
        for e in &mut self.entries {
            if checked && e.state == FileState::Excluded {
                e.state = FileState::Pending;
            } else if !checked {
                e.state = FileState::Excluded;
            }
        }
        if !checked {
            self.selection.clear();
        }
        self.take_plan()
    }

    pub fn desired(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.state.is_checked())
            .map(|e| e.path.as_str())
            .collect()
    }

    // Checked paths that have neither content nor a fetch in flight.
    pub fn plan(&self) -> FetchPlan {
        FetchPlan {
            epoch: self.epoch,
            paths: self
                .entries
                .iter()
                .filter(|e| e.state == FileState::Pending && !self.selection.contains(&e.path))
                .map(|e| e.path.clone())
                .collect(),
        }
    }

    // Same as `plan`, and marks the planned paths as in flight.
    pub fn take_plan(&mut self) -> FetchPlan {
        let plan = self.plan();
        for e in &mut self.entries {
            if plan.paths.contains(&e.path) {
                e.state = FileState::Fetching;
            }
        }
        plan
    }

    pub fn apply_fetch(&mut self, fetched: Fetched) -> Applied {
        if fetched.epoch != self.epoch {
            debug!(target: "core::remote", "dropping stale fetch {} epoch={}", fetched.path, fetched.epoch);
            return Applied::Stale;
        }
        let Some(entry) = self.entries.iter_mut().find(|e| e.path == fetched.path) else {
            return Applied::Stale;
        };
        if !entry.state.is_checked() {
            return Applied::Stale;
        }
        let result = fetched.result.and_then(|content| {
            let size = content.len() as u64;
            if size > PER_FILE_LIMIT {
                Err(Error::PerFileSizeExceeded {
                    path: fetched.path.clone(),
                    size,
                    limit: PER_FILE_LIMIT,
                })
            } else {
                Ok(content)
            }
        });
        match result {
            Ok(content) => {
                entry.state = FileState::Included;
                self.selection.insert(SelectedFile::remote(fetched.path, content));
                Applied::Stored
            }
            Err(e) => {
                warn!(target: "core::remote", "fetch failed: {}", e);
                entry.state = FileState::Excluded;
                self.selection.remove(&fetched.path);
                Applied::Failed(e)
            }
        }
    }

    pub fn clear(&mut self) {
        self.reset();
        self.repo = None;
        self.branches.clear();
    }

    pub fn formatted(&self, allow_oversize: bool) -> Result<String> {
        self.selection.formatted(allow_oversize)
    }

    pub async fn reconcile<A: RepoApi>(&mut self, api: &A) -> Vec<Error> {
        let Some(repo) = self.repo.clone() else {
            return Vec::new();
        };
        // Nothing else fetches here, so in-flight paths are taken over too.
        let plan = FetchPlan {
            epoch: self.epoch,
            paths: self
                .desired()
                .into_iter()
                .filter(|p| !self.selection.contains(p))
                .map(str::to_string)
                .collect(),
        };
        let mut results = Vec::new();
        fetch_plan(api, &repo, &plan, |f| results.push(f)).await;
        results
            .into_iter()
            .filter_map(|f| match self.apply_fetch(f) {
                Applied::Failed(e) => Some(e),
                _ => None,
            })
            .collect()
    }
}

pub async fn fetch_plan<A, F>(api: &A, repo: &RepoRef, plan: &FetchPlan, mut sink: F)
where
    A: RepoApi,
    F: FnMut(Fetched),
{
    for path in &plan.paths {
        let result = api
            .fetch_file_content(&repo.owner, &repo.repo, &repo.branch, path)
            .await;
        sink(Fetched {
            epoch: plan.epoch,
            path: path.clone(),
            result,
        });
    }
}

pub async fn load_listing<A: RepoApi>(api: &A, repo: &RepoRef) -> Result<(Vec<String>, String, Vec<TreeEntry>)> {
    let branches = api.list_branches(&repo.owner, &repo.repo).await?;
    let active = crate::repo::choose_branch(&repo.branch, &branches)?;
    let tree = api.list_tree(&repo.owner, &repo.repo, &active).await?;
    Ok((branches, active, tree))
}
