use crossterm::event::{KeyCode, KeyEvent};
use dsc_core::remote::{fetch_plan, load_listing, Applied, FetchPlan, Fetched};
use dsc_core::repo::{RepoApi as _, RepoRef, TreeEntry};
use dsc_core::Error;
use providers::config::GitHubConfig;
use providers::GitHubClient;
use tracing::debug;

use super::{App, GitHubFocus, JobMsg, Listing};

fn github_client() -> anyhow::Result<GitHubClient> {
    GitHubClient::new(GitHubConfig::from_env_and_file())
}

impl App {
    pub(crate) fn github_key(&mut self, key: KeyEvent) {
        match self.gh_focus {
            GitHubFocus::Url => {
                if key.code == KeyCode::Enter {
                    self.load_repo();
                } else {
                    self.url_input.handle_key(&key, false);
                }
            }
            GitHubFocus::Branches => {
                let len = self.remote.branches().len();
                match key.code {
                    KeyCode::Up => self.branch_cursor = self.branch_cursor.saturating_sub(1),
                    KeyCode::Down => {
                        if self.branch_cursor + 1 < len {
                            self.branch_cursor += 1;
                        }
                    }
                    KeyCode::Enter => self.switch_branch_at(self.branch_cursor),
                    _ => {}
                }
            }
            GitHubFocus::Tree => {
                let len = self.remote.entries().len();
                match key.code {
                    KeyCode::Up => self.tree_cursor = self.tree_cursor.saturating_sub(1),
                    KeyCode::Down => {
                        if self.tree_cursor + 1 < len {
                            self.tree_cursor += 1;
                        }
                    }
                    KeyCode::PageUp => self.tree_cursor = self.tree_cursor.saturating_sub(10),
                    KeyCode::PageDown => {
                        self.tree_cursor = (self.tree_cursor + 10).min(len.saturating_sub(1))
                    }
                    KeyCode::Home => self.tree_cursor = 0,
                    KeyCode::End => self.tree_cursor = len.saturating_sub(1),
                    KeyCode::Char(' ') | KeyCode::Enter => self.toggle_at(self.tree_cursor),
                    KeyCode::Char('a') => self.check_all(true),
                    KeyCode::Char('n') => self.check_all(false),
                    _ => {}
                }
            }
        }
    }

    pub fn load_repo(&mut self) {
        let url = self.url_input.text.trim().to_string();
        match self.remote.begin_load(&url) {
            Ok(repo) => {
                self.branch_cursor = 0;
                self.tree_cursor = 0;
                self.gh_loading = true;
                self.spawn_listing(repo, self.remote.epoch());
            }
            Err(e) => self.fail(e),
        }
    }

    fn spawn_listing(&self, repo: RepoRef, epoch: u64) {
        self.spawn_job("listing", move |tx| async move {
            let result = match github_client() {
                Ok(api) => load_listing(&api, &repo).await.map_err(|e| e.to_string()),
                Err(e) => Err(format!("{:#}", e)),
            };
            let _ = tx.send(JobMsg::Listing { epoch, result });
        });
    }

    fn spawn_tree(&self, repo: RepoRef, epoch: u64) {
        self.spawn_job("tree", move |tx| async move {
            let result = match github_client() {
                Ok(api) => api
                    .list_tree(&repo.owner, &repo.repo, &repo.branch)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(format!("{:#}", e)),
            };
            let _ = tx.send(JobMsg::Tree { epoch, result });
        });
    }

    fn spawn_fetch(&self, plan: FetchPlan) {
        if plan.is_empty() {
            return;
        }
        let Some(repo) = self.remote.repo().cloned() else {
            return;
        };
        self.spawn_job("fetch", move |tx| async move {
            match github_client() {
                Ok(api) => {
                    fetch_plan(&api, &repo, &plan, |f| {
                        let _ = tx.send(JobMsg::Fetched(f));
                    })
                    .await
                }
                Err(e) => {
                    let reason = format!("{:#}", e);
                    for path in plan.paths {
                        let _ = tx.send(JobMsg::Fetched(Fetched {
                            epoch: plan.epoch,
                            result: Err(Error::FileFetch {
                                path: path.clone(),
                                reason: reason.clone(),
                            }),
                            path,
                        }));
                    }
                }
            }
        });
    }

    pub(crate) fn apply_listing(&mut self, epoch: u64, result: Result<Listing, String>) {
        if epoch != self.remote.epoch() {
            debug!(target: "tui", "stale listing epoch={}", epoch);
            return;
        }
        self.gh_loading = false;
        match result {
            Ok((branches, active, tree)) => {
                self.branch_cursor = branches.iter().position(|b| *b == active).unwrap_or(0);
                self.remote.set_branches(epoch, branches, &active);
                if let Some(plan) = self.remote.set_tree(epoch, tree) {
                    self.spawn_fetch(plan);
                }
            }
            Err(e) => self.fail(e),
        }
    }

    pub(crate) fn apply_tree(&mut self, epoch: u64, result: Result<Vec<TreeEntry>, String>) {
        if epoch != self.remote.epoch() {
            debug!(target: "tui", "stale tree epoch={}", epoch);
            return;
        }
        self.gh_loading = false;
        match result {
            Ok(tree) => {
                if let Some(plan) = self.remote.set_tree(epoch, tree) {
                    self.spawn_fetch(plan);
                }
            }
            Err(e) => self.fail(e),
        }
    }

    pub(crate) fn apply_fetched(&mut self, fetched: Fetched) {
        if let Applied::Failed(e) = self.remote.apply_fetch(fetched) {
            self.fail(e);
        }
    }

    pub fn switch_branch_at(&mut self, idx: usize) {
        let Some(name) = self.remote.branches().get(idx).cloned() else {
            return;
        };
        if let Some((repo, epoch)) = self.remote.switch_branch(&name) {
            self.tree_cursor = 0;
            self.gh_loading = true;
            self.spawn_tree(repo, epoch);
        }
    }

    pub fn toggle_at(&mut self, idx: usize) {
        let Some(path) = self.remote.entries().get(idx).map(|e| e.path.clone()) else {
            return;
        };
        if let Some(plan) = self.remote.toggle(&path) {
            self.spawn_fetch(plan);
        }
    }

    pub fn check_all(&mut self, checked: bool) {
        let plan = self.remote.set_all(checked);
        self.spawn_fetch(plan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{test_app, NoticeLevel};
    use dsc_core::remote::FileState;

    fn loaded_app() -> (App, u64) {
        let mut app = test_app();
        app.remote
            .begin_load("https://github.com/acme/widgets")
            .unwrap();
        let epoch = app.remote.epoch();
        app.remote
            .set_tree(epoch, vec![TreeEntry::blob("a.rs"), TreeEntry::blob("b.rs")])
            .unwrap();
        (app, epoch)
    }

    #[test]
    fn invalid_url_is_reported_without_loading() {
        let mut app = test_app();
        app.url_input.set("https://gitlab.com/a/b");
        let before = app.remote.epoch();
        app.load_repo();
        assert!(!app.gh_loading);
        assert_eq!(app.remote.epoch(), before);
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn stale_listing_is_ignored() {
        let (mut app, epoch) = loaded_app();
        app.gh_loading = true;
        app.handle_job(JobMsg::Listing {
            epoch: epoch + 1,
            result: Err("404".into()),
        });
        assert!(app.gh_loading);
        assert!(app.notice.is_none());

        app.handle_job(JobMsg::Listing {
            epoch,
            result: Err("404 Not Found".into()),
        });
        assert!(!app.gh_loading);
        assert!(app.notice.as_ref().unwrap().text.contains("404 Not Found"));
    }

    #[test]
    fn fetched_content_lands_in_the_selection() {
        let (mut app, epoch) = loaded_app();
        app.handle_job(JobMsg::Fetched(Fetched {
            epoch,
            path: "a.rs".into(),
            result: Ok("fn a() {}".into()),
        }));
        assert_eq!(app.remote.state_of("a.rs"), Some(FileState::Included));
        assert!(app.remote.selection().contains("a.rs"));

        app.handle_job(JobMsg::Fetched(Fetched {
            epoch,
            path: "b.rs".into(),
            result: Err(Error::FileFetch {
                path: "b.rs".into(),
                reason: "403".into(),
            }),
        }));
        assert_eq!(app.remote.state_of("b.rs"), Some(FileState::Excluded));
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn unchecking_drops_content_without_fetching() {
        let (mut app, epoch) = loaded_app();
        app.apply_fetched(Fetched {
            epoch,
            path: "a.rs".into(),
            result: Ok("x".into()),
        });
        app.toggle_at(0);
        assert_eq!(app.remote.state_of("a.rs"), Some(FileState::Excluded));
        assert!(!app.remote.selection().contains("a.rs"));

        app.check_all(false);
        assert!(app.remote.desired().is_empty());
    }
}
