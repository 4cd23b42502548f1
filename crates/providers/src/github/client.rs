use crate::config::GitHubConfig;
use crate::github::content::decode_content;
use dsc_core::repo::{RepoApi, TreeEntry};
use dsc_core::{Error, Result};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tokio::time::Duration;
use tracing::{info, warn};
use url::Url;

#[derive(Deserialize)]
struct Branch {
    name: String,
}

#[derive(Deserialize)]
struct Tree {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct Contents {
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    base: Url,
}

impl GitHubClient {
    pub fn new(cfg: GitHubConfig) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("dscoder/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = &cfg.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(cfg.timeout);
        if let Some(p) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        let base = Url::parse(&cfg.api_base)?;
        Ok(Self {
            http: builder.build()?,
            base,
        })
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>, query: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    pub fn branches_url(&self, owner: &str, repo: &str) -> Url {
        self.url(["repos", owner, repo, "branches"], &[("per_page", "100")])
    }

    pub fn tree_url(&self, owner: &str, repo: &str, branch: &str) -> Url {
        self.url(["repos", owner, repo, "git", "trees", branch], &[("recursive", "1")])
    }

    pub fn contents_url(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Url {
        let segments = ["repos", owner, repo, "contents"].into_iter().chain(path.split('/'));
        self.url(segments, &[("ref", branch)])
    }

    async fn get(&self, url: Url) -> std::result::Result<reqwest::Response, String> {
        let resp = self.http.get(url).send().await.map_err(|e| e.to_string())?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(describe_status(status, &body))
    }
}

fn describe_status(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string));
    match message {
        Some(m) => format!("{} {}", status.as_u16(), m),
        None => status.as_u16().to_string(),
    }
}

#[allow(async_fn_in_trait)]
impl RepoApi for GitHubClient {
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let url = self.branches_url(owner, repo);
        info!(target: "providers::github", "list branches {}", url);
        let not_found = |reason: String| Error::RepoNotFound(format!("{}/{}: {}", owner, repo, reason));
        let resp = self.get(url).await.map_err(not_found)?;
        let branches: Vec<Branch> = resp.json().await.map_err(|e| not_found(e.to_string()))?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn list_tree(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<TreeEntry>> {
        let url = self.tree_url(owner, repo, branch);
        info!(target: "providers::github", "list tree {}", url);
        let failed = |reason: String| Error::BranchLoad {
            branch: branch.to_string(),
            reason,
        };
        let resp = self.get(url).await.map_err(failed)?;
        let tree: Tree = resp.json().await.map_err(|e| failed(e.to_string()))?;
        if tree.truncated {
            warn!(target: "providers::github", "tree for {}/{}@{} is truncated", owner, repo, branch);
        }
        Ok(tree.tree)
    }

    async fn fetch_file_content(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Result<String> {
        let url = self.contents_url(owner, repo, branch, path);
        let failed = |reason: String| Error::FileFetch {
            path: path.to_string(),
            reason,
        };
        let resp = self.get(url).await.map_err(failed)?;
        let body: Contents = resp.json().await.map_err(|e| failed(e.to_string()))?;
        match (body.content, body.encoding.as_deref()) {
            (Some(c), Some("base64") | None) => decode_content(&c).map_err(|e| failed(e.to_string())),
            (_, Some(other)) => Err(failed(format!("unsupported encoding {}", other))),
            (None, None) => Err(failed("no content in response".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, GitHubConfig};

    fn client(base: &str) -> GitHubClient {
        let mut cfg = GitHubConfig::resolve(&FileConfig::default());
        cfg.api_base = base.to_string();
        cfg.token = None;
        cfg.proxy = None;
        GitHubClient::new(cfg).unwrap()
    }

    #[test]
    fn endpoint_urls() {
        let c = client("https://api.github.com");
        assert_eq!(
            c.branches_url("acme", "widgets").as_str(),
            "https://api.github.com/repos/acme/widgets/branches?per_page=100"
        );
        assert_eq!(
            c.tree_url("acme", "widgets", "dev").as_str(),
            "https://api.github.com/repos/acme/widgets/git/trees/dev?recursive=1"
        );
        assert_eq!(
            c.contents_url("acme", "widgets", "dev", "src/my file.rs").as_str(),
            "https://api.github.com/repos/acme/widgets/contents/src/my%20file.rs?ref=dev"
        );
    }

    #[test]
    fn enterprise_base_keeps_prefix() {
        let c = client("https://ghe.example.com/api/v3/");
        assert_eq!(
            c.branches_url("a", "b").as_str(),
            "https://ghe.example.com/api/v3/repos/a/b/branches?per_page=100"
        );
    }

    #[test]
    fn status_description_uses_api_message() {
        assert_eq!(
            describe_status(StatusCode::NOT_FOUND, r#"{"message":"Not Found"}"#),
            "404 Not Found"
        );
        assert_eq!(describe_status(StatusCode::FORBIDDEN, "<html>"), "403");
    }

    #[test]
    fn tree_payload_shape() {
        let t: Tree = serde_json::from_str(
            r#"{"sha":"x","tree":[{"path":"a.rs","type":"blob","mode":"100644"}],"truncated":false}"#,
        )
        .unwrap();
        assert_eq!(t.tree, vec![TreeEntry::blob("a.rs")]);
    }
}
