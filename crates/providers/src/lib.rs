pub mod completion;
pub mod config;
pub mod github;

pub use completion::CompletionClient;
pub use github::GitHubClient;
