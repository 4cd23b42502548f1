use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use dsc_core::llm::{ChatError, ChatOpts, ChatResult, Message, ModelClient as _};
use dsc_core::prompt::{compose, FileSource};
use dsc_core::selection::Selection;
use dsc_core::settings::Settings;
use dsc_core::Error;
use providers::config::CompletionConfig;
use providers::CompletionClient;
use tracing::info;

use super::{App, ConfirmAction, ConfirmState, JobMsg, Tab};

pub const CODE_FILE_NAME: &str = "deepseek_code.txt";

async fn request_completion(settings: &Settings, prompt: &str) -> dsc_core::Result<ChatResult> {
    let cfg = CompletionConfig::from_env_and_file(&settings.api_key)
        .map_err(|e| ChatError::Other(format!("config: {:#}", e)))?;
    let client =
        CompletionClient::new(cfg).map_err(|e| ChatError::Other(format!("client: {:#}", e)))?;
    let opts = ChatOpts {
        model: settings.model.clone(),
        temperature: Some(settings.temperature),
        max_tokens: Some(settings.max_tokens),
    };
    Ok(client.send_chat(&[Message::user(prompt)], &opts).await?)
}

pub fn write_code(dir: &Path, code: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(CODE_FILE_NAME);
    fs::write(&path, code).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

fn copy_to_clipboard(text: &str) -> anyhow::Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("open clipboard")?;
    clipboard
        .set_text(text.to_string())
        .context("set clipboard text")?;
    Ok(())
}

impl App {
    // Assembles the prompt from the chosen sources and sends it. An
    // oversized selection asks for confirmation first; `Y` comes back here
    // with `allow_oversize`.
    pub fn send(&mut self, allow_oversize: bool) {
        if self.sending {
            return;
        }
        let selections: Vec<&Selection> = match self.source {
            FileSource::Local => vec![self.local.selection()],
            FileSource::Remote => vec![self.remote.selection()],
            FileSource::Both => vec![self.local.selection(), self.remote.selection()],
        };
        let composed = compose(
            &self.settings,
            &self.system_input.text,
            &self.user_input.text,
            &selections,
            allow_oversize,
        );
        match composed {
            Ok(prompt) => self.spawn_chat(prompt),
            Err(Error::SizeLimitExceeded { total, .. }) => {
                self.confirm = Some(ConfirmState {
                    action: ConfirmAction::SendOversize { total },
                });
            }
            Err(e) => self.fail(e),
        }
    }

    fn spawn_chat(&mut self, prompt: String) {
        let settings = self.settings.clone();
        info!(
            target: "tui",
            "send: model={} source={:?} prompt_len={}",
            settings.model,
            self.source,
            prompt.len()
        );
        self.sending = true;
        self.tab = Tab::Response;
        self.spawn_job("chat", move |tx| async move {
            let result = request_completion(&settings, &prompt).await;
            let _ = tx.send(JobMsg::Reply {
                request: prompt,
                result,
            });
        });
    }

    pub(crate) fn apply_reply(&mut self, request: String, result: dsc_core::Result<ChatResult>) {
        self.sending = false;
        match result {
            Ok(res) => {
                self.last_usage = res.prompt_tokens.zip(res.completion_tokens);
                self.present(&res.text);
                self.info(self.text().response_ready(res.text.chars().count()));
                match self.store.record(&request, &res.text) {
                    Ok(_) => {
                        self.history = self.store.history();
                        self.history_cursor = self.history.len().saturating_sub(1);
                    }
                    Err(e) => self.fail(e),
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn current_code(&self) -> Option<String> {
        self.presented
            .as_ref()
            .map(|p| p.code.clone())
            .filter(|c| !c.is_empty())
    }

    pub fn copy_code(&mut self) {
        let Some(code) = self.current_code() else {
            self.info(self.text().nothing_to_copy);
            return;
        };
        match copy_to_clipboard(&code) {
            Ok(()) => self.info(self.text().code_copied),
            Err(e) => self.fail(format!("{:#}", e)),
        }
    }

    pub fn download_code(&mut self) {
        let Some(code) = self.current_code() else {
            self.info(self.text().nothing_to_copy);
            return;
        };
        match write_code(Path::new("."), &code) {
            Ok(path) => self.info(self.text().code_written(&path.display().to_string())),
            Err(e) => self.fail(format!("{:#}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{test_app, NoticeLevel, ResponseView};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn ready_app() -> App {
        let mut app = test_app();
        app.settings.api_key = "sk-test".into();
        app.user_input.set("explain");
        app
    }

    #[test]
    fn missing_key_is_reported_before_anything_else() {
        let mut app = test_app();
        app.send(false);
        assert!(!app.sending);
        assert!(app.confirm.is_none());
        assert!(app
            .notice
            .as_ref()
            .unwrap()
            .text
            .contains(&Error::MissingCredential.to_string()));
    }

    #[test]
    fn blank_prompt_is_reported() {
        let mut app = ready_app();
        app.user_input.set("   ");
        app.send(false);
        assert!(!app.sending);
        assert!(app
            .notice
            .as_ref()
            .unwrap()
            .text
            .contains(&Error::MissingPrompt.to_string()));
    }

    #[test]
    fn oversize_asks_and_no_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let chunk = "x".repeat(3 * 1024 * 1024);
        std::fs::write(dir.path().join("a.txt"), &chunk).unwrap();
        std::fs::write(dir.path().join("b.txt"), &chunk).unwrap();

        let mut app = ready_app();
        app.add_dropped(&dir.path().display().to_string());
        assert_eq!(app.local.selection().len(), 2);

        app.send(false);
        assert!(matches!(
            app.confirm.as_ref().map(|c| &c.action),
            Some(ConfirmAction::SendOversize { total }) if *total == 6 * 1024 * 1024
        ));
        app.on_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE));
        assert!(app.confirm.is_none());
        assert!(!app.sending);
        assert_eq!(app.local.selection().len(), 2);
    }

    #[test]
    fn reply_is_presented_and_recorded() {
        let mut app = ready_app();
        app.sending = true;
        app.apply_reply(
            "prompt".into(),
            Ok(ChatResult {
                text: "Here\n```rust\nfn x() {}\n```\n".into(),
                finish_reason: Some("stop".into()),
                prompt_tokens: Some(3),
                completion_tokens: Some(4),
            }),
        );
        assert!(!app.sending);
        assert_eq!(app.tab, Tab::Response);
        assert_eq!(app.response_view, ResponseView::Raw);
        assert_eq!(app.presented.as_ref().unwrap().code, "fn x() {}");
        assert_eq!(app.history.len(), 1);
        assert_eq!(app.history[0].request, "prompt");
        assert_eq!(app.last_usage, Some((3, 4)));
    }

    #[test]
    fn failed_reply_keeps_history_untouched() {
        let mut app = ready_app();
        app.sending = true;
        app.apply_reply("p".into(), Err(ChatError::Auth("401".into()).into()));
        assert!(!app.sending);
        assert!(app.history.is_empty());
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn code_is_written_to_the_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_code(dir.path(), "fn main() {}").unwrap();
        assert_eq!(path.file_name().unwrap(), CODE_FILE_NAME);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "fn main() {}");
    }

    #[test]
    fn nothing_to_copy_without_code() {
        let mut app = test_app();
        app.present("no fences here");
        app.copy_code();
        assert_eq!(app.notice.as_ref().unwrap().text, app.text().nothing_to_copy);
    }
}
