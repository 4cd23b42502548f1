use std::future::Future;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use dsc_core::extract::Presented;
use dsc_core::llm::ChatResult;
use dsc_core::local::LocalCollector;
use dsc_core::prompt::FileSource;
use dsc_core::remote::{Fetched, RemoteCollector};
use dsc_core::repo::TreeEntry;
use dsc_core::settings::{HistoryEntry, Settings, SettingsStore};
use ratatui::layout::Rect;
use tracing::{error, info};

use crate::persist::FileStore;
use crate::strings::{strings, Strings};

pub mod files;
pub mod github;
pub mod history;
pub mod input;
pub mod send;
pub mod settings;

use input::TextInput;
use settings::SettingsForm;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    Files,
    GitHub,
    Prompt,
    Response,
    History,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Files,
        Tab::GitHub,
        Tab::Prompt,
        Tab::Response,
        Tab::History,
        Tab::Settings,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilesFocus {
    Path,
    Filter,
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GitHubFocus {
    Url,
    Branches,
    Tree,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptFocus {
    System,
    User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseView {
    Raw,
    Code,
}

pub(crate) fn cycle<T: Copy + PartialEq>(all: &[T], cur: T, forward: bool) -> T {
    let n = all.len();
    let i = all.iter().position(|x| *x == cur).unwrap_or(0);
    if forward {
        all[(i + 1) % n]
    } else {
        all[(i + n - 1) % n]
    }
}

#[derive(Clone, Debug)]
pub struct ConfirmState {
    pub action: ConfirmAction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    SendOversize { total: usize },
    ClearHistory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Clone, Debug)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
}

pub type Listing = (Vec<String>, String, Vec<TreeEntry>);

pub enum JobMsg {
    Listing {
        epoch: u64,
        result: Result<Listing, String>,
    },
    Tree {
        epoch: u64,
        result: Result<Vec<TreeEntry>, String>,
    },
    Fetched(Fetched),
    Reply {
        request: String,
        result: dsc_core::Result<ChatResult>,
    },
}

pub struct App {
    pub tab: Tab,
    pub should_quit: bool,
    pub dirty: bool,
    pub show_help: bool,
    pub confirm: Option<ConfirmState>,
    pub notice: Option<Notice>,
    // Files
    pub local: LocalCollector,
    pub path_input: TextInput,
    pub filter_input: TextInput,
    pub files_focus: FilesFocus,
    pub files_cursor: usize,
    // GitHub
    pub remote: RemoteCollector,
    pub url_input: TextInput,
    pub gh_focus: GitHubFocus,
    pub branch_cursor: usize,
    pub tree_cursor: usize,
    pub gh_loading: bool,
    // Prompt
    pub system_input: TextInput,
    pub user_input: TextInput,
    pub prompt_focus: PromptFocus,
    pub source: FileSource,
    // Response
    pub presented: Option<Presented>,
    pub response_view: ResponseView,
    pub response_scroll: u16,
    pub response_max_scroll: u16,
    pub response_area: Option<Rect>,
    pub sending: bool,
    pub last_usage: Option<(u32, u32)>,
    // History
    pub history: Vec<HistoryEntry>,
    pub history_cursor: usize,
    // Settings
    pub settings: Settings,
    pub settings_form: SettingsForm,
    store: SettingsStore<FileStore>,
    tx: Sender<JobMsg>,
    rx: Receiver<JobMsg>,
}

impl App {
    pub fn new() -> Self {
        let env_key = std::env::var("DEEPSEEK_API_KEY").ok();
        Self::with_store(FileStore::open_default(), env_key)
    }

    // `env_key` fills in the credential when none is saved; it is only
    // written to storage if the user saves the settings.
    pub fn with_store(store: FileStore, env_key: Option<String>) -> Self {
        let store = SettingsStore::new(store);
        let mut settings = store.settings();
        if settings.api_key.trim().is_empty() {
            if let Some(k) = env_key.filter(|k| !k.trim().is_empty()) {
                settings.api_key = k.trim().to_string();
            }
        }
        let history = store.history();
        let (tx, rx) = mpsc::channel();
        info!(target: "tui", "start: history={} lang={}", history.len(), settings.language.as_str());
        Self {
            tab: Tab::Files,
            should_quit: false,
            dirty: true,
            show_help: false,
            confirm: None,
            notice: None,
            local: LocalCollector::new(""),
            path_input: TextInput::default(),
            filter_input: TextInput::default(),
            files_focus: FilesFocus::Path,
            files_cursor: 0,
            remote: RemoteCollector::new(),
            url_input: TextInput::default(),
            gh_focus: GitHubFocus::Url,
            branch_cursor: 0,
            tree_cursor: 0,
            gh_loading: false,
            system_input: TextInput::default(),
            user_input: TextInput::default(),
            prompt_focus: PromptFocus::User,
            source: FileSource::default(),
            presented: None,
            response_view: ResponseView::Raw,
            response_scroll: 0,
            response_max_scroll: 0,
            response_area: None,
            sending: false,
            last_usage: None,
            history,
            history_cursor: 0,
            settings_form: SettingsForm::from_settings(&settings),
            settings,
            store,
            tx,
            rx,
        }
    }

    pub fn text(&self) -> &'static Strings {
        strings(self.settings.language)
    }

    pub fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!(target: "tui", "{}", text);
        self.notice = Some(Notice {
            text,
            level: NoticeLevel::Info,
        });
        self.dirty = true;
    }

    pub fn fail(&mut self, err: impl std::fmt::Display) {
        error!(target: "tui", "{}", err);
        self.notice = Some(Notice {
            text: format!("{}: {}", self.text().error_prefix, err),
            level: NoticeLevel::Error,
        });
        self.dirty = true;
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.dirty = true;

        if self.show_help {
            if matches!(key.code, KeyCode::F(1) | KeyCode::Esc | KeyCode::Char('q')) {
                self.show_help = false;
            }
            return;
        }

        if let Some(confirm) = self.confirm.clone() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirm = None;
                    match confirm.action {
                        ConfirmAction::SendOversize { .. } => self.send(true),
                        ConfirmAction::ClearHistory => self.clear_history(),
                    }
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirm = None;
                    if let ConfirmAction::SendOversize { .. } = confirm.action {
                        self.info(self.text().send_aborted);
                    }
                }
                _ => {}
            }
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return;
            }
            KeyCode::Esc => {
                self.leave_field();
                return;
            }
            KeyCode::Char('s') if ctrl => {
                self.send(false);
                return;
            }
            KeyCode::Char('o') if ctrl => {
                self.source = self.source.next();
                return;
            }
            KeyCode::F(1) => {
                self.show_help = true;
                return;
            }
            KeyCode::F(n @ 2..=7) => {
                self.tab = Tab::ALL[(n - 2) as usize];
                return;
            }
            KeyCode::Tab => {
                self.cycle_focus(true);
                return;
            }
            KeyCode::BackTab => {
                self.cycle_focus(false);
                return;
            }
            _ => {}
        }

        match self.tab {
            Tab::Files => self.files_key(key),
            Tab::GitHub => self.github_key(key),
            Tab::Prompt => self.prompt_key(key),
            Tab::Response => self.response_key(key),
            Tab::History => self.history_key(key),
            Tab::Settings => self.settings_key(key),
        }
    }

    pub fn on_paste(&mut self, text: &str) {
        self.dirty = true;
        if self.show_help || self.confirm.is_some() {
            return;
        }
        if self.tab == Tab::Files && self.files_focus != FilesFocus::Filter {
            self.add_dropped(text);
            return;
        }
        let multiline = self.tab == Tab::Prompt;
        let text = if multiline {
            text.replace("\r\n", "\n")
        } else {
            text.lines().collect::<Vec<_>>().join(" ")
        };
        if let Some(input) = self.focused_input() {
            input.insert_text(&text);
        }
        if self.tab == Tab::Files {
            self.sync_filter();
        }
    }

    fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.tab {
            Tab::Files => match self.files_focus {
                FilesFocus::Path => Some(&mut self.path_input),
                FilesFocus::Filter => Some(&mut self.filter_input),
                FilesFocus::List => None,
            },
            Tab::GitHub => match self.gh_focus {
                GitHubFocus::Url => Some(&mut self.url_input),
                _ => None,
            },
            Tab::Prompt => match self.prompt_focus {
                PromptFocus::System => Some(&mut self.system_input),
                PromptFocus::User => Some(&mut self.user_input),
            },
            Tab::Settings => self.settings_form.focused_input(),
            Tab::Response | Tab::History => None,
        }
    }

    // Esc: text fields hand focus to the tab's list; elsewhere it only
    // dismisses the notice.
    fn leave_field(&mut self) {
        match self.tab {
            Tab::Files if self.files_focus != FilesFocus::List => {
                self.files_focus = FilesFocus::List
            }
            Tab::GitHub if self.gh_focus == GitHubFocus::Url => self.gh_focus = GitHubFocus::Tree,
            _ => self.notice = None,
        }
    }

    fn cycle_focus(&mut self, forward: bool) {
        match self.tab {
            Tab::Files => {
                self.files_focus = cycle(
                    &[FilesFocus::Path, FilesFocus::Filter, FilesFocus::List],
                    self.files_focus,
                    forward,
                )
            }
            Tab::GitHub => {
                self.gh_focus = cycle(
                    &[GitHubFocus::Url, GitHubFocus::Branches, GitHubFocus::Tree],
                    self.gh_focus,
                    forward,
                )
            }
            Tab::Prompt => {
                self.prompt_focus = cycle(
                    &[PromptFocus::System, PromptFocus::User],
                    self.prompt_focus,
                    forward,
                )
            }
            Tab::Settings => self.settings_form.cycle(forward),
            Tab::Response | Tab::History => {}
        }
    }

    fn prompt_key(&mut self, key: KeyEvent) {
        let input = match self.prompt_focus {
            PromptFocus::System => &mut self.system_input,
            PromptFocus::User => &mut self.user_input,
        };
        input.handle_key(&key, true);
    }

    fn response_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.scroll_response(-1),
            KeyCode::Down => self.scroll_response(1),
            KeyCode::PageUp => self.scroll_response(-10),
            KeyCode::PageDown => self.scroll_response(10),
            KeyCode::Home => self.response_scroll = 0,
            KeyCode::End => self.response_scroll = self.response_max_scroll,
            KeyCode::Char('v') => {
                self.response_view = match self.response_view {
                    ResponseView::Raw => ResponseView::Code,
                    ResponseView::Code => ResponseView::Raw,
                };
                self.response_scroll = 0;
            }
            KeyCode::Char('y') => self.copy_code(),
            KeyCode::Char('w') => self.download_code(),
            _ => {}
        }
    }

    pub fn scroll_response(&mut self, delta: i32) {
        let next = (self.response_scroll as i32 + delta).clamp(0, self.response_max_scroll as i32);
        self.response_scroll = next as u16;
        self.dirty = true;
    }

    pub(crate) fn present(&mut self, raw: &str) {
        self.presented = Some(Presented::new(raw));
        self.response_view = ResponseView::Raw;
        self.response_scroll = 0;
        self.tab = Tab::Response;
    }

    // Runs `job` on its own thread with a private tokio runtime; the job
    // reports back through the app channel, drained in `on_tick`.
    pub(crate) fn spawn_job<F, Fut>(&self, name: &'static str, job: F)
    where
        F: FnOnce(Sender<JobMsg>) -> Fut + Send + 'static,
        Fut: Future<Output = ()>,
    {
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!(target: "tui", "{} job: runtime: {}", name, e);
                    return;
                }
            };
            rt.block_on(job(tx));
        });
    }

    pub fn on_tick(&mut self) {
        for _ in 0..64 {
            match self.rx.try_recv() {
                Ok(msg) => {
                    self.handle_job(msg);
                    self.dirty = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    pub fn handle_job(&mut self, msg: JobMsg) {
        match msg {
            JobMsg::Listing { epoch, result } => self.apply_listing(epoch, result),
            JobMsg::Tree { epoch, result } => self.apply_tree(epoch, result),
            JobMsg::Fetched(f) => self.apply_fetched(f),
            JobMsg::Reply { request, result } => self.apply_reply(request, result),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_app() -> App {
    App::with_store(FileStore::default(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsc_core::settings::Language;

    fn press(app: &mut App, code: KeyCode) {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn env_key_fills_missing_credential_only() {
        let app = App::with_store(FileStore::default(), Some(" sk-env ".into()));
        assert_eq!(app.settings.api_key, "sk-env");

        let mut store = FileStore::default();
        dsc_core::settings::KvStore::set(&mut store, "apiKey", "sk-saved").unwrap();
        let app = App::with_store(store, Some("sk-env".into()));
        assert_eq!(app.settings.api_key, "sk-saved");
    }

    #[test]
    fn function_keys_switch_tabs() {
        let mut app = test_app();
        press(&mut app, KeyCode::F(4));
        assert_eq!(app.tab, Tab::Prompt);
        press(&mut app, KeyCode::F(7));
        assert_eq!(app.tab, Tab::Settings);
        press(&mut app, KeyCode::F(1));
        assert!(app.show_help);
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.tab, Tab::Settings);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_help && !app.should_quit);
    }

    #[test]
    fn esc_leaves_the_field_and_only_ctrl_c_quits() {
        let mut app = test_app();
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.files_focus, FilesFocus::List);
        assert!(!app.should_quit);

        app.tab = Tab::GitHub;
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.gh_focus, GitHubFocus::Tree);

        app.tab = Tab::Prompt;
        app.user_input.set("draft");
        app.info("hello");
        press(&mut app, KeyCode::Esc);
        assert!(app.notice.is_none());
        assert_eq!(app.user_input.text, "draft");
        assert!(!app.should_quit);

        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn tab_cycles_focus_within_the_tab() {
        let mut app = test_app();
        assert_eq!(app.files_focus, FilesFocus::Path);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.files_focus, FilesFocus::Filter);
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.files_focus, FilesFocus::List);
    }

    #[test]
    fn paste_goes_to_the_focused_prompt() {
        let mut app = test_app();
        app.tab = Tab::Prompt;
        app.on_paste("line one\r\nline two");
        assert_eq!(app.user_input.text, "line one\nline two");
        app.tab = Tab::GitHub;
        app.on_paste("https://github.com/a/b\n");
        assert_eq!(app.url_input.text, "https://github.com/a/b");
    }

    #[test]
    fn notices_use_the_active_language() {
        let mut app = test_app();
        app.fail("boom");
        assert_eq!(app.notice.as_ref().unwrap().text, "Ошибка: boom");
        app.settings.language = Language::En;
        app.fail("boom");
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Error);
        assert_eq!(app.notice.as_ref().unwrap().text, "Error: boom");
    }

    #[test]
    fn response_scroll_is_clamped() {
        let mut app = test_app();
        app.response_max_scroll = 5;
        app.scroll_response(-3);
        assert_eq!(app.response_scroll, 0);
        app.scroll_response(50);
        assert_eq!(app.response_scroll, 5);
    }
}
