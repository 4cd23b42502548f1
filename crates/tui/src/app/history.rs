use chrono::{DateTime, Local, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use dsc_core::selection::parse_formatted;

use super::{App, ConfirmAction, ConfirmState};

pub fn request_files(request: &str) -> Vec<String> {
    parse_formatted(request).into_iter().map(|(p, _)| p).collect()
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

impl App {
    pub(crate) fn history_key(&mut self, key: KeyEvent) {
        let len = self.history.len();
        match key.code {
            KeyCode::Up => self.history_cursor = self.history_cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.history_cursor + 1 < len {
                    self.history_cursor += 1;
                }
            }
            KeyCode::Home => self.history_cursor = 0,
            KeyCode::End => self.history_cursor = len.saturating_sub(1),
            KeyCode::Enter => self.replay_history(self.history_cursor),
            KeyCode::Char('x') | KeyCode::Delete => {
                if len > 0 {
                    self.confirm = Some(ConfirmState {
                        action: ConfirmAction::ClearHistory,
                    });
                }
            }
            _ => {}
        }
    }

    pub fn replay_history(&mut self, idx: usize) {
        let Some(entry) = self.history.get(idx) else {
            return;
        };
        let raw = entry.response.clone();
        self.present(&raw);
    }

    pub fn clear_history(&mut self) {
        match self.store.clear_history() {
            Ok(()) => {
                self.history.clear();
                self.history_cursor = 0;
                self.info(self.text().history_cleared);
            }
            Err(e) => self.fail(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{test_app, Tab};
    use crossterm::event::KeyModifiers;
    use dsc_core::selection::{SelectedFile, Selection};

    fn press(app: &mut App, code: KeyCode) {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn files_are_listed_from_the_request_text() {
        let mut sel = Selection::new();
        sel.insert(SelectedFile::remote("src/a.rs", "a".into()));
        sel.insert(SelectedFile::remote("b.md", "b".into()));
        let request = format!("system\n\n{}\n\nuser", sel.format());
        assert_eq!(request_files(&request), vec!["src/a.rs", "b.md"]);
        assert!(request_files("no files here").is_empty());
    }

    #[test]
    fn replay_extracts_code_again() {
        let mut app = test_app();
        app.store.record("q1", "```\none\n```").unwrap();
        app.store.record("q2", "plain").unwrap();
        app.history = app.store.history();
        app.tab = Tab::History;

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.tab, Tab::Response);
        assert_eq!(app.presented.as_ref().unwrap().code, "one");

        app.tab = Tab::History;
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.presented.as_ref().unwrap().raw, "plain");
        assert_eq!(app.presented.as_ref().unwrap().code, "");
    }

    #[test]
    fn clearing_asks_first() {
        let mut app = test_app();
        app.store.record("q", "a").unwrap();
        app.history = app.store.history();
        app.tab = Tab::History;

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(
            app.confirm.as_ref().map(|c| c.action.clone()),
            Some(ConfirmAction::ClearHistory)
        );
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.history.len(), 1);

        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.history.is_empty());
        assert!(app.store.history().is_empty());
    }
}
