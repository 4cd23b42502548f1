use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use directories::BaseDirs;
use dsc_core::local::AddReport;
use tracing::warn;

use super::{App, FilesFocus};

pub fn resolve_typed_path(raw: &str) -> PathBuf {
    let raw = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(raw)
}

impl App {
    pub(crate) fn files_key(&mut self, key: KeyEvent) {
        match self.files_focus {
            FilesFocus::Path => {
                if key.code == KeyCode::Enter {
                    self.add_from_path_input();
                } else {
                    self.path_input.handle_key(&key, false);
                }
            }
            FilesFocus::Filter => {
                if self.filter_input.handle_key(&key, false) {
                    self.sync_filter();
                }
            }
            FilesFocus::List => self.files_list_key(key),
        }
    }

    fn files_list_key(&mut self, key: KeyEvent) {
        let len = self.local.selection().len();
        match key.code {
            KeyCode::Up => self.files_cursor = self.files_cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.files_cursor + 1 < len {
                    self.files_cursor += 1;
                }
            }
            KeyCode::Home => self.files_cursor = 0,
            KeyCode::End => self.files_cursor = len.saturating_sub(1),
            KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('d') => self.remove_selected_file(),
            KeyCode::Char('x') => {
                self.local.clear();
                self.files_cursor = 0;
            }
            _ => {}
        }
    }

    pub(crate) fn sync_filter(&mut self) {
        self.local.set_filter(&self.filter_input.text);
    }

    pub fn add_from_path_input(&mut self) {
        if self.path_input.is_blank() {
            return;
        }
        let path = resolve_typed_path(&self.path_input.text);
        let report = self.local.add_path(&path);
        if report.errors.is_empty() {
            self.path_input.clear();
        }
        self.report_added(report);
    }

    pub fn add_dropped(&mut self, pasted: &str) {
        let report = self.local.add_dropped(pasted);
        self.report_added(report);
    }

    fn report_added(&mut self, report: AddReport) {
        self.clamp_files_cursor();
        let summary = self
            .text()
            .added(report.accepted(), report.filtered, report.errors.len());
        match report.errors.first() {
            None => self.info(summary),
            Some(first) => {
                for e in &report.errors[1..] {
                    warn!(target: "tui", "add failed: {}", e);
                }
                self.fail(format!("{} ({})", first, summary));
            }
        }
    }

    pub fn remove_selected_file(&mut self) {
        let Some(path) = self
            .local
            .selection()
            .iter()
            .nth(self.files_cursor)
            .map(|f| f.path.clone())
        else {
            return;
        };
        self.local.remove_entry(&path);
        self.clamp_files_cursor();
    }

    fn clamp_files_cursor(&mut self) {
        let len = self.local.selection().len();
        self.files_cursor = self.files_cursor.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{test_app, NoticeLevel, Tab};
    use crossterm::event::KeyModifiers;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("README.md"), "# readme").unwrap();
        dir
    }

    fn type_into(app: &mut App, s: &str) {
        for ch in s.chars() {
            app.on_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
        }
    }

    #[test]
    fn typed_directory_is_added_with_filter() {
        let dir = tree();
        let mut app = test_app();
        app.files_focus = FilesFocus::Filter;
        type_into(&mut app, ".rs");
        assert_eq!(app.local.filter().as_str(), ".rs");

        app.files_focus = FilesFocus::Path;
        app.path_input.set(&dir.path().display().to_string());
        app.on_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));

        let paths: Vec<_> = app.local.selection().iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec!["src/main.rs".to_string()]);
        assert!(app.path_input.text.is_empty());
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Info);
    }

    #[test]
    fn paste_on_files_tab_adds_dropped_paths() {
        let dir = tree();
        let mut app = test_app();
        assert_eq!(app.tab, Tab::Files);
        let pasted = format!("'{}'", dir.path().join("README.md").display());
        app.on_paste(&pasted);
        assert!(app.local.selection().contains("README.md"));
    }

    #[test]
    fn missing_path_keeps_the_input_and_reports() {
        let mut app = test_app();
        app.path_input.set("/definitely/not/here.rs");
        app.add_from_path_input();
        assert!(app.local.selection().is_empty());
        assert_eq!(app.path_input.text, "/definitely/not/here.rs");
        assert_eq!(app.notice.as_ref().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn list_removal_and_clear() {
        let dir = tree();
        let mut app = test_app();
        app.add_dropped(&dir.path().display().to_string());
        assert_eq!(app.local.selection().len(), 2);

        app.files_focus = FilesFocus::List;
        app.on_key(KeyEvent::new(KeyCode::End, KeyModifiers::NONE));
        app.on_key(KeyEvent::new(KeyCode::Delete, KeyModifiers::NONE));
        assert_eq!(app.local.selection().len(), 1);
        assert_eq!(app.files_cursor, 0);

        app.on_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert!(app.local.selection().is_empty());
    }

    #[test]
    fn quotes_are_stripped_from_typed_paths() {
        assert_eq!(resolve_typed_path(" \"/tmp/a b\" "), PathBuf::from("/tmp/a b"));
    }
}
