use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug, Default)]
pub struct TextInput {
    pub text: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn with_text(s: &str) -> Self {
        let mut t = Self::default();
        t.set(s);
        t
    }

    pub fn set(&mut self, s: &str) {
        self.text = s.to_string();
        self.cursor = self.text.graphemes(true).count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    // Applies an editing key. Returns false when the key is not an edit so
    // the caller can use it for navigation.
    pub fn handle_key(&mut self, key: &KeyEvent, multiline: bool) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('a') if ctrl => self.move_line_start(),
            KeyCode::Char('e') if ctrl => self.move_line_end(),
            KeyCode::Char('w') if ctrl => self.delete_prev_word(),
            KeyCode::Char('u') if ctrl => self.kill_to_line_start(),
            KeyCode::Char('k') if ctrl => self.kill_to_line_end(),
            KeyCode::Char(_) if ctrl => return false,
            KeyCode::Char(ch) => {
                let mut buf = [0u8; 4];
                self.insert_text(ch.encode_utf8(&mut buf));
            }
            KeyCode::Enter if multiline => self.insert_text("\n"),
            KeyCode::Backspace => self.delete_left(),
            KeyCode::Delete => self.delete_right(),
            KeyCode::Left if ctrl => self.move_word_left(),
            KeyCode::Right if ctrl => self.move_word_right(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.text.graphemes(true).count());
            }
            KeyCode::Home => self.move_line_start(),
            KeyCode::End => self.move_line_end(),
            _ => return false,
        }
        true
    }

    pub fn insert_text(&mut self, s: &str) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        let idx = self.cursor.min(parts.len());
        let mut out = String::with_capacity(self.text.len() + s.len());
        for g in &parts[..idx] {
            out.push_str(g);
        }
        out.push_str(s);
        for g in &parts[idx..] {
            out.push_str(g);
        }
        self.text = out;
        let added = s.graphemes(true).count();
        self.cursor = (idx + added).min(self.text.graphemes(true).count());
    }

    pub fn delete_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let idx = self.cursor.min(parts.len());
        parts.remove(idx - 1);
        self.text = parts.concat();
        self.cursor = idx - 1;
    }

    pub fn delete_right(&mut self) {
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let idx = self.cursor.min(parts.len());
        if idx < parts.len() {
            parts.remove(idx);
            self.text = parts.concat();
        }
    }

    fn line_start(parts: &[&str], from: usize) -> usize {
        let mut i = from.min(parts.len());
        while i > 0 && parts[i - 1] != "\n" {
            i -= 1;
        }
        i
    }

    fn line_end(parts: &[&str], from: usize) -> usize {
        let mut i = from.min(parts.len());
        while i < parts.len() && parts[i] != "\n" {
            i += 1;
        }
        i
    }

    pub fn move_line_start(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        self.cursor = Self::line_start(&parts, self.cursor);
    }

    pub fn move_line_end(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        self.cursor = Self::line_end(&parts, self.cursor);
    }

    fn word_left(parts: &[&str], from: usize) -> usize {
        let mut i = from.min(parts.len());
        while i > 0 && parts[i - 1].trim().is_empty() {
            i -= 1;
        }
        while i > 0 && !parts[i - 1].trim().is_empty() {
            i -= 1;
        }
        i
    }

    pub fn move_word_left(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        self.cursor = Self::word_left(&parts, self.cursor);
    }

    pub fn move_word_right(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        let mut i = self.cursor.min(parts.len());
        while i < parts.len() && parts[i].trim().is_empty() {
            i += 1;
        }
        while i < parts.len() && !parts[i].trim().is_empty() {
            i += 1;
        }
        self.cursor = i;
    }

    pub fn delete_prev_word(&mut self) {
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let end = self.cursor.min(parts.len());
        let start = Self::word_left(&parts, end);
        parts.drain(start..end);
        self.text = parts.concat();
        self.cursor = start;
    }

    pub fn kill_to_line_start(&mut self) {
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let end = self.cursor.min(parts.len());
        let start = Self::line_start(&parts, end);
        parts.drain(start..end);
        self.text = parts.concat();
        self.cursor = start;
    }

    pub fn kill_to_line_end(&mut self) {
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let start = self.cursor.min(parts.len());
        let end = Self::line_end(&parts, start);
        parts.drain(start..end);
        self.text = parts.concat();
    }
}
