use crossterm::event::{KeyCode, KeyEvent};
use dsc_core::settings::{Language, Settings, Theme, DEFAULT_MODEL};

use super::input::TextInput;
use super::{cycle, App};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsField {
    ApiKey,
    Model,
    Temperature,
    MaxTokens,
    Theme,
    Language,
}

impl SettingsField {
    pub const ALL: [SettingsField; 6] = [
        SettingsField::ApiKey,
        SettingsField::Model,
        SettingsField::Temperature,
        SettingsField::MaxTokens,
        SettingsField::Theme,
        SettingsField::Language,
    ];

    pub fn is_toggle(self) -> bool {
        matches!(self, SettingsField::Theme | SettingsField::Language)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormError {
    Temperature,
    MaxTokens,
}

#[derive(Clone, Debug)]
pub struct SettingsForm {
    pub api_key: TextInput,
    pub model: TextInput,
    pub temperature: TextInput,
    pub max_tokens: TextInput,
    pub theme: Theme,
    pub language: Language,
    pub focus: SettingsField,
}

impl SettingsForm {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            api_key: TextInput::with_text(&s.api_key),
            model: TextInput::with_text(&s.model),
            temperature: TextInput::with_text(&s.temperature.to_string()),
            max_tokens: TextInput::with_text(&s.max_tokens.to_string()),
            theme: s.theme,
            language: s.language,
            focus: SettingsField::ApiKey,
        }
    }

    pub fn to_settings(&self) -> Result<Settings, FormError> {
        let temperature = self
            .temperature
            .text
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|t| t.is_finite() && *t >= 0.0)
            .ok_or(FormError::Temperature)?;
        let max_tokens = self
            .max_tokens
            .text
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(FormError::MaxTokens)?;
        let model = match self.model.text.trim() {
            "" => DEFAULT_MODEL.to_string(),
            m => m.to_string(),
        };
        Ok(Settings {
            api_key: self.api_key.text.trim().to_string(),
            model,
            temperature,
            max_tokens,
            theme: self.theme,
            language: self.language,
        })
    }

    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            SettingsField::ApiKey => Some(&mut self.api_key),
            SettingsField::Model => Some(&mut self.model),
            SettingsField::Temperature => Some(&mut self.temperature),
            SettingsField::MaxTokens => Some(&mut self.max_tokens),
            SettingsField::Theme | SettingsField::Language => None,
        }
    }

    pub fn cycle(&mut self, forward: bool) {
        self.focus = cycle(&SettingsField::ALL, self.focus, forward);
    }

    fn toggle_focused(&mut self) {
        match self.focus {
            SettingsField::Theme => self.theme = self.theme.toggled(),
            SettingsField::Language => self.language = self.language.toggled(),
            _ => {}
        }
    }
}

impl App {
    pub(crate) fn settings_key(&mut self, key: KeyEvent) {
        let toggle = self.settings_form.focus.is_toggle();
        match key.code {
            KeyCode::Up => self.settings_form.cycle(false),
            KeyCode::Down => self.settings_form.cycle(true),
            KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right if toggle => {
                self.settings_form.toggle_focused()
            }
            KeyCode::Enter => self.save_settings(),
            _ => {
                if let Some(input) = self.settings_form.focused_input() {
                    input.handle_key(&key, false);
                }
            }
        }
    }

    pub fn save_settings(&mut self) {
        let parsed = match self.settings_form.to_settings() {
            Ok(s) => s,
            Err(FormError::Temperature) => {
                self.fail(self.text().invalid_temperature);
                return;
            }
            Err(FormError::MaxTokens) => {
                self.fail(self.text().invalid_max_tokens);
                return;
            }
        };
        match self.store.save(&parsed) {
            Ok(()) => {
                self.settings = parsed;
                self.settings_form = SettingsForm {
                    focus: self.settings_form.focus,
                    ..SettingsForm::from_settings(&self.settings)
                };
                self.info(self.text().settings_saved);
            }
            Err(e) => self.fail(e),
        }
    }
}
