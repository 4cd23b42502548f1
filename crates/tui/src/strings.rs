// UI strings in both languages. Russian is the default, as in saved settings.

use dsc_core::prompt::FileSource;
use dsc_core::selection::format_size;
use dsc_core::settings::{Language, Theme};
use unicode_width::UnicodeWidthStr;

pub struct Strings {
    pub lang: Language,
    pub tabs: [&'static str; 6],
    pub title_path: &'static str,
    pub title_filter: &'static str,
    pub title_selected: &'static str,
    pub title_url: &'static str,
    pub title_branches: &'static str,
    pub title_tree: &'static str,
    pub title_system: &'static str,
    pub title_user: &'static str,
    pub title_response: &'static str,
    pub title_code: &'static str,
    pub title_history: &'static str,
    pub title_request_files: &'static str,
    pub title_settings: &'static str,
    pub title_confirm: &'static str,
    pub title_help: &'static str,
    pub hint_path: &'static str,
    pub hint_filter: &'static str,
    pub hint_url: &'static str,
    pub hint_system: &'static str,
    pub hint_user: &'static str,
    pub no_files: &'static str,
    pub no_tree: &'static str,
    pub no_response: &'static str,
    pub no_history: &'static str,
    pub waiting: &'static str,
    pub loading: &'static str,
    pub size_warning: &'static str,
    pub label_api_key: &'static str,
    pub label_model: &'static str,
    pub label_temperature: &'static str,
    pub label_max_tokens: &'static str,
    pub label_theme: &'static str,
    pub label_language: &'static str,
    pub label_source: &'static str,
    pub settings_saved: &'static str,
    pub settings_hint: &'static str,
    pub invalid_temperature: &'static str,
    pub invalid_max_tokens: &'static str,
    pub code_copied: &'static str,
    pub nothing_to_copy: &'static str,
    pub history_cleared: &'static str,
    pub send_aborted: &'static str,
    pub confirm_clear_history: &'static str,
    pub error_prefix: &'static str,
    pub status_hints: &'static [&'static str],
    pub help_lines: &'static [&'static str],
}

pub const RU: Strings = Strings {
    lang: Language::Ru,
    tabs: ["Файлы", "GitHub", "Запрос", "Ответ", "История", "Настройки"],
    title_path: " Путь к файлу или папке ",
    title_filter: " Фильтр расширений ",
    title_selected: " Выбранные файлы ",
    title_url: " URL репозитория ",
    title_branches: " Ветки ",
    title_tree: " Файлы репозитория ",
    title_system: " Системный промпт ",
    title_user: " Пользовательский промпт ",
    title_response: " Ответ ",
    title_code: " Код ",
    title_history: " История запросов ",
    title_request_files: " Файлы запроса ",
    title_settings: " Настройки ",
    title_confirm: " Подтверждение ",
    title_help: " Справка ",
    hint_path: "Введите путь и нажмите Enter, или перетащите файлы в терминал",
    hint_filter: "например .rs, .toml (пусто = все файлы)",
    hint_url: "https://github.com/owner/repo/tree/branch",
    hint_system: "Системный промпт (необязательно)",
    hint_user: "Опишите задачу",
    no_files: "Файлы не выбраны",
    no_tree: "Репозиторий не загружен",
    no_response: "Ответа пока нет",
    no_history: "История пуста",
    waiting: "Ожидание ответа...",
    loading: "Загрузка...",
    size_warning: "Внимание: общий размер файлов превышает 5 MB",
    label_api_key: "API ключ",
    label_model: "Модель",
    label_temperature: "Температура",
    label_max_tokens: "Макс. токенов",
    label_theme: "Тема",
    label_language: "Язык",
    label_source: "Источник файлов",
    settings_saved: "Настройки сохранены",
    settings_hint: "Up/Down: поле  Space: переключить  Enter: сохранить",
    invalid_temperature: "Температура должна быть числом",
    invalid_max_tokens: "Макс. токенов должно быть положительным целым",
    code_copied: "Код скопирован в буфер обмена",
    nothing_to_copy: "В ответе нет кода",
    history_cleared: "История очищена",
    send_aborted: "Отправка отменена",
    confirm_clear_history: "Очистить историю запросов? Y: да, N/Esc: нет",
    error_prefix: "Ошибка",
    status_hints: &[
        "Ctrl+S: отправить",
        "F2-F7: вкладки",
        "Tab: поле",
        "F1: справка",
        "Ctrl+C: выход",
    ],
    help_lines: &[
        "Вкладки",
        "  F2 Файлы  F3 GitHub  F4 Запрос  F5 Ответ  F6 История  F7 Настройки",
        "Общее",
        "  Ctrl+S: отправить запрос    Tab/Shift+Tab: следующее поле    Esc: выйти из поля    Ctrl+C: выход",
        "Файлы",
        "  Enter в поле пути: добавить файл или папку    Вставка/перетаскивание: добавить пути",
        "  Список: Up/Down выбор, Delete удалить, x очистить всё",
        "GitHub",
        "  Enter в поле URL: загрузить    Ветки: Enter переключить",
        "  Файлы: Space отметить, a выбрать все, n снять все",
        "Запрос",
        "  Enter: новая строка    Ctrl+O: источник файлов (локальные / GitHub / оба)",
        "Ответ",
        "  v: ответ/код    y: копировать код    w: сохранить deepseek_code.txt    PgUp/PgDn: прокрутка",
        "История",
        "  Enter: показать ответ    x: очистить историю",
        "Редактирование",
        "  Ctrl+A/E: начало/конец строки    Ctrl+W: удалить слово    Ctrl+U/K: удалить до начала/конца",
    ],
};

pub const EN: Strings = Strings {
    lang: Language::En,
    tabs: ["Files", "GitHub", "Prompt", "Response", "History", "Settings"],
    title_path: " File or folder path ",
    title_filter: " Extension filter ",
    title_selected: " Selected files ",
    title_url: " Repository URL ",
    title_branches: " Branches ",
    title_tree: " Repository files ",
    title_system: " System prompt ",
    title_user: " User prompt ",
    title_response: " Response ",
    title_code: " Code ",
    title_history: " Request history ",
    title_request_files: " Request files ",
    title_settings: " Settings ",
    title_confirm: " Confirm ",
    title_help: " Help ",
    hint_path: "Type a path and press Enter, or drop files onto the terminal",
    hint_filter: "e.g. .rs, .toml (empty = all files)",
    hint_url: "https://github.com/owner/repo/tree/branch",
    hint_system: "System prompt (optional)",
    hint_user: "Describe the task",
    no_files: "No files selected",
    no_tree: "No repository loaded",
    no_response: "No response yet",
    no_history: "History is empty",
    waiting: "Waiting for the response...",
    loading: "Loading...",
    size_warning: "Warning: total file size exceeds 5 MB",
    label_api_key: "API key",
    label_model: "Model",
    label_temperature: "Temperature",
    label_max_tokens: "Max tokens",
    label_theme: "Theme",
    label_language: "Language",
    label_source: "File source",
    settings_saved: "Settings saved",
    settings_hint: "Up/Down: field  Space: toggle  Enter: save",
    invalid_temperature: "Temperature must be a number",
    invalid_max_tokens: "Max tokens must be a positive integer",
    code_copied: "Code copied to clipboard",
    nothing_to_copy: "The response has no code",
    history_cleared: "History cleared",
    send_aborted: "Send cancelled",
    confirm_clear_history: "Clear the request history? Y: yes, N/Esc: no",
    error_prefix: "Error",
    status_hints: &[
        "Ctrl+S: send",
        "F2-F7: tabs",
        "Tab: field",
        "F1: help",
        "Ctrl+C: quit",
    ],
    help_lines: &[
        "Tabs",
        "  F2 Files  F3 GitHub  F4 Prompt  F5 Response  F6 History  F7 Settings",
        "General",
        "  Ctrl+S: send request    Tab/Shift+Tab: next field    Esc: leave field    Ctrl+C: quit",
        "Files",
        "  Enter in the path field: add file or folder    Paste/drop: add paths",
        "  List: Up/Down select, Delete remove, x clear all",
        "GitHub",
        "  Enter in the URL field: load    Branches: Enter to switch",
        "  Files: Space toggle, a check all, n uncheck all",
        "Prompt",
        "  Enter: newline    Ctrl+O: file source (local / GitHub / both)",
        "Response",
        "  v: response/code    y: copy code    w: save deepseek_code.txt    PgUp/PgDn: scroll",
        "History",
        "  Enter: show response    x: clear history",
        "Editing",
        "  Ctrl+A/E: line start/end    Ctrl+W: delete word    Ctrl+U/K: kill to start/end",
    ],
};

pub fn strings(lang: Language) -> &'static Strings {
    match lang {
        Language::Ru => &RU,
        Language::En => &EN,
    }
}

impl Strings {
    pub fn files_summary(&self, count: usize, size: u64) -> String {
        match self.lang {
            Language::Ru => format!("Файлов: {}, общий размер: {}", count, format_size(size)),
            Language::En => format!("Files: {}, total size: {}", count, format_size(size)),
        }
    }

    pub fn added(&self, accepted: usize, filtered: usize, failed: usize) -> String {
        match self.lang {
            Language::Ru => format!(
                "Добавлено: {}, отфильтровано: {}, ошибок: {}",
                accepted, filtered, failed
            ),
            Language::En => format!(
                "Added: {}, filtered: {}, failed: {}",
                accepted, filtered, failed
            ),
        }
    }

    pub fn remote_progress(&self, included: usize, checked: usize, total: usize) -> String {
        match self.lang {
            Language::Ru => format!("Загружено {} из {} отмеченных ({} всего)", included, checked, total),
            Language::En => format!("Loaded {} of {} checked ({} total)", included, checked, total),
        }
    }

    pub fn confirm_oversize(&self, total: usize) -> String {
        match self.lang {
            Language::Ru => format!(
                "Общий размер файлов {} больше 5 MB. Всё равно отправить? Y: да, N/Esc: нет",
                format_size(total as u64)
            ),
            Language::En => format!(
                "Total file size {} exceeds 5 MB. Send anyway? Y: yes, N/Esc: no",
                format_size(total as u64)
            ),
        }
    }

    pub fn code_written(&self, path: &str) -> String {
        match self.lang {
            Language::Ru => format!("Код сохранён в {}", path),
            Language::En => format!("Code saved to {}", path),
        }
    }

    pub fn history_item(&self, index: usize, when: &str) -> String {
        match self.lang {
            Language::Ru => format!("Запрос {} - {}", index, when),
            Language::En => format!("Request {} - {}", index, when),
        }
    }

    pub fn response_ready(&self, chars: usize) -> String {
        match self.lang {
            Language::Ru => format!("Ответ получен ({} символов)", chars),
            Language::En => format!("Response received ({} chars)", chars),
        }
    }

    pub fn source(&self, s: FileSource) -> &'static str {
        match (self.lang, s) {
            (Language::Ru, FileSource::Local) => "локальные",
            (Language::Ru, FileSource::Remote) => "GitHub",
            (Language::Ru, FileSource::Both) => "локальные + GitHub",
            (Language::En, FileSource::Local) => "local",
            (Language::En, FileSource::Remote) => "GitHub",
            (Language::En, FileSource::Both) => "local + GitHub",
        }
    }

    pub fn theme(&self, t: Theme) -> &'static str {
        match (self.lang, t) {
            (Language::Ru, Theme::Light) => "светлая",
            (Language::Ru, Theme::Dark) => "тёмная",
            (Language::En, Theme::Light) => "light",
            (Language::En, Theme::Dark) => "dark",
        }
    }

    pub fn language(&self, l: Language) -> &'static str {
        match l {
            Language::Ru => "Русский",
            Language::En => "English",
        }
    }
}

// Joins status segments, then hints, dropping whatever does not fit in
// `max_width` columns.
pub fn build_status_line(segments: &[String], hints: &[&str], max_width: u16) -> String {
    let sep = "  |  ";
    let sep_w = UnicodeWidthStr::width(sep);
    let mut out = String::new();
    let mut used = 0usize;
    let all = segments.iter().map(String::as_str).chain(hints.iter().copied());
    for (i, seg) in all.enumerate() {
        let segw = UnicodeWidthStr::width(seg);
        let addw = segw + if i == 0 { 0 } else { sep_w };
        if used + addw > max_width as usize {
            break;
        }
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(seg);
        used += addw;
    }
    out
}
