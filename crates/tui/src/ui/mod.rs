use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use dsc_core::remote::FileState;
use dsc_core::selection::{format_size, SIZE_LIMIT};

use crate::app::history::{format_timestamp, request_files};
use crate::app::input::TextInput;
use crate::app::settings::SettingsField;
use crate::app::{
    App, ConfirmAction, ConfirmState, FilesFocus, GitHubFocus, NoticeLevel, PromptFocus,
    ResponseView, Tab,
};
use crate::strings::build_status_line;
use crate::theme::{palette, Theme};

pub fn draw(f: &mut Frame, app: &mut App) {
    let t = palette(app.settings.theme);
    f.render_widget(
        Block::default().style(Style::default().bg(t.bg).fg(t.text)),
        f.area(),
    );
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(f.area());

    draw_tabs(f, chunks[0], app, t);
    app.response_area = None;
    match app.tab {
        Tab::Files => draw_files(f, chunks[1], app, t),
        Tab::GitHub => draw_github(f, chunks[1], app, t),
        Tab::Prompt => draw_prompt(f, chunks[1], app, t),
        Tab::Response => draw_response(f, chunks[1], app, t),
        Tab::History => draw_history(f, chunks[1], app, t),
        Tab::Settings => draw_settings(f, chunks[1], app, t),
    }
    draw_status(f, chunks[2], app, t);

    if let Some(confirm) = &app.confirm {
        draw_confirm(f, f.area(), confirm, app, t);
    }
    if app.show_help {
        draw_help(f, f.area(), app, t);
    }
}

fn block<'a>(title: &'a str, focused: bool, t: &Theme) -> Block<'a> {
    let border = if focused {
        t.border_focus
    } else {
        t.border_inactive
    };
    Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(t.title).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn draw_tabs(f: &mut Frame, area: Rect, app: &App, t: &Theme) {
    let titles: Vec<Line> = app
        .text()
        .tabs
        .iter()
        .enumerate()
        .map(|(i, name)| Line::from(format!("F{} {}", i + 2, name)))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(t.border_inactive)))
        .style(Style::default().fg(t.muted))
        .highlight_style(
            Style::default()
                .fg(t.selected_fg)
                .bg(t.selected_bg)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

#[allow(clippy::too_many_arguments)]
fn draw_input(
    f: &mut Frame,
    area: Rect,
    title: &str,
    hint: &str,
    input: &TextInput,
    focused: bool,
    masked: bool,
    t: &Theme,
) {
    let inner_width = area.width.saturating_sub(2);
    let visible = area.height.saturating_sub(2).max(1);
    let shown = if masked {
        "*".repeat(input.text.graphemes(true).count())
    } else {
        input.text.clone()
    };
    let graphemes: Vec<&str> = shown.graphemes(true).collect();
    let upto = input.cursor.min(graphemes.len());
    let (line_idx, col) = measure_prefix_line_col(&graphemes, upto, inner_width);
    let offset_y = line_idx.saturating_sub(visible.saturating_sub(1));

    let para = if shown.is_empty() {
        Paragraph::new(Line::from(Span::styled(hint, Style::default().fg(t.muted))))
    } else {
        Paragraph::new(shown.as_str()).scroll((offset_y, 0))
    };
    f.render_widget(
        para.block(block(title, focused, t)).wrap(Wrap { trim: false }),
        area,
    );
    if focused {
        f.set_cursor_position(Position::new(
            area.x + 1 + col,
            area.y + 1 + line_idx.saturating_sub(offset_y),
        ));
    }
}

fn list_lines<'a>(
    items: Vec<Line<'a>>,
    cursor: usize,
    height: u16,
    highlight: bool,
    t: &Theme,
) -> Vec<Line<'a>> {
    let h = height.max(1) as usize;
    let start = cursor.saturating_sub(h.saturating_sub(1));
    items
        .into_iter()
        .enumerate()
        .skip(start)
        .take(h)
        .map(|(i, line)| {
            if highlight && i == cursor {
                line.style(Style::default().fg(t.selected_fg).bg(t.selected_bg))
            } else {
                line
            }
        })
        .collect()
}

fn draw_files(f: &mut Frame, area: Rect, app: &mut App, t: &Theme) {
    let s = app.text();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(area);
    draw_input(
        f,
        chunks[0],
        s.title_path,
        s.hint_path,
        &app.path_input,
        app.files_focus == FilesFocus::Path,
        false,
        t,
    );
    draw_input(
        f,
        chunks[1],
        s.title_filter,
        s.hint_filter,
        &app.filter_input,
        app.files_focus == FilesFocus::Filter,
        false,
        t,
    );

    let sel = app.local.selection();
    let focused = app.files_focus == FilesFocus::List;
    let list_block = block(s.title_selected, focused, t);
    let lines = if sel.is_empty() {
        vec![Line::from(Span::styled(s.no_files, Style::default().fg(t.muted)))]
    } else {
        let items = sel
            .iter()
            .map(|file| {
                Line::from(vec![
                    Span::raw(file.path.clone()),
                    Span::styled(
                        format!("  ({})", format_size(file.size)),
                        Style::default().fg(t.muted),
                    ),
                ])
            })
            .collect();
        list_lines(items, app.files_cursor, chunks[2].height.saturating_sub(2), focused, t)
    };
    f.render_widget(Paragraph::new(lines).block(list_block), chunks[2]);

    let total = sel.reported_size();
    let mut summary = vec![Line::from(s.files_summary(sel.len(), total))];
    if total > SIZE_LIMIT as u64 {
        summary.push(Line::from(Span::styled(
            s.size_warning,
            Style::default().fg(t.warning).add_modifier(Modifier::BOLD),
        )));
    }
    f.render_widget(Paragraph::new(summary), chunks[3]);
}

fn state_mark(state: FileState) -> &'static str {
    match state {
        FileState::Included => "[x] ",
        FileState::Pending | FileState::Fetching => "[~] ",
        FileState::Excluded => "[ ] ",
    }
}

fn draw_github(f: &mut Frame, area: Rect, app: &mut App, t: &Theme) {
    let s = app.text();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);
    draw_input(
        f,
        chunks[0],
        s.title_url,
        s.hint_url,
        &app.url_input,
        app.gh_focus == GitHubFocus::Url,
        false,
        t,
    );
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[1]);

    let active = app.remote.repo().map(|r| r.branch.clone()).unwrap_or_default();
    let branch_focus = app.gh_focus == GitHubFocus::Branches;
    let branches = app
        .remote
        .branches()
        .iter()
        .map(|b| {
            let mark = if *b == active { "* " } else { "  " };
            Line::from(format!("{}{}", mark, b))
        })
        .collect();
    let branch_lines = list_lines(
        branches,
        app.branch_cursor,
        cols[0].height.saturating_sub(2),
        branch_focus,
        t,
    );
    f.render_widget(
        Paragraph::new(branch_lines).block(block(s.title_branches, branch_focus, t)),
        cols[0],
    );

    let tree_focus = app.gh_focus == GitHubFocus::Tree;
    let entries = app.remote.entries();
    let tree_lines = if entries.is_empty() {
        let msg = if app.gh_loading { s.loading } else { s.no_tree };
        vec![Line::from(Span::styled(msg, Style::default().fg(t.muted)))]
    } else {
        let items = entries
            .iter()
            .map(|e| Line::from(format!("{}{}", state_mark(e.state), e.path)))
            .collect();
        list_lines(items, app.tree_cursor, cols[1].height.saturating_sub(2), tree_focus, t)
    };
    f.render_widget(
        Paragraph::new(tree_lines).block(block(s.title_tree, tree_focus, t)),
        cols[1],
    );

    let checked = app.remote.desired().len();
    let included = app.remote.selection().len();
    let mut progress = s.remote_progress(included, checked, entries.len());
    if app.gh_loading || included < checked {
        progress = format!("{}  {}", progress, s.loading);
    }
    progress = format!("{}  {}", progress, format_size(app.remote.selection().reported_size()));
    f.render_widget(
        Paragraph::new(Span::styled(progress, Style::default().fg(t.muted))),
        chunks[2],
    );
}

fn draw_prompt(f: &mut Frame, area: Rect, app: &mut App, t: &Theme) {
    let s = app.text();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Percentage(35),
            Constraint::Min(4),
        ])
        .split(area);
    let source = Line::from(vec![
        Span::styled(format!("{}: ", s.label_source), Style::default().fg(t.muted)),
        Span::styled(
            s.source(app.source),
            Style::default().fg(t.title).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  (Ctrl+O)", Style::default().fg(t.muted)),
    ]);
    f.render_widget(Paragraph::new(source), chunks[0]);
    draw_input(
        f,
        chunks[1],
        s.title_system,
        s.hint_system,
        &app.system_input,
        app.prompt_focus == PromptFocus::System,
        false,
        t,
    );
    draw_input(
        f,
        chunks[2],
        s.title_user,
        s.hint_user,
        &app.user_input,
        app.prompt_focus == PromptFocus::User,
        false,
        t,
    );
}

fn draw_response(f: &mut Frame, area: Rect, app: &mut App, t: &Theme) {
    let s = app.text();
    let title = match app.response_view {
        ResponseView::Raw => s.title_response,
        ResponseView::Code => s.title_code,
    };
    let body: String = match (&app.presented, app.sending) {
        (_, true) => s.waiting.to_string(),
        (None, false) => s.no_response.to_string(),
        (Some(p), false) => match app.response_view {
            ResponseView::Raw => p.raw.clone(),
            ResponseView::Code => p.code.clone(),
        },
    };
    let inner_w = area.width.saturating_sub(2);
    let inner_h = area.height.saturating_sub(2);
    let total = saturate(measure_total_lines(&body, inner_w));
    app.response_max_scroll = total.saturating_sub(inner_h);
    app.response_scroll = app.response_scroll.min(app.response_max_scroll);
    app.response_area = Some(area);

    let para = Paragraph::new(body)
        .block(block(title, true, t))
        .wrap(Wrap { trim: false })
        .scroll((app.response_scroll, 0));
    f.render_widget(para, area);
}

fn draw_history(f: &mut Frame, area: Rect, app: &mut App, t: &Theme) {
    let s = app.text();
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let lines = if app.history.is_empty() {
        vec![Line::from(Span::styled(s.no_history, Style::default().fg(t.muted)))]
    } else {
        let items = app
            .history
            .iter()
            .enumerate()
            .map(|(i, h)| Line::from(s.history_item(i + 1, &format_timestamp(&h.timestamp))))
            .collect();
        list_lines(items, app.history_cursor, cols[0].height.saturating_sub(2), true, t)
    };
    f.render_widget(
        Paragraph::new(lines).block(block(s.title_history, true, t)),
        cols[0],
    );

    let files: Vec<Line> = app
        .history
        .get(app.history_cursor)
        .map(|h| request_files(&h.request))
        .unwrap_or_default()
        .into_iter()
        .map(Line::from)
        .collect();
    f.render_widget(
        Paragraph::new(files).block(block(s.title_request_files, false, t)),
        cols[1],
    );
}

fn draw_settings(f: &mut Frame, area: Rect, app: &mut App, t: &Theme) {
    let s = app.text();
    let form = &app.settings_form;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
        ])
        .split(area);
    let fields = [
        (SettingsField::ApiKey, s.label_api_key, &form.api_key, true),
        (SettingsField::Model, s.label_model, &form.model, false),
        (SettingsField::Temperature, s.label_temperature, &form.temperature, false),
        (SettingsField::MaxTokens, s.label_max_tokens, &form.max_tokens, false),
    ];
    for (i, (field, label, input, masked)) in fields.into_iter().enumerate() {
        let title = format!(" {} ", label);
        draw_input(f, chunks[i], &title, "", input, form.focus == field, masked, t);
    }

    let toggle_line = |field: SettingsField, label: &str, value: &str| {
        let style = if form.focus == field {
            Style::default().fg(t.selected_fg).bg(t.selected_bg)
        } else {
            Style::default()
        };
        Line::from(Span::styled(format!("{}: < {} >", label, value), style))
    };
    let toggles = vec![
        toggle_line(SettingsField::Theme, s.label_theme, s.theme(form.theme)),
        toggle_line(
            SettingsField::Language,
            s.label_language,
            s.language(form.language),
        ),
    ];
    f.render_widget(
        Paragraph::new(toggles).block(block(s.title_settings, form.focus.is_toggle(), t)),
        chunks[4],
    );
    f.render_widget(
        Paragraph::new(Span::styled(s.settings_hint, Style::default().fg(t.muted))),
        chunks[5],
    );
}

fn draw_status(f: &mut Frame, area: Rect, app: &App, t: &Theme) {
    let s = app.text();
    let mut segments = vec![
        format!("[{}]", s.tabs[app.tab.index()]),
        format!("{}: {}", s.label_source, s.source(app.source)),
        format!(
            "Local:{} GitHub:{}",
            app.local.selection().len(),
            app.remote.selection().len()
        ),
        format!("[{}]", app.settings.model),
        format!("T:{:.1}", app.settings.temperature),
        format!("Max:{}", app.settings.max_tokens),
    ];
    if let Some((p, c)) = app.last_usage {
        segments.push(format!("Tok:{}/{}/{}", p, c, p.saturating_add(c)));
    }
    if app.sending {
        segments.insert(1, s.waiting.to_string());
    }
    let width = area.width.saturating_sub(2);
    let status = build_status_line(&segments, s.status_hints, width);

    let mut lines = Vec::new();
    match &app.notice {
        Some(n) => {
            let color = match n.level {
                NoticeLevel::Info => t.ok,
                NoticeLevel::Error => t.error,
            };
            lines.push(Line::from(Span::styled(n.text.clone(), Style::default().fg(color))));
        }
        None => lines.push(Line::from("")),
    }
    lines.push(Line::from(Span::styled(status, Style::default().fg(t.muted))));
    let para = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.border_inactive)),
    );
    f.render_widget(para, area);
}

fn draw_help(f: &mut Frame, area: Rect, app: &App, t: &Theme) {
    let popup_area = centered_rect(80, 70, area);
    let s = app.text();
    let lines = s
        .help_lines
        .iter()
        .map(|l| Line::from(*l))
        .collect::<Vec<Line>>();
    let para = Paragraph::new(lines)
        .block(block(s.title_help, true, t))
        .style(Style::default().bg(t.bg).fg(t.text))
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, popup_area);
    f.render_widget(para, popup_area);
}

fn draw_confirm(f: &mut Frame, area: Rect, confirm: &ConfirmState, app: &App, t: &Theme) {
    let popup_area = centered_rect(60, 30, area);
    let s = app.text();
    let message = match &confirm.action {
        ConfirmAction::SendOversize { total } => s.confirm_oversize(*total),
        ConfirmAction::ClearHistory => s.confirm_clear_history.to_string(),
    };
    let para = Paragraph::new(Line::from(message))
        .block(block(s.title_confirm, true, t))
        .style(Style::default().bg(t.bg).fg(t.text))
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, popup_area);
    f.render_widget(para, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1]);
    horiz[1]
}

fn saturate(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn measure_total_lines(s: &str, width: u16) -> usize {
    let g: Vec<&str> = s.graphemes(true).collect();
    measure_line_col(&g, g.len(), width).0 + 1
}

fn measure_prefix_line_col(graphemes: &[&str], upto: usize, width: u16) -> (u16, u16) {
    let (line, col) = measure_line_col(graphemes, upto, width);
    (saturate(line), saturate(col))
}

fn measure_line_col(graphemes: &[&str], upto: usize, width: u16) -> (usize, usize) {
    if width == 0 {
        return (0, 0);
    }
    let mut line = 0usize;
    let mut col = 0usize;
    for g in graphemes.iter().take(upto) {
        if *g == "\n" || *g == "\r\n" {
            line += 1;
            col = 0;
            continue;
        }
        let w = UnicodeWidthStr::width(*g);
        if col + w > width as usize {
            line += 1;
            col = 0;
        }
        col += w;
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_app;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn wrap_basic_ascii() {
        let s = "abcdef";
        let g: Vec<&str> = s.graphemes(true).collect();
        assert_eq!(measure_total_lines(s, 5), 2);
        assert_eq!(measure_prefix_line_col(&g, 5, 5), (0, 5));
        assert_eq!(measure_prefix_line_col(&g, 6, 5), (1, 1));
    }

    #[test]
    fn wrap_with_newline() {
        let s = "ab\ncdef";
        let g: Vec<&str> = s.graphemes(true).collect();
        assert_eq!(measure_total_lines(s, 80), 2);
        assert_eq!(measure_prefix_line_col(&g, 2, 80), (0, 2));
        assert_eq!(measure_prefix_line_col(&g, 5, 80), (1, 2));
    }

    #[test]
    fn wrap_fullwidth_chars() {
        let s = "你好世";
        let g: Vec<&str> = s.graphemes(true).collect();
        assert_eq!(measure_total_lines(s, 4), 2);
        assert_eq!(measure_prefix_line_col(&g, 2, 4), (0, 4));
        assert_eq!(measure_prefix_line_col(&g, 3, 4), (1, 2));
    }

    #[test]
    fn huge_line_counts_saturate() {
        let s = "\n".repeat(70_000);
        let g: Vec<&str> = s.graphemes(true).collect();
        assert_eq!(measure_total_lines(&s, 10), 70_001);
        assert_eq!(measure_prefix_line_col(&g, g.len(), 10), (u16::MAX, 0));
        assert_eq!(saturate(70_001), u16::MAX);
    }

    #[test]
    fn every_tab_renders() {
        let mut app = test_app();
        app.present("text\n```\ncode\n```");
        let mut term = Terminal::new(TestBackend::new(100, 30)).unwrap();
        for tab in Tab::ALL {
            app.tab = tab;
            term.draw(|f| draw(f, &mut app)).unwrap();
        }
        app.confirm = Some(ConfirmState {
            action: ConfirmAction::SendOversize { total: 6 << 20 },
        });
        app.show_help = true;
        term.draw(|f| draw(f, &mut app)).unwrap();
    }

    #[test]
    fn response_scroll_tracks_content() {
        let mut app = test_app();
        app.present(&"line\n".repeat(100));
        let mut term = Terminal::new(TestBackend::new(60, 20)).unwrap();
        term.draw(|f| draw(f, &mut app)).unwrap();
        assert!(app.response_max_scroll > 80);
        assert!(app.response_area.is_some());
    }
}
