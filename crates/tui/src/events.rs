use std::time::{Duration, Instant};

use crossterm::event::{self, Event, MouseEvent, MouseEventKind};
use ratatui::{backend::Backend, Terminal};

use crate::{app::App, ui};

pub fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let mut last_draw = Instant::now();
    let heartbeat = Duration::from_millis(500);
    loop {
        if app.dirty || last_draw.elapsed() >= heartbeat {
            terminal.draw(|f| ui::draw(f, app))?;
            app.dirty = false;
            last_draw = Instant::now();
        }

        if event::poll(Duration::from_millis(120))? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Paste(s) => app.on_paste(&s),
                Event::Resize(_, _) => app.dirty = true,
                Event::Mouse(me) => on_mouse(app, me),
                _ => {}
            }
        }

        app.on_tick();

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn on_mouse(app: &mut App, me: MouseEvent) {
    if app.show_help || app.confirm.is_some() {
        return;
    }
    let Some(area) = app.response_area else {
        return;
    };
    let inside = me.column >= area.x
        && me.column < area.x + area.width
        && me.row >= area.y
        && me.row < area.y + area.height;
    if !inside {
        return;
    }
    match me.kind {
        MouseEventKind::ScrollUp => app.scroll_response(-3),
        MouseEventKind::ScrollDown => app.scroll_response(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{test_app, ConfirmAction, ConfirmState};
    use crossterm::event::KeyModifiers;
    use ratatui::layout::Rect;

    fn wheel(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn wheel_scrolls_only_inside_the_response_pane() {
        let mut app = test_app();
        app.present(&"x\n".repeat(50));
        app.response_area = Some(Rect::new(0, 3, 40, 10));
        app.response_max_scroll = 40;

        on_mouse(&mut app, wheel(MouseEventKind::ScrollDown, 5, 5));
        assert_eq!(app.response_scroll, 3);
        on_mouse(&mut app, wheel(MouseEventKind::ScrollDown, 50, 5));
        assert_eq!(app.response_scroll, 3);
        on_mouse(&mut app, wheel(MouseEventKind::ScrollUp, 5, 5));
        assert_eq!(app.response_scroll, 0);

        app.confirm = Some(ConfirmState {
            action: ConfirmAction::ClearHistory,
        });
        on_mouse(&mut app, wheel(MouseEventKind::ScrollDown, 5, 5));
        assert_eq!(app.response_scroll, 0);
    }
}
