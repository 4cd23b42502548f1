use dsc_core::settings::Theme as ThemeName;
use ratatui::style::Color;

pub struct Theme {
    pub bg: Color,
    pub border_focus: Color,
    pub border_inactive: Color,
    pub title: Color,
    pub text: Color,
    pub muted: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
    pub error: Color,
    pub warning: Color,
    pub ok: Color,
}

pub const LIGHT: Theme = Theme {
    bg: Color::White,
    border_focus: Color::Blue,
    border_inactive: Color::Gray,
    title: Color::Blue,
    text: Color::Black,
    muted: Color::DarkGray,
    selected_fg: Color::White,
    selected_bg: Color::Blue,
    error: Color::Red,
    warning: Color::Magenta,
    ok: Color::Green,
};

pub const DARK: Theme = Theme {
    bg: Color::Black,
    border_focus: Color::Cyan,
    border_inactive: Color::DarkGray,
    title: Color::Yellow,
    text: Color::White,
    muted: Color::DarkGray,
    selected_fg: Color::Black,
    selected_bg: Color::Cyan,
    error: Color::LightRed,
    warning: Color::Yellow,
    ok: Color::LightGreen,
};

pub fn palette(name: ThemeName) -> &'static Theme {
    match name {
        ThemeName::Light => &LIGHT,
        ThemeName::Dark => &DARK,
    }
}
