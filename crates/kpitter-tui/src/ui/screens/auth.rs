//! Login and registration forms.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, AuthForm, FormFocus};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

const FORM_WIDTH: u16 = 50;
const FIELD_WIDTH: usize = 20;

const LOGO: [&str; 3] = [
    "     ╦╔═╔═╗╦   ╔╦╗╔╦╗╔═╗╦═╗",
    "     ╠╩╗╠═╝║ ── ║  ║ ║╣ ╠╦╝",
    "     ╩ ╩╩  ╩    ╩  ╩ ╚═╝╩╚═",
];

pub fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let form = &app.login_form;
    let mut lines = logo_lines();

    lines.push(field_line("Username", &form.username, form.focus == FormFocus::Username));
    lines.push(field_line(
        "Password",
        &"*".repeat(form.password.chars().count().min(FIELD_WIDTH)),
        form.focus == FormFocus::Password,
    ));
    lines.push(Line::from(""));
    lines.push(button_line("Log in", form));
    push_messages(&mut lines, form);
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled("Ctrl+R", styles::help_key_style()),
        Span::styled(" create account  ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" quit", styles::muted_style()),
    ]));

    render_form(frame, " Log in ", lines, area);
}

pub fn render_register(frame: &mut Frame, app: &App, area: Rect) {
    let form = &app.register_form;
    let mut lines = logo_lines();

    lines.push(field_line("Username", &form.username, form.focus == FormFocus::Username));
    lines.push(field_line("Full name", &form.full_name, form.focus == FormFocus::FullName));
    lines.push(field_line(
        "Password",
        &"*".repeat(form.password.chars().count().min(FIELD_WIDTH)),
        form.focus == FormFocus::Password,
    ));
    lines.push(Line::from(""));
    lines.push(button_line("Register", form));
    push_messages(&mut lines, form);
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" back to log in", styles::muted_style()),
    ]));

    render_form(frame, " Register ", lines, area);
}

fn logo_lines() -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = LOGO
        .iter()
        .map(|row| Line::from(Span::styled(*row, styles::title_style())))
        .collect();
    lines.push(Line::from(""));
    lines
}

fn field_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    // Keep the tail visible while typing past the box width
    let skip = value.chars().count().saturating_sub(FIELD_WIDTH);
    let visible: String = value.chars().skip(skip).collect();
    let cursor = if focused { "▌" } else { " " };
    Line::from(vec![
        Span::styled(format!("  {:>10}: [", label), styles::muted_style()),
        Span::styled(format!("{:<width$}{}", visible, cursor, width = FIELD_WIDTH), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn button_line(label: &str, form: &AuthForm) -> Line<'static> {
    let focused = form.focus == FormFocus::Button;
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let text = if form.submitting {
        format!("  {}...  ", label)
    } else if focused {
        format!(" ▶ {} ◀ ", label)
    } else {
        format!("   {}   ", label)
    };
    Line::from(vec![
        Span::raw("              ["),
        Span::styled(text, style),
        Span::raw("]"),
    ])
}

fn push_messages(lines: &mut Vec<Line<'static>>, form: &AuthForm) {
    if let Some(ref error) = form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    } else if let Some(ref notice) = form.notice {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", notice),
            styles::success_style(),
        )));
    }
}

fn render_form(frame: &mut Frame, title: &str, lines: Vec<Line>, area: Rect) {
    let height = lines.len() as u16 + 2;
    let area = centered_rect_fixed(FORM_WIDTH, height, area);

    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(title.to_string())
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}
