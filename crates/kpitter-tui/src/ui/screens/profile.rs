use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, Screen};
use crate::ui::styles;

use super::{render_error_line, render_post_list};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let area = render_error_line(frame, &app.status, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)])
        .split(area);

    render_header(frame, app, chunks[0]);

    let username = match app.screen {
        Screen::Profile(ref username) => username.as_str(),
        _ => "",
    };
    let title = format!(" Posts by @{} ({}) ", username, app.profile.posts.len());
    render_post_list(
        frame,
        &app.profile.posts,
        app.profile.selection,
        title,
        "No posts yet.",
        &app.status,
        chunks[1],
    );
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Profile ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let lines = match app.profile.user {
        Some(ref user) => {
            let is_me = app.current_username() == Some(user.username.as_str());
            let mut name_line = vec![
                Span::styled(user.display_name().to_string(), styles::author_style()),
                Span::raw(" "),
                Span::styled(user.handle(), styles::muted_style()),
            ];
            if is_me {
                name_line.push(Span::styled("  (you)", styles::success_style()));
            }

            let count = user.posts.unwrap_or(app.profile.posts.len() as u32);
            vec![
                Line::from(name_line),
                Line::from(""),
                Line::from(Span::styled(
                    format!("{} post{}", count, if count == 1 { "" } else { "s" }),
                    styles::highlight_style(),
                )),
            ]
        }
        None if app.status.loading => {
            vec![Line::from(Span::styled("Loading...", styles::muted_style()))]
        }
        None => vec![Line::from(Span::styled(
            "Profile not available",
            styles::muted_style(),
        ))],
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
