use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::styles;
use crate::utils::format::format_timestamp;

use super::render_error_line;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let area = render_error_line(frame, &app.status, area);

    let block = Block::default()
        .title(" Post ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let Some(ref post) = app.post else {
        let text = if app.status.loading {
            " Loading..."
        } else {
            " Post not available"
        };
        let paragraph =
            Paragraph::new(Line::from(Span::styled(text, styles::muted_style()))).block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(post.author.display_name().to_string(), styles::author_style()),
            Span::raw(" "),
            Span::styled(post.author.handle(), styles::muted_style()),
        ]),
        Line::from(""),
    ];

    for text_line in post.content.lines() {
        lines.push(Line::from(Span::styled(
            text_line.to_string(),
            styles::list_item_style(),
        )));
    }
    lines.push(Line::from(""));

    let timestamp = format_timestamp(post.created_at.as_ref());
    if !timestamp.is_empty() {
        lines.push(Line::from(Span::styled(timestamp, styles::muted_style())));
    }

    let heart = if post.liked_by_current_user { "♥" } else { "♡" };
    let mut likes = vec![Span::styled(
        format!("{} {}", heart, post.likes_display()),
        styles::like_style(post.liked_by_current_user),
    )];
    if post.liked_by_current_user {
        likes.push(Span::styled("  · you liked this", styles::muted_style()));
    }
    if app.status.busy {
        likes.push(Span::styled("  · saving...", styles::highlight_style()));
    }
    lines.push(Line::from(likes));

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("[l]", styles::help_key_style()),
        Span::styled(" like/unlike  ", styles::muted_style()),
        Span::styled("[a]", styles::help_key_style()),
        Span::styled(" author  ", styles::muted_style()),
        Span::styled("[Esc]", styles::help_key_style()),
        Span::styled(" back", styles::muted_style()),
    ]));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
