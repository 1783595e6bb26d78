//! One module per screen, plus the pieces they share.

pub mod auth;
pub mod feed;
pub mod post;
pub mod profile;

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use kpitter_core::models::Post;

use crate::app::ViewStatus;
use crate::ui::styles;
use crate::utils::format::{format_age, single_line, truncate_string};

/// Two-line list row: author, age and likes, then the content
pub(crate) fn post_item(post: &Post, selected: bool, width: u16) -> ListItem<'static> {
    let age = format_age(post.created_at.as_ref(), Utc::now());
    let heart = if post.liked_by_current_user { "♥" } else { "♡" };

    let header = Line::from(vec![
        Span::styled(post.author.display_name().to_string(), styles::author_style()),
        Span::raw(" "),
        Span::styled(post.author.handle(), styles::muted_style()),
        Span::styled(
            if age.is_empty() {
                String::new()
            } else {
                format!(" · {}", age)
            },
            styles::muted_style(),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} {}", heart, post.like_count),
            styles::like_style(post.liked_by_current_user),
        ),
    ]);

    let body_width = width.saturating_sub(6) as usize;
    let body = Line::from(vec![
        Span::raw("  "),
        Span::styled(
            truncate_string(&single_line(&post.content), body_width),
            styles::list_item_style(),
        ),
    ]);

    let style = if selected {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    ListItem::new(vec![header, body]).style(style)
}

/// Bordered list of posts with the selection kept in view
pub(crate) fn render_post_list(
    frame: &mut Frame,
    posts: &[Post],
    selection: usize,
    title: String,
    empty_text: &str,
    status: &ViewStatus,
    area: Rect,
) {
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if posts.is_empty() {
        let text = if status.loading { "Loading..." } else { empty_text };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            format!(" {}", text),
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = posts
        .iter()
        .enumerate()
        .map(|(i, post)| post_item(post, i == selection, area.width))
        .collect();

    let list = List::new(items).block(block);

    let mut state = ListState::default();
    state.select(Some(selection));

    frame.render_stateful_widget(list, area, &mut state);
}

/// Reserve one line above `area` for the screen's error, if any.
/// Returns the area left for content.
pub(crate) fn render_error_line(frame: &mut Frame, status: &ViewStatus, area: Rect) -> Rect {
    let Some(ref error) = status.error else {
        return area;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let line = Line::from(vec![
        Span::styled(format!(" {}", error), styles::error_style()),
        Span::styled("  [r] retry", styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(line), chunks[0]);
    chunks[1]
}
