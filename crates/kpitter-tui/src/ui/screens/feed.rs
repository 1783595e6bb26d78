use ratatui::{layout::Rect, Frame};

use crate::app::App;

use super::{render_error_line, render_post_list};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let area = render_error_line(frame, &app.status, area);

    let title = if app.status.loading && !app.feed.posts.is_empty() {
        format!(" Feed ({}) · refreshing ", app.feed.posts.len())
    } else {
        format!(" Feed ({}) ", app.feed.posts.len())
    };

    render_post_list(
        frame,
        &app.feed.posts,
        app.feed.selection,
        title,
        "No posts yet. Press [n] to write the first one.",
        &app.status,
        area,
    );
}
