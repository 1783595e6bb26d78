use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState, Screen, MAX_POST_LENGTH};
use crate::utils::format::remaining_chars;

use super::screens::{auth, feed, post, profile};
use super::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::Composing => render_compose_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("  KPI-tter · {}", app.screen.title());
    let user_hint = match app.current_username() {
        Some(username) if !app.screen.is_public() => format!("@{}  [?] Help", username),
        _ => "[?] Help".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title.clone(), styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.chars().count() as u16 + user_hint.chars().count() as u16 + 2)
                as usize,
        )),
        Span::styled(user_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.screen {
        Screen::Login => auth::render_login(frame, app, area),
        Screen::Register => auth::render_register(frame, app, area),
        Screen::Feed => feed::render(frame, app, area),
        Screen::PostDetail(_) => post::render(frame, app, area),
        Screen::Profile(_) => profile::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.screen {
        Screen::Login | Screen::Register => "Tab next field | Enter submit",
        Screen::Feed => "[n]ew | [l]ike | [m]e | [r]efresh | [q]uit",
        Screen::PostDetail(_) => "[l]ike | [a]uthor | [Esc] back",
        Screen::Profile(_) => "[l]ike | [Enter] open | [Esc] back",
    };

    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else if app.status.busy {
        " Saving... ".to_string()
    } else if app.status.loading {
        " Loading... ".to_string()
    } else {
        String::new()
    };

    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 22, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  KPI-tter", styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("↑/↓ j/k", "Move selection"),
        help_line("PgUp/PgDn", "Scroll a page"),
        help_line("Enter", "Open post"),
        help_line("a", "Open author's profile"),
        help_line("m", "Open my profile"),
        help_line("Esc", "Go back"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("n", "New post (feed)"),
        help_line("l", "Like / unlike"),
        help_line("r", "Refresh"),
        help_line("L", "Log out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(help_text).block(block);

    frame.render_widget(paragraph, area);
}

fn render_compose_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(60, 10, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let remaining = remaining_chars(&app.compose, MAX_POST_LENGTH);
    let counter_style = if remaining < 10 {
        styles::error_style()
    } else {
        styles::muted_style()
    };

    let block = Block::default()
        .title(" New post ")
        .title_style(styles::title_style())
        .title_bottom(Line::from(Span::styled(format!(" {} left ", remaining), counter_style)))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(format!("{}▌", app.compose))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, chunks[0]);

    let hint = Line::from(vec![
        Span::styled(" Enter", styles::help_key_style()),
        Span::styled(" publish  ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" cancel", styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(hint).style(styles::status_bar_style()), chunks[1]);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block);

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use kpitter_core::auth::{MemoryStorage, SecretStorage, StorageError};
    use kpitter_core::models::UserProfile;
    use kpitter_core::{Config, Session};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    /// Memory storage that counts reads, standing in for a slow keychain
    #[derive(Default)]
    struct CountingStorage {
        inner: MemoryStorage,
        reads: Arc<AtomicUsize>,
    }

    impl SecretStorage for CountingStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect_fixed(50, 10, outer), Rect::new(25, 15, 50, 10));

        // Never larger than the terminal
        let small = Rect::new(0, 0, 30, 5);
        assert_eq!(centered_rect_fixed(50, 10, small), Rect::new(0, 0, 30, 5));
    }

    #[test]
    fn test_frames_do_not_read_credential_storage() {
        let storage = CountingStorage::default();
        let reads = Arc::clone(&storage.reads);
        let config = Config::default();
        let session = Session::from_config(&config, Box::new(storage)).unwrap();
        session.credentials().save("alice", "pw1").unwrap();

        let mut app = App::new(config, session).with_config_path(None);
        app.screen = Screen::Profile("alice".to_string());
        app.profile.user = Some(UserProfile {
            username: "alice".to_string(),
            full_name: Some("Alice A".to_string()),
            posts: Some(0),
        });

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let before = reads.load(Ordering::SeqCst);
        for _ in 0..10 {
            terminal.draw(|frame| render(frame, &app)).unwrap();
        }
        assert_eq!(reads.load(Ordering::SeqCst), before);

        let title: String = (0..80u16)
            .map(|x| terminal.backend().buffer()[(x, 0u16)].symbol().to_string())
            .collect();
        assert!(title.contains("@alice"));
    }
}
