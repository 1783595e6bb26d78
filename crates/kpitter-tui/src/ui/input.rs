//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{
    can_add_full_name_char, can_add_password_char, can_add_post_char, can_add_username_char,
    App, AppState, FormFocus, Screen, PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    if matches!(app.state, AppState::Composing) {
        handle_compose_input(app, key);
        return Ok(false);
    }

    match app.screen {
        Screen::Login => handle_login_input(app, key),
        Screen::Register => {
            handle_register_input(app, key);
            Ok(false)
        }
        Screen::Feed | Screen::PostDetail(_) | Screen::Profile(_) => {
            handle_screen_input(app, key);
            Ok(false)
        }
    }
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.show_register();
        return Ok(false);
    }

    let form = &mut app.login_form;
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => form.focus = form.focus.next(false),
        KeyCode::Up | KeyCode::BackTab => form.focus = form.focus.prev(false),
        KeyCode::Enter => {
            if form.focus == FormFocus::Button {
                app.submit_login();
            } else {
                form.focus = form.focus.next(false);
            }
        }
        KeyCode::Backspace => match form.focus {
            FormFocus::Username => {
                form.username.pop();
            }
            FormFocus::Password => {
                form.password.pop();
            }
            FormFocus::FullName | FormFocus::Button => {}
        },
        KeyCode::Char(c) => match form.focus {
            FormFocus::Username => {
                if can_add_username_char(form.username.chars().count(), c) {
                    form.username.push(c);
                }
            }
            FormFocus::Password => {
                if can_add_password_char(form.password.chars().count(), c) {
                    form.password.push(c);
                }
            }
            // Ignore character input on button
            FormFocus::FullName | FormFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_register_input(app: &mut App, key: KeyEvent) {
    let form = &mut app.register_form;
    match key.code {
        KeyCode::Esc => {
            if !form.submitting {
                app.show_login(None);
            }
        }
        KeyCode::Down | KeyCode::Tab => form.focus = form.focus.next(true),
        KeyCode::Up | KeyCode::BackTab => form.focus = form.focus.prev(true),
        KeyCode::Enter => {
            if form.focus == FormFocus::Button {
                app.submit_register();
            } else {
                form.focus = form.focus.next(true);
            }
        }
        KeyCode::Backspace => match form.focus {
            FormFocus::Username => {
                form.username.pop();
            }
            FormFocus::FullName => {
                form.full_name.pop();
            }
            FormFocus::Password => {
                form.password.pop();
            }
            FormFocus::Button => {}
        },
        KeyCode::Char(c) => match form.focus {
            FormFocus::Username => {
                if can_add_username_char(form.username.chars().count(), c) {
                    form.username.push(c);
                }
            }
            FormFocus::FullName => {
                if can_add_full_name_char(form.full_name.chars().count(), c) {
                    form.full_name.push(c);
                }
            }
            FormFocus::Password => {
                if can_add_password_char(form.password.chars().count(), c) {
                    form.password.push(c);
                }
            }
            FormFocus::Button => {}
        },
        _ => {}
    }
}

fn handle_compose_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.state = AppState::Normal,
        KeyCode::Enter => app.submit_post(),
        KeyCode::Backspace => {
            app.compose.pop();
        }
        KeyCode::Char(c) => {
            if can_add_post_char(app.compose.chars().count(), c) {
                app.compose.push(c);
            }
        }
        _ => {}
    }
}

/// Keys shared by the feed, post and profile screens
fn handle_screen_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Esc | KeyCode::Backspace => {
            if app.can_go_back() {
                app.go_back();
            } else if app.screen != Screen::Feed {
                app.navigate(Screen::Feed);
            }
        }
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::PageUp => app.move_selection(-(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => app.move_selection(PAGE_SCROLL_SIZE as isize),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Enter => app.open_selected_post(),
        KeyCode::Char('l') | KeyCode::Char(' ') => app.toggle_like(),
        KeyCode::Char('a') | KeyCode::Char('p') => app.open_selected_author(),
        KeyCode::Char('m') => app.open_my_profile(),
        KeyCode::Char('n') => app.start_compose(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('L') => app.logout(),
        _ => {}
    }
}
