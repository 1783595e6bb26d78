//! Application state management for kpitter.
//!
//! `App` owns the screen the user is on, the transient data that screen has
//! loaded, and the channel that background requests report back through.
//! Requests never run on the UI loop: each action spawns one task, and the
//! loop drains finished results on every tick.

use std::future::Future;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use kpitter_core::models::{Post, UserProfile};
use kpitter_core::{ApiClient, ApiError, Config, Session, SessionError};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background result channel.
/// At most one read and one mutation are in flight per screen.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Maximum length for username input (server accepts 3-20 characters)
const MAX_USERNAME_LENGTH: usize = 20;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for the optional full name at registration
const MAX_FULL_NAME_LENGTH: usize = 64;

/// Maximum post length accepted by the server
pub const MAX_POST_LENGTH: usize = 140;

/// Number of items to scroll on page up/down
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Environment variables used to prefill the login form
const USERNAME_ENV: &str = "KPITTER_USERNAME";
const PASSWORD_ENV: &str = "KPITTER_PASSWORD";

// ============================================================================
// UI State Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    Feed,
    PostDetail(String),
    Profile(String),
}

impl Screen {
    pub fn title(&self) -> String {
        match self {
            Screen::Login => "Log in".to_string(),
            Screen::Register => "Register".to_string(),
            Screen::Feed => "Feed".to_string(),
            Screen::PostDetail(_) => "Post".to_string(),
            Screen::Profile(username) => format!("@{}", username),
        }
    }

    /// Screens reachable without credentials
    pub fn is_public(&self) -> bool {
        matches!(self, Screen::Login | Screen::Register)
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Composing,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Focused field on the login and register forms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormFocus {
    #[default]
    Username,
    FullName,
    Password,
    Button,
}

impl FormFocus {
    /// Next field; `FullName` only exists on the register form
    pub fn next(self, with_full_name: bool) -> Self {
        match self {
            FormFocus::Username if with_full_name => FormFocus::FullName,
            FormFocus::Username | FormFocus::FullName => FormFocus::Password,
            FormFocus::Password => FormFocus::Button,
            FormFocus::Button => FormFocus::Username,
        }
    }

    pub fn prev(self, with_full_name: bool) -> Self {
        match self {
            FormFocus::Username => FormFocus::Button,
            FormFocus::FullName => FormFocus::Username,
            FormFocus::Password if with_full_name => FormFocus::FullName,
            FormFocus::Password => FormFocus::Username,
            FormFocus::Button => FormFocus::Password,
        }
    }
}

#[derive(Debug, Default)]
pub struct AuthForm {
    pub username: String,
    pub full_name: String,
    pub password: String,
    pub focus: FormFocus,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub submitting: bool,
}

/// Loading/busy/error flags of the current screen
#[derive(Debug, Default)]
pub struct ViewStatus {
    /// A read for this screen is in flight
    pub loading: bool,
    /// A mutation (post, like, unlike) is in flight
    pub busy: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct FeedView {
    pub posts: Vec<Post>,
    pub selection: usize,
}

#[derive(Debug, Default)]
pub struct ProfileView {
    pub user: Option<UserProfile>,
    pub posts: Vec<Post>,
    pub selection: usize,
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from background tasks.
#[derive(Debug)]
enum Outcome {
    /// Global feed loaded
    Feed(Vec<Post>),
    /// Single post loaded
    Post(Post),
    /// Profile and that user's posts loaded
    Profile(UserProfile, Vec<Post>),
    /// Nothing to show (public screens)
    Idle,
    /// A read or mutation failed
    Failed(ApiError),
    /// Creating a post failed; carries the draft so it can be restored
    CreateFailed(String, ApiError),
    /// Login (or register-then-login) succeeded for this username
    LoggedIn(String),
    /// Login or registration was refused
    AuthFailed(SessionError),
}

/// Which in-progress flag a task owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    /// Screen read; owns `ViewStatus::loading`
    Read,
    /// Post, like or unlike (plus its re-fetch); owns `ViewStatus::busy`
    Mutation,
    /// Login or register; tracked by the form's `submitting`
    Auth,
}

/// An outcome tagged with the navigation ticket it was requested under
#[derive(Debug)]
struct Envelope {
    ticket: u64,
    kind: TaskKind,
    outcome: Outcome,
}

/// Load everything `screen` displays.
async fn fetch_screen(api: &ApiClient, screen: &Screen) -> Outcome {
    let result = match screen {
        Screen::Feed => api.list_posts().await.map(Outcome::Feed),
        Screen::PostDetail(id) => api.get_post(id).await.map(Outcome::Post),
        Screen::Profile(username) => match api.get_user(username).await {
            Ok(user) => api
                .list_user_posts(username)
                .await
                .map(|posts| Outcome::Profile(user, posts)),
            Err(e) => Err(e),
        },
        Screen::Login | Screen::Register => Ok(Outcome::Idle),
    };
    result.unwrap_or_else(Outcome::Failed)
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    /// Where `last_username` is saved after login; `None` skips saving
    config_path: Option<PathBuf>,
    pub session: Session,
    /// Logged-in username, read from the credential store on each screen change
    username: Option<String>,

    // UI State
    pub state: AppState,
    pub screen: Screen,
    history: Vec<Screen>,
    pub status: ViewStatus,
    pub status_message: Option<String>,

    // Forms
    pub login_form: AuthForm,
    pub register_form: AuthForm,
    pub compose: String,

    // Screen data
    pub feed: FeedView,
    pub post: Option<Post>,
    pub profile: ProfileView,

    // Background task channel
    ticket: u64,
    result_rx: mpsc::Receiver<Envelope>,
    result_tx: mpsc::Sender<Envelope>,
}

impl App {
    pub fn new(config: Config, session: Session) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_username = std::env::var(USERNAME_ENV)
            .ok()
            .or_else(|| config.last_username.clone())
            .unwrap_or_default();
        let login_password = std::env::var(PASSWORD_ENV).unwrap_or_default();

        Self {
            config,
            config_path: Config::config_path().ok(),
            username: session.current_username(),
            session,

            state: AppState::Normal,
            screen: Screen::Login,
            history: Vec::new(),
            status: ViewStatus::default(),
            status_message: None,

            login_form: AuthForm {
                username: login_username,
                password: login_password,
                ..AuthForm::default()
            },
            register_form: AuthForm::default(),
            compose: String::new(),

            feed: FeedView::default(),
            post: None,
            profile: ProfileView::default(),

            ticket: 0,
            result_rx: rx,
            result_tx: tx,
        }
    }

    /// Pick the first screen: the feed if credentials are stored, else login
    pub fn start(&mut self) {
        if self.session.is_authenticated() {
            self.navigate(Screen::Feed);
        } else {
            self.show_login(None);
        }
    }

    pub fn current_username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Save the config somewhere else (or nowhere) instead of the user's config dir
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Open `screen`, remembering the current one for `go_back`.
    pub fn navigate(&mut self, screen: Screen) {
        if screen == self.screen && !screen.is_public() {
            self.refresh();
            return;
        }
        let previous = std::mem::replace(&mut self.screen, screen);
        if !previous.is_public() {
            self.history.push(previous);
        }
        self.enter_screen();
    }

    /// Return to the previous screen. Returns false if there is none.
    pub fn go_back(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.screen = previous;
                self.enter_screen();
                true
            }
            None => false,
        }
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn show_login(&mut self, error: Option<String>) {
        self.history.clear();
        self.screen = Screen::Login;
        self.clear_data();
        self.enter_screen();

        let form = &mut self.login_form;
        form.password.clear();
        form.submitting = false;
        form.error = error;
        form.focus = if form.username.is_empty() {
            FormFocus::Username
        } else {
            FormFocus::Password
        };
    }

    pub fn show_register(&mut self) {
        if self.login_form.submitting {
            return;
        }
        self.register_form = AuthForm::default();
        self.screen = Screen::Register;
        self.enter_screen();
    }

    /// Reset per-screen state and start loading.
    /// Bumping the ticket discards anything still in flight for the old screen.
    fn enter_screen(&mut self) {
        self.ticket += 1;
        self.username = self.session.current_username();
        self.status = ViewStatus::default();
        self.status_message = None;
        self.state = AppState::Normal;

        match &self.screen {
            Screen::PostDetail(_) => self.post = None,
            Screen::Profile(_) => self.profile = ProfileView::default(),
            Screen::Feed | Screen::Login | Screen::Register => {}
        }

        self.load_current();
    }

    fn load_current(&mut self) {
        if self.screen.is_public() {
            return;
        }
        self.status.loading = true;
        self.status.error = None;
        let api = self.session.api().clone();
        let screen = self.screen.clone();
        debug!(?screen, ticket = self.ticket, "Loading screen");
        self.spawn(TaskKind::Read, async move { fetch_screen(&api, &screen).await });
    }

    /// Re-fetch the current screen unless a request is already pending
    pub fn refresh(&mut self) {
        if self.status.loading || self.status.busy {
            return;
        }
        self.load_current();
    }

    pub fn open_selected_post(&mut self) {
        let id = match self.screen {
            Screen::Feed | Screen::Profile(_) => self.selected_post().map(|p| p.id.clone()),
            _ => None,
        };
        if let Some(id) = id {
            self.navigate(Screen::PostDetail(id));
        }
    }

    pub fn open_selected_author(&mut self) {
        if let Some(username) = self.selected_post().map(|p| p.author.username.clone()) {
            self.navigate(Screen::Profile(username));
        }
    }

    pub fn open_my_profile(&mut self) {
        if let Some(username) = self.username.clone() {
            self.navigate(Screen::Profile(username));
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn submit_login(&mut self) {
        let form = &mut self.login_form;
        if form.submitting {
            return;
        }
        if form.username.is_empty() || form.password.is_empty() {
            form.error = Some("Username and password required".to_string());
            return;
        }
        form.error = None;
        form.notice = None;
        form.submitting = true;

        let session = self.session.clone();
        let username = form.username.clone();
        let password = form.password.clone();
        self.spawn(TaskKind::Auth, async move {
            match session.login(&username, &password).await {
                Ok(()) => Outcome::LoggedIn(username),
                Err(e) => Outcome::AuthFailed(e),
            }
        });
    }

    /// Register, then log in with the same pair
    pub fn submit_register(&mut self) {
        let form = &mut self.register_form;
        if form.submitting {
            return;
        }
        if form.username.is_empty() || form.password.is_empty() {
            form.error = Some("Username and password required".to_string());
            return;
        }
        form.error = None;
        form.submitting = true;

        let session = self.session.clone();
        let username = form.username.clone();
        let password = form.password.clone();
        let full_name = Some(form.full_name.trim().to_string()).filter(|n| !n.is_empty());
        self.spawn(TaskKind::Auth, async move {
            if let Err(e) = session
                .register(&username, &password, full_name.as_deref())
                .await
            {
                return Outcome::AuthFailed(e);
            }
            match session.login(&username, &password).await {
                Ok(()) => Outcome::LoggedIn(username),
                Err(e) => Outcome::AuthFailed(e),
            }
        });
    }

    fn finish_login(&mut self, username: String) {
        info!(username = %username, "Signed in");
        self.config.last_username = Some(username.clone());
        if let Some(ref path) = self.config_path {
            if let Err(e) = self.config.save_to(path) {
                warn!(error = %e, "Failed to save config");
            }
        }

        self.login_form = AuthForm {
            username,
            ..AuthForm::default()
        };
        self.register_form = AuthForm::default();
        self.history.clear();
        self.screen = Screen::Feed;
        self.enter_screen();
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.session.logout() {
            error!(error = %e, "Logout failed");
            self.status_message = Some(format!("Logout failed: {}", e));
            return;
        }
        self.show_login(None);
        self.login_form.notice = Some("Logged out".to_string());
    }

    fn clear_data(&mut self) {
        self.feed = FeedView::default();
        self.post = None;
        self.profile = ProfileView::default();
        self.compose.clear();
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Post under the cursor (or the open post on the detail screen)
    pub fn selected_post(&self) -> Option<&Post> {
        match self.screen {
            Screen::Feed => self.feed.posts.get(self.feed.selection),
            Screen::PostDetail(_) => self.post.as_ref(),
            Screen::Profile(_) => self.profile.posts.get(self.profile.selection),
            Screen::Login | Screen::Register => None,
        }
    }

    /// Gate for mutations: only one may be pending per screen
    fn begin_mutation(&mut self) -> bool {
        if self.status.busy {
            self.status_message = Some("Still working on the last action...".to_string());
            return false;
        }
        self.status.busy = true;
        self.status.error = None;
        self.status_message = None;
        true
    }

    /// Like or unlike the selected post, then re-fetch the screen
    pub fn toggle_like(&mut self) {
        let Some(post) = self.selected_post().cloned() else {
            return;
        };
        if !self.begin_mutation() {
            return;
        }
        let api = self.session.api().clone();
        let screen = self.screen.clone();
        self.spawn(TaskKind::Mutation, async move {
            let result = if post.liked_by_current_user {
                api.unlike_post(&post.id).await
            } else {
                api.like_post(&post.id).await
            };
            match result {
                Ok(()) => fetch_screen(&api, &screen).await,
                Err(e) => Outcome::Failed(e),
            }
        });
    }

    pub fn start_compose(&mut self) {
        if self.screen == Screen::Feed {
            self.state = AppState::Composing;
        }
    }

    /// Publish the draft, then re-fetch the feed
    pub fn submit_post(&mut self) {
        let content = self.compose.trim().to_string();
        if content.is_empty() {
            self.status.error = Some("Post cannot be empty".to_string());
            return;
        }
        if !self.begin_mutation() {
            return;
        }
        self.state = AppState::Normal;
        self.compose.clear();

        let api = self.session.api().clone();
        let screen = self.screen.clone();
        self.spawn(TaskKind::Mutation, async move {
            match api.create_post(&content).await {
                Ok(post) => {
                    debug!(id = %post.id, "Post created");
                    fetch_screen(&api, &screen).await
                }
                Err(e) => Outcome::CreateFailed(content, e),
            }
        });
    }

    // =========================================================================
    // Background Results
    // =========================================================================

    fn spawn<F>(&self, kind: TaskKind, task: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let tx = self.result_tx.clone();
        let ticket = self.ticket;
        tokio::spawn(async move {
            let outcome = task.await;
            if tx.send(Envelope { ticket, kind, outcome }).await.is_err() {
                debug!("App closed before result was delivered");
            }
        });
    }

    /// Apply every finished background result
    pub fn check_background_tasks(&mut self) {
        while let Ok(envelope) = self.result_rx.try_recv() {
            self.apply(envelope);
        }
    }

    fn apply(&mut self, envelope: Envelope) {
        if envelope.ticket != self.ticket {
            debug!(
                ticket = envelope.ticket,
                current = self.ticket,
                "Dropping result for a screen that is no longer shown"
            );
            return;
        }

        // A read landing must not reopen the gate for a pending mutation
        match envelope.kind {
            TaskKind::Read => self.status.loading = false,
            TaskKind::Mutation => self.status.busy = false,
            TaskKind::Auth => {}
        }

        match envelope.outcome {
            Outcome::Feed(posts) => {
                self.feed.selection = clamp_selection(self.feed.selection, posts.len());
                self.feed.posts = posts;
            }
            Outcome::Post(post) => self.post = Some(post),
            Outcome::Profile(user, posts) => {
                self.profile.selection = clamp_selection(self.profile.selection, posts.len());
                self.profile.user = Some(user);
                self.profile.posts = posts;
            }
            Outcome::Idle => {}
            Outcome::Failed(e) => self.handle_error(e),
            Outcome::CreateFailed(draft, e) => {
                if self.compose.is_empty() {
                    self.compose = draft;
                }
                self.handle_error(e);
            }
            Outcome::LoggedIn(username) => self.finish_login(username),
            Outcome::AuthFailed(e) => {
                warn!(error = %e, "Authentication failed");
                let form = if self.screen == Screen::Register {
                    &mut self.register_form
                } else {
                    &mut self.login_form
                };
                form.submitting = false;
                form.password.clear();
                form.error = Some(e.user_message());
            }
        }
    }

    fn handle_error(&mut self, e: ApiError) {
        warn!(error = %e, screen = ?self.screen, "Request failed");
        if e.is_unauthorized() {
            // The client has already dropped the rejected credentials
            self.show_login(Some(
                "Your session has expired. Please log in again.".to_string(),
            ));
            return;
        }
        self.status.error = Some(e.user_message());
    }

    // =========================================================================
    // Selection
    // =========================================================================

    fn list_len(&self) -> usize {
        match self.screen {
            Screen::Feed => self.feed.posts.len(),
            Screen::Profile(_) => self.profile.posts.len(),
            _ => 0,
        }
    }

    fn selection_mut(&mut self) -> Option<&mut usize> {
        match self.screen {
            Screen::Feed => Some(&mut self.feed.selection),
            Screen::Profile(_) => Some(&mut self.profile.selection),
            _ => None,
        }
    }

    /// Move the list cursor by `delta`, clamped to the list
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.list_len();
        if let Some(selection) = self.selection_mut() {
            let max = len.saturating_sub(1) as isize;
            *selection = (*selection as isize + delta).clamp(0, max) as usize;
        }
    }

    pub fn select_first(&mut self) {
        if let Some(selection) = self.selection_mut() {
            *selection = 0;
        }
    }

    pub fn select_last(&mut self) {
        let len = self.list_len();
        if let Some(selection) = self.selection_mut() {
            *selection = len.saturating_sub(1);
        }
    }
}

fn clamp_selection(selection: usize, len: usize) -> usize {
    selection.min(len.saturating_sub(1))
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

pub fn can_add_full_name_char(current_len: usize, c: char) -> bool {
    current_len < MAX_FULL_NAME_LENGTH && is_valid_input_char(c)
}

/// Check if a character fits in the post draft (counted in characters)
pub fn can_add_post_char(current_chars: usize, c: char) -> bool {
    current_chars < MAX_POST_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use kpitter_core::auth::MemoryStorage;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_app() -> App {
        let config = Config {
            base_url: "http://127.0.0.1:9/api".to_string(),
            ..Config::default()
        };
        let session = Session::from_config(&config, Box::new(MemoryStorage::default()))
            .expect("valid session");
        App::new(config, session).with_config_path(None)
    }

    fn post(id: &str, liked: bool) -> Post {
        Post {
            id: id.to_string(),
            content: format!("post {}", id),
            author: UserProfile {
                username: "alice".to_string(),
                full_name: None,
                posts: None,
            },
            like_count: u32::from(liked),
            liked_by_current_user: liked,
            created_at: None,
        }
    }

    // -------------------------------------------------------------------------
    // Result Handling Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_stale_ticket_is_dropped() {
        let mut app = test_app();
        app.screen = Screen::PostDetail("1".to_string());
        app.ticket = 5;

        app.apply(Envelope {
            ticket: 4,
            kind: TaskKind::Read,
            outcome: Outcome::Post(post("old", false)),
        });
        assert!(app.post.is_none());

        app.apply(Envelope {
            ticket: 5,
            kind: TaskKind::Read,
            outcome: Outcome::Post(post("1", false)),
        });
        assert_eq!(app.post.as_ref().map(|p| p.id.as_str()), Some("1"));
    }

    #[test]
    fn test_feed_result_replaces_state_and_clamps_selection() {
        let mut app = test_app();
        app.screen = Screen::Feed;
        app.feed.selection = 7;
        app.status.loading = true;

        app.apply(Envelope {
            ticket: app.ticket,
            kind: TaskKind::Read,
            outcome: Outcome::Feed(vec![post("1", false), post("2", true)]),
        });

        assert_eq!(app.feed.posts.len(), 2);
        assert_eq!(app.feed.selection, 1);
        assert!(!app.status.loading);
    }

    #[test]
    fn test_failure_sets_message_without_touching_data() {
        let mut app = test_app();
        app.screen = Screen::Feed;
        app.feed.posts = vec![post("1", false)];

        app.apply(Envelope {
            ticket: app.ticket,
            kind: TaskKind::Read,
            outcome: Outcome::Failed(ApiError::NotFound(String::new())),
        });

        assert_eq!(app.status.error.as_deref(), Some("Not found"));
        assert_eq!(app.screen, Screen::Feed);
    }

    #[test]
    fn test_unauthorized_routes_to_login_and_clears_data() {
        let mut app = test_app();
        app.screen = Screen::Feed;
        app.feed.posts = vec![post("1", false)];
        app.history.push(Screen::Profile("bob".to_string()));

        app.apply(Envelope {
            ticket: app.ticket,
            kind: TaskKind::Read,
            outcome: Outcome::Failed(ApiError::Unauthorized),
        });

        assert_eq!(app.screen, Screen::Login);
        assert!(app.feed.posts.is_empty());
        assert!(!app.can_go_back());
        assert!(app
            .login_form
            .error
            .as_deref()
            .is_some_and(|e| e.contains("expired")));
    }

    #[test]
    fn test_create_failure_restores_draft() {
        let mut app = test_app();
        app.screen = Screen::Feed;
        app.status.busy = true;

        app.apply(Envelope {
            ticket: app.ticket,
            kind: TaskKind::Mutation,
            outcome: Outcome::CreateFailed(
                "hello".to_string(),
                ApiError::InvalidResponse("missing id".to_string()),
            ),
        });

        assert_eq!(app.compose, "hello");
        assert!(!app.status.busy);
        assert!(app.status.error.is_some());
    }

    #[test]
    fn test_read_result_leaves_mutation_pending() {
        let mut app = test_app();
        app.screen = Screen::Feed;
        app.status.loading = true;
        app.status.busy = true;

        app.apply(Envelope {
            ticket: app.ticket,
            kind: TaskKind::Read,
            outcome: Outcome::Feed(vec![post("1", false)]),
        });
        assert!(!app.status.loading);
        assert!(app.status.busy);

        app.apply(Envelope {
            ticket: app.ticket,
            kind: TaskKind::Mutation,
            outcome: Outcome::Feed(vec![post("1", true)]),
        });
        assert!(!app.status.busy);
        assert!(app.feed.posts[0].liked_by_current_user);
    }

    #[test]
    fn test_auth_failure_goes_to_active_form() {
        let mut app = test_app();
        app.screen = Screen::Register;
        app.register_form.submitting = true;
        app.register_form.password = "pw1".to_string();

        app.apply(Envelope {
            ticket: app.ticket,
            kind: TaskKind::Auth,
            outcome: Outcome::AuthFailed(SessionError::UsernameTaken),
        });

        assert!(!app.register_form.submitting);
        assert!(app.register_form.password.is_empty());
        assert_eq!(
            app.register_form.error.as_deref(),
            Some("Username is already taken")
        );
        assert!(app.login_form.error.is_none());
    }

    // -------------------------------------------------------------------------
    // Mutation Gating Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_second_mutation_is_rejected_while_busy() {
        let mut app = test_app();
        app.screen = Screen::Feed;
        app.status.busy = true;
        app.feed.posts = vec![post("1", false)];

        // Rejected before anything is spawned, so no runtime is needed
        app.toggle_like();

        assert!(app.status.busy);
        assert!(app
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("Still working")));
    }

    #[test]
    fn test_empty_post_is_not_submitted() {
        let mut app = test_app();
        app.screen = Screen::Feed;
        app.compose = "   ".to_string();

        app.submit_post();

        assert!(!app.status.busy);
        assert_eq!(app.status.error.as_deref(), Some("Post cannot be empty"));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let mut app = test_app();
        app.login_form.username = "alice".to_string();
        app.login_form.password.clear();

        app.submit_login();

        assert!(!app.login_form.submitting);
        assert_eq!(
            app.login_form.error.as_deref(),
            Some("Username and password required")
        );
    }

    // -------------------------------------------------------------------------
    // Navigation Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_navigation_history() {
        let mut app = test_app();
        app.session.credentials().save("alice", "pw1").unwrap();
        app.start();
        assert_eq!(app.screen, Screen::Feed);
        let first_ticket = app.ticket;

        app.navigate(Screen::PostDetail("1".to_string()));
        assert!(app.ticket > first_ticket);
        assert!(app.status.loading);

        app.navigate(Screen::Profile("alice".to_string()));
        assert!(app.go_back());
        assert_eq!(app.screen, Screen::PostDetail("1".to_string()));
        assert!(app.go_back());
        assert_eq!(app.screen, Screen::Feed);
        assert!(!app.go_back());
    }

    /// Drain results until `done` holds, or give up after a few seconds
    async fn pump_until(app: &mut App, done: impl Fn(&App) -> bool) {
        for _ in 0..500 {
            app.check_background_tasks();
            if done(app) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// App talking to `server`, optionally logged in, never touching the real config dir
    fn app_for(server: &MockServer, logged_in_as: Option<(&str, &str)>) -> App {
        let config = Config {
            base_url: format!("{}/api", server.uri()),
            ..Config::default()
        };
        let session = Session::from_config(&config, Box::new(MemoryStorage::default()))
            .expect("valid session");
        if let Some((username, password)) = logged_in_as {
            session.credentials().save(username, password).unwrap();
        }
        App::new(config, session).with_config_path(None)
    }

    fn feed_json(likes: u32, liked: bool) -> serde_json::Value {
        json!([{
            "id": "p1",
            "content": "hello",
            "author": {"username": "alice"},
            "likes": likes,
            "is_liked": liked,
        }])
    }

    async fn requests_with(server: &MockServer, verb: &str) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == verb)
            .count()
    }

    #[tokio::test]
    async fn test_rejected_credentials_route_to_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some(("alice", "stale")));

        app.start();
        assert_eq!(app.screen, Screen::Feed);

        pump_until(&mut app, |app| app.screen == Screen::Login).await;

        assert_eq!(app.screen, Screen::Login);
        assert!(!app.session.is_authenticated());
        assert_eq!(app.current_username(), None);
        assert!(app.login_form.error.is_some());
    }

    #[tokio::test]
    async fn test_feed_loads_and_like_refetches() {
        let server = MockServer::start().await;
        // First read sees no likes, every later read sees the like
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(feed_json(0, false)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(feed_json(1, true)))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/posts/p1/like"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some(("alice", "pw1")));

        app.start();
        pump_until(&mut app, |app| !app.status.loading).await;
        assert_eq!(app.feed.posts.len(), 1);
        assert!(!app.feed.posts[0].liked_by_current_user);

        app.toggle_like();
        // A second press while the first is pending is ignored
        app.toggle_like();
        pump_until(&mut app, |app| !app.status.busy).await;

        assert_eq!(app.feed.posts[0].like_count, 1);
        assert!(app.feed.posts[0].liked_by_current_user);
        assert!(app.status.error.is_none());
    }

    #[tokio::test]
    async fn test_refresh_landing_does_not_release_pending_like() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(feed_json(0, false))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/posts/p1/like"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(1500)))
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some(("alice", "pw1")));
        app.start();
        pump_until(&mut app, |app| !app.status.loading).await;
        assert_eq!(app.feed.posts.len(), 1);

        app.refresh();
        app.toggle_like();
        assert!(app.status.loading && app.status.busy);

        // The refresh lands long before the like does
        pump_until(&mut app, |app| !app.status.loading).await;
        assert!(!app.status.loading);
        assert!(app.status.busy);

        app.toggle_like();
        assert!(app
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("Still working")));

        pump_until(&mut app, |app| !app.status.busy).await;
        assert!(!app.status.busy);
        assert_eq!(requests_with(&server, "PUT").await, 1);
        assert_eq!(requests_with(&server, "DELETE").await, 0);
    }

    #[tokio::test]
    async fn test_register_then_login_opens_feed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "username": "alice", "full_name": "Alice A", "posts": 0
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let config_file = dir.path().join("config.json");
        let mut app =
            app_for(&server, None).with_config_path(Some(config_file.clone()));
        app.start();
        app.show_register();
        app.register_form.username = "alice".to_string();
        app.register_form.full_name = "Alice A".to_string();
        app.register_form.password = "pw1".to_string();

        app.submit_register();
        assert!(app.register_form.submitting);

        pump_until(&mut app, |app| app.screen == Screen::Feed && !app.status.loading).await;

        assert_eq!(app.screen, Screen::Feed);
        assert!(app.session.is_authenticated());
        assert_eq!(app.current_username(), Some("alice"));
        assert!(app.register_form.username.is_empty());
        assert!(!app.can_go_back());

        let saved = std::fs::read_to_string(&config_file).unwrap();
        assert!(saved.contains("\"last_username\": \"alice\""));
    }

    #[tokio::test]
    async fn test_register_conflict_stays_on_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"detail": "Username already taken"})),
            )
            .mount(&server)
            .await;

        let mut app = app_for(&server, None);
        app.start();
        app.show_register();
        app.register_form.username = "alice".to_string();
        app.register_form.password = "pw1".to_string();

        app.submit_register();
        pump_until(&mut app, |app| !app.register_form.submitting).await;

        assert_eq!(app.screen, Screen::Register);
        assert_eq!(
            app.register_form.error.as_deref(),
            Some("Username is already taken")
        );
        assert!(!app.session.is_authenticated());
        // Never goes on to log in
        assert_eq!(requests_with(&server, "POST").await, 1);
    }

    #[tokio::test]
    async fn test_login_opens_feed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(feed_json(0, false)))
            .mount(&server)
            .await;

        let mut app = app_for(&server, None);
        app.start();
        app.login_form.username = "alice".to_string();
        app.login_form.password = "pw1".to_string();

        app.submit_login();
        pump_until(&mut app, |app| app.screen == Screen::Feed && !app.status.loading).await;

        assert_eq!(app.screen, Screen::Feed);
        assert_eq!(app.feed.posts.len(), 1);
        assert_eq!(app.login_form.username, "alice");
        assert!(app.login_form.password.is_empty());
        assert!(!app.login_form.submitting);
        assert_eq!(app.current_username(), Some("alice"));
    }

    #[test]
    fn test_start_without_credentials_shows_login() {
        let mut app = test_app();
        app.start();
        assert_eq!(app.screen, Screen::Login);
        assert!(!app.status.loading);
    }

    #[tokio::test]
    async fn test_logout_returns_to_login() {
        let mut app = test_app();
        app.session.credentials().save("alice", "pw1").unwrap();
        app.start();
        app.feed.posts = vec![post("1", false)];

        app.logout();

        assert_eq!(app.screen, Screen::Login);
        assert!(!app.session.is_authenticated());
        assert_eq!(app.current_username(), None);
        assert!(app.feed.posts.is_empty());
        assert_eq!(app.login_form.notice.as_deref(), Some("Logged out"));
    }

    #[test]
    fn test_move_selection_is_clamped() {
        let mut app = test_app();
        app.screen = Screen::Feed;
        app.feed.posts = vec![post("1", false), post("2", false), post("3", false)];

        app.move_selection(10);
        assert_eq!(app.feed.selection, 2);
        app.move_selection(-1);
        assert_eq!(app.feed.selection, 1);
        app.move_selection(-10);
        assert_eq!(app.feed.selection, 0);
        app.select_last();
        assert_eq!(app.feed.selection, 2);
        app.select_first();
        assert_eq!(app.feed.selection, 0);
    }

    #[test]
    fn test_form_focus_cycle() {
        assert_eq!(FormFocus::Username.next(false), FormFocus::Password);
        assert_eq!(FormFocus::Username.next(true), FormFocus::FullName);
        assert_eq!(FormFocus::FullName.next(true), FormFocus::Password);
        assert_eq!(FormFocus::Button.next(true), FormFocus::Username);
        assert_eq!(FormFocus::Password.prev(false), FormFocus::Username);
        assert_eq!(FormFocus::Password.prev(true), FormFocus::FullName);
        assert_eq!(FormFocus::Username.prev(true), FormFocus::Button);
    }

    // -------------------------------------------------------------------------
    // Input Validation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_can_add_username_char() {
        assert!(can_add_username_char(0, 'a'));
        assert!(can_add_username_char(19, '_'));
        assert!(!can_add_username_char(20, 'a'));
        assert!(!can_add_username_char(0, ' '));
        assert!(!can_add_username_char(0, '\n'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(127, '!'));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\x00'));
    }

    #[test]
    fn test_can_add_post_char() {
        assert!(can_add_post_char(0, 'h'));
        assert!(can_add_post_char(139, ' '));
        assert!(!can_add_post_char(140, 'x'));
        assert!(!can_add_post_char(0, '\t'));
    }
}
