use std::path::Path;

use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tracing::warn;
use ultron_core::session::Ticket;
use ultron_core::{
    Completer, CompletionError, DocumentUpload, ExtractionError, GeminiClient, NewChat,
    SendOutcome, SendResult, SessionController, UploadOutcome, UploadResult,
};

/// Display identities for the user, one picked per chat
const AVATAR_POOL: [&str; 5] = ["🦊", "🐼", "🐙", "🦉", "🐢"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Chat,
    /// The input line holds a file path to attach
    AttachPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub session: SessionController,
    pub client: GeminiClient,

    // Input line
    pub input_mode: InputMode,
    pub input: String,
    pub cursor: usize,
    /// Chat draft parked while the attach prompt is open
    pub stashed_draft: Option<String>,

    // Presentation
    pub theme: Theme,
    pub avatar: &'static str,
    pub status: Option<String>,
    pub animation_frame: u8,
    pub scroll: u16,
    pub follow_bottom: bool,
    pub chat_height: u16,
    pub chat_width: u16,

    // In-flight work, settled from the event loop
    pub send_task: Option<(Ticket, JoinHandle<SendResult>)>,
    pub upload_task: Option<(Ticket, JoinHandle<UploadResult>)>,
}

impl App {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            should_quit: false,
            session: SessionController::new(),
            client,

            input_mode: InputMode::Chat,
            input: String::new(),
            cursor: 0,
            stashed_draft: None,

            theme: Theme::Light,
            avatar: pick_avatar(),
            status: None,
            animation_frame: 0,
            scroll: 0,
            follow_bottom: true,
            chat_height: 0,
            chat_width: 0,

            send_task: None,
            upload_task: None,
        }
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    /// Send the input line. Mirrors a disabled send button while busy.
    pub fn submit(&mut self) {
        if self.session.busy() {
            return;
        }
        if let Some(pending) = self.session.begin_send(&self.input) {
            self.clear_input();
            self.follow_bottom = true;

            let client = self.client.clone();
            let ticket = pending.ticket();
            self.send_task = Some((ticket, tokio::spawn(async move { pending.run(&client).await })));
        }
    }

    pub fn open_attach_prompt(&mut self) {
        if self.input_mode == InputMode::AttachPath {
            return;
        }
        self.stashed_draft = Some(std::mem::take(&mut self.input));
        self.cursor = 0;
        self.input_mode = InputMode::AttachPath;
    }

    pub fn close_attach_prompt(&mut self) {
        self.input = self.stashed_draft.take().unwrap_or_default();
        self.cursor = self.input.chars().count();
        self.input_mode = InputMode::Chat;
    }

    /// Attach the file named on the input line
    pub fn submit_attach_prompt(&mut self) {
        let path = self.input.trim().to_string();
        self.close_attach_prompt();
        if !path.is_empty() {
            self.attach_path(Path::new(&path));
        }
    }

    pub fn attach_path(&mut self, path: &Path) {
        let upload = match DocumentUpload::from_path(path) {
            Ok(upload) => upload,
            Err(error) => {
                warn!(%error, path = %path.display(), "could not read attachment");
                self.status = Some(format!("Could not read {}", path.display()));
                return;
            }
        };

        if let Some(pending) = self.session.begin_upload(upload) {
            self.status = Some(format!("Reading {}...", pending.file_name()));
            let ticket = pending.ticket();
            self.upload_task = Some((ticket, tokio::spawn(pending.run())));
        }
    }

    pub fn new_chat(&mut self) {
        match self.session.new_chat() {
            NewChat::Reset => self.after_reset(),
            NewChat::Deferred => {
                self.status = Some("New chat will start once the current operation finishes".to_string());
            }
        }
    }

    fn after_reset(&mut self) {
        self.clear_input();
        self.stashed_draft = None;
        self.input_mode = InputMode::Chat;
        self.avatar = pick_avatar();
        self.status = None;
        self.scroll = 0;
        self.follow_bottom = true;
    }

    /// Settle finished background work into the session
    pub async fn poll_tasks(&mut self) {
        let was_deferred = self.session.reset_deferred();

        if self.send_task.as_ref().is_some_and(|(_, h)| h.is_finished()) {
            if let Some((ticket, handle)) = self.send_task.take() {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => SendResult {
                        ticket,
                        backend_name: self.client.backend_name().to_string(),
                        outcome: Err(CompletionError::Transport(e.to_string())),
                    },
                };
                if let SendOutcome::Replied(_) | SendOutcome::FellBack { .. } =
                    self.session.finish_send(result)
                {
                    self.follow_bottom = true;
                }
            }
        }

        if self.upload_task.as_ref().is_some_and(|(_, h)| h.is_finished()) {
            if let Some((ticket, handle)) = self.upload_task.take() {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => UploadResult {
                        ticket,
                        result: Err(ExtractionError::Join(e.to_string())),
                    },
                };
                // Failures stay silent apart from the log
                self.status = None;
                if let UploadOutcome::Attached(_) = self.session.finish_upload(result) {
                    self.follow_bottom = true;
                }
            }
        }

        if was_deferred && !self.session.reset_deferred() {
            self.after_reset();
        }
    }

    // Input editing (cursor is a char index)

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    // Chat scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }
}

fn pick_avatar() -> &'static str {
    AVATAR_POOL
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(AVATAR_POOL[0])
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(GeminiClient::new(None, "gemini-test"))
    }

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_editing_inserts_at_cursor() {
        let mut app = app();
        for c in "hllo".chars() {
            app.insert_char(c);
        }
        app.cursor_home();
        app.cursor_right();
        app.insert_char('e');
        assert_eq!(app.input, "hello");
        app.cursor_end();
        app.backspace();
        assert_eq!(app.input, "hell");
    }

    #[test]
    fn test_attach_prompt_restores_draft() {
        let mut app = app();
        app.input = "half typed".to_string();
        app.open_attach_prompt();
        assert!(app.input.is_empty());
        app.input = "/tmp/x.pdf".to_string();
        app.close_attach_prompt();
        assert_eq!(app.input, "half typed");
        assert_eq!(app.input_mode, InputMode::Chat);
    }

    #[test]
    fn test_theme_toggles() {
        let mut app = app();
        app.toggle_theme();
        assert_eq!(app.theme, Theme::Dark);
        app.toggle_theme();
        assert_eq!(app.theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_new_chat_picks_avatar_from_pool() {
        let mut app = app();
        app.input = "draft".to_string();
        app.new_chat();
        assert!(AVATAR_POOL.contains(&app.avatar));
        assert!(app.input.is_empty());
    }
}
