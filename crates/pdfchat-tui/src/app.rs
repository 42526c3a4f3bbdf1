use std::path::PathBuf;
use std::time::Instant;

use pdfchat_core::{is_pdf, Config, HttpQaClient, Message, Session, Theme};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    FilePrompt,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: Session,
    pub theme: Theme,

    // Question input
    pub query_input: String,
    pub query_cursor: usize, // cursor position in query_input, in chars

    // File prompt (stands in for a file chooser)
    pub file_input: String,
    pub file_cursor: usize,
    pub file_error: Option<String>,

    // Transcript view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub client: HttpQaClient,
    pub events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: &Config,
        client: HttpQaClient,
        theme: Theme,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            session: Session::new(config.reset_policy(), config.banner_window()),
            theme,

            query_input: String::new(),
            query_cursor: 0,

            file_input: String::new(),
            file_cursor: 0,
            file_error: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            animation_frame: 0,

            client,
            events,
        }
    }

    /// Theme has exactly one writer
    pub fn toggle_theme(&mut self) {
        self.theme.toggle();
    }

    /// Tick animation frame and expire the upload banner
    pub fn tick(&mut self, now: Instant) {
        if self.session.is_loading() || self.session.is_uploading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.session.tick(now);
    }

    pub fn open_file_prompt(&mut self) {
        self.file_input = self
            .session
            .selected_file()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        self.file_cursor = self.file_input.chars().count();
        self.file_error = None;
        self.input_mode = InputMode::FilePrompt;
    }

    /// Select the typed path if it names an existing PDF; keep the prompt open otherwise
    pub fn submit_file_prompt(&mut self) {
        let path = expand_home(self.file_input.trim());

        if !is_pdf(&path) {
            self.file_error = Some("Only PDF files can be selected".to_string());
            return;
        }
        if !path.is_file() {
            self.file_error = Some(format!("No such file: {}", path.display()));
            return;
        }

        self.session.select_file(path);
        self.file_error = None;
        self.input_mode = InputMode::Normal;
    }

    pub fn cancel_file_prompt(&mut self) {
        self.file_error = None;
        self.input_mode = InputMode::Normal;
    }

    // Transcript scrolling
    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.total_chat_lines().saturating_sub(self.chat_height);
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
    }

    /// Keep the scroll offset valid after the chat area changed size
    pub fn clamp_chat_scroll(&mut self) {
        self.scroll_down(0);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = self.total_chat_lines().saturating_sub(visible_height);
    }

    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines = self
            .session
            .messages()
            .iter()
            .map(|msg| message_height(msg, wrap_width))
            .sum::<usize>();

        if self.session.is_loading() {
            total_lines += 2; // "Bot:" + "Thinking..."
        }

        total_lines.min(u16::MAX as usize) as u16
    }
}

/// Lines a message occupies once wrapped: role line, body, trailing blank
fn message_height(msg: &Message, wrap_width: usize) -> usize {
    let body: usize = msg
        .text
        .lines()
        .map(|line| {
            // Use character count, not byte length, for proper UTF-8 handling
            let char_count = line.chars().count();
            if char_count == 0 {
                1
            } else {
                char_count.div_ceil(wrap_width)
            }
        })
        .sum();

    1 + body.max(1) + 1
}

fn expand_home(input: &str) -> PathBuf {
    match input.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(input)),
        None => PathBuf::from(input),
    }
}
