use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use pdfchat_core::{QaService, UploadOutcome};
use ratatui::layout::Rect;
use tracing::debug;

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.clamp_chat_scroll(),
        AppEvent::Tick => app.tick(Instant::now()),
        AppEvent::Uploaded(request, result) => {
            let outcome = app.session.finish_upload(&request, result, Instant::now());
            if matches!(outcome, UploadOutcome::Stored(_)) {
                app.scroll_chat_to_bottom();
            }
        }
        AppEvent::Answered(request, result) => {
            app.session.finish_query(&request, result);
            app.scroll_chat_to_bottom();
        }
        AppEvent::ResetDone(request, result) => {
            app.session.finish_reset(&request, result);
            if app.session.messages().is_empty() {
                app.chat_scroll = 0;
            }
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
        InputMode::FilePrompt => handle_file_prompt(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Document
        KeyCode::Char('o') => app.open_file_prompt(),
        KeyCode::Char('u') => start_upload(app),
        KeyCode::Char('R') => start_reset(app),

        // Conversation
        KeyCode::Char('i') | KeyCode::Enter => {
            // Input is disabled until a document is ready and no answer is pending
            if app.session.can_query() {
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(app.chat_height / 2),
        KeyCode::PageUp => app.scroll_up(app.chat_height / 2),
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,

        KeyCode::Char('t') => app.toggle_theme(),
        KeyCode::Esc => app.session.dismiss_notice(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => start_query(app),
        KeyCode::Backspace => {
            if app.query_cursor > 0 {
                app.query_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.query_input.chars().count();
            if app.query_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.query_cursor = app.query_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.query_input.chars().count();
            app.query_cursor = (app.query_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.query_cursor = 0;
        }
        KeyCode::End => {
            app.query_cursor = app.query_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
            app.query_input.insert(byte_pos, c);
            app.query_cursor += 1;
        }
        _ => {}
    }
}

fn handle_file_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_file_prompt(),
        KeyCode::Enter => app.submit_file_prompt(),
        KeyCode::Backspace => {
            if app.file_cursor > 0 {
                app.file_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.file_input, app.file_cursor);
                app.file_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.file_cursor = app.file_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.file_input.chars().count();
            app.file_cursor = (app.file_cursor + 1).min(char_count);
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.file_input, app.file_cursor);
            app.file_input.insert(byte_pos, c);
            app.file_cursor += 1;
        }
        _ => {}
    }
}

// Requests run on spawned tasks and report back through the event channel

fn start_upload(app: &mut App) {
    let Some(request) = app.session.begin_upload() else {
        debug!("upload not started: no file selected or already uploading");
        return;
    };

    let client = app.client.clone();
    let events = app.events.clone();
    tokio::spawn(async move {
        let result = client.upload_pdf(&request.path).await;
        let _ = events.send(AppEvent::Uploaded(request, result));
    });
}

fn start_query(app: &mut App) {
    let Some(request) = app.session.send_query(&app.query_input) else {
        return;
    };

    app.query_input.clear();
    app.query_cursor = 0;
    app.input_mode = InputMode::Normal;

    // Scroll to bottom so "Thinking..." is visible
    app.scroll_chat_to_bottom();

    let client = app.client.clone();
    let events = app.events.clone();
    tokio::spawn(async move {
        let result = client.ask(&request.document_id, &request.query).await;
        let _ = events.send(AppEvent::Answered(request, result));
    });
}

fn start_reset(app: &mut App) {
    let Some(request) = app.session.begin_reset() else {
        return;
    };
    if app.session.messages().is_empty() {
        app.chat_scroll = 0;
    }

    let client = app.client.clone();
    let events = app.events.clone();
    tokio::spawn(async move {
        let result = client.reset_all().await;
        let _ = events.send(AppEvent::ResetDone(request, result));
    });
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
