use std::time::Instant;

use pdfchat_core::{NoticeKind, Phase, Role, Theme};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::{App, InputMode};

/// Colours derived from the application theme
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub border: Color,
    pub bar_bg: Color,
    pub user: Color,
    pub bot: Color,
    pub success: Color,
    pub error: Color,
}

impl Palette {
    pub fn for_theme(theme: &Theme) -> Self {
        match theme {
            Theme::Light => Self {
                bg: Color::White,
                fg: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                border: Color::Gray,
                bar_bg: Color::Gray,
                user: Color::Blue,
                bot: Color::Magenta,
                success: Color::Green,
                error: Color::Red,
            },
            Theme::Dark => Self {
                bg: Color::Black,
                fg: Color::White,
                muted: Color::Gray,
                accent: Color::LightBlue,
                border: Color::DarkGray,
                bar_bg: Color::DarkGray,
                user: Color::Cyan,
                bot: Color::Yellow,
                success: Color::LightGreen,
                error: Color::LightRed,
            },
        }
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let palette = Palette::for_theme(&app.theme);
    let area = frame.area();

    frame.render_widget(Block::default().style(Style::default().bg(palette.bg)), area);

    // Main layout: header, body, notice, footer
    let [header_area, body_area, notice_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let [sidebar_area, chat_area] = Layout::horizontal([
        Constraint::Length(34),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_header(app, &palette, frame, header_area);
    render_sidebar(app, &palette, frame, sidebar_area);
    render_chat(app, &palette, frame, chat_area);
    render_notice(app, &palette, frame, notice_area);
    render_footer(app, &palette, frame, footer_area);

    if app.input_mode == InputMode::FilePrompt {
        render_file_prompt(app, &palette, frame, area);
    }
}

fn render_header(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" PDF Chat ", Style::default().fg(palette.accent).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(palette.muted),
        ),
        Span::styled(
            format!("[{}] ", app.client.base_url()),
            Style::default().fg(palette.muted),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(palette.bar_bg));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(" Document ");

    let now = Instant::now();
    let session = &app.session;
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "Upload a PDF and start chatting with it",
            Style::default().fg(palette.muted),
        )),
        Line::default(),
        Line::from(Span::styled("Select PDF File", Style::default().fg(palette.fg).bold())),
    ];

    let file_label = match session.selected_file() {
        Some(path) => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        None => "Choose a PDF file (o)".to_string(),
    };
    lines.push(Line::from(Span::styled(
        format!("  {}", file_label),
        Style::default().fg(palette.accent),
    )));
    lines.push(Line::default());

    let upload_label = if session.is_uploading() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        Span::styled(format!("[u] Uploading{}", dots), Style::default().fg(palette.muted))
    } else if session.upload_banner_visible(now) {
        Span::styled("[u] Uploaded!", Style::default().fg(palette.success).bold())
    } else if session.selected_file().is_some() && !session.is_resetting() {
        Span::styled("[u] Upload PDF", Style::default().fg(palette.accent).bold())
    } else {
        Span::styled("[u] Upload PDF", Style::default().fg(palette.muted))
    };
    lines.push(Line::from(upload_label));

    if session.upload_banner_visible(now) {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "PDF uploaded successfully! You can now start chatting.",
            Style::default().fg(palette.success),
        )));
    }

    lines.push(Line::default());
    let status = match session.document_id() {
        Some(id) => Span::styled(format!("Document: {}", id), Style::default().fg(palette.fg)),
        None => Span::styled("No document loaded", Style::default().fg(palette.muted)),
    };
    lines.push(Line::from(status));

    let [info_area, clear_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(block.inner(area));

    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
        info_area,
    );

    let clear_label = if session.is_resetting() {
        "[R] Clearing..."
    } else {
        "[R] Clear Memory"
    };
    frame.render_widget(
        Paragraph::new(Span::styled(clear_label, Style::default().fg(palette.error))),
        clear_area,
    );
}

fn render_chat(app: &mut App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let phase = app.session.phase();
    let subtitle = match phase {
        Phase::NoDocument => "Upload a PDF to start chatting",
        Phase::DocumentReady | Phase::AwaitingAnswer => "Ready to answer your questions",
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(Line::from(vec![
            Span::styled(" Chat with your PDF ", Style::default().fg(palette.fg).bold()),
            Span::styled(format!("- {} ", subtitle), Style::default().fg(palette.muted)),
        ]));

    let messages = app.session.messages();
    let chat_text = if messages.is_empty() && !app.session.is_loading() {
        let (heading, hint) = match phase {
            Phase::NoDocument => (
                "No PDF uploaded",
                "Upload a PDF file to start asking questions about its content.",
            ),
            _ => ("Ready to chat!", "Ask me anything about your PDF content."),
        };
        Text::from(vec![
            Line::from(Span::styled(heading, Style::default().fg(palette.fg).bold())),
            Line::from(Span::styled(hint, Style::default().fg(palette.muted))),
        ])
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in messages {
            let (label, color) = match msg.role {
                Role::User => ("You:", palette.user),
                Role::Bot => ("Bot:", palette.bot),
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            for line in msg.text.lines() {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(palette.fg),
                )));
            }
            lines.push(Line::default());
        }

        if app.session.is_loading() {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(palette.bot).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    render_input(app, palette, frame, input_area);
}

fn render_input(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { palette.accent } else { palette.border };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask (Enter to send) ");

    if app.query_input.is_empty() && !editing {
        let placeholder = if app.session.document_id().is_some() {
            "Ask something about your PDF..."
        } else {
            "Upload a PDF first to start chatting"
        };
        let input = Paragraph::new(placeholder)
            .style(Style::default().fg(palette.muted))
            .block(input_block);
        frame.render_widget(input, area);
        return;
    }

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .query_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(palette.user))
        .block(input_block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_notice(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let Some(notice) = app.session.notice() else {
        return;
    };

    let style = match notice.kind {
        NoticeKind::Info => Style::default().fg(palette.muted),
        NoticeKind::Error => Style::default().fg(palette.error).bold(),
    };
    let line = Line::from(vec![
        Span::styled(format!(" {} ", notice.text), style),
        Span::styled(" (Esc to dismiss)", Style::default().fg(palette.muted)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing | InputMode::FilePrompt => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " ASK ",
        InputMode::FilePrompt => " OPEN ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(palette.bar_bg).fg(palette.fg);

    let hints: Vec<(&str, &str)> = match app.input_mode {
        InputMode::Normal => vec![
            (" o ", " open "),
            (" u ", " upload "),
            (" i ", " ask "),
            (" j/k ", " scroll "),
            (" R ", " clear "),
            (" t ", if app.theme.is_dark() { " light " } else { " dark " }),
            (" q ", " quit "),
        ],
        InputMode::Editing => vec![(" Enter ", " send "), (" Esc ", " stop typing ")],
        InputMode::FilePrompt => vec![(" Enter ", " select "), (" Esc ", " cancel ")],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints.into_iter().flat_map(|(key, label)| {
            [Span::styled(key, key_style), Span::styled(label, label_style)]
        }))
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(palette.bar_bg));
    frame.render_widget(footer, area);
}

fn render_file_prompt(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 7;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    // Clamp to the frame so tiny terminals never index outside the buffer
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height).intersection(area);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .style(Style::default().bg(palette.bg))
        .title(" Select PDF File ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Type a path to a .pdf file. Enter to select, Esc to cancel.")
        .style(Style::default().fg(palette.muted));
    frame.render_widget(instructions, prompt_row(inner, 0));

    // Input field, scrolled so the cursor stays visible
    let input_area = prompt_row(inner, 2);
    let width = input_area.width as usize;
    let scroll_offset = if width > 0 && app.file_cursor >= width {
        app.file_cursor - width + 1
    } else {
        0
    };
    let visible: String = app.file_input.chars().skip(scroll_offset).take(width).collect();
    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(palette.user)),
        input_area,
    );

    if !input_area.is_empty() {
        let cursor_x = (app.file_cursor - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
    }

    if let Some(error) = &app.file_error {
        let status = Paragraph::new(error.as_str()).style(Style::default().fg(palette.error));
        frame.render_widget(status, prompt_row(inner, 4));
    }
}

/// One line of the popup, empty when the popup is too short to hold it
fn prompt_row(inner: Rect, offset: u16) -> Rect {
    Rect::new(inner.x, inner.y.saturating_add(offset), inner.width, 1).intersection(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfchat_core::{Config, HttpQaClient};
    use ratatui::{backend::TestBackend, Terminal};

    fn app_in_file_prompt() -> App {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = App::new(
            &Config::new(),
            HttpQaClient::new("http://localhost:8000"),
            Theme::Dark,
            tx,
        );
        app.open_file_prompt();
        app.file_input = "/tmp/some/long/path/to/a/document.pdf".to_string();
        app.file_cursor = app.file_input.chars().count();
        app.file_error = Some("No such file".to_string());
        app
    }

    #[test]
    fn test_file_prompt_renders_on_tiny_terminals() {
        for (width, height) in [(80, 24), (20, 4), (10, 2), (3, 1)] {
            let mut app = app_in_file_prompt();
            let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
        }
    }

    #[test]
    fn test_prompt_row_clamped_to_popup() {
        let inner = Rect::new(5, 5, 10, 3);
        assert_eq!(prompt_row(inner, 2), Rect::new(5, 7, 10, 1));
        assert!(prompt_row(inner, 4).is_empty());
    }
}
