use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, InputMode, Theme};
use ultron_core::{Phase, Sender};

struct Palette {
    background: Color,
    text: Color,
    muted: Color,
    user: Color,
    ai: Color,
    system: Color,
    border: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            background: Color::Reset,
            text: Color::Reset,
            muted: Color::DarkGray,
            user: Color::Blue,
            ai: Color::Magenta,
            system: Color::Cyan,
            border: Color::DarkGray,
        },
        Theme::Dark => Palette {
            background: Color::Black,
            text: Color::White,
            muted: Color::Gray,
            user: Color::LightCyan,
            ai: Color::LightYellow,
            system: Color::LightBlue,
            border: Color::Gray,
        },
    }
}

/// Render `**bold**` and `*italic*` spans; unmatched markers stay literal
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;
    let mut plain = String::new();

    while let Some(start) = rest.find('*') {
        let (marker, style) = if rest[start..].starts_with("**") {
            ("**", Style::default().add_modifier(Modifier::BOLD))
        } else {
            ("*", Style::default().add_modifier(Modifier::ITALIC))
        };
        let after = &rest[start + marker.len()..];

        match after.find(marker) {
            Some(end) if end > 0 => {
                plain.push_str(&rest[..start]);
                if !plain.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut plain)));
                }
                spans.push(Span::styled(after[..end].to_string(), style));
                rest = &after[end + marker.len()..];
            }
            _ => {
                // No closing marker, treat as literal
                plain.push_str(&rest[..start + marker.len()]);
                rest = after;
            }
        }
    }
    plain.push_str(rest);
    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Rows a line occupies once wrapped to `width`
fn wrapped_rows(line: &Line, width: u16) -> usize {
    if width == 0 {
        return 1;
    }
    line.width().div_ceil(usize::from(width)).max(1)
}

/// Furthest the chat pane can scroll, clamped to what `Paragraph::scroll` takes
fn max_scroll(lines: &[Line], width: u16, height: u16) -> u16 {
    let total_rows: usize = lines.iter().map(|l| wrapped_rows(l, width)).sum();
    let overflow = total_rows.saturating_sub(usize::from(height));
    u16::try_from(overflow).unwrap_or(u16::MAX)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let colors = palette(app.theme);
    let area = frame.area();

    frame.render_widget(
        Block::default().style(Style::default().bg(colors.background).fg(colors.text)),
        area,
    );

    let [header_area, chat_area, input_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    // Header
    let header = Line::from(vec![
        Span::styled("Chat with Ultron", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", app.client.model()), Style::default().fg(colors.muted)),
        match app.session.pending_document() {
            Some(doc) => Span::styled(format!("  📎 {}", doc.file_name), Style::default().fg(colors.system)),
            None => Span::raw(""),
        },
    ]);
    frame.render_widget(Paragraph::new(header), header_area);

    // Chat history
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.session.messages() {
        match msg.sender {
            Sender::User => {
                lines.push(
                    Line::from(Span::styled(
                        format!("You {}", app.avatar),
                        Style::default().fg(colors.user).add_modifier(Modifier::BOLD),
                    ))
                    .alignment(Alignment::Right),
                );
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()).alignment(Alignment::Right));
                }
            }
            Sender::Ai => {
                lines.push(Line::from(Span::styled(
                    "AI",
                    Style::default().fg(colors.ai).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
            Sender::System => {
                lines.push(
                    Line::from(Span::styled(
                        msg.text.clone(),
                        Style::default().fg(colors.system).add_modifier(Modifier::ITALIC),
                    ))
                    .alignment(Alignment::Center),
                );
            }
        }
        lines.push(Line::default());
    }

    if app.session.busy() {
        lines.push(Line::from(Span::styled(
            "AI",
            Style::default().fg(colors.ai).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Typing{}", dots),
            Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
        )));
    }

    let max_scroll = max_scroll(&lines, app.chat_width, app.chat_height);
    if app.follow_bottom || app.scroll >= max_scroll {
        app.scroll = max_scroll;
        app.follow_bottom = true;
    }

    let chat_text = if lines.is_empty() {
        Text::from(Span::styled(
            "Say something, or press Ctrl+O to attach a PDF...",
            Style::default().fg(colors.muted),
        ))
    } else {
        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    frame.render_widget(chat, chat_area);

    // Input line
    let (title, border) = match app.input_mode {
        InputMode::Chat if app.session.busy() => (" Waiting for reply... ".to_string(), colors.muted),
        InputMode::Chat => (" Message ".to_string(), colors.user),
        InputMode::AttachPath => (" Attach PDF (path, Enter to upload, Esc to cancel) ".to_string(), colors.system),
    };
    let title = match &app.status {
        Some(status) => format!("{}· {} ", title, status),
        None => title,
    };

    // Horizontal scroll keeps the cursor visible
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.cursor < inner_width {
        0
    } else {
        app.cursor - inner_width + 1
    };
    let visible_text: String = app.input.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );
    frame.render_widget(input, input_area);
    frame.set_cursor_position((
        input_area.x + (app.cursor - scroll_offset) as u16 + 1,
        input_area.y + 1,
    ));

    // Key help
    let mut help = "Enter send · Ctrl+O attach · Ctrl+N new chat · Ctrl+T theme · Esc quit".to_string();
    if app.session.phase() == Phase::Extracting {
        help.push_str(" · reading document");
    }
    frame.render_widget(
        Paragraph::new(Span::styled(help, Style::default().fg(colors.muted))),
        help_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_texts(line: &Line) -> Vec<(String, bool, bool)> {
        line.spans
            .iter()
            .map(|s| {
                (
                    s.content.to_string(),
                    s.style.add_modifier.contains(Modifier::BOLD),
                    s.style.add_modifier.contains(Modifier::ITALIC),
                )
            })
            .collect()
    }

    #[test]
    fn test_bold_and_italic_spans() {
        let line = parse_markdown_line("a **b** c *d*");
        assert_eq!(
            span_texts(&line),
            vec![
                ("a ".to_string(), false, false),
                ("b".to_string(), true, false),
                (" c ".to_string(), false, false),
                ("d".to_string(), false, true),
            ]
        );
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        let line = parse_markdown_line("2 * 3 = 6");
        assert_eq!(span_texts(&line), vec![("2 * 3 = 6".to_string(), false, false)]);
    }

    #[test]
    fn test_empty_line() {
        assert!(parse_markdown_line("").spans.is_empty());
    }

    #[test]
    fn test_wrapped_rows() {
        let line = Line::from("abcdefghij");
        assert_eq!(wrapped_rows(&line, 4), 3);
        assert_eq!(wrapped_rows(&Line::default(), 4), 1);
    }

    #[test]
    fn test_wrapped_rows_wider_than_u16() {
        let line = Line::from("x".repeat(70_000));
        assert_eq!(wrapped_rows(&line, 1), 70_000);
        assert_eq!(wrapped_rows(&line, 100), 700);
    }

    #[test]
    fn test_max_scroll_clamps_instead_of_overflowing() {
        let lines: Vec<Line> = (0..3).map(|_| Line::from("y".repeat(30_000))).collect();
        assert_eq!(max_scroll(&lines, 1, 10), u16::MAX);
        assert_eq!(max_scroll(&lines, 1000, 10), 80);
        assert_eq!(max_scroll(&lines, 1000, 200), 0);
    }
}
