use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('n') => app.new_chat(),
            KeyCode::Char('t') => app.toggle_theme(),
            KeyCode::Char('o') => app.open_attach_prompt(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => match app.input_mode {
            InputMode::AttachPath => app.close_attach_prompt(),
            InputMode::Chat => app.should_quit = true,
        },
        KeyCode::Enter => match app.input_mode {
            InputMode::Chat => app.submit(),
            InputMode::AttachPath => app.submit_attach_prompt(),
        },
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(2) / 2),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(2) / 2),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}
