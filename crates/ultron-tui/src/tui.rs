use std::io::{self, Stderr};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Drives the typing animation and task polling
const TICK_RATE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
}

/// Map a terminal event onto what the app reacts to. Key releases and
/// repeats, focus, mouse and paste events are dropped.
pub fn translate(event: Event) -> Option<AppEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
        _ => None,
    }
}

/// Terminal input and ticks merged into one queue by a single pump task.
pub struct Events {
    rx: mpsc::Receiver<AppEvent>,
    pump: JoinHandle<()>,
}

impl Events {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(64);
        let pump = tokio::spawn(async move {
            let mut input = EventStream::new();
            let mut ticks = tokio::time::interval(TICK_RATE);
            loop {
                let event = tokio::select! {
                    _ = ticks.tick() => Some(AppEvent::Tick),
                    read = input.next() => match read {
                        Some(Ok(event)) => translate(event),
                        Some(Err(error)) => {
                            warn!(%error, "terminal input failed");
                            break;
                        }
                        None => break,
                    },
                };
                if let Some(event) = event {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
        });
        Self { rx, pump }
    }

    /// `None` once terminal input has closed
    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

impl Drop for Events {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Raw-mode alternate screen, left again when dropped.
pub struct Screen {
    terminal: Tui,
}

impl Screen {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        if let Err(error) = execute!(io::stderr(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(error.into());
        }
        let terminal = Terminal::new(CrosstermBackend::new(io::stderr()))?;
        Ok(Self { terminal })
    }
}

impl Deref for Screen {
    type Target = Tui;

    fn deref(&self) -> &Tui {
        &self.terminal
    }
}

impl DerefMut for Screen {
    fn deref_mut(&mut self) -> &mut Tui {
        &mut self.terminal
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        if let Err(error) = leave() {
            warn!(%error, "could not restore terminal");
        }
    }
}

fn leave() -> io::Result<()> {
    execute!(io::stderr(), LeaveAlternateScreen)?;
    disable_raw_mode()
}

/// Leave the alternate screen before the panic message is printed
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = leave();
        previous(info);
    }));
}
