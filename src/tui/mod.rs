//! Terminal UI for watching an execution live.
//!
//! Drives the polling loop in a background task and renders each status
//! snapshot as it arrives. Cancellation is cooperative: `c` sets the
//! shared flag and the polling task issues the cancel request on its next
//! tick.

pub mod app;
mod ui;
pub mod widgets;

pub use app::{WatchApp, WatchMessage};

use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::panic;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use crate::api::ExecutionApi;
use crate::error::{DuneqError, Result};
use crate::poll::{CancelFlag, ExecutionHandle, PollOutcome, Poller};

/// The watch screen runner. Owns the terminal for its lifetime.
pub struct Watcher {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Watcher {
    /// Creates a new watcher, initializing the terminal.
    pub fn new() -> Result<Self> {
        let terminal = Self::setup_terminal()?;
        Ok(Self { terminal })
    }

    /// Sets up the terminal for TUI rendering.
    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()
            .map_err(|e| DuneqError::internal(format!("Failed to enable raw mode: {e}")))?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)
            .map_err(|e| DuneqError::internal(format!("Failed to enter alternate screen: {e}")))?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)
            .map_err(|e| DuneqError::internal(format!("Failed to create terminal: {e}")))?;

        Ok(terminal)
    }

    /// Restores the terminal to its original state.
    fn restore_terminal(&mut self) -> Result<()> {
        disable_raw_mode()
            .map_err(|e| DuneqError::internal(format!("Failed to disable raw mode: {e}")))?;

        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| DuneqError::internal(format!("Failed to leave alternate screen: {e}")))?;

        self.terminal
            .show_cursor()
            .map_err(|e| DuneqError::internal(format!("Failed to show cursor: {e}")))?;

        Ok(())
    }

    /// Runs the watch loop until the user quits or detaches.
    pub async fn run(
        &mut self,
        api: Arc<dyn ExecutionApi>,
        execution_id: &str,
        interval: Duration,
        max_display_rows: usize,
    ) -> Result<()> {
        // Restore the terminal if rendering panics
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        let cancel = CancelFlag::new();
        let mut app = WatchApp::new(execution_id, interval, cancel.clone(), max_display_rows);

        let (tx, mut rx) = mpsc::channel::<WatchMessage>(32);
        spawn_poll_task(Arc::clone(&api), execution_id.to_string(), interval, cancel, tx);

        let result = self.run_event_loop(&mut app, &mut rx).await;

        let _ = panic::take_hook();
        result
    }

    /// The main event loop, separated for cleaner error handling.
    async fn run_event_loop(
        &mut self,
        app: &mut WatchApp,
        rx: &mut mpsc::Receiver<WatchMessage>,
    ) -> Result<()> {
        loop {
            self.terminal
                .draw(|frame| ui::render(frame, app))
                .map_err(|e| DuneqError::internal(format!("Failed to draw: {e}")))?;

            if !app.running {
                break;
            }

            tokio::select! {
                // Terminal events
                event_result = tokio::task::spawn_blocking(|| {
                    let tick_rate = Duration::from_millis(100);
                    if crossterm::event::poll(tick_rate).unwrap_or(false) {
                        crossterm::event::read().ok()
                    } else {
                        None
                    }
                }) => {
                    if let Ok(Some(event)) = event_result {
                        handle_event(event, app);
                    }
                }

                // Updates from the polling task
                Some(msg) = rx.recv() => {
                    app.apply(msg);
                }
            }
        }

        if !app.is_settled() {
            info!(
                "Detached from execution {}; it keeps running remotely",
                app.execution_id
            );
        }

        Ok(())
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

/// Spawns the polling task feeding the UI channel.
fn spawn_poll_task(
    api: Arc<dyn ExecutionApi>,
    execution_id: String,
    interval: Duration,
    cancel: CancelFlag,
    tx: mpsc::Sender<WatchMessage>,
) {
    tokio::spawn(async move {
        // Watching is open-ended; the user cancels or detaches.
        let poller = Poller::new(Arc::clone(&api), interval, None);
        let mut handle = ExecutionHandle::new(&execution_id);

        let tick_tx = tx.clone();
        let outcome = poller
            .wait(&mut handle, &cancel, move |status| {
                let _ = tick_tx.try_send(WatchMessage::Status(Box::new(status.clone())));
            })
            .await;

        match outcome {
            Ok(outcome) => {
                let completed = outcome == PollOutcome::Completed;
                let _ = tx.send(WatchMessage::Finished(outcome)).await;

                if completed {
                    match api.get_execution_results(&execution_id).await {
                        Ok(results) => {
                            let _ = tx.send(WatchMessage::Results(Box::new(results))).await;
                        }
                        Err(e) => {
                            let _ = tx.send(WatchMessage::Error(e.to_string())).await;
                        }
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(WatchMessage::Error(e.to_string())).await;
            }
        }
    });
}

/// Handles a crossterm event.
fn handle_event(event: crossterm::event::Event, app: &mut WatchApp) {
    use crossterm::event::Event as CEvent;

    if let CEvent::Key(key) = event {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.running = false;
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                app.running = false;
            }
            KeyCode::Char('c') => {
                app.request_cancel();
            }
            _ => {}
        }
    }
}

/// Runs the watch screen for an execution.
pub async fn watch(
    api: Arc<dyn ExecutionApi>,
    execution_id: &str,
    interval: Duration,
    max_display_rows: usize,
) -> Result<()> {
    let mut watcher = Watcher::new()?;
    watcher
        .run(api, execution_id, interval, max_display_rows)
        .await
}
