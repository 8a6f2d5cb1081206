//! Single-writer task that owns a [`Session`].
//!
//! Front-ends receive input on several channels (terminal lines, chat
//! messages). They all go through one bounded queue into this worker, so
//! commands execute strictly one at a time in arrival order.

use tokio::sync::{broadcast, mpsc, oneshot};

use game_core::{Event, GameState};

use crate::error::{Result, SessionError};
use crate::handle::SessionHandle;
use crate::session::Session;

/// Capacity of the committed-event broadcast.
const EVENT_BUFFER: usize = 256;

/// Requests the worker serves.
pub enum Command {
    Submit {
        raw: String,
        reply: oneshot::Sender<Result<Vec<Event>>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameState>,
    },
    Verify {
        reply: oneshot::Sender<Result<bool>>,
    },
    /// Flush the log and stop after replying.
    Shutdown { reply: oneshot::Sender<Result<()>> },
}

/// Owns the session and processes queued commands.
///
/// Session calls sync the log to disk, so each command runs on the blocking
/// pool with the worker moved in and handed back.
pub struct SessionWorker {
    session: Session,
    event_tx: broadcast::Sender<Event>,
}

impl SessionWorker {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// `queue_depth` bounds how many submissions may wait; senders block
    /// once it is full.
    pub fn spawn(
        session: Session,
        queue_depth: usize,
    ) -> (SessionHandle, tokio::task::JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(queue_depth.max(1));
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let worker = Self {
            session,
            event_tx: event_tx.clone(),
        };
        let task = tokio::spawn(worker.run(command_rx));
        (SessionHandle::new(command_tx, event_tx), task)
    }

    /// Main worker loop. Ends when every handle is dropped or on shutdown.
    async fn run(self, mut command_rx: mpsc::Receiver<Command>) {
        let mut worker = self;
        while let Some(cmd) = command_rx.recv().await {
            let outcome = tokio::task::spawn_blocking(move || {
                let shutdown = worker.handle_command(cmd);
                (worker, shutdown)
            })
            .await;
            let (next, shutdown) = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(%err, "session command panicked; worker stopped");
                    return;
                }
            };
            worker = next;

            if let Some(reply) = shutdown {
                let _ = reply.send(worker.close().await);
                return;
            }
        }
        tracing::debug!("all session handles dropped");
        // Already logged by `close`.
        let _ = worker.close().await;
    }

    async fn close(self) -> Result<()> {
        let result = tokio::task::spawn_blocking(move || self.session.close())
            .await
            .unwrap_or_else(|err| {
                tracing::error!(%err, "session close panicked");
                Err(SessionError::WorkerClosed)
            });
        if let Err(err) = &result {
            tracing::error!(%err, "failed to close session");
        }
        result
    }

    /// Returns the shutdown reply channel when asked to stop.
    fn handle_command(&mut self, cmd: Command) -> Option<oneshot::Sender<Result<()>>> {
        match cmd {
            Command::Submit { raw, reply } => {
                let result = self.session.submit(&raw);
                if let Ok(events) = &result {
                    for event in events {
                        // No subscribers is fine.
                        let _ = self.event_tx.send(event.clone());
                    }
                }
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.session.state().clone());
            }
            Command::Verify { reply } => {
                let _ = reply.send(self.session.verify());
            }
            Command::Shutdown { reply } => return Some(reply),
        }
        None
    }
}
