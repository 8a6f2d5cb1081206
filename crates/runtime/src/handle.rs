use tokio::sync::{broadcast, mpsc, oneshot};

use game_core::{Event, GameState};

use crate::error::{Result, SessionError};
use crate::worker::Command;

/// Client-facing handle to a running [`SessionWorker`](crate::SessionWorker).
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    event_tx: broadcast::Sender<Event>,
}

impl SessionHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            command_tx,
            event_tx,
        }
    }

    /// Queue one line of input and wait for its committed events.
    pub async fn submit(&self, raw: impl Into<String>) -> Result<Vec<Event>> {
        let raw = raw.into();
        self.request(|reply| Command::Submit { raw, reply }).await?
    }

    /// Copy of the current projection.
    pub async fn snapshot(&self) -> Result<GameState> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Replay the log and compare it with the live projection.
    pub async fn verify(&self) -> Result<bool> {
        self.request(|reply| Command::Verify { reply }).await?
    }

    /// Flush the log and stop the worker.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await?
    }

    /// Every event committed after this call, from any submitter.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::WorkerClosed)?;
        reply_rx.await.map_err(|_| SessionError::WorkerClosed)
    }
}
