//! Line-oriented read-execute-print loop.
use std::io::{BufRead, Write};

use anyhow::Result;
use game_core::{ErrorSeverity, GameError};
use runtime::SessionHandle;
use tokio::sync::mpsc;

pub const QUIT: &str = ":quit";
pub const VERIFY: &str = ":verify";
pub const STATE: &str = ":state";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Reads `input` line by line on a dedicated thread into a bounded queue.
///
/// The thread stops at end of input or once the receiver is dropped.
pub fn spawn_reader<R>(input: R, depth: usize) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(depth.max(1));
    std::thread::spawn(move || {
        for line in input.lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "stopped reading input");
                    break;
                }
            }
        }
    });
    rx
}

/// Executes queued lines until `:quit`, end of input, or a fatal error.
pub async fn run(
    handle: &SessionHandle,
    mut lines: mpsc::Receiver<String>,
    out: &mut impl Write,
) -> Result<()> {
    while let Some(line) = lines.recv().await {
        if handle_line(handle, line.trim(), out).await? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

async fn handle_line(handle: &SessionHandle, line: &str, out: &mut impl Write) -> Result<Flow> {
    match line {
        "" => {}
        QUIT => return Ok(Flow::Quit),
        VERIFY => {
            let message = if handle.verify().await? {
                "log and state agree"
            } else {
                "state differs from the log; restart to replay"
            };
            writeln!(out, "{message}")?;
        }
        STATE => {
            let state = handle.snapshot().await?;
            writeln!(
                out,
                "{} entities, digest {}",
                state.entities().len(),
                state.digest()
            )?;
            for (name, turns) in state.loops().iter().filter(|(_, l)| l.active) {
                let current = turns.current_actor().unwrap_or("nobody");
                let order = turns.ordered_actors().join(", ");
                writeln!(out, "{name}: {order} (current: {current})")?;
            }
        }
        raw => match handle.submit(raw).await {
            Ok(events) => {
                for event in events {
                    writeln!(out, "{}", event.message())?;
                }
            }
            Err(err) => {
                tracing::debug!(code = err.error_code(), "reported error");
                writeln!(out, "error: {err}")?;
                if let Some(usage) = err.usage() {
                    writeln!(out, "usage: {usage}")?;
                }
                if err.severity() == ErrorSeverity::Fatal {
                    return Err(err.into());
                }
            }
        },
    }
    out.flush()?;
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use game_content::loaders::{CharacterLoader, ManifestLoader};
    use game_content::reference;
    use game_core::{DataLoader, Evaluator, FixedRoller, StaticLoader};
    use runtime::{InMemoryEventLog, Session, SessionWorker};

    fn handle() -> (SessionHandle, tokio::task::JoinHandle<()>) {
        let loader: Arc<dyn DataLoader> = Arc::new(
            reference::CHARACTERS
                .iter()
                .flat_map(|(_, content)| CharacterLoader::parse(content).unwrap())
                .fold(StaticLoader::new(), StaticLoader::with_entity),
        );
        let session = Session::builder()
            .manifest(ManifestLoader::parse(reference::MANIFEST).unwrap())
            .loader(loader)
            .event_log(InMemoryEventLog::new())
            .evaluator(Evaluator::new(FixedRoller(10)))
            .build()
            .unwrap();
        SessionWorker::spawn(session, 4)
    }

    async fn transcript(input: &'static str) -> String {
        let (handle, worker) = handle();
        let mut out = Vec::new();
        run(&handle, spawn_reader(input.as_bytes(), 2), &mut out)
            .await
            .unwrap();
        handle.shutdown().await.unwrap();
        worker.await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_transcript_prints_event_messages() {
        let input = "encounter start\n\nroll by: fighter dice: 1d20\n:quit\nencounter end\n";
        let text = transcript(input).await;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "encounter_start started");
        assert!(lines[2].contains("fighter"));
        assert!(!text.contains("ended"));
    }

    #[tokio::test]
    async fn test_errors_show_usage_and_continue() {
        let text = transcript("check by: fighter\n:state\n").await;
        assert!(text.contains("error: invalid parameter"));
        assert!(text.contains("usage: check by: <actor> stat: <stat> dc: <number>"));
        assert!(text.contains("2 entities, digest "));
    }
}
