use std::sync::{Arc, mpsc};
use std::time::Duration;

use game_content::loaders::{CharacterLoader, ManifestLoader};
use game_content::reference;
use game_core::{DataLoader, Evaluator, Event, FixedRoller, StaticLoader};
use runtime::{EventRepository, InMemoryEventLog, Session, SessionError, SessionWorker};

fn session(log: impl EventRepository + 'static) -> Session {
    let loader: Arc<dyn DataLoader> = Arc::new(
        reference::CHARACTERS
            .iter()
            .flat_map(|(_, content)| CharacterLoader::parse(content).unwrap())
            .fold(StaticLoader::new(), StaticLoader::with_entity),
    );
    Session::builder()
        .manifest(ManifestLoader::parse(reference::MANIFEST).unwrap())
        .loader(loader)
        .event_log(log)
        .evaluator(Evaluator::new(FixedRoller(10)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_handles_share_one_ordered_session() {
    let log = InMemoryEventLog::new();
    let (handle, task) = SessionWorker::spawn(session(log.clone()), 4);
    let mut events = handle.subscribe_events();

    let chat = handle.clone();
    let started = handle.submit("encounter start").await.unwrap();
    let rolled = chat.submit("roll by: fighter dice: 1d20").await.unwrap();
    assert_eq!(started.len(), 2);
    assert_eq!(rolled.len(), 1);

    let mut broadcast = Vec::new();
    for _ in 0..3 {
        broadcast.push(events.recv().await.unwrap());
    }
    assert_eq!(broadcast, [started, rolled].concat());
    assert_eq!(log.events().unwrap(), broadcast);

    let state = handle.snapshot().await.unwrap();
    assert!(state.is_loop_active("encounter_start"));
    assert!(handle.verify().await.unwrap());

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    assert!(matches!(
        chat.submit("encounter end").await,
        Err(SessionError::WorkerClosed)
    ));
}

#[tokio::test]
async fn test_rejected_commands_are_not_broadcast() {
    let (handle, task) = SessionWorker::spawn(session(InMemoryEventLog::new()), 1);
    let mut events = handle.subscribe_events();

    assert!(handle.submit("encounter start by: fighter").await.is_err());
    handle.submit("hint").await.unwrap();

    let Event::Hint { .. } = events.recv().await.unwrap() else {
        panic!("expected the hint to be the first broadcast event");
    };

    drop(handle);
    task.await.unwrap();
}

/// Holds every append until the test releases it, like a slow disk.
struct GatedLog {
    inner: InMemoryEventLog,
    gate: mpsc::Receiver<()>,
}

impl EventRepository for GatedLog {
    fn append(&mut self, event: &Event) -> runtime::repository::Result<u64> {
        let _ = self.gate.recv();
        self.inner.append(event)
    }

    fn load(&self) -> runtime::repository::Result<Vec<Event>> {
        self.inner.load()
    }

    fn flush(&mut self) -> runtime::repository::Result<()> {
        self.inner.flush()
    }

    fn len(&self) -> u64 {
        self.inner.len()
    }
}

#[tokio::test]
async fn test_slow_storage_does_not_stall_the_runtime() {
    let (release, gate) = mpsc::channel();
    let log = InMemoryEventLog::new();
    let gated = GatedLog {
        inner: log.clone(),
        gate,
    };
    let (handle, task) = SessionWorker::spawn(session(gated), 4);

    let submitter = handle.clone();
    let pending = tokio::spawn(async move { submitter.submit("encounter start").await });

    // The single runtime thread keeps running while the append waits.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());
    assert!(log.is_empty());

    release.send(()).unwrap();
    release.send(()).unwrap();
    let events = pending.await.unwrap().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(log.events().unwrap(), events);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}
