//! The session: single writer of one campaign's event log.
//!
//! A [`Session`] owns the projection, the executor and the log. Each call to
//! [`Session::submit`] parses one line of input, runs it through the
//! executor and commits the resulting events: staged on a scratch copy of
//! the state, appended to the log, then applied.

use std::sync::Arc;

use game_core::state::PENDING_ASK;
use game_core::{
    CommandRequest, DataLoader, Event, Evaluator, Executor, ExecutorOptions, GM, GameError,
    GameState, Manifest, ParsedInput, RandomRoller, canonical_command, engine, replay,
};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SessionError};
use crate::repository::{EventRepository, RepositoryError};
use crate::surface::{KeywordParser, SurfaceParser};

/// Built-ins that resolve a pending ask in the actor's favour.
const APPROVALS: [&str; 2] = ["allow", "adjudicate"];

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`Session`] and replays its log.
pub struct SessionBuilder {
    manifest: Option<Arc<Manifest>>,
    loader: Option<Arc<dyn DataLoader>>,
    log: Option<Box<dyn EventRepository>>,
    parser: Box<dyn SurfaceParser>,
    evaluator: Option<Evaluator>,
    options: ExecutorOptions,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            manifest: None,
            loader: None,
            log: None,
            parser: Box::new(KeywordParser),
            evaluator: None,
            options: ExecutorOptions::default(),
        }
    }
}

impl SessionBuilder {
    pub fn manifest(mut self, manifest: impl Into<Arc<Manifest>>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    pub fn loader(mut self, loader: Arc<dyn DataLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn event_log(mut self, log: impl EventRepository + 'static) -> Self {
        self.log = Some(Box::new(log));
        self
    }

    /// Replaces the default [`KeywordParser`].
    pub fn parser(mut self, parser: impl SurfaceParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Evaluator to run formulas with. Defaults to entropy-seeded dice.
    pub fn evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Loads the log and replays it over the loader's entities.
    ///
    /// A log that fails to load or replay aborts startup.
    pub fn build(self) -> Result<Session> {
        let manifest = self.manifest.ok_or(SessionError::Incomplete("manifest"))?;
        let loader = self.loader.ok_or(SessionError::Incomplete("data loader"))?;
        let log = self.log.ok_or(SessionError::Incomplete("event log"))?;

        let events = log.load()?;
        let state = replay(GameState::with_entities(loader.entities()), &events)?;
        info!(
            events = events.len(),
            entities = state.entities().len(),
            digest = %state.digest(),
            "session replayed"
        );

        let evaluator = self
            .evaluator
            .unwrap_or_else(|| Evaluator::new(RandomRoller::from_entropy()));
        let executor = Executor::new(manifest, evaluator, loader).with_options(self.options);

        Ok(Session {
            executor,
            log,
            parser: self.parser,
            state,
            diverged: false,
        })
    }
}

// ============================================================================
// Session
// ============================================================================

/// One campaign's command loop. Not shareable: wrap it in a
/// [`SessionWorker`](crate::SessionWorker) to accept input from several
/// sources.
pub struct Session {
    executor: Executor,
    log: Box<dyn EventRepository>,
    parser: Box<dyn SurfaceParser>,
    state: GameState,
    /// Set when an appended event failed to apply, or a command was only
    /// partly logged.
    diverged: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("executor", &self.executor)
            .field("events", &self.log.len())
            .field("diverged", &self.diverged)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn manifest(&self) -> &Manifest {
        self.executor.manifest()
    }

    pub fn is_diverged(&self) -> bool {
        self.diverged
    }

    /// Number of events in the log.
    pub fn event_count(&self) -> u64 {
        self.log.len()
    }

    /// Runs one line of input and returns its first event, if any.
    pub fn execute(&mut self, raw: &str) -> Result<Option<Event>> {
        Ok(self.submit(raw)?.into_iter().next())
    }

    /// Runs one line of input and returns every committed event.
    ///
    /// Silently ignored input (out of turn, frozen) returns `Ok` with no
    /// events.
    pub fn submit(&mut self, raw: &str) -> Result<Vec<Event>> {
        let raw = raw.trim();
        let input = self.parser.parse(raw)?;
        self.run(CommandRequest::new(input).with_raw(raw))
    }

    /// Runs an already structured command.
    pub fn submit_input(&mut self, input: ParsedInput) -> Result<Vec<Event>> {
        self.run(CommandRequest::new(input))
    }

    /// Replays the log from scratch and checks it reproduces the current
    /// projection.
    pub fn verify(&self) -> Result<bool> {
        let events = self.log.load()?;
        let genesis = GameState::with_entities(self.executor.loader().entities());
        let replayed = replay(genesis, &events)?;
        Ok(replayed == self.state)
    }

    /// Flushes and releases the log.
    pub fn close(mut self) -> Result<()> {
        self.log.close()?;
        info!(events = self.log.len(), digest = %self.state.digest(), "session closed");
        Ok(())
    }

    fn run(&mut self, request: CommandRequest) -> Result<Vec<Event>> {
        if self.diverged {
            return Err(SessionError::Diverged);
        }

        let command = canonical_command(&request.input.command);
        let actor = request.input.actor_id.clone();
        let pending = self.pending_gm_command();

        let mut events = match self.executor.execute(&request, &self.state) {
            Ok(events) => events,
            Err(err) if err.is_silent() => {
                debug!(%command, %actor, "input ignored");
                return Ok(Vec::new());
            }
            Err(err) => {
                warn!(%command, %actor, code = err.error_code(), %err, "command rejected");
                return Err(err.into());
            }
        };

        self.commit(&events)?;
        if !engine::is_builtin(&command) {
            self.state.record_command(&command);
        }
        debug!(%command, %actor, events = events.len(), "command committed");

        if APPROVALS.contains(&command.as_str()) {
            if let Some(original) = pending {
                info!(%original, "re-executing approved command");
                let input = self.parser.parse(&original)?;
                let request = CommandRequest::new(input).with_raw(original).approved();
                events.extend(self.run(request)?);
            }
        }
        Ok(events)
    }

    /// Stages `events` on a copy of the state, then appends and applies
    /// them one by one.
    ///
    /// A storage failure before the first append leaves the session usable.
    /// Once part of the command is logged, or the log is torn, the session
    /// refuses further input until restarted.
    fn commit(&mut self, events: &[Event]) -> Result<()> {
        let mut staged = self.state.clone();
        for (index, event) in events.iter().enumerate() {
            event
                .apply(&mut staged)
                .map_err(|source| SessionError::InvalidEvent {
                    index,
                    event: event.type_tag(),
                    source,
                })?;
        }

        for (index, event) in events.iter().enumerate() {
            if let Err(err) = self.log.append(event) {
                if index > 0 || matches!(err, RepositoryError::TornWrite { .. }) {
                    self.diverged = true;
                    error!(index, event = event.type_tag(), %err, "command only partly logged");
                }
                return Err(err.into());
            }
            if let Err(err) = event.apply(&mut self.state) {
                self.diverged = true;
                error!(event = event.type_tag(), %err, "logged event failed to apply");
                return Err(SessionError::Diverged);
            }
        }
        Ok(())
    }

    /// The command string recorded by an outstanding GM ask.
    fn pending_gm_command(&self) -> Option<String> {
        let ask = self.state.metadata_value(PENDING_ASK)?;
        let target = ask.get("target")?.as_str()?;
        if !target.eq_ignore_ascii_case(GM) {
            return None;
        }
        ask.get("options")?
            .as_array()?
            .first()?
            .as_str()
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryEventLog;
    use game_content::loaders::{CharacterLoader, ManifestLoader};
    use game_content::reference;
    use game_core::{FixedRoller, StaticLoader};

    fn loader() -> Arc<dyn DataLoader> {
        let loader = reference::CHARACTERS
            .iter()
            .flat_map(|(_, content)| CharacterLoader::parse(content).unwrap())
            .fold(StaticLoader::new(), StaticLoader::with_entity);
        Arc::new(loader)
    }

    fn session(log: InMemoryEventLog) -> Session {
        Session::builder()
            .manifest(ManifestLoader::parse(reference::MANIFEST).unwrap())
            .loader(loader())
            .event_log(log)
            .evaluator(Evaluator::new(FixedRoller(10)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_every_part() {
        let err = Session::builder().build().unwrap_err();
        assert!(matches!(err, SessionError::Incomplete("manifest")));
    }

    #[test]
    fn test_storage_failure_applies_nothing() {
        let log = InMemoryEventLog::new();
        let mut session = session(log.clone());
        log.set_read_only(true);

        let err = session.submit("encounter start").unwrap_err();
        assert!(matches!(err, SessionError::Storage(RepositoryError::ReadOnly)));
        assert!(!session.state().is_loop_active("encounter_start"));
        assert!(!session.is_diverged());

        log.set_read_only(false);
        assert!(session.execute("encounter start").unwrap().is_some());
        assert!(session.state().is_loop_active("encounter_start"));
    }

    /// Accepts `remaining` appends, then fails like a full disk.
    struct FailingLog {
        inner: InMemoryEventLog,
        remaining: usize,
    }

    impl EventRepository for FailingLog {
        fn append(&mut self, event: &Event) -> crate::repository::Result<u64> {
            if self.remaining == 0 {
                return Err(std::io::Error::other("no space left on device").into());
            }
            self.remaining -= 1;
            self.inner.append(event)
        }

        fn load(&self) -> crate::repository::Result<Vec<Event>> {
            self.inner.load()
        }

        fn flush(&mut self) -> crate::repository::Result<()> {
            self.inner.flush()
        }

        fn len(&self) -> u64 {
            self.inner.len()
        }
    }

    #[test]
    fn test_partly_logged_command_halts_session() {
        let log = InMemoryEventLog::new();
        let mut session = Session::builder()
            .manifest(ManifestLoader::parse(reference::MANIFEST).unwrap())
            .loader(loader())
            .event_log(FailingLog {
                inner: log.clone(),
                remaining: 1,
            })
            .evaluator(Evaluator::new(FixedRoller(10)))
            .build()
            .unwrap();

        let err = session.submit("encounter start").unwrap_err();
        assert!(matches!(err, SessionError::Storage(RepositoryError::Io(_))));
        assert!(session.is_diverged());
        assert_eq!(log.events().unwrap().len(), 1);
        assert!(matches!(session.submit("hint"), Err(SessionError::Diverged)));

        // The restarted session replays exactly what reached the log.
        let restarted = self::session(log);
        assert!(restarted.state().is_loop_active("encounter_start"));
        assert!(!restarted.is_diverged());
    }

    #[test]
    fn test_rejected_event_is_never_logged() {
        let log = InMemoryEventLog::new();
        let mut session = session(log.clone());

        // Maps cleanly, but there is no such section to write.
        let err = session
            .submit("set of: fighter section: armour key: ac value: 3")
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidEvent { index: 0, .. }));
        assert!(log.is_empty());
    }

    #[test]
    fn test_hint_follows_last_manifest_command() {
        let mut session = session(InMemoryEventLog::new());
        session.submit("encounter start").unwrap();
        session.submit("roll dice: 1d20").unwrap();
        let hint = session.execute("hint").unwrap().unwrap();
        assert_eq!(hint.message(), "Each participant should now roll initiative.");
    }

    #[test]
    fn test_verify_matches_replay() {
        let log = InMemoryEventLog::new();
        let mut session = session(log.clone());
        session.submit("encounter start with: fighter and goblin").unwrap();
        session.submit("initiative by: fighter").unwrap();
        assert!(session.verify().unwrap());

        let restarted = self::session(log);
        assert_eq!(restarted.state(), session.state());
        assert_eq!(restarted.state().digest(), session.state().digest());
    }
}
