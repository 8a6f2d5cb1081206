//! Assembles a replayed [`Session`] from a campaign directory.
use std::sync::Arc;

use anyhow::{Context, Result};
use game_content::ContentFactory;
use game_core::{DiceRoller, Evaluator, ExecutorOptions, RandomRoller};
use runtime::{FileEventLog, Session};

use crate::config::ClientConfig;

/// Builder that opens a campaign: content, event log and dice.
pub struct SessionBootstrap {
    config: ClientConfig,
    roller: Option<Box<dyn DiceRoller>>,
    install_reference: bool,
}

impl SessionBootstrap {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            roller: None,
            install_reference: true,
        }
    }

    /// Overrides the roller chosen from `dice_seed`.
    pub fn roller(mut self, roller: impl DiceRoller + 'static) -> Self {
        self.roller = Some(Box::new(roller));
        self
    }

    /// Whether an empty campaign directory is seeded with the bundled
    /// reference manifest and characters (default: true).
    pub fn install_reference(mut self, install: bool) -> Self {
        self.install_reference = install;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build(self) -> Result<Session> {
        let factory = ContentFactory::new(self.config.layout());
        let root = factory.layout().root().display().to_string();

        if self.install_reference && factory.install_reference()? {
            tracing::info!(campaign = %root, "seeded new campaign with reference content");
        }

        let manifest = factory
            .load_manifest()
            .with_context(|| format!("failed to load manifest for campaign {root}"))?;
        let data = factory.load_data()?;
        let log = FileEventLog::open(factory.layout().log_path())
            .with_context(|| format!("failed to open event log for campaign {root}"))?;

        let roller: Box<dyn DiceRoller> = match (self.roller, self.config.dice_seed) {
            (Some(roller), _) => roller,
            (None, Some(seed)) => Box::new(RandomRoller::seeded(seed)),
            (None, None) => Box::new(RandomRoller::from_entropy()),
        };
        let evaluator = Evaluator::new(roller).with_step_limit(self.config.step_limit);

        tracing::debug!(
            campaign = %root,
            seeded = self.config.dice_seed.is_some(),
            step_limit = self.config.step_limit,
            "building session"
        );

        Session::builder()
            .manifest(manifest)
            .loader(Arc::new(data))
            .event_log(log)
            .evaluator(evaluator)
            .options(ExecutorOptions {
                transcribe_rolls: self.config.transcribe_rolls,
            })
            .build()
            .with_context(|| format!("failed to start session for campaign {root}"))
    }
}
