//! Manifest-driven command pipeline.

use std::sync::Arc;

use crate::context::ContextBridge;
use crate::engine::mapper::{self, Origin};
use crate::engine::{CommandError, CommandRequest, GM, builtin, canonical_command, is_builtin};
use crate::env::DataLoader;
use crate::event::Event;
use crate::formula::{DiceReporter, Evaluator, FormulaError};
use crate::manifest::{CommandDef, Manifest, StepDef, resolve_targets, validate_params};
use crate::state::GameState;
use crate::value::{Value, ValueMap};

/// Result a game-phase step returns to request GM approval.
pub const ADJUDICATE: &str = "adjudicate";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Emit a `DiceRolledEvent` for every `roll()` made by a step, ahead of
    /// that step's mapped event.
    pub transcribe_rolls: bool,
}

/// Turns command requests into events.
///
/// Pipeline, in order:
/// 1. freeze gate (non-GM input is silently ignored while frozen)
/// 2. built-in dispatch
/// 3. manifest lookup, GM restriction, turn gate
/// 4. parameter validation
/// 5. prerequisites
/// 6. `game` steps once, `targets` steps per resolved target, `actor` steps once
///
/// Events are buffered: a failure at any stage returns the error and no
/// events. The executor reads state but never writes it; recording
/// `last_command` is left to the caller once the events are applied.
pub struct Executor {
    manifest: Arc<Manifest>,
    manifest_value: Value,
    evaluator: Evaluator,
    loader: Arc<dyn DataLoader>,
    options: ExecutorOptions,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("commands", &self.manifest.commands.len())
            .field("evaluator", &self.evaluator)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(manifest: Arc<Manifest>, evaluator: Evaluator, loader: Arc<dyn DataLoader>) -> Self {
        let manifest_value = manifest.to_value();
        Self {
            manifest,
            manifest_value,
            evaluator,
            loader,
            options: ExecutorOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn loader(&self) -> &dyn DataLoader {
        self.loader.as_ref()
    }

    pub fn evaluator_mut(&mut self) -> &mut Evaluator {
        &mut self.evaluator
    }

    pub fn execute(
        &mut self,
        request: &CommandRequest,
        state: &GameState,
    ) -> Result<Vec<Event>, CommandError> {
        let input = &request.input;
        let command = canonical_command(&input.command);
        let actor = input.actor_id.as_str();

        if state.is_frozen() && !input.is_gm() {
            return Err(CommandError::SilentIgnore);
        }
        if is_builtin(&command) {
            return builtin::run(&command, input, state, &self.manifest, &mut self.evaluator);
        }

        let manifest = Arc::clone(&self.manifest);
        let def = manifest
            .command(&command)
            .ok_or_else(|| CommandError::UnknownCommand {
                command: command.clone(),
            })?;

        if manifest.is_gm_command(&command) && !input.is_gm() {
            return Err(CommandError::Unauthorized {
                command,
                actor: actor.to_string(),
            });
        }
        if !input.is_gm() && !holds_turn(def, state, actor) {
            return Err(CommandError::SilentIgnore);
        }

        let params = validate(def, request, state)?;
        let targets = resolve_targets(def, &input.targets, &params);
        let bridge = ContextBridge::new(
            state,
            self.loader.as_ref(),
            &self.manifest_value,
            manifest.command_names(),
            &params,
            request.approved,
        );

        self.check_prereqs(def, &bridge, actor, targets.first().map(String::as_str))?;

        let mut events = Vec::new();
        let origin = Origin {
            actor,
            target: "",
            command: &command,
            loop_override: None,
        };

        let mut game_results = ValueMap::new();
        for step in &def.game {
            let result = self.run_step(&bridge, step, origin, &game_results, &mut events)?;
            if !request.approved
                && manifest.requires_adjudication(&command)
                && result.as_str() == Some(ADJUDICATE)
            {
                return Ok(vec![Event::AskIssued {
                    target: GM.to_string(),
                    options: vec![request.original()],
                }]);
            }
            game_results.insert(step.name.clone(), result);
        }

        for target in &targets {
            let mut results = game_results.clone();
            for step in &def.targets {
                let origin = Origin {
                    target: target.as_str(),
                    ..origin
                };
                let result = self.run_step(&bridge, step, origin, &results, &mut events)?;
                results.insert(step.name.clone(), result);
            }
        }

        let mut results = game_results;
        for step in &def.actor {
            let result = self.run_step(&bridge, step, origin, &results, &mut events)?;
            results.insert(step.name.clone(), result);
        }

        Ok(events)
    }

    fn check_prereqs(
        &mut self,
        def: &CommandDef,
        bridge: &ContextBridge<'_>,
        actor: &str,
        target: Option<&str>,
    ) -> Result<(), CommandError> {
        if def.prereq.is_empty() {
            return Ok(());
        }
        let context = bridge.context(actor, target, &ValueMap::new());
        for prereq in &def.prereq {
            let result = self
                .evaluator
                .evaluate(&prereq.formula, &context, None)
                .map_err(|err| CommandError::formula(&prereq.name, err))?;
            match result {
                Value::Bool(true) => {}
                Value::Bool(false) => {
                    let message = if prereq.error.is_empty() {
                        format!("prerequisite '{}' not met", prereq.name)
                    } else {
                        prereq.error.clone()
                    };
                    return Err(CommandError::Prereq { message });
                }
                other => {
                    return Err(CommandError::formula(
                        &prereq.name,
                        FormulaError::Type {
                            message: format!(
                                "prerequisite must return a bool, got {}",
                                other.type_name()
                            ),
                        },
                    ));
                }
            }
        }
        Ok(())
    }

    /// Evaluates one step and appends the events its result maps to.
    fn run_step(
        &mut self,
        bridge: &ContextBridge<'_>,
        step: &StepDef,
        origin: Origin<'_>,
        steps: &ValueMap,
        events: &mut Vec<Event>,
    ) -> Result<Value, CommandError> {
        let target = (!origin.target.is_empty()).then_some(origin.target);
        let context = bridge.context(origin.actor, target, steps);

        let mut rolls: Vec<(String, i64)> = Vec::new();
        let reporter: &mut dyn DiceReporter = &mut rolls;
        let result = self
            .evaluator
            .evaluate(&step.formula, &context, Some(reporter))
            .map_err(|err| CommandError::formula(&step.name, err))?;

        if self.options.transcribe_rolls {
            events.extend(rolls.into_iter().map(|(dice, result)| Event::DiceRolled {
                actor: origin.actor.to_string(),
                dice,
                result,
            }));
        }
        if !step.event.is_empty() {
            let origin = Origin {
                loop_override: step.loop_name.as_deref(),
                ..origin
            };
            events.extend(mapper::map_event(&step.event, &result, &origin));
        }
        Ok(result)
    }
}

/// Commands bound to a loop may only be run by its current actor while the
/// loop is active.
fn holds_turn(def: &CommandDef, state: &GameState, actor: &str) -> bool {
    let Some(turn) = def.turn.as_deref() else {
        return true;
    };
    match state.get_loop(turn) {
        Some(encounter) if encounter.active => encounter.current_actor() == Some(actor),
        _ => true,
    }
}

fn validate(
    def: &CommandDef,
    request: &CommandRequest,
    state: &GameState,
) -> Result<ValueMap, CommandError> {
    let param_error = |param: String, reason: String| CommandError::Param {
        param,
        reason,
        usage: def.error.clone(),
    };
    if let Some(unknown) = request
        .input
        .targets
        .iter()
        .find(|t| !state.contains_entity(t))
    {
        return Err(param_error("to".into(), format!("unknown target '{unknown}'")));
    }
    validate_params(def, &request.input.params, state)
        .map_err(|issue| param_error(issue.param, issue.reason))
}
