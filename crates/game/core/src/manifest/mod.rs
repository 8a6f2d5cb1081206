//! Declarative rule bundle.
//!
//! A [`Manifest`] names every command the session understands, the
//! parameters each accepts, its prerequisites and the three phases of
//! formula steps (`game`, `targets`, `actor`) whose results map to events.
//! It is loaded once and treated as immutable for the session's lifetime.
mod params;

pub use params::{ParamIssue, resolve_targets, validate_params};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::mapper;
use crate::formula::{FormulaError, Program};
use crate::value::Value;

/// Top-level manifest document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub restrictions: Restrictions,
    pub commands: BTreeMap<String, CommandDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Restrictions {
    /// Commands only the GM may run.
    pub gm_commands: Vec<String>,
    pub adjudication: Adjudication,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjudication {
    /// Commands gated behind GM approval.
    pub commands: Vec<String>,
}

/// One command definition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandDef {
    pub name: String,
    pub params: Vec<ParamDef>,
    pub prereq: Vec<PrereqDef>,
    pub game: Vec<StepDef>,
    pub targets: Vec<StepDef>,
    pub actor: Vec<StepDef>,
    pub hint: String,
    pub help: String,
    /// Usage string attached to parameter errors.
    pub error: String,
    /// Loop whose current actor alone may run this command while it is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ParamType,
    #[serde(default)]
    pub required: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    #[default]
    #[serde(rename = "string")]
    String,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "target")]
    Target,
    #[serde(rename = "list<target>")]
    TargetList,
}

impl ParamType {
    pub fn is_target(self) -> bool {
        matches!(self, ParamType::Target | ParamType::TargetList)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrereqDef {
    pub name: String,
    pub formula: String,
    /// Message reported when the formula returns `false`.
    pub error: String,
}

/// One formula step in a phase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDef {
    pub name: String,
    pub formula: String,
    /// Event mapper name; empty means the result is only stored in `steps`.
    pub event: String,
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_name: Option<String>,
}

/// Phase a step belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Prereq,
    Game,
    Targets,
    Actor,
}

/// A formula in the manifest failed to compile.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("command '{command}' {phase} '{step}': {source}")]
pub struct ManifestError {
    pub command: String,
    pub phase: Phase,
    pub step: String,
    #[source]
    pub source: FormulaError,
}

impl Manifest {
    /// Fills each command's `name` from its map key when omitted and
    /// canonicalizes keys (`encounter start` becomes `encounter_start`).
    #[must_use]
    pub fn normalized(self) -> Self {
        let commands = self
            .commands
            .into_iter()
            .map(|(key, mut def)| {
                let key = crate::engine::canonical_command(&key);
                if def.name.is_empty() {
                    def.name = key.clone();
                }
                (key, def)
            })
            .collect();
        Self {
            restrictions: self.restrictions,
            commands,
        }
    }

    pub fn command(&self, name: &str) -> Option<&CommandDef> {
        self.commands.get(name)
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn is_gm_command(&self, name: &str) -> bool {
        self.restrictions.gm_commands.iter().any(|c| c == name)
    }

    pub fn requires_adjudication(&self, name: &str) -> bool {
        self.restrictions
            .adjudication
            .commands
            .iter()
            .any(|c| c == name)
    }

    /// Dynamic view exposed to formulas as `manifest`.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self)
            .map(Value::from)
            .unwrap_or_default()
    }

    /// Compiles every formula and reports event names the mapper does not
    /// know. Compile failures are errors; unknown events are warnings.
    pub fn lint(&self) -> Result<Vec<String>, ManifestError> {
        let mut warnings = Vec::new();
        for (name, def) in &self.commands {
            for prereq in &def.prereq {
                Program::compile(&prereq.formula).map_err(|source| ManifestError {
                    command: name.clone(),
                    phase: Phase::Prereq,
                    step: prereq.name.clone(),
                    source,
                })?;
            }
            let phases = [
                (Phase::Game, &def.game),
                (Phase::Targets, &def.targets),
                (Phase::Actor, &def.actor),
            ];
            for (phase, steps) in phases {
                for step in steps {
                    Program::compile(&step.formula).map_err(|source| ManifestError {
                        command: name.clone(),
                        phase,
                        step: step.name.clone(),
                        source,
                    })?;
                    if !step.event.is_empty() && !mapper::is_known_event(&step.event) {
                        warnings.push(format!(
                            "command '{name}' {phase} step '{}' uses unknown event '{}'",
                            step.name, step.event
                        ));
                    }
                }
            }
            if let Some(turn) = &def.turn
                && turn.is_empty()
            {
                warnings.push(format!("command '{name}' has an empty turn loop"));
            }
        }
        for listed in self
            .restrictions
            .gm_commands
            .iter()
            .chain(&self.restrictions.adjudication.commands)
        {
            if !self.commands.contains_key(listed) && !crate::engine::is_builtin(listed) {
                warnings.push(format!("restriction names unknown command '{listed}'"));
            }
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
restrictions:
  gm_commands: [encounter_start]
  adjudication:
    commands: [shove]
commands:
  encounter start:
    params:
      - { name: with, type: "list<target>" }
    game:
      - { name: start, formula: "true", event: LoopEvent }
  shove:
    turn: encounter_start
    game:
      - { name: gate, formula: "pending_adjudication.approved ? 'ok' : 'adjudicate'" }
      - { name: push, formula: "'prone'", event: TeleportEvent }
"#;

    fn manifest() -> Manifest {
        serde_yaml::from_str::<Manifest>(MANIFEST).unwrap().normalized()
    }

    #[test]
    fn test_yaml_shape_and_normalization() {
        let manifest = manifest();
        let start = manifest.command("encounter_start").unwrap();
        assert_eq!(start.name, "encounter_start");
        assert_eq!(start.params[0].kind, ParamType::TargetList);
        assert!(!start.params[0].required);
        assert_eq!(start.game[0].event, "LoopEvent");
        assert!(manifest.is_gm_command("encounter_start"));
        assert!(manifest.requires_adjudication("shove"));
        assert_eq!(manifest.command("shove").unwrap().turn.as_deref(), Some("encounter_start"));
    }

    #[test]
    fn test_lint_warns_on_unknown_events() {
        let warnings = manifest().lint().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("TeleportEvent"));
    }

    #[test]
    fn test_lint_rejects_bad_formulas() {
        let mut manifest = manifest();
        manifest
            .commands
            .get_mut("shove")
            .unwrap()
            .game[0]
            .formula = "1 +".into();
        let err = manifest.lint().unwrap_err();
        assert_eq!(err.command, "shove");
        assert_eq!(err.phase, Phase::Game);
        assert_eq!(err.step, "gate");
    }

    #[test]
    fn test_manifest_value_is_visible_to_formulas() {
        let value = manifest().to_value();
        assert!(value.get("commands").and_then(|c| c.get("shove")).is_some());
    }
}
