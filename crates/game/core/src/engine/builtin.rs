//! Commands that exist regardless of manifest contents.

use crate::engine::{CommandError, canonical_command, request::ParsedInput};
use crate::event::Event;
use crate::formula::Evaluator;
use crate::manifest::Manifest;
use crate::state::{GameState, LAST_ADJUDICATION, PENDING_ASK};
use crate::value::Value;

const DEFAULT_HINT: &str = "No hint yet. Try 'help' to list the available commands.";

pub(super) fn run(
    command: &str,
    input: &ParsedInput,
    state: &GameState,
    manifest: &Manifest,
    evaluator: &mut Evaluator,
) -> Result<Vec<Event>, CommandError> {
    match command {
        "roll" => roll(input, evaluator),
        "help" => Ok(vec![help(input, manifest)]),
        "hint" => Ok(vec![hint(state, manifest)]),
        "ask" => ask(input),
        "allow" | "adjudicate" => adjudicate(command, input, state, true),
        "deny" => adjudicate(command, input, state, false),
        other => Err(CommandError::UnknownCommand {
            command: other.to_string(),
        }),
    }
}

fn roll(input: &ParsedInput, evaluator: &mut Evaluator) -> Result<Vec<Event>, CommandError> {
    let param_error = |reason: String| CommandError::Param {
        param: "dice".into(),
        reason,
        usage: "roll dice: <notation>, e.g. roll dice: 1d20+3".into(),
    };

    let dice = input
        .params
        .get("dice")
        .map(Value::to_text)
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| param_error("missing required parameter".into()))?;
    let result = evaluator
        .roll(&dice)
        .map_err(|err| param_error(err.to_string()))?;

    Ok(vec![Event::DiceRolled {
        actor: input.actor_id.clone(),
        dice,
        result,
    }])
}

fn help(input: &ParsedInput, manifest: &Manifest) -> Event {
    let requested = input
        .params
        .get("command")
        .map(|c| canonical_command(&c.to_text()))
        .unwrap_or_default();

    let message = match manifest.command(&requested) {
        Some(def) => {
            let mut lines = vec![format!("{}: {}", def.name, def.help)];
            if !def.error.is_empty() {
                lines.push(format!("usage: {}", def.error));
            }
            lines.join("\n")
        }
        None => {
            let commands: Vec<&str> = manifest.command_names().collect();
            format!(
                "commands: {}\nbuilt-in: {}",
                commands.join(", "),
                super::BUILTINS.join(", ")
            )
        }
    };
    Event::Hint { message }
}

fn hint(state: &GameState, manifest: &Manifest) -> Event {
    let message = state
        .last_command()
        .and_then(|name| manifest.command(name))
        .map(|def| def.hint.clone())
        .filter(|hint| !hint.is_empty())
        .unwrap_or_else(|| DEFAULT_HINT.to_string());
    Event::Hint { message }
}

fn ask(input: &ParsedInput) -> Result<Vec<Event>, CommandError> {
    if input.targets.is_empty() {
        return Err(CommandError::Param {
            param: "to".into(),
            reason: "ask needs at least one target".into(),
            usage: "ask to: <target> options: <a> and <b>".into(),
        });
    }
    let options: Vec<String> = match input.params.get("options") {
        Some(Value::List(items)) => items.iter().map(Value::to_text).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_text()],
    };
    Ok(input
        .targets
        .iter()
        .map(|target| Event::AskIssued {
            target: target.clone(),
            options: options.clone(),
        })
        .collect())
}

/// `allow`, `deny` and `adjudicate`: resolve the pending ask.
fn adjudicate(
    command: &str,
    input: &ParsedInput,
    state: &GameState,
    approved: bool,
) -> Result<Vec<Event>, CommandError> {
    if !input.is_gm() {
        return Err(CommandError::Unauthorized {
            command: command.to_string(),
            actor: input.actor_id.clone(),
        });
    }
    let mut events = Vec::with_capacity(2);
    if state.metadata_value(PENDING_ASK).is_some() {
        events.push(Event::MetadataChanged {
            key: PENDING_ASK.to_string(),
            value: serde_json::Value::Null,
        });
    }
    events.push(Event::MetadataChanged {
        key: LAST_ADJUDICATION.to_string(),
        value: serde_json::json!({ "approved": approved }),
    });
    Ok(events)
}
