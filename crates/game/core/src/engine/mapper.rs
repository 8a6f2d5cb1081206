//! Step result to event mapping.
//!
//! A manifest step names an event; the mapper checks the formula result has
//! the shape that event needs and builds it. Unknown names and mismatched
//! shapes produce no event, which [`Manifest::lint`](crate::Manifest::lint)
//! reports ahead of time for the names.

use std::str::FromStr;

use crate::event::Event;
use crate::state::Entity;
use crate::value::Value;

/// Event names a manifest step may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
pub enum MappedEvent {
    LoopEvent,
    LoopOrderAscendingEvent,
    LoopOrderEvent,
    ActorAddedEvent,
    LoopAdvancedEvent,
    EntityAddedEvent,
    AttributeChangedEvent,
    AddSpentEvent,
    AddConditionEvent,
    RemoveConditionEvent,
    AskIssuedEvent,
    HintEvent,
    MetadataChangedEvent,
    CheckEvent,
    ContestResolvedEvent,
}

pub fn is_known_event(name: &str) -> bool {
    MappedEvent::from_str(name).is_ok()
}

/// Who and what a step ran for.
#[derive(Clone, Copy, Debug)]
pub struct Origin<'a> {
    pub actor: &'a str,
    /// Empty outside the per-target phase.
    pub target: &'a str,
    pub command: &'a str,
    /// The step's `loop:` field; defaults to the command name.
    pub loop_override: Option<&'a str>,
}

impl Origin<'_> {
    fn loop_name(&self) -> String {
        self.loop_override.unwrap_or(self.command).to_string()
    }

    fn target_or_actor(&self) -> String {
        if self.target.is_empty() {
            self.actor.to_string()
        } else {
            self.target.to_string()
        }
    }
}

/// Builds the events a step result maps to; usually zero or one.
pub fn map_event(name: &str, result: &Value, origin: &Origin<'_>) -> Vec<Event> {
    let Ok(kind) = MappedEvent::from_str(name) else {
        return Vec::new();
    };

    match (kind, result) {
        (MappedEvent::LoopEvent, Value::Bool(active)) => vec![Event::Loop {
            loop_name: origin.loop_name(),
            active: *active,
        }],
        (MappedEvent::LoopOrderAscendingEvent, Value::Bool(ascending)) => {
            vec![Event::LoopOrderAscending {
                loop_name: origin.loop_name(),
                ascending: *ascending,
            }]
        }
        (MappedEvent::LoopOrderEvent, Value::Map(map)) => {
            let actor = map
                .get("actor")
                .and_then(Value::as_str)
                .map_or_else(|| origin.actor.to_string(), str::to_string);
            map.get("value")
                .and_then(Value::to_int)
                .map(|value| Event::LoopOrder {
                    loop_name: origin.loop_name(),
                    actor,
                    value,
                })
                .into_iter()
                .collect()
        }
        (MappedEvent::LoopOrderEvent, value) => value
            .to_int()
            .map(|value| Event::LoopOrder {
                loop_name: origin.loop_name(),
                actor: origin.actor.to_string(),
                value,
            })
            .into_iter()
            .collect(),
        // A game-phase list enrolls only its first name; the per-target
        // phase runs once per target instead.
        (MappedEvent::ActorAddedEvent, value) => strings(value)
            .into_iter()
            .take(if origin.target.is_empty() { 1 } else { usize::MAX })
            .map(|actor| Event::ActorAdded {
                loop_name: origin.loop_name(),
                actor,
            })
            .collect(),
        (MappedEvent::LoopAdvancedEvent, Value::Bool(true)) => vec![Event::LoopAdvanced {
            loop_name: origin.loop_name(),
        }],
        (MappedEvent::EntityAddedEvent, Value::Map(map)) => {
            let has_id = map
                .get("id")
                .and_then(Value::as_str)
                .is_some_and(|id| !id.is_empty());
            if !has_id {
                return Vec::new();
            }
            serde_json::from_value::<Entity>(result.to_json())
                .map(|entity| Event::EntityAdded { entity })
                .into_iter()
                .collect()
        }
        (MappedEvent::AttributeChangedEvent, Value::Map(map)) => {
            let (Some(section), Some(key)) = (
                map.get("section").and_then(Value::as_str),
                map.get("key").and_then(Value::as_str),
            ) else {
                return Vec::new();
            };
            let actor = map
                .get("actor_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map_or_else(|| origin.target_or_actor(), str::to_string);
            vec![Event::AttributeChanged {
                actor,
                section: section.to_string(),
                key: key.to_string(),
                value: map.get("value").map(Value::to_json).unwrap_or_default(),
            }]
        }
        (MappedEvent::AddSpentEvent, Value::String(key)) if !key.is_empty() => {
            vec![Event::AddSpent {
                actor: origin.actor.to_string(),
                key: key.clone(),
            }]
        }
        (
            kind @ (MappedEvent::AddConditionEvent | MappedEvent::RemoveConditionEvent),
            Value::String(condition),
        ) if !condition.is_empty() => vec![Event::Condition {
            actor: origin.target_or_actor(),
            condition: condition.clone(),
            add: kind == MappedEvent::AddConditionEvent,
        }],
        (MappedEvent::AskIssuedEvent, Value::List(items)) => {
            let Some((first, options)) = items.split_first() else {
                return Vec::new();
            };
            let target = match first {
                Value::String(id) => id.clone(),
                Value::Map(entity) => match entity.get("id").and_then(Value::as_str) {
                    Some(id) => id.to_string(),
                    None => return Vec::new(),
                },
                _ => return Vec::new(),
            };
            if target.is_empty() {
                return Vec::new();
            }
            vec![Event::AskIssued {
                target,
                options: options.iter().map(Value::to_text).collect(),
            }]
        }
        (MappedEvent::HintEvent, Value::String(message)) => vec![Event::Hint {
            message: message.clone(),
        }],
        (MappedEvent::MetadataChangedEvent, Value::Map(map)) => {
            match map.get("key").and_then(Value::as_str) {
                Some(key) if !key.is_empty() => vec![Event::MetadataChanged {
                    key: key.to_string(),
                    value: map.get("value").map(Value::to_json).unwrap_or_default(),
                }],
                _ => Vec::new(),
            }
        }
        (MappedEvent::CheckEvent, Value::Bool(passed)) => vec![Event::Check {
            actor: origin.actor.to_string(),
            check: origin.command.to_string(),
            passed: *passed,
        }],
        (MappedEvent::ContestResolvedEvent, Value::Bool(passed)) => vec![Event::Check {
            actor: origin.actor.to_string(),
            check: "contest".to_string(),
            passed: *passed,
        }],
        _ => Vec::new(),
    }
}

/// A string, or every non-empty string in a list.
fn strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::List(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
