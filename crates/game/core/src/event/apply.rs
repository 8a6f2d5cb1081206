//! Event application: the only code path that mutates [`GameState`].
//!
//! Each handler validates before it writes, so a rejected event leaves the
//! state exactly as it found it.

use serde_json::Value as Json;

use super::Event;
use crate::state::{
    ApplyError, Entity, GameState, LAST_CHECK, Loop, PENDING_ASK, Section,
};

impl Event {
    /// Folds this event into `state`.
    ///
    /// Pure function of `(state, event)`: no I/O, no randomness.
    pub fn apply(&self, state: &mut GameState) -> Result<(), ApplyError> {
        match self {
            Event::Loop { loop_name, active } => {
                set_loop_active(state, loop_name, *active);
                Ok(())
            }
            Event::LoopOrderAscending {
                loop_name,
                ascending,
            } => {
                loop_mut(state, loop_name)?.ascending = *ascending;
                Ok(())
            }
            Event::LoopOrder {
                loop_name,
                actor,
                value,
            } => {
                let encounter = loop_mut(state, loop_name)?;
                encounter.order.insert(actor.clone(), *value);
                if !encounter.contains(actor) {
                    encounter.actors.push(actor.clone());
                }
                Ok(())
            }
            Event::ActorAdded { loop_name, actor } => {
                let encounter = loop_mut(state, loop_name)?;
                if !encounter.contains(actor) {
                    encounter.actors.push(actor.clone());
                }
                Ok(())
            }
            Event::LoopAdvanced { loop_name } => {
                loop_mut(state, loop_name)?.advance();
                Ok(())
            }
            Event::EntityAdded { entity } => add_entity(state, entity),
            Event::AttributeChanged {
                actor,
                section,
                key,
                value,
            } => change_attribute(state, actor, section, key, value),
            Event::AddSpent { actor, key } => add_spent(state, actor, key),
            Event::Condition {
                actor,
                condition,
                add,
            } => {
                let entity = entity_mut(state, actor)?;
                let present = entity.has_condition(condition);
                if *add && !present {
                    entity.conditions.push(condition.clone());
                } else if !*add && present {
                    entity.conditions.retain(|c| c != condition);
                }
                Ok(())
            }
            Event::AskIssued { target, options } => {
                state.metadata_mut().insert(
                    PENDING_ASK.to_string(),
                    serde_json::json!({ "target": target, "options": options }),
                );
                Ok(())
            }
            Event::Hint { .. } | Event::DiceRolled { .. } => Ok(()),
            Event::MetadataChanged { key, value } => set_metadata(state, key, value),
            Event::Check {
                actor,
                check,
                passed,
            } => {
                state.metadata_mut().insert(
                    LAST_CHECK.to_string(),
                    serde_json::json!({ "actor": actor, "check": check, "passed": passed }),
                );
                Ok(())
            }
        }
    }
}

// ============================================================================
// Loops
// ============================================================================

fn loop_mut<'a>(state: &'a mut GameState, name: &str) -> Result<&'a mut Loop, ApplyError> {
    state.loop_mut(name).ok_or_else(|| ApplyError::UnknownLoop {
        name: name.to_string(),
    })
}

fn set_loop_active(state: &mut GameState, name: &str, active: bool) {
    if active {
        state.loops_mut().insert(name.to_string(), Loop::started());
    } else if let Some(existing) = state.loop_mut(name) {
        existing.active = false;
    }
}

// ============================================================================
// Entities
// ============================================================================

fn entity_mut<'a>(state: &'a mut GameState, id: &str) -> Result<&'a mut Entity, ApplyError> {
    state
        .entity_mut(id)
        .ok_or_else(|| ApplyError::UnknownEntity { id: id.to_string() })
}

fn add_entity(state: &mut GameState, entity: &Entity) -> Result<(), ApplyError> {
    if entity.id.is_empty() {
        return Err(ApplyError::EmptyEntityId);
    }
    if state.contains_entity(&entity.id) {
        return Err(ApplyError::DuplicateEntity {
            id: entity.id.clone(),
        });
    }
    entity.check_spent()?;
    state
        .entities_mut()
        .insert(entity.id.clone(), entity.clone());
    Ok(())
}

fn add_spent(state: &mut GameState, actor: &str, key: &str) -> Result<(), ApplyError> {
    let entity = entity_mut(state, actor)?;
    let spent = entity.spent.get(key).copied().unwrap_or(0) + 1;
    if let Some(limit) = entity.resources.get(key).copied()
        && spent > limit
    {
        return Err(ApplyError::SpentOutOfRange {
            actor: actor.to_string(),
            key: key.to_string(),
            spent,
            limit,
        });
    }
    entity.spent.insert(key.to_string(), spent);
    Ok(())
}

fn change_attribute(
    state: &mut GameState,
    actor: &str,
    section: &str,
    key: &str,
    value: &Json,
) -> Result<(), ApplyError> {
    let section: Section = section.parse().map_err(|_| ApplyError::UnknownSection {
        section: section.to_string(),
    })?;
    let entity = entity_mut(state, actor)?;

    if section.is_numeric() {
        let number = match value {
            Json::Null => None,
            other => Some(crate::Value::from(other).to_int().ok_or_else(|| {
                ApplyError::AttributeType {
                    section,
                    key: key.to_string(),
                    expected: "int",
                    found: other.to_string(),
                }
            })?),
        };
        if let Some(n) = number {
            check_numeric(entity, section, key, n)?;
        }
        let map = match section {
            Section::Stats => &mut entity.stats,
            Section::Resources => &mut entity.resources,
            Section::Spent => &mut entity.spent,
            Section::Proficiencies => &mut entity.proficiencies,
            _ => &mut entity.inventory,
        };
        match number {
            Some(n) => map.insert(key.to_string(), n),
            None => map.remove(key),
        };
    } else {
        let text = match value {
            Json::Null => None,
            Json::String(s) => Some(s.clone()),
            Json::Bool(_) | Json::Number(_) => Some(value.to_string()),
            other => {
                return Err(ApplyError::AttributeType {
                    section,
                    key: key.to_string(),
                    expected: "string",
                    found: other.to_string(),
                });
            }
        };
        let map = match section {
            Section::Classes => &mut entity.classes,
            _ => &mut entity.statuses,
        };
        match text {
            Some(t) => map.insert(key.to_string(), t),
            None => map.remove(key),
        };
    }
    Ok(())
}

/// Rejects writes that would break `0 <= spent[k] <= resources[k]`.
fn check_numeric(
    entity: &Entity,
    section: Section,
    key: &str,
    value: i64,
) -> Result<(), ApplyError> {
    let non_negative = matches!(
        section,
        Section::Resources | Section::Spent | Section::Inventory
    );
    if non_negative && value < 0 {
        return Err(ApplyError::NegativeValue {
            actor: entity.id.clone(),
            section,
            key: key.to_string(),
            value,
        });
    }
    let (spent, limit) = match section {
        Section::Spent => (Some(value), entity.resources.get(key).copied()),
        Section::Resources => (entity.spent.get(key).copied(), Some(value)),
        _ => (None, None),
    };
    if let (Some(spent), Some(limit)) = (spent, limit)
        && spent > limit
    {
        return Err(ApplyError::SpentOutOfRange {
            actor: entity.id.clone(),
            key: key.to_string(),
            spent,
            limit,
        });
    }
    Ok(())
}

// ============================================================================
// Metadata
// ============================================================================

/// Upserts a dotted path, creating intermediate objects. `null` deletes.
fn set_metadata(state: &mut GameState, key: &str, value: &Json) -> Result<(), ApplyError> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ApplyError::EmptyMetadataKey);
    }
    let Some((first, rest)) = segments.split_first() else {
        return Err(ApplyError::EmptyMetadataKey);
    };
    let metadata = state.metadata_mut();

    if rest.is_empty() {
        if value.is_null() {
            metadata.remove(*first);
        } else {
            metadata.insert(first.to_string(), value.clone());
        }
        return Ok(());
    }

    let child = match metadata.remove(*first) {
        Some(Json::Object(object)) => object,
        // Deleting below a scalar (or nothing) leaves it alone.
        Some(other) if value.is_null() => {
            metadata.insert(first.to_string(), other);
            return Ok(());
        }
        None if value.is_null() => return Ok(()),
        _ => serde_json::Map::new(),
    };
    metadata.insert(
        first.to_string(),
        Json::Object(upsert(child, rest, value.clone())),
    );
    Ok(())
}

fn upsert(
    mut object: serde_json::Map<String, Json>,
    path: &[&str],
    value: Json,
) -> serde_json::Map<String, Json> {
    match path {
        [] => {}
        [last] if value.is_null() => {
            object.remove(*last);
        }
        [last] => {
            object.insert(last.to_string(), value);
        }
        [head, rest @ ..] => match object.remove(*head) {
            Some(Json::Object(child)) => {
                object.insert(head.to_string(), Json::Object(upsert(child, rest, value)));
            }
            Some(other) if value.is_null() => {
                object.insert(head.to_string(), other);
            }
            None if value.is_null() => {}
            _ => {
                let child = upsert(serde_json::Map::new(), rest, value);
                object.insert(head.to_string(), Json::Object(child));
            }
        },
    }
    object
}
