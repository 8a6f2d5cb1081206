//! Closed set of state-changing events.
//!
//! Every accepted command becomes a sequence of [`Event`]s. An event carries
//! only identifiers and plain values, serializes to the on-disk
//! `{"type": <tag>, "data": {..}}` shape, and knows how to fold itself into a
//! [`GameState`](crate::GameState) (see [`Event::apply`]).
mod apply;

use serde::{Deserialize, Serialize};

use crate::state::Entity;

/// A single immutable record of something that happened in the session.
///
/// The serde representation is adjacently tagged, so the variant rename is
/// the persisted wire tag. Field names match the log format; `loop` is a
/// keyword in Rust and is therefore renamed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// Create-and-reset an active loop, or mark an existing loop inactive.
    #[serde(rename = "LoopEvent")]
    Loop {
        #[serde(rename = "loop")]
        loop_name: String,
        active: bool,
    },

    #[serde(rename = "LoopOrderAscendingEvent")]
    LoopOrderAscending {
        #[serde(rename = "loop")]
        loop_name: String,
        ascending: bool,
    },

    /// Writes one actor's sort key, enrolling the actor if needed.
    #[serde(rename = "LoopOrderEvent")]
    LoopOrder {
        #[serde(rename = "loop")]
        loop_name: String,
        actor: String,
        value: i64,
    },

    /// Appends an actor to a loop; duplicates are ignored.
    #[serde(rename = "ActorAddedEvent")]
    ActorAdded {
        #[serde(rename = "loop")]
        loop_name: String,
        actor: String,
    },

    /// Moves the loop's turn pointer to the next actor.
    #[serde(rename = "LoopAdvancedEvent")]
    LoopAdvanced {
        #[serde(rename = "loop")]
        loop_name: String,
    },

    /// Inserts a brand-new entity (GM spawn).
    #[serde(rename = "EntityAddedEvent")]
    EntityAdded { entity: Entity },

    /// Sets one entry in a named entity map. A `null` value removes the entry.
    #[serde(rename = "AttributeChangedEvent")]
    AttributeChanged {
        actor: String,
        section: String,
        key: String,
        value: serde_json::Value,
    },

    /// Increments `spent[key]` by one.
    #[serde(rename = "AddSpentEvent")]
    AddSpent { actor: String, key: String },

    #[serde(rename = "ConditionEvent")]
    Condition {
        actor: String,
        condition: String,
        add: bool,
    },

    /// Records the single pending ask in `metadata.pending_ask`.
    #[serde(rename = "AskIssuedEvent")]
    AskIssued { target: String, options: Vec<String> },

    #[serde(rename = "HintEvent")]
    Hint { message: String },

    #[serde(rename = "DiceRolledEvent")]
    DiceRolled {
        actor: String,
        dice: String,
        result: i64,
    },

    /// Upserts a (possibly dotted) metadata key; `null` deletes it.
    #[serde(rename = "MetadataChangedEvent")]
    MetadataChanged {
        key: String,
        value: serde_json::Value,
    },

    #[serde(rename = "CheckEvent")]
    Check {
        actor: String,
        check: String,
        passed: bool,
    },
}

impl Event {
    /// Every persisted tag, in declaration order.
    pub const TAGS: [&'static str; 14] = [
        "LoopEvent",
        "LoopOrderAscendingEvent",
        "LoopOrderEvent",
        "ActorAddedEvent",
        "LoopAdvancedEvent",
        "EntityAddedEvent",
        "AttributeChangedEvent",
        "AddSpentEvent",
        "ConditionEvent",
        "AskIssuedEvent",
        "HintEvent",
        "DiceRolledEvent",
        "MetadataChangedEvent",
        "CheckEvent",
    ];

    /// Stable wire tag of this variant.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Event::Loop { .. } => "LoopEvent",
            Event::LoopOrderAscending { .. } => "LoopOrderAscendingEvent",
            Event::LoopOrder { .. } => "LoopOrderEvent",
            Event::ActorAdded { .. } => "ActorAddedEvent",
            Event::LoopAdvanced { .. } => "LoopAdvancedEvent",
            Event::EntityAdded { .. } => "EntityAddedEvent",
            Event::AttributeChanged { .. } => "AttributeChangedEvent",
            Event::AddSpent { .. } => "AddSpentEvent",
            Event::Condition { .. } => "ConditionEvent",
            Event::AskIssued { .. } => "AskIssuedEvent",
            Event::Hint { .. } => "HintEvent",
            Event::DiceRolled { .. } => "DiceRolledEvent",
            Event::MetadataChanged { .. } => "MetadataChangedEvent",
            Event::Check { .. } => "CheckEvent",
        }
    }

    /// Short transcript line.
    pub fn message(&self) -> String {
        match self {
            Event::Loop { loop_name, active: true } => format!("{loop_name} started"),
            Event::Loop { loop_name, active: false } => format!("{loop_name} ended"),
            Event::LoopOrderAscending { loop_name, ascending } => {
                let direction = if *ascending { "ascending" } else { "descending" };
                format!("{loop_name} ordered {direction}")
            }
            Event::LoopOrder { loop_name, actor, value } => {
                format!("{actor} takes position {value} in {loop_name}")
            }
            Event::ActorAdded { loop_name, actor } => format!("{actor} joins {loop_name}"),
            Event::LoopAdvanced { loop_name } => format!("{loop_name}: next turn"),
            Event::EntityAdded { entity } => format!("{} ({}) enters", entity.name, entity.id),
            Event::AttributeChanged { actor, section, key, value } => {
                if value.is_null() {
                    format!("{actor}: {section}.{key} cleared")
                } else {
                    format!("{actor}: {section}.{key} = {value}")
                }
            }
            Event::AddSpent { actor, key } => format!("{actor} spends {key}"),
            Event::Condition { actor, condition, add: true } => {
                format!("{actor} is now {condition}")
            }
            Event::Condition { actor, condition, add: false } => {
                format!("{actor} is no longer {condition}")
            }
            Event::AskIssued { target, options } => {
                format!("{target}, choose: {}", options.join(" | "))
            }
            Event::Hint { message } => message.clone(),
            Event::DiceRolled { actor, dice, result } => format!("{actor} rolls {dice}: {result}"),
            Event::MetadataChanged { key, value } => {
                if value.is_null() {
                    format!("{key} cleared")
                } else {
                    format!("{key} = {value}")
                }
            }
            Event::Check { actor, check, passed } => {
                let outcome = if *passed { "passes" } else { "fails" };
                format!("{actor} {outcome} {check}")
            }
        }
    }
}
