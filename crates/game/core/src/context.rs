//! Evaluation context bridge.
//!
//! Projects [`GameState`], the acting and targeted entities and the command
//! parameters into the [`ValueMap`] a formula sees. The bridge only reads
//! state; each step gets a fresh map built from a shared per-command base.

use crate::env::DataLoader;
use crate::state::{Entity, GameState};
use crate::value::{Value, ValueMap};

/// Metadata keys that always exist in the `metadata` context entry.
const METADATA_DEFAULTS: [&str; 3] = ["pending_adjudication", "pending_checks", "pending_damage"];

/// Per-command context shared by every step of one execution.
#[derive(Clone, Debug)]
pub struct ContextBridge<'a> {
    state: &'a GameState,
    base: ValueMap,
}

impl<'a> ContextBridge<'a> {
    /// Builds the parts of the context that do not change between steps.
    ///
    /// `command_names` yields every manifest command so each gets an
    /// `is_<name>_active` flag. `approved` marks a re-execution after the GM
    /// allowed an adjudicated command.
    pub fn new<'n>(
        state: &'a GameState,
        loader: &dyn DataLoader,
        manifest: &Value,
        command_names: impl IntoIterator<Item = &'n str>,
        params: &ValueMap,
        approved: bool,
    ) -> Self {
        let mut base = ValueMap::new();

        let action = normalize_action(params, loader);
        base.insert("action".into(), action.clone());
        base.insert("command".into(), action);

        let metadata = metadata_view(state, approved);
        let pending = metadata
            .get("pending_adjudication")
            .cloned()
            .unwrap_or_default();
        base.insert("metadata".into(), Value::Map(metadata));
        base.insert("pending_adjudication".into(), pending);

        base.insert("is_frozen".into(), Value::Bool(state.is_frozen()));
        base.insert(
            "is_encounter_active".into(),
            Value::Bool(
                state
                    .loops()
                    .iter()
                    .any(|(name, l)| l.active && name.starts_with("encounter")),
            ),
        );
        base.insert(
            "entities".into(),
            Value::Map(
                state
                    .entities()
                    .iter()
                    .map(|(id, e)| (id.clone(), entity_value(e)))
                    .collect(),
            ),
        );
        base.insert("manifest".into(), manifest.clone());
        for name in command_names {
            base.insert(
                format!("is_{name}_active"),
                Value::Bool(state.is_loop_active(name)),
            );
        }

        Self { state, base }
    }

    /// Full context for one evaluation.
    ///
    /// Absent entities materialize as empty projections so prereqs that only
    /// read global state still work.
    pub fn context(&self, actor_id: &str, target_id: Option<&str>, steps: &ValueMap) -> ValueMap {
        let mut context = self.base.clone();
        context.insert("actor".into(), self.project(actor_id));
        context.insert(
            "target".into(),
            target_id.map_or_else(|| empty_entity_value(""), |id| self.project(id)),
        );
        context.insert("steps".into(), Value::Map(steps.clone()));
        context
    }

    fn project(&self, id: &str) -> Value {
        self.state
            .entity(id)
            .map_or_else(|| empty_entity_value(id), entity_value)
    }
}

/// Projection of an entity as nested maps plus derived conveniences.
pub fn entity_value(entity: &Entity) -> Value {
    let ints = |map: &std::collections::BTreeMap<String, i64>| {
        Value::Map(map.iter().map(|(k, v)| (k.clone(), Value::Int(*v))).collect())
    };
    let strings = |map: &std::collections::BTreeMap<String, String>| {
        Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    };
    let actions_remaining = entity
        .resources
        .get("actions")
        .map(|total| total - entity.spent.get("actions").copied().unwrap_or(0))
        .unwrap_or(0);

    Value::map([
        ("id", Value::from(entity.id.as_str())),
        ("name", Value::from(entity.name.as_str())),
        (
            "types",
            Value::List(entity.types.iter().map(|t| Value::from(t.as_str())).collect()),
        ),
        ("classes", strings(&entity.classes)),
        ("stats", ints(&entity.stats)),
        ("resources", ints(&entity.resources)),
        ("spent", ints(&entity.spent)),
        (
            "conditions",
            Value::List(entity.conditions.iter().map(|c| Value::from(c.as_str())).collect()),
        ),
        ("proficiencies", ints(&entity.proficiencies)),
        ("statuses", strings(&entity.statuses)),
        ("inventory", ints(&entity.inventory)),
        ("size", Value::from(entity.size())),
        ("category", Value::from(entity.category())),
        ("actions_remaining", Value::Int(actions_remaining)),
    ])
}

/// Projection used when the referenced entity does not exist.
pub fn empty_entity_value(id: &str) -> Value {
    entity_value(&Entity::new(id, ""))
}

fn metadata_view(state: &GameState, approved: bool) -> ValueMap {
    let mut metadata: ValueMap = METADATA_DEFAULTS
        .iter()
        .map(|key| (key.to_string(), Value::Map(ValueMap::new())))
        .collect();
    metadata.insert(
        "pending_adjudication".into(),
        Value::map([("approved", Value::Bool(false))]),
    );
    for (key, value) in state.metadata() {
        metadata.insert(key.clone(), Value::from(value));
    }
    if approved {
        metadata.insert(
            "pending_adjudication".into(),
            Value::map([("approved", Value::Bool(true))]),
        );
    }
    metadata
}

/// Command parameters plus the normalized weapon and attack fields.
pub fn normalize_action(params: &ValueMap, loader: &dyn DataLoader) -> Value {
    let mut action = params.clone();

    let weapon = params.get("weapon").cloned().unwrap_or_default();
    let resolved = weapon
        .as_str()
        .and_then(|name| loader.weapon(name))
        .unwrap_or_default();
    let pick = |key: &str, default: Value| {
        params
            .get(key)
            .filter(|v| !v.is_null())
            .or_else(|| resolved.get(key).filter(|v| !v.is_null()))
            .cloned()
            .unwrap_or(default)
    };

    let bonus = pick("bonus", Value::Int(0));
    let bonus = bonus.to_int().map(Value::Int).unwrap_or(bonus);
    let recharge = pick("recharge", Value::Null);
    let damage_type = pick("type", Value::from(""));
    let offhand = flag(params.get("offhand"));
    let opportunity = flag(params.get("opportunity"));

    let mut dice = pick("dice", Value::from(""));
    if offhand && let Value::String(text) = &dice {
        dice = Value::String(strip_modifier(text).to_string());
    }

    action.insert("weapon".into(), weapon);
    action.insert("weapon_resolved".into(), resolved);
    action.insert("bonus".into(), bonus);
    action.insert("recharge".into(), recharge);
    action.insert("dice".into(), dice);
    action.insert("type".into(), damage_type);
    action.insert("offhand".into(), Value::Bool(offhand));
    action.insert("opportunity".into(), Value::Bool(opportunity));
    Value::Map(action)
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        Some(Value::Int(i)) => *i != 0,
        _ => false,
    }
}

/// `1d6+3` becomes `1d6`; anything without a `+<n>` tail is unchanged.
fn strip_modifier(dice: &str) -> &str {
    match dice.rsplit_once('+') {
        Some((head, tail))
            if !head.trim().is_empty()
                && !tail.trim().is_empty()
                && tail.trim().chars().all(|c| c.is_ascii_digit()) =>
        {
            head.trim_end()
        }
        _ => dice,
    }
}
