//! Parameter validation and target resolution.

use super::{CommandDef, ParamType};
use crate::state::GameState;
use crate::value::{Value, ValueMap};

/// Why a parameter was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamIssue {
    pub param: String,
    pub reason: String,
}

impl ParamIssue {
    fn new(param: &str, reason: impl Into<String>) -> Self {
        Self {
            param: param.to_string(),
            reason: reason.into(),
        }
    }
}

/// Checks `params` against the command's declarations and returns the
/// normalized map: ints parsed, targets verified, `list<target>` always a
/// list. Undeclared parameters pass through untouched.
pub fn validate_params(
    def: &CommandDef,
    params: &ValueMap,
    state: &GameState,
) -> Result<ValueMap, ParamIssue> {
    let mut normalized = params.clone();

    for param in &def.params {
        let name = param.name.as_str();
        let value = params.get(name).filter(|v| !is_blank(v));

        let Some(value) = value else {
            if param.required {
                return Err(ParamIssue::new(name, "missing required parameter"));
            }
            if param.kind == ParamType::TargetList {
                normalized.insert(name.to_string(), Value::List(Vec::new()));
            }
            continue;
        };

        let resolved = match param.kind {
            ParamType::String => match value {
                Value::List(items) => Value::String(
                    items
                        .iter()
                        .map(Value::to_text)
                        .collect::<Vec<_>>()
                        .join(" and "),
                ),
                other => Value::String(other.to_text()),
            },
            ParamType::Int => value.to_int().map(Value::Int).ok_or_else(|| {
                ParamIssue::new(name, format!("expected an integer, got '{value}'"))
            })?,
            ParamType::Target => {
                let ids = target_ids(name, value)?;
                let [id] = ids.as_slice() else {
                    return Err(ParamIssue::new(name, "expected a single target"));
                };
                ensure_exists(name, id, state)?;
                Value::String(id.clone())
            }
            ParamType::TargetList => {
                let ids = target_ids(name, value)?;
                for id in &ids {
                    ensure_exists(name, id, state)?;
                }
                Value::List(ids.into_iter().map(Value::String).collect())
            }
        };
        normalized.insert(name.to_string(), resolved);
    }

    Ok(normalized)
}

/// First-seen, de-duplicated union of explicit targets and every
/// `target` / `list<target>` parameter, in declaration order.
pub fn resolve_targets(def: &CommandDef, explicit: &[String], params: &ValueMap) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    let mut push = |id: &str| {
        if !id.is_empty() && !targets.iter().any(|t| t == id) {
            targets.push(id.to_string());
        }
    };

    for id in explicit {
        push(id.as_str());
    }
    for param in def.params.iter().filter(|p| p.kind.is_target()) {
        match params.get(&param.name) {
            Some(Value::String(id)) => push(id.as_str()),
            Some(Value::List(items)) => items.iter().filter_map(Value::as_str).for_each(&mut push),
            _ => {}
        }
    }
    targets
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::List(items) => items.is_empty(),
        _ => false,
    }
}

fn target_ids(param: &str, value: &Value) -> Result<Vec<String>, ParamIssue> {
    match value {
        Value::String(id) => Ok(vec![id.clone()]),
        Value::List(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ParamIssue::new(param, format!("'{item}' is not an entity id")))
            })
            .collect(),
        other => Err(ParamIssue::new(param, format!("'{other}' is not an entity id"))),
    }
}

fn ensure_exists(param: &str, id: &str, state: &GameState) -> Result<(), ParamIssue> {
    if state.contains_entity(id) {
        Ok(())
    } else {
        Err(ParamIssue::new(param, format!("unknown target '{id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ParamDef;
    use crate::state::Entity;

    fn def() -> CommandDef {
        CommandDef {
            name: "grapple".into(),
            params: vec![
                ParamDef {
                    name: "with".into(),
                    kind: ParamType::TargetList,
                    required: false,
                },
                ParamDef {
                    name: "of".into(),
                    kind: ParamType::Target,
                    required: false,
                },
                ParamDef {
                    name: "times".into(),
                    kind: ParamType::Int,
                    required: false,
                },
                ParamDef {
                    name: "note".into(),
                    kind: ParamType::String,
                    required: false,
                },
            ],
            ..Default::default()
        }
    }

    fn state() -> GameState {
        GameState::with_entities([
            Entity::new("fighter", "Fighter"),
            Entity::new("goblin", "Goblin"),
            Entity::new("orc", "Orc"),
        ])
    }

    fn params(entries: &[(&str, Value)]) -> ValueMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_normalizes_declared_params() {
        let input = params(&[
            ("with", Value::from("goblin")),
            ("times", Value::from("3")),
            ("note", Value::List(vec!["quick".into(), "quiet".into()])),
            ("extra", Value::from("kept")),
        ]);
        let out = validate_params(&def(), &input, &state()).unwrap();
        assert_eq!(out["with"], Value::List(vec!["goblin".into()]));
        assert_eq!(out["times"], Value::Int(3));
        assert_eq!(out["note"], Value::from("quick and quiet"));
        assert_eq!(out["extra"], Value::from("kept"));
    }

    #[test]
    fn test_optional_target_list_defaults_to_empty() {
        let out = validate_params(&def(), &ValueMap::new(), &state()).unwrap();
        assert_eq!(out["with"], Value::List(vec![]));
        assert!(!out.contains_key("of"));
    }

    #[test]
    fn test_rejections() {
        let mut required = def();
        required.params[2].required = true;
        let err = validate_params(&required, &ValueMap::new(), &state()).unwrap_err();
        assert_eq!(err.param, "times");

        let err = validate_params(&def(), &params(&[("times", Value::from("x"))]), &state())
            .unwrap_err();
        assert_eq!(err.param, "times");

        let err = validate_params(&def(), &params(&[("with", Value::from("dragon"))]), &state())
            .unwrap_err();
        assert_eq!(err.reason, "unknown target 'dragon'");

        let two = Value::List(vec!["goblin".into(), "orc".into()]);
        let err = validate_params(&def(), &params(&[("of", two)]), &state()).unwrap_err();
        assert_eq!(err.param, "of");
    }

    #[test]
    fn test_required_target_list_rejects_empty_list() {
        let mut required = def();
        required.params[0].required = true;
        let empty = params(&[("with", Value::List(vec![]))]);
        let err = validate_params(&required, &empty, &state()).unwrap_err();
        assert_eq!(err.param, "with");
        assert_eq!(err.reason, "missing required parameter");

        let out = validate_params(&def(), &empty, &state()).unwrap();
        assert_eq!(out["with"], Value::List(vec![]));
    }

    #[test]
    fn test_target_union_is_first_seen_and_deduplicated() {
        let input = params(&[
            ("with", Value::List(vec!["orc".into(), "goblin".into()])),
            ("of", Value::from("fighter")),
        ]);
        let targets = resolve_targets(&def(), &["goblin".to_string()], &input);
        assert_eq!(targets, vec!["goblin", "orc", "fighter"]);
    }
}
