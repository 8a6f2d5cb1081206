//! Parsed command input.

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueMap};

/// Actor id of the Game Master.
pub const GM: &str = "GM";

/// Output of a surface parser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedInput {
    pub command: String,
    pub actor_id: String,
    /// Explicit targets (`to:` / `of:`), in input order.
    pub targets: Vec<String>,
    pub params: ValueMap,
}

impl Default for ParsedInput {
    fn default() -> Self {
        Self {
            command: String::new(),
            actor_id: GM.to_string(),
            targets: Vec::new(),
            params: ValueMap::new(),
        }
    }
}

impl ParsedInput {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor_id = actor.into();
        self
    }

    #[must_use]
    pub fn to(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn is_gm(&self) -> bool {
        self.actor_id.eq_ignore_ascii_case(GM)
    }
}

/// A command submission as the executor sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandRequest {
    pub input: ParsedInput,
    /// Original text, recorded verbatim in adjudication asks.
    pub raw: Option<String>,
    /// Set when re-running a command the GM has already allowed.
    pub approved: bool,
}

impl CommandRequest {
    pub fn new(input: ParsedInput) -> Self {
        Self {
            input,
            raw: None,
            approved: false,
        }
    }

    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    #[must_use]
    pub fn approved(mut self) -> Self {
        self.approved = true;
        self
    }

    /// Renders the request back into keyword syntax:
    /// `grapple by: fighter to: goblin and orc dice: 1d20`.
    pub fn to_command_string(&self) -> String {
        let input = &self.input;
        let mut out = input.command.replace('_', " ");
        if !input.actor_id.is_empty() && !input.is_gm() {
            out.push_str(&format!(" by: {}", input.actor_id));
        }
        if !input.targets.is_empty() {
            out.push_str(&format!(" to: {}", input.targets.join(" and ")));
        }
        for (key, value) in &input.params {
            let rendered = match value {
                Value::List(items) => items
                    .iter()
                    .map(Value::to_text)
                    .collect::<Vec<_>>()
                    .join(" and "),
                other => other.to_text(),
            };
            out.push_str(&format!(" {key}: {rendered}"));
        }
        out
    }

    /// `raw` when present, otherwise [`Self::to_command_string`].
    pub fn original(&self) -> String {
        self.raw.clone().unwrap_or_else(|| self.to_command_string())
    }
}
