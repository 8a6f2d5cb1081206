//! Surface parsing: raw player text to [`ParsedInput`].
//!
//! The executor never sees raw text. Front-ends pick a [`SurfaceParser`];
//! [`KeywordParser`] implements the keyword DSL used by the terminal client:
//!
//! ```text
//! grapple by: fighter to: goblin
//! encounter start with: fighter and goblin
//! check by: fighter stat: str dc: 12
//! ```

use game_core::{ParsedInput, Value};

/// Generic usage line returned with every parse failure.
pub const USAGE: &str = "<command> [by: <actor>] [to: <target> and <target>] [<key>: <value>]...";

/// Raw input could not be turned into a [`ParsedInput`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub usage: String,
}

impl ParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            usage: USAGE.to_string(),
        }
    }
}

/// Turns one line of player input into a structured command.
pub trait SurfaceParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<ParsedInput, ParseError>;
}

/// `<command words> (<key>: <value>)*`
///
/// Words before the first `key:` form the command. `by:` names the actor,
/// `to:` and `of:` name explicit targets, and every other key becomes a
/// parameter. Values split on ` and ` and `,`: one item stays a string,
/// several become a list.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordParser;

impl KeywordParser {
    pub fn new() -> Self {
        Self
    }
}

impl SurfaceParser for KeywordParser {
    fn parse(&self, raw: &str) -> Result<ParsedInput, ParseError> {
        let mut command_words: Vec<&str> = Vec::new();
        let mut clauses: Vec<(String, Vec<&str>)> = Vec::new();

        for word in raw.split_whitespace() {
            match keyword(word) {
                Some(key) => clauses.push((key, Vec::new())),
                None => match clauses.last_mut() {
                    Some((_, words)) => words.push(word),
                    None => command_words.push(word),
                },
            }
        }

        if command_words.is_empty() {
            return Err(ParseError::new(if clauses.is_empty() {
                "nothing to do: type a command"
            } else {
                "a command must come before its keywords"
            }));
        }

        let mut input = ParsedInput::new(command_words.join("_").to_lowercase());
        for (key, words) in clauses {
            let items = split_items(&words.join(" "));
            if items.is_empty() {
                return Err(ParseError::new(format!("'{key}:' needs a value")));
            }
            match key.as_str() {
                "by" => {
                    let [actor] = items.as_slice() else {
                        return Err(ParseError::new("'by:' names exactly one actor"));
                    };
                    input.actor_id = actor.clone();
                }
                "to" | "of" => input.targets.extend(items),
                _ => {
                    let value = match <[String; 1]>::try_from(items) {
                        Ok([single]) => Value::String(single),
                        Err(items) => Value::List(items.into_iter().map(Value::String).collect()),
                    };
                    input.params.insert(key, value);
                }
            }
        }
        Ok(input)
    }
}

/// `dc:` -> `Some("dc")`. A bare `:` is not a keyword.
fn keyword(word: &str) -> Option<String> {
    let key = word.strip_suffix(':')?;
    (!key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_'))
        .then(|| key.to_lowercase())
}

fn split_items(value: &str) -> Vec<String> {
    value
        .split(',')
        .flat_map(|part| part.split(" and "))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::GM;

    fn parse(raw: &str) -> Result<ParsedInput, ParseError> {
        KeywordParser.parse(raw)
    }

    #[test]
    fn test_command_words_are_canonicalized() {
        let input = parse("Encounter Start with: fighter and goblin").unwrap();
        assert_eq!(input.command, "encounter_start");
        assert_eq!(input.actor_id, GM);
        assert_eq!(
            input.params["with"],
            Value::List(vec!["fighter".into(), "goblin".into()])
        );
    }

    #[test]
    fn test_actor_and_targets() {
        let input = parse("grapple by: fighter to: goblin, orc").unwrap();
        assert_eq!(input.command, "grapple");
        assert_eq!(input.actor_id, "fighter");
        assert_eq!(input.targets, vec!["goblin", "orc"]);
        assert!(input.params.is_empty());

        let input = parse("set of: goblin section: spent key: hp value: 3").unwrap();
        assert_eq!(input.targets, vec!["goblin"]);
        assert_eq!(input.params["section"], Value::from("spent"));
        assert_eq!(input.params["value"], Value::from("3"));
    }

    #[test]
    fn test_multi_word_values_stay_whole() {
        let input = parse("improvise by: fighter what: swing from the chandelier").unwrap();
        assert_eq!(input.params["what"], Value::from("swing from the chandelier"));
    }

    #[test]
    fn test_rejections() {
        assert_eq!(parse("   ").unwrap_err().usage, USAGE);
        assert!(parse("by: fighter").unwrap_err().message.contains("command"));
        assert!(parse("grapple to:").unwrap_err().message.contains("'to:'"));
        assert!(parse("grapple by: fighter and goblin").is_err());
    }

    #[test]
    fn test_colons_inside_values_are_not_keywords() {
        let input = parse("roll dice: 1d20+3 note: ratio:2").unwrap();
        assert_eq!(input.params["dice"], Value::from("1d20+3"));
        assert_eq!(input.params["note"], Value::from("ratio:2"));
    }
}
