//! Turn-taking containers (combat encounters are the canonical example).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An ordered, named turn loop.
///
/// `actors` keeps insertion order; the turn order is a stable sort of
/// `actors` by their `order` key (higher first unless `ascending`). Actors
/// without a key sort after every keyed actor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Loop {
    pub active: bool,
    pub actors: Vec<String>,
    pub order: BTreeMap<String, i64>,
    pub ascending: bool,
    /// Index into [`Loop::ordered_actors`].
    pub current: usize,
}

impl Loop {
    /// A freshly (re)started loop: active with no participants.
    pub fn started() -> Self {
        Self {
            active: true,
            ..Default::default()
        }
    }

    pub fn contains(&self, actor: &str) -> bool {
        self.actors.iter().any(|a| a == actor)
    }

    /// Participants in turn order.
    pub fn ordered_actors(&self) -> Vec<&str> {
        let mut actors: Vec<&str> = self.actors.iter().map(String::as_str).collect();
        actors.sort_by(|a, b| {
            match (self.order.get(*a), self.order.get(*b)) {
                (Some(x), Some(y)) if self.ascending => x.cmp(y),
                (Some(x), Some(y)) => y.cmp(x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        actors
    }

    /// Actor whose turn it is, if the loop is active and non-empty.
    pub fn current_actor(&self) -> Option<&str> {
        if !self.active {
            return None;
        }
        let ordered = self.ordered_actors();
        ordered.get(self.current % ordered.len().max(1)).copied()
    }

    /// Moves to the next actor, wrapping around. No-op while inactive.
    pub(crate) fn advance(&mut self) {
        if self.active && !self.actors.is_empty() {
            self.current = (self.current + 1) % self.actors.len();
        }
    }
}
