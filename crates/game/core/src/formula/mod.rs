//! Sandboxed rule expressions ("formulas").
//!
//! Manifests describe prerequisites and step results as small expressions
//! over a [`ValueMap`] context:
//!
//! ```ignore
//! actor.spent.actions < actor.resources.actions
//! roll('1d20') + mod(actor.stats.dex)
//! target.conditions.exists(c, c.startsWith('grappledby:'))
//! ```
//!
//! The language has literals, field access, indexing, arithmetic,
//! comparison, boolean logic, the conditional operator, `in`, comprehension
//! macros and a fixed set of registered functions. It has no assignment, no
//! loops beyond the macros and no I/O; `roll()` is the only impure call and
//! is routed through the evaluator's [`DiceRoller`].
//!
//! ## Missing values
//!
//! Absent map fields and out-of-range indexes read as `null`. `null` is `0`
//! in arithmetic and ordering, `false` in conditions and `""` when joined to
//! a string, so `actor.spent.actions < actor.resources.actions` works for
//! entities that define neither key. Type errors (adding a map to an int,
//! negating a string) are never coerced away.
mod check;
mod evaluate;
mod functions;
mod lexer;
mod parser;

pub use parser::{MAX_DEPTH, MAX_LINKS};

use std::collections::HashMap;
use std::sync::Arc;

use crate::env::{DiceError, DiceRoller};
use crate::error::{ErrorSeverity, GameError};
use crate::value::{Value, ValueMap};

/// Default instruction ceiling per evaluation.
pub const DEFAULT_STEP_LIMIT: u64 = 10_000;

/// Free variables that read as `null` when the context omits them.
pub const PREDECLARED: &[&str] = &[
    "actor",
    "target",
    "action",
    "command",
    "steps",
    "metadata",
    "manifest",
    "pending_adjudication",
    "is_frozen",
    "is_encounter_active",
    "entities",
];

/// Compile-time or runtime failure of a formula.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("expression nested deeper than {limit}")]
    TooDeep { limit: usize },

    #[error("undeclared reference '{name}'")]
    Undeclared { name: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("{name}() takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    #[error("type error: {message}")]
    Type { message: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("evaluation exceeded {limit} steps")]
    StepLimit { limit: u64 },

    #[error(transparent)]
    Dice(#[from] DiceError),
}

impl FormulaError {
    /// Whether the error is detectable without evaluating (syntax, arity).
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            FormulaError::Syntax { .. }
                | FormulaError::TooDeep { .. }
                | FormulaError::UnknownFunction { .. }
                | FormulaError::Arity { .. }
        )
    }
}

impl GameError for FormulaError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        "FormulaError"
    }
}

/// Receives every `roll()` made during an evaluation.
pub trait DiceReporter {
    fn on_roll(&mut self, dice: &str, result: i64);
}

impl DiceReporter for Vec<(String, i64)> {
    fn on_roll(&mut self, dice: &str, result: i64) {
        self.push((dice.to_string(), result));
    }
}

/// A parsed and checked formula, ready to evaluate any number of times.
#[derive(Clone, Debug)]
pub struct Program {
    source: String,
    expr: parser::Expr,
}

impl Program {
    /// Parses `source` and checks function names and arities.
    pub fn compile(source: &str) -> Result<Self, FormulaError> {
        let tokens = lexer::tokenize(source)?;
        let expr = parser::parse(tokens)?;
        check::check(&expr)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Formula evaluator owning the dice roller and a compile cache.
///
/// One evaluator serves one session. It is deterministic apart from the
/// roller, which tests replace with a fixed or scripted one.
pub struct Evaluator {
    roller: Box<dyn DiceRoller>,
    step_limit: u64,
    cache: HashMap<String, Arc<Program>>,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("step_limit", &self.step_limit)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Evaluator {
    pub fn new(roller: impl DiceRoller + 'static) -> Self {
        Self {
            roller: Box::new(roller),
            step_limit: DEFAULT_STEP_LIMIT,
            cache: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn step_limit(&self) -> u64 {
        self.step_limit
    }

    /// Replaces the dice roller (e.g. to stub `roll` in a test).
    pub fn set_roller(&mut self, roller: impl DiceRoller + 'static) {
        self.roller = Box::new(roller);
    }

    /// Rolls dice outside a formula (the built-in `roll` command).
    pub fn roll(&mut self, dice: &str) -> Result<i64, DiceError> {
        self.roller.roll(dice)
    }

    /// Compiles `source`, reusing a cached program when possible.
    pub fn compile(&mut self, source: &str) -> Result<Arc<Program>, FormulaError> {
        if let Some(program) = self.cache.get(source) {
            return Ok(Arc::clone(program));
        }
        let program = Arc::new(Program::compile(source)?);
        self.cache.insert(source.to_string(), Arc::clone(&program));
        Ok(program)
    }

    /// Evaluates `source` against `context`.
    ///
    /// Every `roll()` is forwarded to `reporter`, in call order, including
    /// rolls made before a later failure.
    pub fn evaluate(
        &mut self,
        source: &str,
        context: &ValueMap,
        reporter: Option<&mut dyn DiceReporter>,
    ) -> Result<Value, FormulaError> {
        let program = self.compile(source)?;
        self.run(&program, context, reporter)
    }

    /// Evaluates an already compiled program.
    pub fn run(
        &mut self,
        program: &Program,
        context: &ValueMap,
        reporter: Option<&mut dyn DiceReporter>,
    ) -> Result<Value, FormulaError> {
        let mut interpreter =
            evaluate::Interpreter::new(context, self.roller.as_mut(), self.step_limit);
        let result = interpreter.eval(&program.expr);
        if let Some(reporter) = reporter {
            for (dice, total) in &interpreter.rolls {
                reporter.on_roll(dice, *total);
            }
        }
        result
    }
}
