//! Virtual machine executing one compiled program.
//!
//! For every line the VM tries each rule in declaration order. A matching
//! rule binds its capture groups and runs its instructions against the
//! shared [`MetricStore`]. A failing builtin is logged and skipped; it never
//! aborts the rest of the rule, the line, or the caller.

use crate::strptime::parse_time;
use chrono::Utc;
use logmeter_core::{MetricStore, StoreError, Timestamp};
use logmeter_dsl::{Builtin, Instr, Operand, Program};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

// ============================================================================
// RUNTIME ERRORS
// ============================================================================

/// Failure of a single builtin call.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("cannot parse {value:?} as time with format {format:?}: {source}")]
    TimeParse {
        value: String,
        format: String,
        source: chrono::ParseError,
    },

    #[error("{value:?} is not a number")]
    NotANumber { value: String },

    #[error("malformed operands for {builtin}")]
    Operands { builtin: Builtin },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

// ============================================================================
// VM
// ============================================================================

/// Executes one [`Program`] against log lines.
#[derive(Debug)]
pub struct Vm {
    program: Program,
    store: Arc<MetricStore>,
    /// Capture buffer, refilled on every rule match.
    captures: Vec<Option<String>>,
}

impl Vm {
    pub fn new(program: Program, store: Arc<MetricStore>) -> Self {
        Self {
            program,
            store,
            captures: Vec::new(),
        }
    }

    /// Label of the program this VM runs, usually its file name.
    pub fn label(&self) -> &str {
        &self.program.label
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Run every rule of the program against `line`.
    pub fn run(&mut self, line: &str) {
        let Vm {
            program,
            store,
            captures,
        } = self;

        for rule in &program.rules {
            let Some(matched) = rule.pattern.captures(line) else {
                continue;
            };

            captures.clear();
            captures.extend(matched.iter().map(|group| group.map(|m| m.as_str().to_string())));

            let mut frame = Frame {
                captures,
                time: None,
            };
            for instr in &rule.instructions {
                if let Err(err) = execute(store, &mut frame, instr) {
                    warn!(
                        program = %program.label,
                        builtin = %instr.builtin,
                        position = %instr.position,
                        error = %err,
                        "Builtin failed, statement skipped"
                    );
                }
            }
        }
    }
}

/// Per-match execution state: the bound captures and the rule's timestamp
/// context, which `strptime` sets for the statements after it.
struct Frame<'a> {
    captures: &'a [Option<String>],
    time: Option<Timestamp>,
}

impl Frame<'_> {
    fn value<'o>(&'o self, operand: &'o Operand) -> &'o str {
        match operand {
            Operand::Literal(text) => text,
            Operand::Capture(index) => self
                .captures
                .get(*index)
                .and_then(Option::as_deref)
                .unwrap_or(""),
            Operand::Metric { name, .. } => name,
        }
    }

    fn time(&self) -> Timestamp {
        self.time.unwrap_or_else(Utc::now)
    }
}

fn execute(store: &MetricStore, frame: &mut Frame<'_>, instr: &Instr) -> RuntimeResult<()> {
    match (instr.builtin, instr.operands.as_slice()) {
        (Builtin::Inc, [Operand::Metric { name, kind }]) => {
            store.increment(name, *kind, 1.0, frame.time())?;
        }
        (Builtin::Tag, [Operand::Metric { name, .. }, key, value]) => {
            store.set_tag(name, frame.value(key), frame.value(value), frame.time())?;
        }
        (Builtin::Strptime, [value, format]) => {
            let (value, format) = (frame.value(value), frame.value(format));
            let parsed = parse_time(value, format).map_err(|source| RuntimeError::TimeParse {
                value: value.to_string(),
                format: format.to_string(),
                source,
            })?;
            frame.time = Some(parsed);
        }
        (Builtin::Set, [Operand::Metric { name, kind }, value]) => {
            let number = parse_number(frame.value(value))?;
            store.set_value(name, *kind, number, frame.time())?;
        }
        (Builtin::Add, [Operand::Metric { name, kind }, value]) => {
            let number = parse_number(frame.value(value))?;
            store.increment(name, *kind, number, frame.time())?;
        }
        (builtin, _) => return Err(RuntimeError::Operands { builtin }),
    }
    Ok(())
}

fn parse_number(value: &str) -> RuntimeResult<f64> {
    value.trim().parse().map_err(|_| RuntimeError::NotANumber {
        value: value.to_string(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
