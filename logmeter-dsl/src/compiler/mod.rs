//! Program Compiler - Transform AST to an Executable Program
//!
//! Compiles each rule's pattern with the `regex` crate, resolves every
//! capture reference to a group index, and checks every builtin call
//! against its fixed signature. Errors are scoped to the rule they occur
//! in: a broken rule is dropped and the rest of the program still compiles.
//!
//! # Pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Compiler → Program → VM
//!                                    ↓
//!                   regex / capture / arity validation
//! ```

use crate::builtin::{ArgKind, Builtin};
use crate::lexer::Position;
use crate::parser::ast::*;
use logmeter_core::MetricKind;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// COMPILE ERRORS
// ============================================================================

/// Errors that can occur during program compilation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// Pattern rejected by the regex engine
    #[error("{label}:{position}: invalid regular expression /{pattern}/: {reason}")]
    InvalidRegex {
        label: String,
        position: Position,
        pattern: String,
        reason: String,
    },

    /// Capture reference with no matching group in the rule's pattern
    #[error("{label}:{position}: undefined capture reference {reference}")]
    UndefinedCapture {
        label: String,
        position: Position,
        reference: CaptureRef,
    },

    /// Wrong number of arguments to a builtin
    #[error("{label}:{position}: {builtin} expects {expected} argument(s), got {actual}")]
    Arity {
        label: String,
        position: Position,
        builtin: Builtin,
        expected: usize,
        actual: usize,
    },

    /// Argument of the wrong kind
    #[error("{label}:{position}: argument {index} of {builtin} must be a {expected}")]
    ArgumentKind {
        label: String,
        position: Position,
        builtin: Builtin,
        index: usize,
        expected: ArgKind,
    },

    /// Every rule failed to compile
    #[error("{label}: no valid rules")]
    NoValidRules { label: String },
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// COMPILED PROGRAM TYPES
// ============================================================================

/// A compiled program, ready to be owned by a VM.
#[derive(Debug, Clone)]
pub struct Program {
    pub label: String,
    pub rules: Vec<CompiledRule>,
}

/// A compiled rule: a matchable pattern and the instructions it guards.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub pattern: Regex,
    pub position: Position,
    /// Named groups of `pattern`, mapped to their group index.
    pub capture_names: HashMap<String, usize>,
    /// Number of capture groups, excluding the whole match.
    pub group_count: usize,
    pub instructions: Vec<Instr>,
}

/// One builtin call with resolved operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub builtin: Builtin,
    pub operands: Vec<Operand>,
    pub position: Position,
}

/// A resolved builtin argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Metric to create or update. `kind` is what value writes declare;
    /// tag writes ignore it, so a tag-only metric's kind stays open in the
    /// store.
    Metric { name: String, kind: MetricKind },
    /// String literal with escapes resolved.
    Literal(String),
    /// Index into the per-line capture bindings.
    Capture(usize),
}

// ============================================================================
// COMPILER
// ============================================================================

/// Compiler for one program.
pub struct Compiler<'a> {
    label: &'a str,
    /// Kind of each metric, decided by the first value-writing builtin that
    /// names it anywhere in the program.
    metric_kinds: HashMap<&'a str, MetricKind>,
}

impl<'a> Compiler<'a> {
    /// Create a compiler for `ast`, labelled `label` in diagnostics.
    pub fn new(label: &'a str, ast: &'a Ast) -> Self {
        let mut metric_kinds = HashMap::new();
        for stmt in ast.rules.iter().flat_map(|rule| &rule.body) {
            let Some(kind) = stmt.builtin.metric_kind() else {
                continue;
            };
            for (arg, expected) in stmt.args.iter().zip(stmt.builtin.signature()) {
                if let (ArgKind::Metric, ExprKind::Identifier(name)) = (expected, &arg.kind) {
                    metric_kinds.entry(name.as_str()).or_insert(kind);
                }
            }
        }

        Self {
            label,
            metric_kinds,
        }
    }

    /// Compile every rule of `ast`. Returns `None` when no rule survived.
    pub fn compile(&self, ast: &Ast) -> (Option<Program>, Vec<CompileError>) {
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        for rule in &ast.rules {
            match self.compile_rule(rule) {
                Ok(compiled) => rules.push(compiled),
                Err(mut rule_errors) => errors.append(&mut rule_errors),
            }
        }

        if rules.is_empty() {
            errors.push(CompileError::NoValidRules {
                label: self.label.to_string(),
            });
            return (None, errors);
        }

        let program = Program {
            label: self.label.to_string(),
            rules,
        };
        (Some(program), errors)
    }

    fn compile_rule(&self, rule: &Rule) -> Result<CompiledRule, Vec<CompileError>> {
        let pattern = Regex::new(&unescape_delimiter(&rule.pattern)).map_err(|e| {
            vec![CompileError::InvalidRegex {
                label: self.label.to_string(),
                position: rule.position,
                pattern: rule.pattern.clone(),
                reason: e.to_string(),
            }]
        })?;

        let capture_names: HashMap<String, usize> = pattern
            .capture_names()
            .enumerate()
            .filter_map(|(index, name)| name.map(|name| (name.to_string(), index)))
            .collect();
        let group_count = pattern.captures_len() - 1;

        let mut instructions = Vec::new();
        let mut errors = Vec::new();
        for stmt in &rule.body {
            match self.compile_statement(stmt, &capture_names, group_count) {
                Ok(instr) => instructions.push(instr),
                Err(mut stmt_errors) => errors.append(&mut stmt_errors),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CompiledRule {
            pattern,
            position: rule.position,
            capture_names,
            group_count,
            instructions,
        })
    }

    fn compile_statement(
        &self,
        stmt: &Statement,
        capture_names: &HashMap<String, usize>,
        group_count: usize,
    ) -> Result<Instr, Vec<CompileError>> {
        let signature = stmt.builtin.signature();
        if stmt.args.len() != signature.len() {
            return Err(vec![CompileError::Arity {
                label: self.label.to_string(),
                position: stmt.position,
                builtin: stmt.builtin,
                expected: signature.len(),
                actual: stmt.args.len(),
            }]);
        }

        let mut operands = Vec::with_capacity(signature.len());
        let mut errors = Vec::new();
        for (index, (arg, expected)) in stmt.args.iter().zip(signature).enumerate() {
            let operand = match (expected, &arg.kind) {
                (ArgKind::Metric, ExprKind::Identifier(name)) => Ok(Operand::Metric {
                    name: name.clone(),
                    kind: self.kind_of(name),
                }),
                (ArgKind::Value | ArgKind::Text, ExprKind::StringLiteral(text)) => {
                    Ok(Operand::Literal(unescape_string(text)))
                }
                (ArgKind::Value | ArgKind::Capture, ExprKind::CaptureRef(reference)) => self
                    .resolve_capture(reference, arg.position, capture_names, group_count)
                    .map(Operand::Capture),
                _ => Err(CompileError::ArgumentKind {
                    label: self.label.to_string(),
                    position: arg.position,
                    builtin: stmt.builtin,
                    index: index + 1,
                    expected: *expected,
                }),
            };

            match operand {
                Ok(operand) => operands.push(operand),
                Err(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Instr {
            builtin: stmt.builtin,
            operands,
            position: stmt.position,
        })
    }

    /// Resolve a capture reference to a group index. Numeric references must
    /// be within `1..=group_count`; named references must name a group.
    fn resolve_capture(
        &self,
        reference: &CaptureRef,
        position: Position,
        capture_names: &HashMap<String, usize>,
        group_count: usize,
    ) -> CompileResult<usize> {
        let resolved = match reference {
            CaptureRef::Index(index) if (1..=group_count).contains(index) => Some(*index),
            CaptureRef::Index(_) => None,
            CaptureRef::Named(name) => capture_names.get(name).copied(),
        };

        resolved.ok_or_else(|| CompileError::UndefinedCapture {
            label: self.label.to_string(),
            position,
            reference: reference.clone(),
        })
    }

    /// Metrics no value-writing builtin names fall back to the default kind,
    /// which only tag operands carry.
    fn kind_of(&self, name: &str) -> MetricKind {
        self.metric_kinds.get(name).copied().unwrap_or_default()
    }
}

/// Compile a parsed program.
pub fn compile(label: &str, ast: &Ast) -> (Option<Program>, Vec<CompileError>) {
    Compiler::new(label, ast).compile(ast)
}

/// Turn `\/` back into `/` in regex source; other escapes pass through.
fn unescape_delimiter(source: &str) -> String {
    unescape(source, &['/'])
}

/// Resolve `\"` and `\\` in a string literal; other escapes pass through.
fn unescape_string(source: &str) -> String {
    unescape(source, &['"', '\\'])
}

fn unescape(source: &str, escaped: &[char]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if escaped.contains(&next) => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
