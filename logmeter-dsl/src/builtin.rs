//! Builtin operations available inside a rule's action block.
//!
//! The set is closed: the lexer classifies these names as `BUILTIN` tokens,
//! and the compiler checks every call against [`Builtin::signature`] once so
//! the VM can dispatch on the enum directly.

use logmeter_core::MetricKind;
use std::fmt;

/// The fixed set of builtins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `inc(metric)` - add one to a counter.
    Inc,
    /// `tag(metric, "key", value)` - attach a key=value pair.
    Tag,
    /// `strptime($capture, "format")` - parse the rule's timestamp.
    Strptime,
    /// `set(metric, value)` - overwrite a gauge.
    Set,
    /// `add(metric, value)` - add a parsed number to a counter.
    Add,
}

/// Kind of expression a builtin accepts in one argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// A bare identifier naming a metric.
    Metric,
    /// A string literal or a capture reference.
    Value,
    /// A string literal only.
    Text,
    /// A capture reference only.
    Capture,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Inc,
        Builtin::Tag,
        Builtin::Strptime,
        Builtin::Set,
        Builtin::Add,
    ];

    /// Look up a builtin by its source name.
    pub fn from_name(name: &str) -> Option<Builtin> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Inc => "inc",
            Builtin::Tag => "tag",
            Builtin::Strptime => "strptime",
            Builtin::Set => "set",
            Builtin::Add => "add",
        }
    }

    /// Argument kinds, in order. Calls must match the length exactly.
    pub fn signature(self) -> &'static [ArgKind] {
        match self {
            Builtin::Inc => &[ArgKind::Metric],
            Builtin::Tag => &[ArgKind::Metric, ArgKind::Text, ArgKind::Value],
            Builtin::Strptime => &[ArgKind::Capture, ArgKind::Text],
            Builtin::Set => &[ArgKind::Metric, ArgKind::Value],
            Builtin::Add => &[ArgKind::Metric, ArgKind::Value],
        }
    }

    /// Kind given to metrics this builtin writes a value to.
    pub fn metric_kind(self) -> Option<MetricKind> {
        match self {
            Builtin::Inc | Builtin::Add => Some(MetricKind::Counter),
            Builtin::Set => Some(MetricKind::Gauge),
            Builtin::Tag | Builtin::Strptime => None,
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ArgKind::Metric => "metric name",
            ArgKind::Value => "string or capture reference",
            ArgKind::Text => "string",
            ArgKind::Capture => "capture reference",
        };
        f.write_str(text)
    }
}
