//! Typed filter graph.
//!
//! A graph is a list of chains. Each chain reads some input pads, runs a
//! sequence of filter stages and writes labeled output pads. The textual
//! `-filter_complex` form is produced only by [`FilterGraph::to_filter_complex`],
//! after [`FilterGraph::validate`] has checked the wiring.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

/// A named link between two chains, written `[label]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PadLabel(String);

impl PadLabel {
    pub fn new(label: impl Into<String>) -> Result<Self, GraphError> {
        let label = label.into();
        let valid = !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(Self(label))
        } else {
            Err(GraphError::InvalidLabel(label))
        }
    }

    /// A well-known label such as `outv`. Must satisfy the label rules.
    pub(crate) fn fixed(label: &'static str) -> Self {
        debug_assert!(Self::new(label).is_ok());
        Self(label.to_string())
    }

    /// Build a label from a prefix and a counter, e.g. `v3`.
    pub(crate) fn indexed(prefix: &str, index: usize) -> Self {
        Self(format!("{prefix}{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PadLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Stream type selected from a numbered input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn specifier(self) -> char {
        match self {
            Self::Video => 'v',
            Self::Audio => 'a',
        }
    }
}

/// A pad consumed by a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PadRef {
    /// A stream of a numbered `-i` input, written `[0:v]`.
    Input { index: usize, stream: StreamKind },
    /// The output of another chain.
    Label(PadLabel),
}

impl fmt::Display for PadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { index, stream } => write!(f, "[{index}:{}]", stream.specifier()),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}

impl From<PadLabel> for PadRef {
    fn from(label: PadLabel) -> Self {
        Self::Label(label)
    }
}

/// An option value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    /// Literal value. Graph-level special characters are backslash-escaped
    /// on serialization; option-level escaping is the producer's job.
    Plain(String),
    /// Expression wrapped in single quotes, so commas need no escaping.
    Expr(String),
}

/// One `key=value` or positional option of a filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterArg {
    pub key: Option<String>,
    pub value: ArgValue,
}

/// A single filter invocation, e.g. `trim=start=1:end=3`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStage {
    pub name: String,
    pub args: Vec<FilterArg>,
}

impl FilterStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: vec![],
        }
    }

    /// Add a `key=value` option.
    pub fn arg(mut self, key: &str, value: impl ToString) -> Self {
        self.args.push(FilterArg {
            key: Some(key.to_string()),
            value: ArgValue::Plain(value.to_string()),
        });
        self
    }

    /// Add a `key='expression'` option.
    pub fn expr(mut self, key: &str, expression: impl Into<String>) -> Self {
        self.args.push(FilterArg {
            key: Some(key.to_string()),
            value: ArgValue::Expr(expression.into()),
        });
        self
    }

    /// Add a positional option.
    pub fn positional(mut self, value: impl ToString) -> Self {
        self.args.push(FilterArg {
            key: None,
            value: ArgValue::Plain(value.to_string()),
        });
        self
    }

    /// Value of a named option, unescaped.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|a| match (&a.key, &a.value) {
            (Some(k), ArgValue::Plain(v) | ArgValue::Expr(v)) if k == key => Some(v.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            if let Some(key) = &arg.key {
                write!(f, "{key}=")?;
            }
            match &arg.value {
                ArgValue::Plain(v) => f.write_str(&escape_graph_value(v))?,
                ArgValue::Expr(v) => write!(f, "'{v}'")?,
            }
        }
        Ok(())
    }
}

/// A linear chain: `[in0][in1]stage,stage[out]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterChain {
    pub inputs: Vec<PadRef>,
    pub stages: Vec<FilterStage>,
    pub outputs: Vec<PadLabel>,
}

impl FilterChain {
    pub fn new(inputs: Vec<PadRef>, output: PadLabel) -> Self {
        Self {
            inputs,
            stages: vec![],
            outputs: vec![output],
        }
    }

    pub fn stage(mut self, stage: FilterStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Names of the stages, in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "{input}")?;
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{stage}")?;
        }
        for output in &self.outputs {
            write!(f, "{output}")?;
        }
        Ok(())
    }
}

/// Wiring errors detected before serialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("invalid pad label '{0}'")]
    InvalidLabel(String),

    #[error("pad {0} is produced more than once")]
    DuplicateLabel(String),

    #[error("pad {0} is consumed but never produced")]
    DanglingPad(String),

    #[error("pad {0} is consumed more than once")]
    PadConsumedTwice(String),

    #[error("pad {0} is produced but never consumed")]
    UnconsumedOutput(String),

    #[error("input index {index} out of range ({count} inputs)")]
    InputOutOfRange { index: usize, count: usize },

    #[error("chain producing {0} has no filter stages")]
    EmptyChain(String),
}

/// A directed filter graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterGraph {
    pub chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    /// The chain producing `label`.
    pub fn producer(&self, label: &PadLabel) -> Option<&FilterChain> {
        self.chains.iter().find(|c| c.outputs.contains(label))
    }

    /// All stages with the given filter name, in graph order.
    pub fn stages_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FilterStage> + 'a {
        self.chains
            .iter()
            .flat_map(|c| c.stages.iter())
            .filter(move |s| s.name == name)
    }

    /// Check the wiring against `input_count` numbered inputs and the set of
    /// `terminals` mapped to the output file.
    pub fn validate(&self, input_count: usize, terminals: &[&PadLabel]) -> Result<(), GraphError> {
        let mut produced: HashSet<&PadLabel> = HashSet::new();
        for chain in &self.chains {
            if chain.stages.is_empty() {
                let name = chain
                    .outputs
                    .first()
                    .map(|l| l.to_string())
                    .unwrap_or_default();
                return Err(GraphError::EmptyChain(name));
            }
            for output in &chain.outputs {
                if !produced.insert(output) {
                    return Err(GraphError::DuplicateLabel(output.to_string()));
                }
            }
        }

        let mut consumed: HashMap<&PadLabel, usize> = HashMap::new();
        for terminal in terminals {
            *consumed.entry(*terminal).or_default() += 1;
        }
        for chain in &self.chains {
            for input in &chain.inputs {
                match input {
                    PadRef::Input { index, .. } => {
                        if *index >= input_count {
                            return Err(GraphError::InputOutOfRange {
                                index: *index,
                                count: input_count,
                            });
                        }
                    }
                    PadRef::Label(label) => {
                        *consumed.entry(label).or_default() += 1;
                    }
                }
            }
        }

        for (label, count) in &consumed {
            if !produced.contains(label) {
                return Err(GraphError::DanglingPad(label.to_string()));
            }
            if *count > 1 {
                return Err(GraphError::PadConsumedTwice(label.to_string()));
            }
        }
        for label in &produced {
            if !consumed.contains_key(label) {
                return Err(GraphError::UnconsumedOutput(label.to_string()));
            }
        }
        Ok(())
    }

    /// Serialize to `-filter_complex` syntax.
    pub fn to_filter_complex(&self) -> String {
        self.chains
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Escape characters special to the filtergraph parser.
pub fn escape_graph_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape characters special to a filter's option parser.
pub fn escape_option_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
