//! Command model shared by the dispatch and batch layers.

pub mod result;
pub mod tag;

pub use result::{CommandOutcome, CommandResult};
pub use tag::{Tag, SENTINEL_TAG};

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An administrative command: a prefix naming the operation plus named
/// arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub prefix: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl CommandDescriptor {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            args: Map::new(),
        }
    }

    /// Add a named argument
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Human-readable rendering: the prefix followed by `name=value` pairs
    /// in sorted name order.
    pub fn human_readable(&self) -> String {
        let mut rendered = self.prefix.clone();
        let mut args: Vec<(&String, &Value)> = self.args.iter().collect();
        args.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in args {
            match value {
                Value::String(s) => rendered.push_str(&format!(" {}={}", name, s)),
                other => rendered.push_str(&format!(" {}={}", name, other)),
            }
        }
        rendered
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.human_readable())
    }
}
