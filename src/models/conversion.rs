use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Literal that callers use to ask for an automatically chosen parameter.
const AUTO_SENTINEL: &str = "auto";

/// Argument tree passed positionally to an image operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OpArg {
    /// Let the processor pick the value (e.g. keep aspect ratio)
    Auto,
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<OpArg>),
    Map(Vec<(String, OpArg)>),
}

impl OpArg {
    /// Replaces every `"auto"` text node, at any depth, with [`OpArg::Auto`].
    pub fn resolve_auto(self) -> OpArg {
        match self {
            OpArg::Text(s) if s == AUTO_SENTINEL => OpArg::Auto,
            OpArg::List(items) => OpArg::List(items.into_iter().map(OpArg::resolve_auto).collect()),
            OpArg::Map(entries) => OpArg::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.resolve_auto()))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OpArg::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OpArg::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// True for any node that still carries the raw sentinel text.
    pub fn contains_raw_sentinel(&self) -> bool {
        match self {
            OpArg::Text(s) => s == AUTO_SENTINEL,
            OpArg::List(items) => items.iter().any(OpArg::contains_raw_sentinel),
            OpArg::Map(entries) => entries.iter().any(|(_, v)| v.contains_raw_sentinel()),
            _ => false,
        }
    }
}

impl From<Value> for OpArg {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => OpArg::Null,
            Value::Bool(b) => OpArg::Bool(b),
            Value::Number(n) => OpArg::Number(n.as_f64().unwrap_or_default()),
            Value::String(s) => OpArg::Text(s),
            Value::Array(items) => OpArg::List(items.into_iter().map(OpArg::from).collect()),
            Value::Object(map) => OpArg::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<f64> for OpArg {
    fn from(n: f64) -> Self {
        OpArg::Number(n)
    }
}

impl From<u32> for OpArg {
    fn from(n: u32) -> Self {
        OpArg::Number(n.into())
    }
}

impl From<i32> for OpArg {
    fn from(n: i32) -> Self {
        OpArg::Number(n.into())
    }
}

impl From<bool> for OpArg {
    fn from(b: bool) -> Self {
        OpArg::Bool(b)
    }
}

impl From<&str> for OpArg {
    fn from(s: &str) -> Self {
        OpArg::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub args: Vec<OpArg>,
}

/// Ordered image operations, applied to every image in insertion order.
///
/// Deserializes from a JSON object such as `{"resize": [120, "auto"], "greyscale": []}`;
/// key order is preserved. A non-array value is treated as a single argument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionSpec {
    operations: Vec<Operation>,
}

impl ConversionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation. A repeated name replaces the earlier arguments
    /// in place, like re-assigning a key in a map.
    pub fn with(mut self, name: impl Into<String>, args: Vec<OpArg>) -> Self {
        let name = name.into();
        match self.operations.iter_mut().find(|op| op.name == name) {
            Some(existing) => existing.args = args,
            None => self.operations.push(Operation { name, args }),
        }
        self
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Copy of the spec with every `"auto"` argument turned into [`OpArg::Auto`].
    pub fn resolve_auto(&self) -> ConversionSpec {
        ConversionSpec {
            operations: self
                .operations
                .iter()
                .map(|op| Operation {
                    name: op.name.clone(),
                    args: op.args.iter().cloned().map(OpArg::resolve_auto).collect(),
                })
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for ConversionSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(map) = value else {
            return Err(de::Error::custom(
                "conversion spec must be an object of operation name to arguments",
            ));
        };

        let operations = map
            .into_iter()
            .map(|(name, args)| {
                let args = match args {
                    Value::Array(items) => items.into_iter().map(OpArg::from).collect(),
                    Value::Null => Vec::new(),
                    single => vec![OpArg::from(single)],
                };
                Operation { name, args }
            })
            .collect();

        Ok(ConversionSpec { operations })
    }
}
