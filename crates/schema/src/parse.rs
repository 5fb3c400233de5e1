//! The validation walk.
//!
//! One pass over the input, driven by the schema: object fields are
//! visited in declaration order, array members in index order, so the
//! violation list comes out in the same order on every run. A breach
//! never aborts the walk; it is recorded and the walk moves on.

use serde_json::Value;

use crate::coerce;
use crate::coerce::CoercedInt;
use crate::error::{ValidationError, Violation};
use crate::input::Input;
use crate::node::{Schema, SchemaNode};

/// Validate `input` against `schema`.
///
/// `strict` turns unknown object keys into violations; otherwise they
/// are silently dropped from the output.
pub fn parse(schema: &Schema, input: Input, strict: bool) -> Result<Value, ValidationError> {
    let mut walker = Walker { strict, violations: Vec::new() };
    let output = walker.entry(schema.root(), Some(&input), "");
    if walker.violations.is_empty() {
        Ok(output.unwrap_or(Value::Null))
    } else {
        Err(ValidationError::new(walker.violations))
    }
}

struct Walker {
    strict: bool,
    violations: Vec<Violation>,
}

impl Walker {
    /// Walk one rule against a value that may be absent. Returns the
    /// validated output value, or `None` when there is nothing to emit
    /// (a breach was recorded, or an optional value is absent).
    fn entry(&mut self, node: &SchemaNode, value: Option<&Input>, path: &str) -> Option<Value> {
        match node {
            SchemaNode::Optional { inner } => match value {
                None | Some(Input::Null) => None,
                Some(present) => self.entry(inner, Some(present), path),
            },
            SchemaNode::Default { inner, value: default } => match value {
                None | Some(Input::Null) => Some(default.clone()),
                Some(present) => self.entry(inner, Some(present), path),
            },
            _ => match value {
                None => self.fail(path, format!("expected {}, got nothing", node.kind())),
                Some(present) => self.value(node, present, path),
            },
        }
    }

    fn value(&mut self, node: &SchemaNode, input: &Input, path: &str) -> Option<Value> {
        match node {
            SchemaNode::Bool => match input {
                Input::Bool(value) => Some(Value::Bool(*value)),
                Input::Str(text) => match coerce::boolean(text) {
                    Some(value) => Some(Value::Bool(value)),
                    None => self.mismatch(node, input, path),
                },
                other => self.mismatch(node, other, path),
            },

            SchemaNode::Int { min, max, range } => {
                let number = match input {
                    Input::Int(value) => *value,
                    Input::Str(text) => match coerce::int(text) {
                        CoercedInt::Value(value) => value,
                        CoercedInt::OutOfRange => return self.fail(path, format!("{text} is out of range")),
                        CoercedInt::Mismatch => return self.mismatch(node, input, path),
                    },
                    other => return self.mismatch(node, other, path),
                };
                if let Some((from, to)) = range {
                    if number < *from || number > *to {
                        return self.fail(path, format!("{number} is out of range"));
                    }
                }
                if let Some(limit) = min {
                    if number < *limit {
                        return self.fail(path, format!("{number} is lower than min ({limit})"));
                    }
                }
                if let Some(limit) = max {
                    if number > *limit {
                        return self.fail(path, format!("{number} is greater than max ({limit})"));
                    }
                }
                Some(Value::from(number))
            }

            SchemaNode::Float { min, max, range } => {
                let number = match input {
                    Input::Float(value) => *value,
                    Input::Int(value) => *value as f64,
                    Input::Str(text) => match coerce::float(text) {
                        Some(value) => value,
                        None => return self.mismatch(node, input, path),
                    },
                    other => return self.mismatch(node, other, path),
                };
                if let Some((from, to)) = range {
                    if number < *from || number > *to {
                        return self.fail(path, format!("{number} is out of range"));
                    }
                }
                if let Some(limit) = min {
                    if number < *limit {
                        return self.fail(path, format!("{number} is lower than min ({limit})"));
                    }
                }
                if let Some(limit) = max {
                    if number > *limit {
                        return self.fail(path, format!("{number} is greater than max ({limit})"));
                    }
                }
                Some(Value::from(number))
            }

            SchemaNode::Str { min_length, max_length } => {
                let text = match input {
                    Input::Str(text) => text,
                    other => return self.mismatch(node, other, path),
                };
                let length = text.chars().count();
                if let Some(limit) = min_length {
                    if length < *limit {
                        return self.fail(path, format!("min {limit} characters"));
                    }
                }
                if let Some(limit) = max_length {
                    if length > *limit {
                        return self.fail(path, format!("max {limit} characters"));
                    }
                }
                Some(Value::String(text.clone()))
            }

            SchemaNode::Array { item } => match input {
                Input::Array(members) => {
                    let mut output = Vec::with_capacity(members.len());
                    for (index, member) in members.iter().enumerate() {
                        let member_path = format!("{path}[{index}]");
                        if let Some(value) = self.entry(item, Some(member), &member_path) {
                            output.push(value);
                        }
                    }
                    Some(Value::Array(output))
                }
                other => self.mismatch(node, other, path),
            },

            SchemaNode::Object { fields } => match input {
                Input::Map(pairs) => {
                    let mut output = serde_json::Map::with_capacity(fields.len());
                    for (name, field_node) in fields {
                        let field_path = join(path, name);
                        // a repeated key resolves to its last occurrence
                        let found = pairs.iter().rfind(|(key, _)| key == name);
                        let value = self.entry(field_node, found.map(|(_, value)| value), &field_path);
                        if let Some(value) = value {
                            output.insert(name.clone(), value);
                        }
                    }
                    if self.strict {
                        let mut unknown: Vec<&str> = pairs
                            .iter()
                            .map(|(key, _)| key.as_str())
                            .filter(|key| !fields.iter().any(|(name, _)| name == key))
                            .collect();
                        unknown.sort_unstable();
                        unknown.dedup();
                        for key in unknown {
                            self.violations.push(Violation::new(join(path, key), "unknown field"));
                        }
                    }
                    Some(Value::Object(output))
                }
                other => self.mismatch(node, other, path),
            },

            SchemaNode::Optional { .. } | SchemaNode::Default { .. } => self.entry(node, Some(input), path),
        }
    }

    fn mismatch(&mut self, node: &SchemaNode, input: &Input, path: &str) -> Option<Value> {
        self.fail(path, format!("expected {}, got {}", node.kind(), input.repr()))
    }

    fn fail(&mut self, path: &str, message: String) -> Option<Value> {
        self.violations.push(Violation::new(path, message));
        None
    }
}

fn join(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_owned()
    } else {
        format!("{base}.{key}")
    }
}
