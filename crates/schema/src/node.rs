use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{SchemaError, ValidationError};
use crate::input::Input;
use crate::parse;

/// One rule in a schema tree.
///
/// Leaves carry their constraints inline; [`Optional`](SchemaNode::Optional)
/// and [`Default`](SchemaNode::Default) wrap any node to change how a
/// missing or null value is treated. Object fields keep declaration
/// order, which is also the order violations are reported in.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Bool,
    Int {
        min: Option<i64>,
        max: Option<i64>,
        range: Option<(i64, i64)>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
        range: Option<(f64, f64)>,
    },
    Str {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Array {
        item: Box<SchemaNode>,
    },
    Object {
        fields: Vec<(String, SchemaNode)>,
    },
    Optional {
        inner: Box<SchemaNode>,
    },
    Default {
        inner: Box<SchemaNode>,
        value: Value,
    },
}

impl SchemaNode {
    /// Kind name used in violation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaNode::Bool => "boolean",
            SchemaNode::Int { .. } => "int",
            SchemaNode::Float { .. } => "float",
            SchemaNode::Str { .. } => "string",
            SchemaNode::Array { .. } => "array",
            SchemaNode::Object { .. } => "object",
            SchemaNode::Optional { inner } | SchemaNode::Default { inner, .. } => inner.kind(),
        }
    }

    /// Treat a missing or null value as absent instead of a violation.
    pub fn optional(self) -> SchemaNode {
        SchemaNode::Optional { inner: Box::new(self) }
    }

    /// Substitute `value` when the value is missing or null.
    pub fn default(self, value: impl Into<Value>) -> SchemaNode {
        SchemaNode::Default { inner: Box::new(self), value: value.into() }
    }
}

/// Start a boolean rule.
pub fn boolean() -> BoolNode {
    BoolNode
}

/// Start an int rule.
pub fn int() -> IntNode {
    IntNode::new()
}

/// Start a float rule.
pub fn float() -> FloatNode {
    FloatNode::new()
}

/// Start a string rule.
pub fn string() -> StrNode {
    StrNode::new()
}

/// Start an array rule whose members all follow `item`.
pub fn array(item: impl Into<SchemaNode>) -> ArrayNode {
    ArrayNode { item: Box::new(item.into()) }
}

/// Start an object rule. Fields are added with [`ObjectNode::field`].
pub fn object() -> ObjectNode {
    ObjectNode::new()
}

#[derive(Debug, Clone, Copy)]
pub struct BoolNode;

impl BoolNode {
    pub fn optional(self) -> SchemaNode {
        SchemaNode::from(self).optional()
    }

    pub fn default(self, value: bool) -> SchemaNode {
        SchemaNode::from(self).default(value)
    }
}

impl From<BoolNode> for SchemaNode {
    fn from(_: BoolNode) -> Self {
        SchemaNode::Bool
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntNode {
    min: Option<i64>,
    max: Option<i64>,
    range: Option<(i64, i64)>,
}

impl IntNode {
    fn new() -> Self {
        <Self as Default>::default()
    }

    /// Lowest accepted value, inclusive.
    pub fn min(mut self, limit: i64) -> Self {
        self.min = Some(limit);
        self
    }

    /// Highest accepted value, inclusive.
    pub fn max(mut self, limit: i64) -> Self {
        self.max = Some(limit);
        self
    }

    /// Inclusive window; breaches report `out of range` rather than
    /// naming the crossed end.
    pub fn range(mut self, from: i64, to: i64) -> Self {
        self.range = Some((from, to));
        self
    }

    pub fn optional(self) -> SchemaNode {
        SchemaNode::from(self).optional()
    }

    pub fn default(self, value: i64) -> SchemaNode {
        SchemaNode::from(self).default(value)
    }
}

impl From<IntNode> for SchemaNode {
    fn from(node: IntNode) -> Self {
        SchemaNode::Int { min: node.min, max: node.max, range: node.range }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatNode {
    min: Option<f64>,
    max: Option<f64>,
    range: Option<(f64, f64)>,
}

impl FloatNode {
    fn new() -> Self {
        <Self as Default>::default()
    }

    pub fn min(mut self, limit: f64) -> Self {
        self.min = Some(limit);
        self
    }

    pub fn max(mut self, limit: f64) -> Self {
        self.max = Some(limit);
        self
    }

    pub fn range(mut self, from: f64, to: f64) -> Self {
        self.range = Some((from, to));
        self
    }

    pub fn optional(self) -> SchemaNode {
        SchemaNode::from(self).optional()
    }

    pub fn default(self, value: f64) -> SchemaNode {
        SchemaNode::from(self).default(value)
    }
}

impl From<FloatNode> for SchemaNode {
    fn from(node: FloatNode) -> Self {
        SchemaNode::Float { min: node.min, max: node.max, range: node.range }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StrNode {
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl StrNode {
    fn new() -> Self {
        <Self as Default>::default()
    }

    /// Fewest accepted characters, inclusive.
    pub fn min_length(mut self, limit: usize) -> Self {
        self.min_length = Some(limit);
        self
    }

    /// Most accepted characters, inclusive.
    pub fn max_length(mut self, limit: usize) -> Self {
        self.max_length = Some(limit);
        self
    }

    pub fn optional(self) -> SchemaNode {
        SchemaNode::from(self).optional()
    }

    pub fn default(self, value: impl Into<String>) -> SchemaNode {
        SchemaNode::from(self).default(Value::String(value.into()))
    }
}

impl From<StrNode> for SchemaNode {
    fn from(node: StrNode) -> Self {
        SchemaNode::Str { min_length: node.min_length, max_length: node.max_length }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayNode {
    item: Box<SchemaNode>,
}

impl ArrayNode {
    pub fn optional(self) -> SchemaNode {
        SchemaNode::from(self).optional()
    }

    pub fn default(self, value: impl Into<Value>) -> SchemaNode {
        SchemaNode::from(self).default(value)
    }
}

impl From<ArrayNode> for SchemaNode {
    fn from(node: ArrayNode) -> Self {
        SchemaNode::Array { item: node.item }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectNode {
    fields: Vec<(String, SchemaNode)>,
}

impl ObjectNode {
    fn new() -> Self {
        <Self as Default>::default()
    }

    /// Declare the next field. Declaration order is also the order the
    /// field's violations surface in.
    pub fn field(mut self, name: impl Into<String>, node: impl Into<SchemaNode>) -> Self {
        self.fields.push((name.into(), node.into()));
        self
    }

    pub fn optional(self) -> SchemaNode {
        SchemaNode::from(self).optional()
    }

    pub fn default(self, value: impl Into<Value>) -> SchemaNode {
        SchemaNode::from(self).default(value)
    }
}

impl From<ObjectNode> for SchemaNode {
    fn from(node: ObjectNode) -> Self {
        SchemaNode::Object { fields: node.fields }
    }
}

/// Root of a reusable schema.
///
/// A `Schema` is plain immutable data: clone it, put it in a `static`,
/// or share one instance across any number of concurrent requests.
/// Strictness is chosen per parse, not baked into the schema.
#[derive(Debug, Clone)]
pub struct Schema {
    root: SchemaNode,
}

impl Schema {
    pub fn new(root: impl Into<SchemaNode>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Validate `input`, dropping unknown object keys from the output.
    pub fn parse(&self, input: impl Into<Input>) -> Result<Value, ValidationError> {
        parse::parse(self, input.into(), false)
    }

    /// Validate `input`, reporting unknown object keys as violations.
    pub fn parse_strict(&self, input: impl Into<Input>) -> Result<Value, ValidationError> {
        parse::parse(self, input.into(), true)
    }

    /// Validate and deserialize in one step.
    pub fn parse_as<T: DeserializeOwned>(&self, input: impl Into<Input>) -> Result<T, SchemaError> {
        let value = self.parse(input)?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_collapse_into_nodes() {
        let node = SchemaNode::from(int().range(1, 10).min(2));
        let SchemaNode::Int { min, max, range } = node else {
            panic!("expected an int node");
        };
        assert_eq!(min, Some(2));
        assert_eq!(max, None);
        assert_eq!(range, Some((1, 10)));
    }

    #[test]
    fn kind_looks_through_wrappers() {
        assert_eq!(int().optional().kind(), "int");
        assert_eq!(string().default("x").kind(), "string");
        assert_eq!(SchemaNode::from(array(boolean())).kind(), "array");
    }

    #[test]
    fn object_fields_keep_declaration_order() {
        let node = SchemaNode::from(object().field("b", string()).field("a", int()));
        let SchemaNode::Object { fields } = node else {
            panic!("expected an object node");
        };
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn schema_is_shareable_across_threads() {
        let schema = Schema::new(object().field("age", int().min(0)));
        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    let value = schema.parse(serde_json::json!({"age": "3"})).unwrap();
                    assert_eq!(value["age"], 3);
                });
            }
        });
    }
}
