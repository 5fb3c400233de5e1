use serde_json::Value;

/// A decoded value on its way into validation.
///
/// Text transports (query strings, form fields) deliver everything as
/// `Str` and rely on coercion to lift values into the declared kind;
/// JSON arrives pre-typed. `Map` keeps pairs in the order they appeared
/// on the wire, duplicates included.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Input>),
    Map(Vec<(String, Input)>),
}

impl Input {
    /// Kind name as it appears in violation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Input::Null => "null",
            Input::Bool(_) => "boolean",
            Input::Int(_) => "int",
            Input::Float(_) => "float",
            Input::Str(_) => "string",
            Input::Array(_) => "array",
            Input::Map(_) => "object",
        }
    }

    /// Literal-plus-kind form used in `expected .., got ..` messages.
    pub(crate) fn repr(&self) -> String {
        match self {
            Input::Null => "`null` (null)".to_owned(),
            Input::Bool(value) => format!("`{value}` (boolean)"),
            Input::Int(value) => format!("`{value}` (int)"),
            Input::Float(value) => format!("`{value}` (float)"),
            Input::Str(value) => format!("`{value}` (string)"),
            Input::Array(_) => "`[..]` (array)".to_owned(),
            Input::Map(_) => "`{..}` (object)".to_owned(),
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Input::Null,
            Value::Bool(value) => Input::Bool(value),
            Value::Number(number) => match number.as_i64() {
                Some(int) => Input::Int(int),
                None => Input::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(text) => Input::Str(text),
            Value::Array(items) => Input::Array(items.into_iter().map(Input::from).collect()),
            Value::Object(map) => Input::Map(map.into_iter().map(|(key, value)| (key, value.into())).collect()),
        }
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Input::Str(text.to_owned())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Input::Str(text)
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Input::Bool(value)
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Input::Int(value)
    }
}

impl From<f64> for Input {
    fn from(value: f64) -> Self {
        Input::Float(value)
    }
}

impl From<Vec<Input>> for Input {
    fn from(items: Vec<Input>) -> Self {
        Input::Array(items)
    }
}

impl From<Vec<(String, Input)>> for Input {
    fn from(pairs: Vec<(String, Input)>) -> Self {
        Input::Map(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_split_into_int_and_float() {
        assert_eq!(Input::from(json!(42)), Input::Int(42));
        assert_eq!(Input::from(json!(-3)), Input::Int(-3));
        assert_eq!(Input::from(json!(1.5)), Input::Float(1.5));
    }

    #[test]
    fn json_object_preserves_entries() {
        let input = Input::from(json!({"name": "ada", "age": 36}));
        let Input::Map(pairs) = input else {
            panic!("expected a map");
        };
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&("name".to_owned(), Input::Str("ada".to_owned()))));
        assert!(pairs.contains(&("age".to_owned(), Input::Int(36))));
    }

    #[test]
    fn repr_quotes_scalars_with_their_kind() {
        assert_eq!(Input::Str("abc".to_owned()).repr(), "`abc` (string)");
        assert_eq!(Input::Int(123).repr(), "`123` (int)");
        assert_eq!(Input::Bool(true).repr(), "`true` (boolean)");
        assert_eq!(Input::Null.repr(), "`null` (null)");
    }
}
