//! Declarative schemas with type coercion and aggregated violations
//!
//! This crate validates decoded request data against schemas built from
//! plain Rust values. It is written for text transports: query strings
//! and form fields arrive as strings, and the schema lifts them into
//! the declared kinds under narrow, predictable rules.
//!
//! # Features
//!
//! - Builder-style schema DSL: [`int`], [`float`], [`boolean`],
//!   [`string`], [`array`], [`object`]
//! - One-way coercion: `"42"` becomes `42` against an int rule, while
//!   `42` against a string rule stays a violation
//! - Exhaustive reporting: one pass collects every violation, ordered
//!   by schema declaration rather than input order
//! - Optional and defaulted fields via [`SchemaNode::optional`] and
//!   [`SchemaNode::default`]
//! - Strictness chosen per parse: [`Schema::parse`] drops unknown keys,
//!   [`Schema::parse_strict`] reports them
//!
//! # Example
//!
//! ```
//! use intake_schema::{int, object, string, Schema};
//!
//! let schema = Schema::new(
//!     object()
//!         .field("name", string().min_length(1))
//!         .field("age", int().min(0)),
//! );
//!
//! let value = schema.parse(serde_json::json!({"name": "ada", "age": "36"}))?;
//! assert_eq!(value["age"], 36);
//! # Ok::<(), intake_schema::ValidationError>(())
//! ```
//!
//! # Concurrency
//!
//! A [`Schema`] is immutable plain data. Build it once, keep it in a
//! `static` or share references across tasks; parsing never locks.

mod coerce;
mod error;
mod input;
mod node;
mod parse;

pub use error::SchemaError;
pub use error::ValidationError;
pub use error::Violation;
pub use input::Input;
pub use node::{array, boolean, float, int, object, string};
pub use node::{ArrayNode, BoolNode, FloatNode, IntNode, ObjectNode, Schema, SchemaNode, StrNode};
pub use parse::parse;
