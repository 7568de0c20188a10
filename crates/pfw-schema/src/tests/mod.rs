use std::sync::Arc;

use jsonschema::{JSONSchema, paths::JSONPointer};
use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;

use crate::{
    Attribute, NestedAttributes, PROTOCOL_JSON_SCHEMA, Schema, StringType, Value, ValueType,
};

pub mod matching;
pub mod protocol;

static PROTOCOL_SCHEMA_JSON: Lazy<JsonValue> = Lazy::new(|| {
    serde_json::from_str(PROTOCOL_JSON_SCHEMA).expect("embedded protocol schema must be valid JSON")
});

pub(crate) fn assert_json_schema(instance: &JsonValue) {
    let compiled = JSONSchema::options()
        .compile(&PROTOCOL_SCHEMA_JSON)
        .expect("embedded schema must compile successfully");
    if let Err(errors) = compiled.validate(instance) {
        let mut messages = Vec::new();
        for err in errors {
            messages.push(format!("{}: {}", format_pointer(&err.instance_path), err));
        }
        panic!(
            "schema validation failed: {}\ninstance: {}",
            messages.join("; "),
            instance
        );
    }
}

fn format_pointer(pointer: &JSONPointer) -> String {
    let text = pointer.to_string();
    if text.is_empty() { "/".into() } else { text }
}

/// `test_parent` list-nested attribute with two optional string children.
pub(crate) fn parent_schema() -> Arc<Schema> {
    Arc::new(Schema::new().attribute(
        "test_parent",
        Attribute::nested(NestedAttributes::list([
            ("test_child1", Attribute::of_type(StringType).optional()),
            ("test_child2", Attribute::of_type(StringType).optional()),
        ]))
        .optional(),
    ))
}

pub(crate) fn child_type() -> ValueType {
    ValueType::object([("test_child1", ValueType::String), ("test_child2", ValueType::String)])
}

pub(crate) fn child(a: &str, b: &str) -> Value {
    Value::object_from([("test_child1", Value::string(a)), ("test_child2", Value::string(b))])
}

/// `test_parent = [{"a","b"}, {"c","d"}]`.
pub(crate) fn parent_value() -> Value {
    Value::object_from([(
        "test_parent",
        Value::list(child_type(), vec![child("a", "b"), child("c", "d")]).unwrap(),
    )])
}

pub(crate) fn parent_value_with(list: Value) -> Value {
    Value::object_from([("test_parent", list)])
}
