use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::value::{Value, ValueError, ValueRepr, ValueType};

impl Value {
    /// Converts to plain JSON. Null becomes JSON `null`; unknown anywhere in the tree is an error.
    pub fn to_json(&self) -> Result<JsonValue, ValueError> {
        Ok(match self.repr() {
            ValueRepr::Null => JsonValue::Null,
            ValueRepr::Unknown => return Err(ValueError::Unknown),
            ValueRepr::Bool(value) => JsonValue::Bool(*value),
            ValueRepr::Number(value) => JsonValue::Number(value.clone()),
            ValueRepr::String(value) => JsonValue::String(value.clone()),
            ValueRepr::List(items) | ValueRepr::Set(items) => JsonValue::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<_, _>>()?,
            ),
            ValueRepr::Map(entries) | ValueRepr::Object(entries) => {
                let mut out = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    out.insert(key.clone(), value.to_json()?);
                }
                JsonValue::Object(out)
            }
        })
    }

    /// Builds a value of type `ty` from plain JSON. Object attributes absent from the JSON
    /// object are null.
    pub fn from_json(ty: &ValueType, json: &JsonValue) -> Result<Value, ValueError> {
        if json.is_null() {
            return Ok(Value::null(ty.clone()));
        }
        let repr = match (ty, json) {
            (ValueType::Bool, JsonValue::Bool(value)) => ValueRepr::Bool(*value),
            (ValueType::Number, JsonValue::Number(value)) => ValueRepr::Number(value.clone()),
            (ValueType::String, JsonValue::String(value)) => ValueRepr::String(value.clone()),
            (ValueType::List(elem), JsonValue::Array(items)) => {
                ValueRepr::List(convert_items(elem, items)?)
            }
            (ValueType::Set(elem), JsonValue::Array(items)) => {
                ValueRepr::Set(convert_items(elem, items)?)
            }
            (ValueType::Map(elem), JsonValue::Object(entries)) => {
                let mut out = BTreeMap::new();
                for (key, item) in entries {
                    out.insert(key.clone(), Value::from_json(elem, item)?);
                }
                ValueRepr::Map(out)
            }
            (ValueType::Object(attrs), JsonValue::Object(fields)) => {
                if let Some(name) = fields.keys().find(|name| !attrs.contains_key(*name)) {
                    return Err(ValueError::UnexpectedAttribute { name: name.clone() });
                }
                let mut out = BTreeMap::new();
                for (name, attr_ty) in attrs {
                    let field = match fields.get(name) {
                        Some(field) => Value::from_json(attr_ty, field)?,
                        None => Value::null(attr_ty.clone()),
                    };
                    out.insert(name.clone(), field);
                }
                ValueRepr::Object(out)
            }
            (ty, json) => {
                return Err(ValueError::TypeMismatch {
                    expected: ty.to_string(),
                    found: json_kind(json).to_string(),
                });
            }
        };
        Value::from_parts(ty.clone(), repr)
    }
}

fn convert_items(elem: &ValueType, items: &[JsonValue]) -> Result<Vec<Value>, ValueError> {
    items.iter().map(|item| Value::from_json(elem, item)).collect()
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn server_type() -> ValueType {
        ValueType::object([
            ("name", ValueType::String),
            ("ports", ValueType::list(ValueType::Number)),
            ("labels", ValueType::map(ValueType::String)),
        ])
    }

    #[test]
    fn missing_object_attributes_become_null() {
        let value = Value::from_json(&server_type(), &json!({"name": "web"})).unwrap();
        let fields = value.entries().unwrap();
        assert_eq!(fields["name"], Value::string("web"));
        assert!(fields["ports"].is_null());
        assert_eq!(fields["ports"].ty(), &ValueType::list(ValueType::Number));
    }

    #[test]
    fn json_round_trips_known_values() {
        let json = json!({"name": "web", "ports": [80, 443], "labels": {"tier": "front"}});
        let value = Value::from_json(&server_type(), &json).unwrap();
        assert_eq!(value.to_json().unwrap(), json!({
            "name": "web",
            "ports": [80, 443],
            "labels": {"tier": "front"},
        }));
    }

    #[test]
    fn unknown_values_do_not_convert() {
        let value = Value::object_from([("a", Value::unknown(ValueType::String))]);
        assert_eq!(value.to_json().unwrap_err(), ValueError::Unknown);
    }

    #[test]
    fn rejects_kind_and_attribute_mismatches() {
        let err = Value::from_json(&ValueType::String, &json!(1)).unwrap_err();
        assert!(matches!(err, ValueError::TypeMismatch { .. }));

        let err = Value::from_json(&server_type(), &json!({"nope": 1})).unwrap_err();
        assert_eq!(
            err,
            ValueError::UnexpectedAttribute {
                name: "nope".into()
            }
        );
    }
}
