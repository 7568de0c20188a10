use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::Number;
use thiserror::Error;

/// Structural type descriptor paired with every [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Number,
    String,
    List(Box<ValueType>),
    Set(Box<ValueType>),
    Map(Box<ValueType>),
    Object(BTreeMap<String, ValueType>),
}

impl ValueType {
    pub fn list(elem: ValueType) -> Self {
        ValueType::List(Box::new(elem))
    }

    pub fn set(elem: ValueType) -> Self {
        ValueType::Set(Box::new(elem))
    }

    pub fn map(elem: ValueType) -> Self {
        ValueType::Map(Box::new(elem))
    }

    pub fn object(attrs: impl IntoIterator<Item = (impl Into<String>, ValueType)>) -> Self {
        ValueType::Object(
            attrs
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        )
    }

    /// Human-readable kind string used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::List(_) => "list",
            ValueType::Set(_) => "set",
            ValueType::Map(_) => "map",
            ValueType::Object(_) => "object",
        }
    }

    /// Element type of a list, set, or map.
    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::List(elem) | ValueType::Set(elem) | ValueType::Map(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn attribute_types(&self) -> Option<&BTreeMap<String, ValueType>> {
        match self {
            ValueType::Object(attrs) => Some(attrs),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool | ValueType::Number | ValueType::String => f.write_str(self.kind()),
            ValueType::List(elem) | ValueType::Set(elem) | ValueType::Map(elem) => {
                write!(f, "{}({elem})", self.kind())
            }
            ValueType::Object(attrs) => {
                f.write_str("object({")?;
                for (idx, (name, ty)) in attrs.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name:?}: {ty}")?;
                }
                f.write_str("})")
            }
        }
    }
}

/// Serializes in the JSON type notation used on the host boundary, e.g. `"string"`,
/// `["list","string"]`, `["object",{"name":"string"}]`.
impl Serialize for ValueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ValueType::Bool | ValueType::Number | ValueType::String => {
                serializer.serialize_str(self.kind())
            }
            ValueType::List(elem) | ValueType::Set(elem) | ValueType::Map(elem) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(self.kind())?;
                seq.serialize_element(elem.as_ref())?;
                seq.end()
            }
            ValueType::Object(attrs) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(self.kind())?;
                seq.serialize_element(attrs)?;
                seq.end()
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("missing object attribute '{name}'")]
    MissingAttribute { name: String },
    #[error("unexpected object attribute '{name}'")]
    UnexpectedAttribute { name: String },
    #[error("unknown value cannot be converted")]
    Unknown,
}

/// Contents of a [`Value`]; the paired [`ValueType`] says how to read it.
#[derive(Debug, Clone)]
pub enum ValueRepr {
    Null,
    Unknown,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    /// Elements are unique; order carries no meaning.
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Always carries every attribute declared by the object type.
    Object(BTreeMap<String, Value>),
}

impl PartialEq for ValueRepr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueRepr::Null, ValueRepr::Null) | (ValueRepr::Unknown, ValueRepr::Unknown) => true,
            (ValueRepr::Bool(a), ValueRepr::Bool(b)) => a == b,
            (ValueRepr::Number(a), ValueRepr::Number(b)) => numbers_equal(a, b),
            (ValueRepr::String(a), ValueRepr::String(b)) => a == b,
            (ValueRepr::List(a), ValueRepr::List(b)) => a == b,
            (ValueRepr::Set(a), ValueRepr::Set(b)) => {
                a.len() == b.len() && a.iter().all(|item| b.contains(item))
            }
            (ValueRepr::Map(a), ValueRepr::Map(b))
            | (ValueRepr::Object(a), ValueRepr::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ValueRepr {}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a == b {
        return true;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// A typed, possibly null or unknown value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    ty: ValueType,
    repr: ValueRepr,
}

impl Value {
    pub fn null(ty: ValueType) -> Self {
        Self {
            ty,
            repr: ValueRepr::Null,
        }
    }

    pub fn unknown(ty: ValueType) -> Self {
        Self {
            ty,
            repr: ValueRepr::Unknown,
        }
    }

    pub fn bool(value: bool) -> Self {
        Self {
            ty: ValueType::Bool,
            repr: ValueRepr::Bool(value),
        }
    }

    pub fn number(value: impl Into<Number>) -> Self {
        Self {
            ty: ValueType::Number,
            repr: ValueRepr::Number(value.into()),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            ty: ValueType::String,
            repr: ValueRepr::String(value.into()),
        }
    }

    pub fn list(elem: ValueType, items: Vec<Value>) -> Result<Self, ValueError> {
        Self::from_parts(ValueType::list(elem), ValueRepr::List(items))
    }

    /// Builds a set; duplicate elements collapse into one.
    pub fn set(elem: ValueType, items: Vec<Value>) -> Result<Self, ValueError> {
        Self::from_parts(ValueType::set(elem), ValueRepr::Set(items))
    }

    pub fn map(
        elem: ValueType,
        entries: impl IntoIterator<Item = (impl Into<String>, Value)>,
    ) -> Result<Self, ValueError> {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        Self::from_parts(ValueType::map(elem), ValueRepr::Map(entries))
    }

    /// Builds an object value of type `ty`, which must declare exactly the supplied attributes.
    pub fn object(
        ty: ValueType,
        fields: impl IntoIterator<Item = (impl Into<String>, Value)>,
    ) -> Result<Self, ValueError> {
        let fields = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        Self::from_parts(ty, ValueRepr::Object(fields))
    }

    /// Convenience helper to build an object whose type is derived from its fields.
    pub fn object_from(fields: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        let fields: BTreeMap<String, Value> = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        let ty = ValueType::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), value.ty.clone()))
                .collect(),
        );
        Self {
            ty,
            repr: ValueRepr::Object(fields),
        }
    }

    /// Pairs a type with contents, checking that every child conforms to the type.
    pub fn from_parts(ty: ValueType, repr: ValueRepr) -> Result<Self, ValueError> {
        let repr = match (&ty, repr) {
            (_, repr @ (ValueRepr::Null | ValueRepr::Unknown)) => repr,
            (ValueType::Bool, repr @ ValueRepr::Bool(_))
            | (ValueType::Number, repr @ ValueRepr::Number(_))
            | (ValueType::String, repr @ ValueRepr::String(_)) => repr,
            (ValueType::List(elem), ValueRepr::List(items)) => {
                check_elements(elem, items.iter())?;
                ValueRepr::List(items)
            }
            (ValueType::Set(elem), ValueRepr::Set(items)) => {
                check_elements(elem, items.iter())?;
                ValueRepr::Set(dedupe(items))
            }
            (ValueType::Map(elem), ValueRepr::Map(entries)) => {
                check_elements(elem, entries.values())?;
                ValueRepr::Map(entries)
            }
            (ValueType::Object(attrs), ValueRepr::Object(fields)) => {
                check_object(attrs, &fields)?;
                ValueRepr::Object(fields)
            }
            (ty, repr) => {
                return Err(ValueError::TypeMismatch {
                    expected: ty.to_string(),
                    found: repr_kind(&repr).to_string(),
                });
            }
        };
        Ok(Self { ty, repr })
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    pub fn repr(&self) -> &ValueRepr {
        &self.repr
    }

    pub fn into_parts(self) -> (ValueType, ValueRepr) {
        (self.ty, self.repr)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.repr, ValueRepr::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.repr, ValueRepr::Unknown)
    }

    /// True when neither this value nor anything beneath it is unknown.
    pub fn is_fully_known(&self) -> bool {
        match &self.repr {
            ValueRepr::Unknown => false,
            ValueRepr::List(items) | ValueRepr::Set(items) => {
                items.iter().all(Value::is_fully_known)
            }
            ValueRepr::Map(entries) | ValueRepr::Object(entries) => {
                entries.values().all(Value::is_fully_known)
            }
            _ => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.repr {
            ValueRepr::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match &self.repr {
            ValueRepr::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.repr {
            ValueRepr::String(value) => Some(value),
            _ => None,
        }
    }

    /// Elements of a known list or set.
    pub fn elements(&self) -> Option<&[Value]> {
        match &self.repr {
            ValueRepr::List(items) | ValueRepr::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a known map or attributes of a known object.
    pub fn entries(&self) -> Option<&BTreeMap<String, Value>> {
        match &self.repr {
            ValueRepr::Map(entries) | ValueRepr::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Human-readable kind string used in error messages.
    pub fn kind(&self) -> &'static str {
        match self.repr {
            ValueRepr::Null => "null",
            ValueRepr::Unknown => "unknown",
            _ => self.ty.kind(),
        }
    }
}

fn repr_kind(repr: &ValueRepr) -> &'static str {
    match repr {
        ValueRepr::Null => "null",
        ValueRepr::Unknown => "unknown",
        ValueRepr::Bool(_) => "bool",
        ValueRepr::Number(_) => "number",
        ValueRepr::String(_) => "string",
        ValueRepr::List(_) => "list",
        ValueRepr::Set(_) => "set",
        ValueRepr::Map(_) => "map",
        ValueRepr::Object(_) => "object",
    }
}

fn check_elements<'a>(
    elem: &ValueType,
    items: impl Iterator<Item = &'a Value>,
) -> Result<(), ValueError> {
    for item in items {
        if &item.ty != elem {
            return Err(ValueError::TypeMismatch {
                expected: elem.to_string(),
                found: item.ty.to_string(),
            });
        }
    }
    Ok(())
}

fn check_object(
    attrs: &BTreeMap<String, ValueType>,
    fields: &BTreeMap<String, Value>,
) -> Result<(), ValueError> {
    for (name, ty) in attrs {
        let Some(field) = fields.get(name) else {
            return Err(ValueError::MissingAttribute { name: name.clone() });
        };
        if &field.ty != ty {
            return Err(ValueError::TypeMismatch {
                expected: ty.to_string(),
                found: field.ty.to_string(),
            });
        }
    }
    if let Some(name) = fields.keys().find(|name| !attrs.contains_key(*name)) {
        return Err(ValueError::UnexpectedAttribute { name: name.clone() });
    }
    Ok(())
}

fn dedupe(items: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ValueRepr::Null => f.write_str("<null>"),
            ValueRepr::Unknown => f.write_str("<unknown>"),
            ValueRepr::Bool(value) => write!(f, "{value}"),
            ValueRepr::Number(value) => write!(f, "{value}"),
            ValueRepr::String(value) => write!(f, "{value:?}"),
            ValueRepr::List(items) | ValueRepr::Set(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ValueRepr::Map(entries) | ValueRepr::Object(entries) => {
                f.write_str("{")?;
                for (idx, (key, item)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{key:?}:{item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::number(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}
