//! Leaf attribute types: the bridge between schema attributes and raw values.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use pfw_value::{Path, PathStep, Value, ValueError, ValueRepr, ValueType};

use crate::diag::Diagnostics;

/// Type of a leaf attribute.
///
/// Decoding and encoding default to a structural type check. Types with a coarser notion
/// of equality (case-insensitive strings, normalized JSON documents, ...) override
/// [`AttrType::equal`]; reconciliation relies on it.
pub trait AttrType: fmt::Debug + Send + Sync {
    fn value_type(&self) -> ValueType;

    /// Raw value to this type's value representation.
    fn value_from_raw(&self, raw: &Value) -> Result<Value, ValueError> {
        check_type(&self.value_type(), raw)?;
        Ok(raw.clone())
    }

    /// This type's value representation back to a raw value.
    fn value_to_raw(&self, value: &Value) -> Result<Value, ValueError> {
        check_type(&self.value_type(), value)?;
        Ok(value.clone())
    }

    /// Semantic equality between two decoded values.
    fn equal(&self, a: &Value, b: &Value) -> bool {
        a == b
    }

    /// Custom validation run on the raw value before decoding.
    fn validate(&self, _raw: &Value, _path: &Path) -> Diagnostics {
        Diagnostics::new()
    }

    /// Type of the element or attribute addressed by `step`, for types with internal
    /// structure.
    fn element_type(&self, _step: &PathStep) -> Option<Arc<dyn AttrType>> {
        None
    }
}

pub(crate) fn check_type(expected: &ValueType, value: &Value) -> Result<(), ValueError> {
    if value.ty() == expected {
        Ok(())
    } else {
        Err(ValueError::TypeMismatch {
            expected: expected.to_string(),
            found: value.ty().to_string(),
        })
    }
}

/// Equality for values where at least one side is null or unknown.
fn shallow_equal(a: &Value, b: &Value) -> Option<bool> {
    match (a.repr(), b.repr()) {
        (ValueRepr::Null | ValueRepr::Unknown, _) | (_, ValueRepr::Null | ValueRepr::Unknown) => {
            Some(a == b)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl AttrType for StringType {
    fn value_type(&self) -> ValueType {
        ValueType::String
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberType;

impl AttrType for NumberType {
    fn value_type(&self) -> ValueType {
        ValueType::Number
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolType;

impl AttrType for BoolType {
    fn value_type(&self) -> ValueType {
        ValueType::Bool
    }
}

#[derive(Debug, Clone)]
pub struct ListType {
    pub elem: Arc<dyn AttrType>,
}

impl ListType {
    pub fn of(elem: impl AttrType + 'static) -> Self {
        Self {
            elem: Arc::new(elem),
        }
    }
}

impl AttrType for ListType {
    fn value_type(&self) -> ValueType {
        ValueType::list(self.elem.value_type())
    }

    fn equal(&self, a: &Value, b: &Value) -> bool {
        if let Some(eq) = shallow_equal(a, b) {
            return eq;
        }
        match (a.elements(), b.elements()) {
            (Some(xs), Some(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.elem.equal(x, y))
            }
            _ => false,
        }
    }

    fn element_type(&self, step: &PathStep) -> Option<Arc<dyn AttrType>> {
        matches!(step, PathStep::ElementKeyInt(_)).then(|| self.elem.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SetType {
    pub elem: Arc<dyn AttrType>,
}

impl SetType {
    pub fn of(elem: impl AttrType + 'static) -> Self {
        Self {
            elem: Arc::new(elem),
        }
    }
}

impl AttrType for SetType {
    fn value_type(&self) -> ValueType {
        ValueType::set(self.elem.value_type())
    }

    fn equal(&self, a: &Value, b: &Value) -> bool {
        if let Some(eq) = shallow_equal(a, b) {
            return eq;
        }
        match (a.elements(), b.elements()) {
            (Some(xs), Some(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().all(|x| ys.iter().any(|y| self.elem.equal(x, y)))
            }
            _ => false,
        }
    }

    fn element_type(&self, step: &PathStep) -> Option<Arc<dyn AttrType>> {
        matches!(step, PathStep::ElementKeyValue(_)).then(|| self.elem.clone())
    }
}

#[derive(Debug, Clone)]
pub struct MapType {
    pub elem: Arc<dyn AttrType>,
}

impl MapType {
    pub fn of(elem: impl AttrType + 'static) -> Self {
        Self {
            elem: Arc::new(elem),
        }
    }
}

impl AttrType for MapType {
    fn value_type(&self) -> ValueType {
        ValueType::map(self.elem.value_type())
    }

    fn equal(&self, a: &Value, b: &Value) -> bool {
        if let Some(eq) = shallow_equal(a, b) {
            return eq;
        }
        entries_equal(a, b, |_| Some(&self.elem))
    }

    fn element_type(&self, step: &PathStep) -> Option<Arc<dyn AttrType>> {
        matches!(step, PathStep::ElementKeyString(_)).then(|| self.elem.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectType {
    pub attrs: BTreeMap<String, Arc<dyn AttrType>>,
}

impl ObjectType {
    pub fn new(attrs: impl IntoIterator<Item = (impl Into<String>, Arc<dyn AttrType>)>) -> Self {
        Self {
            attrs: attrs
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        }
    }
}

impl AttrType for ObjectType {
    fn value_type(&self) -> ValueType {
        ValueType::Object(
            self.attrs
                .iter()
                .map(|(name, ty)| (name.clone(), ty.value_type()))
                .collect(),
        )
    }

    fn equal(&self, a: &Value, b: &Value) -> bool {
        if let Some(eq) = shallow_equal(a, b) {
            return eq;
        }
        entries_equal(a, b, |name| self.attrs.get(name))
    }

    fn element_type(&self, step: &PathStep) -> Option<Arc<dyn AttrType>> {
        match step {
            PathStep::AttributeName(name) => self.attrs.get(name).cloned(),
            _ => None,
        }
    }
}

fn entries_equal<'a, F>(a: &Value, b: &Value, type_of: F) -> bool
where
    F: Fn(&str) -> Option<&'a Arc<dyn AttrType>>,
{
    let (Some(xs), Some(ys)) = (a.entries(), b.entries()) else {
        return false;
    };
    xs.len() == ys.len()
        && xs.iter().all(|(key, x)| match (ys.get(key), type_of(key)) {
            (Some(y), Some(ty)) => ty.equal(x, y),
            _ => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strings that compare case-insensitively.
    #[derive(Debug)]
    struct FoldedString;

    impl AttrType for FoldedString {
        fn value_type(&self) -> ValueType {
            ValueType::String
        }

        fn equal(&self, a: &Value, b: &Value) -> bool {
            match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
                _ => a == b,
            }
        }
    }

    #[test]
    fn decoding_checks_structural_type() {
        let err = StringType.value_from_raw(&Value::bool(true)).unwrap_err();
        assert!(matches!(err, ValueError::TypeMismatch { .. }));
        assert!(StringType.value_from_raw(&Value::null(ValueType::String)).is_ok());
    }

    #[test]
    fn collection_equality_delegates_to_elements() {
        let list = ListType::of(FoldedString);
        let a = Value::list(ValueType::String, vec![Value::string("ABC")]).unwrap();
        let b = Value::list(ValueType::String, vec![Value::string("abc")]).unwrap();
        assert!(list.equal(&a, &b));

        let c = Value::list(ValueType::String, vec![Value::string("xyz")]).unwrap();
        assert!(!list.equal(&a, &c));
        assert!(!list.equal(&a, &Value::null(ValueType::list(ValueType::String))));
    }

    #[test]
    fn object_equality_delegates_to_attributes() {
        let ty = ObjectType::new([("name", Arc::new(FoldedString) as Arc<dyn AttrType>)]);
        let a = Value::object_from([("name", Value::string("Web"))]);
        let b = Value::object_from([("name", Value::string("WEB"))]);
        assert!(ty.equal(&a, &b));
    }

    #[test]
    fn element_type_follows_step_kind() {
        let map = MapType::of(NumberType);
        assert!(map.element_type(&PathStep::ElementKeyString("k".into())).is_some());
        assert!(map.element_type(&PathStep::ElementKeyInt(0)).is_none());
        assert_eq!(map.value_type(), ValueType::map(ValueType::Number));
    }
}
