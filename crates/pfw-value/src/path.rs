use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::expression::{Expression, ExpressionStep};
use crate::value::{Value, ValueRepr};

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    AttributeName(String),
    ElementKeyInt(i64),
    ElementKeyString(String),
    ElementKeyValue(Value),
}

impl PathStep {
    pub(crate) fn expression_step(&self) -> ExpressionStep {
        match self {
            PathStep::AttributeName(name) => ExpressionStep::AttributeNameExact(name.clone()),
            PathStep::ElementKeyInt(index) => ExpressionStep::ElementKeyIntExact(*index),
            PathStep::ElementKeyString(key) => ExpressionStep::ElementKeyStringExact(key.clone()),
            PathStep::ElementKeyValue(value) => ExpressionStep::ElementKeyValueExact(value.clone()),
        }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::AttributeName(name) => f.write_str(name),
            PathStep::ElementKeyInt(index) => write!(f, "[{index}]"),
            PathStep::ElementKeyString(key) => write!(f, "[{key:?}]"),
            PathStep::ElementKeyValue(value) => write!(f, "[Value({value})]"),
        }
    }
}

/// Ordered, immutable address of one location inside a value tree.
///
/// Builders return a new path and never touch the receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Path to a top-level attribute.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            steps: vec![PathStep::AttributeName(name.into())],
        }
    }

    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    pub fn at_step(&self, step: PathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    pub fn at_name(&self, name: impl Into<String>) -> Self {
        self.at_step(PathStep::AttributeName(name.into()))
    }

    pub fn at_list_index(&self, index: i64) -> Self {
        self.at_step(PathStep::ElementKeyInt(index))
    }

    pub fn at_map_key(&self, key: impl Into<String>) -> Self {
        self.at_step(PathStep::ElementKeyString(key.into()))
    }

    pub fn at_set_value(&self, value: Value) -> Self {
        self.at_step(PathStep::ElementKeyValue(value))
    }

    /// Path without its last step; `None` at the root.
    pub fn parent(&self) -> Option<Path> {
        let (_, rest) = self.steps.split_last()?;
        Some(Self {
            steps: rest.to_vec(),
        })
    }

    pub fn last_step(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// True when `prefix` is this path or one of its ancestors.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        self.steps.starts_with(&prefix.steps)
    }

    /// Exact, root-anchored expression matching only this path.
    pub fn expression(&self) -> Expression {
        Expression::from_steps(self.steps.iter().map(PathStep::expression_step).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            if idx > 0 && matches!(step, PathStep::AttributeName(_)) {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("cannot apply step {step} to a null value")]
    Null { step: String },
    #[error("cannot apply step {step} to an unknown value")]
    Unknown { step: String },
    #[error("cannot apply step {step} to {kind}")]
    KindMismatch { step: String, kind: &'static str },
    #[error("no attribute named '{0}'")]
    NoSuchAttribute(String),
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("no map key {0:?}")]
    NoSuchKey(String),
    #[error("no set element {0}")]
    NoSuchElement(String),
}

impl Value {
    /// Applies one step to a known container, yielding the addressed child.
    pub fn apply_step(&self, step: &PathStep) -> Result<&Value, StepError> {
        match (self.repr(), step) {
            (ValueRepr::Null, _) => Err(StepError::Null {
                step: step.to_string(),
            }),
            (ValueRepr::Unknown, _) => Err(StepError::Unknown {
                step: step.to_string(),
            }),
            (ValueRepr::Object(fields), PathStep::AttributeName(name)) => fields
                .get(name)
                .ok_or_else(|| StepError::NoSuchAttribute(name.clone())),
            (ValueRepr::List(items), PathStep::ElementKeyInt(index)) => usize::try_from(*index)
                .ok()
                .and_then(|idx| items.get(idx))
                .ok_or(StepError::IndexOutOfRange {
                    index: *index,
                    len: items.len(),
                }),
            (ValueRepr::Map(entries), PathStep::ElementKeyString(key)) => entries
                .get(key)
                .ok_or_else(|| StepError::NoSuchKey(key.clone())),
            (ValueRepr::Set(items), PathStep::ElementKeyValue(value)) => items
                .iter()
                .find(|item| *item == value)
                .ok_or_else(|| StepError::NoSuchElement(value.to_string())),
            _ => Err(StepError::KindMismatch {
                step: step.to_string(),
                kind: self.kind(),
            }),
        }
    }

    /// Walks every step of `path`, stopping at the first one that does not apply.
    pub fn value_at_path(&self, path: &Path) -> Result<&Value, StepError> {
        let mut current = self;
        for step in path.steps() {
            current = current.apply_step(step)?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn sample() -> Value {
        let child = ValueType::object([("test_child", ValueType::String)]);
        Value::object_from([(
            "test_parent",
            Value::list(
                child,
                vec![
                    Value::object_from([("test_child", Value::string("a"))]),
                    Value::object_from([("test_child", Value::string("b"))]),
                ],
            )
            .unwrap(),
        )])
    }

    #[test]
    fn renders_each_step_kind() {
        let path = Path::root("test_parent").at_list_index(1).at_name("test_child");
        assert_eq!(path.to_string(), "test_parent[1].test_child");

        let path = Path::root("tags").at_map_key("key");
        assert_eq!(path.to_string(), r#"tags["key"]"#);

        let path = Path::root("ids").at_set_value(Value::string("x"));
        assert_eq!(path.to_string(), r#"ids[Value("x")]"#);

        assert_eq!(Path::empty().to_string(), "");
    }

    #[test]
    fn builders_leave_receiver_untouched() {
        let parent = Path::root("a");
        let child = parent.at_name("b");
        assert_eq!(parent.len(), 1);
        assert_eq!(child.len(), 2);
        assert_eq!(child.parent(), Some(parent.clone()));
        assert!(child.has_prefix(&parent));
        assert!(!parent.has_prefix(&child));
    }

    #[test]
    fn rewalking_steps_yields_equal_path() {
        let original = Path::root("a")
            .at_list_index(3)
            .at_map_key("k")
            .at_set_value(Value::bool(true))
            .at_name("z");
        let rebuilt = original
            .steps()
            .iter()
            .fold(Path::empty(), |path, step| path.at_step(step.clone()));
        assert_eq!(original, rebuilt);
    }

    #[test]
    fn parent_of_root_is_none() {
        assert_eq!(Path::empty().parent(), None);
        assert_eq!(Path::root("a").parent(), Some(Path::empty()));
    }

    #[test]
    fn value_at_path_descends() {
        let value = sample();
        let path = Path::root("test_parent").at_list_index(1).at_name("test_child");
        assert_eq!(value.value_at_path(&path).unwrap(), &Value::string("b"));
    }

    #[test]
    fn apply_step_reports_mismatches() {
        let value = sample();
        let list = value.apply_step(&PathStep::AttributeName("test_parent".into())).unwrap();

        let err = list.apply_step(&PathStep::ElementKeyInt(4)).unwrap_err();
        assert_eq!(err, StepError::IndexOutOfRange { index: 4, len: 2 });

        let err = list
            .apply_step(&PathStep::ElementKeyString("x".into()))
            .unwrap_err();
        assert!(matches!(err, StepError::KindMismatch { kind: "list", .. }));

        let null = Value::null(ValueType::list(ValueType::String));
        let err = null.apply_step(&PathStep::ElementKeyInt(0)).unwrap_err();
        assert!(matches!(err, StepError::Null { .. }));
    }

    #[test]
    fn path_serializes_as_rendered_string() {
        let path = Path::root("a").at_list_index(0);
        assert_eq!(serde_json::to_value(&path).unwrap(), serde_json::json!("a[0]"));
    }
}
