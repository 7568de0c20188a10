use std::fmt;

use crate::path::{Path, PathStep};
use crate::value::Value;

/// One step of an [`Expression`]: an exact step, a wildcard, or a move to the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionStep {
    AttributeNameExact(String),
    ElementKeyIntExact(i64),
    ElementKeyIntAny,
    ElementKeyStringExact(String),
    ElementKeyStringAny,
    ElementKeyValueExact(Value),
    ElementKeyValueAny,
    Parent,
}

impl ExpressionStep {
    /// Whether this step accepts the given concrete step. `Parent` never does.
    pub fn matches(&self, step: &PathStep) -> bool {
        match (self, step) {
            (ExpressionStep::AttributeNameExact(want), PathStep::AttributeName(got)) => want == got,
            (ExpressionStep::ElementKeyIntExact(want), PathStep::ElementKeyInt(got)) => want == got,
            (ExpressionStep::ElementKeyIntAny, PathStep::ElementKeyInt(_)) => true,
            (ExpressionStep::ElementKeyStringExact(want), PathStep::ElementKeyString(got)) => {
                want == got
            }
            (ExpressionStep::ElementKeyStringAny, PathStep::ElementKeyString(_)) => true,
            (ExpressionStep::ElementKeyValueExact(want), PathStep::ElementKeyValue(got)) => {
                want == got
            }
            (ExpressionStep::ElementKeyValueAny, PathStep::ElementKeyValue(_)) => true,
            _ => false,
        }
    }

    /// The concrete step this expression step stands for, if it is exact.
    pub fn exact(&self) -> Option<PathStep> {
        match self {
            ExpressionStep::AttributeNameExact(name) => Some(PathStep::AttributeName(name.clone())),
            ExpressionStep::ElementKeyIntExact(index) => Some(PathStep::ElementKeyInt(*index)),
            ExpressionStep::ElementKeyStringExact(key) => {
                Some(PathStep::ElementKeyString(key.clone()))
            }
            ExpressionStep::ElementKeyValueExact(value) => {
                Some(PathStep::ElementKeyValue(value.clone()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ExpressionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionStep::AttributeNameExact(name) => f.write_str(name),
            ExpressionStep::ElementKeyIntExact(index) => write!(f, "[{index}]"),
            ExpressionStep::ElementKeyIntAny => f.write_str("[*]"),
            ExpressionStep::ElementKeyStringExact(key) => write!(f, "[{key:?}]"),
            ExpressionStep::ElementKeyStringAny => f.write_str(r#"["*"]"#),
            ExpressionStep::ElementKeyValueExact(value) => write!(f, "[Value({value})]"),
            ExpressionStep::ElementKeyValueAny => f.write_str("[Value(*)]"),
            ExpressionStep::Parent => f.write_str("<"),
        }
    }
}

/// Pattern over [`Path`]s, resolved against concrete data by the schema layer.
///
/// Root expressions start at the top of the tree. Relative expressions are meant to be
/// merged onto another expression, typically the one addressing the attribute under
/// validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    root: bool,
    steps: Vec<ExpressionStep>,
}

impl Default for Expression {
    fn default() -> Self {
        Self {
            root: true,
            steps: Vec::new(),
        }
    }
}

impl Expression {
    /// Root expression with no steps.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Root expression starting at a top-level attribute.
    pub fn root(name: impl Into<String>) -> Self {
        Self::empty().at_name(name)
    }

    /// Relative expression with no steps.
    pub fn relative() -> Self {
        Self {
            root: false,
            steps: Vec::new(),
        }
    }

    pub fn from_steps(steps: Vec<ExpressionStep>) -> Self {
        Self { root: true, steps }
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn steps(&self) -> &[ExpressionStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn at_step(&self, step: ExpressionStep) -> Self {
        let mut next = self.clone();
        next.steps.push(step);
        next
    }

    pub fn at_name(&self, name: impl Into<String>) -> Self {
        self.at_step(ExpressionStep::AttributeNameExact(name.into()))
    }

    pub fn at_list_index(&self, index: i64) -> Self {
        self.at_step(ExpressionStep::ElementKeyIntExact(index))
    }

    pub fn at_any_list_index(&self) -> Self {
        self.at_step(ExpressionStep::ElementKeyIntAny)
    }

    pub fn at_map_key(&self, key: impl Into<String>) -> Self {
        self.at_step(ExpressionStep::ElementKeyStringExact(key.into()))
    }

    pub fn at_any_map_key(&self) -> Self {
        self.at_step(ExpressionStep::ElementKeyStringAny)
    }

    pub fn at_set_value(&self, value: Value) -> Self {
        self.at_step(ExpressionStep::ElementKeyValueExact(value))
    }

    pub fn at_any_set_value(&self) -> Self {
        self.at_step(ExpressionStep::ElementKeyValueAny)
    }

    /// Steps back to the parent of the location reached so far.
    pub fn at_parent(&self) -> Self {
        self.at_step(ExpressionStep::Parent)
    }

    /// Appends a relative expression; a root expression replaces this one entirely.
    pub fn merge(&self, other: &Expression) -> Self {
        if other.root {
            return other.clone();
        }
        let mut next = self.clone();
        next.steps.extend(other.steps.iter().cloned());
        next
    }

    /// Applies every parent step, yielding an expression without any. `None` when a
    /// parent step pops past the root.
    pub fn resolve(&self) -> Option<Self> {
        let mut steps: Vec<ExpressionStep> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            match step {
                ExpressionStep::Parent => {
                    steps.pop()?;
                }
                other => steps.push(other.clone()),
            }
        }
        Some(Self {
            root: self.root,
            steps,
        })
    }

    /// True when `path` matches every step of the resolved expression.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(resolved) = self.resolve() else {
            return false;
        };
        resolved.steps.len() == path.len()
            && resolved
                .steps
                .iter()
                .zip(path.steps())
                .all(|(want, got)| want.matches(got))
    }

    /// True when `path` is a strict ancestor of some location the expression can match.
    pub fn matches_parent(&self, path: &Path) -> bool {
        let Some(resolved) = self.resolve() else {
            return false;
        };
        path.len() < resolved.steps.len()
            && resolved
                .steps
                .iter()
                .zip(path.steps())
                .all(|(want, got)| want.matches(got))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            if idx > 0
                && matches!(
                    step,
                    ExpressionStep::AttributeNameExact(_) | ExpressionStep::Parent
                )
            {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_wildcards_and_parent_steps() {
        let expr = Expression::root("test_parent")
            .at_list_index(1)
            .at_name("test_child1")
            .at_parent()
            .at_name("test_child2");
        assert_eq!(expr.to_string(), "test_parent[1].test_child1.<.test_child2");

        assert_eq!(Expression::root("a").at_any_list_index().to_string(), "a[*]");
        assert_eq!(Expression::root("a").at_any_map_key().to_string(), r#"a["*"]"#);
        assert_eq!(
            Expression::root("a").at_any_set_value().to_string(),
            "a[Value(*)]"
        );
        assert_eq!(Expression::root("test").at_parent().at_parent().to_string(), "test.<.<");
    }

    #[test]
    fn resolve_drops_parent_steps() {
        let expr = Expression::root("test_parent")
            .at_list_index(1)
            .at_name("test_child1")
            .at_parent()
            .at_name("test_child2");
        assert_eq!(
            expr.resolve(),
            Some(Expression::root("test_parent").at_list_index(1).at_name("test_child2"))
        );
        assert_eq!(Expression::root("test").at_parent().resolve(), Some(Expression::empty()));
    }

    #[test]
    fn popping_past_root_fails_resolution() {
        let expr = Expression::root("test").at_parent().at_parent().at_name("test_parent");
        assert_eq!(expr.resolve(), None);
        assert!(!expr.matches(&Path::root("test_parent")));
        assert!(!expr.matches_parent(&Path::empty()));
    }

    #[test]
    fn merge_appends_relative_and_replaces_with_root() {
        let base = Path::root("a").at_list_index(0).at_name("b").expression();
        let relative = Expression::relative().at_parent().at_name("c");
        assert_eq!(
            base.merge(&relative).resolve(),
            Some(Expression::root("a").at_list_index(0).at_name("c"))
        );

        let absolute = Expression::root("z");
        assert_eq!(base.merge(&absolute), absolute);
    }

    #[test]
    fn matches_honours_wildcards() {
        let expr = Expression::root("a").at_any_map_key().at_name("b");
        assert!(expr.matches(&Path::root("a").at_map_key("k").at_name("b")));
        assert!(!expr.matches(&Path::root("a").at_list_index(0).at_name("b")));
        assert!(!expr.matches(&Path::root("a").at_map_key("k")));
        assert!(expr.matches_parent(&Path::root("a").at_map_key("k")));
        assert!(expr.matches_parent(&Path::empty()));
        assert!(!expr.matches_parent(&Path::root("a").at_map_key("k").at_name("b")));
    }

    #[test]
    fn path_expression_matches_itself() {
        let path = Path::root("a").at_set_value(Value::string("x")).at_name("b");
        assert!(path.expression().matches(&path));
        assert_eq!(path.expression().to_string(), path.to_string());
    }
}
