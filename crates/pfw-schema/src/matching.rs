//! Expansion of path expressions into the concrete paths present in a value tree.

use log::debug;
use pfw_value::{Expression, ExpressionStep, Path, Value, ValueRepr};

use crate::diag::Diagnostics;
use crate::model::Schema;

/// Concrete paths in `root` matched by `expression`, in data order and without duplicates.
///
/// The expression is checked against the schema before any data is read. Descent stops at
/// null or unknown values with steps still left, matching the path reached so far. An
/// expression that matches nothing yields exactly one error naming the expression.
pub fn path_matches(
    schema: &Schema,
    root: &Value,
    expression: &Expression,
) -> (Vec<Path>, Diagnostics) {
    let mut diags = Diagnostics::new();
    let resolved = match expression.resolve() {
        Some(resolved) if schema.valid_path_expression(expression) => resolved,
        _ => {
            diags.add_error(
                "Invalid Path Expression for Schema",
                format!(
                    "The provider unexpectedly provided a path expression that does not match \
                     the current schema. This can happen if the path expression does not \
                     correctly follow the schema in structure or types. Please report this to \
                     the provider developers.\n\nPath Expression: {expression}"
                ),
            );
            return (Vec::new(), diags);
        }
    };

    let mut matches = Vec::new();
    descend(root, Path::empty(), resolved.steps(), &mut matches);

    let mut unique: Vec<Path> = Vec::with_capacity(matches.len());
    for path in matches {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }

    if unique.is_empty() {
        diags.add_error(
            "Invalid Path Expression for Schema Data",
            format!(
                "The provider unexpectedly matched no paths with the given path expression and \
                 current schema data. This can happen if the path expression does not match any \
                 paths or the schema data. Please report this to the provider developers.\n\n\
                 Path Expression: {expression}"
            ),
        );
    }
    (unique, diags)
}

fn descend(value: &Value, path: Path, steps: &[ExpressionStep], out: &mut Vec<Path>) {
    let Some((step, rest)) = steps.split_first() else {
        out.push(path);
        return;
    };

    if value.is_null() || value.is_unknown() {
        debug!("stopping expression descent at {} value '{path}'", value.kind());
        out.push(path);
        return;
    }

    if let Some(exact) = step.exact() {
        match value.apply_step(&exact) {
            Ok(child) => descend(child, path.at_step(exact), rest, out),
            Err(err) => debug!("no match below '{path}': {err}"),
        }
        return;
    }

    match (step, value.repr()) {
        (ExpressionStep::ElementKeyIntAny, ValueRepr::List(items)) => {
            for (idx, item) in items.iter().enumerate() {
                descend(item, path.at_list_index(idx as i64), rest, out);
            }
        }
        (ExpressionStep::ElementKeyStringAny, ValueRepr::Map(entries)) => {
            for (key, item) in entries {
                descend(item, path.at_map_key(key.as_str()), rest, out);
            }
        }
        (ExpressionStep::ElementKeyValueAny, ValueRepr::Set(items)) => {
            for item in items {
                descend(item, path.at_set_value(item.clone()), rest, out);
            }
        }
        (step, _) => debug!(
            "wildcard {step} does not apply to {} at '{path}'",
            value.kind()
        ),
    }
}
