use crate::path::Path;
use crate::value::{Value, ValueError, ValueRepr};

impl Value {
    /// Visits every node in pre-order. Returning `false` from `visit` skips that node's
    /// children.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&Path, &Value) -> bool,
    {
        walk_node(&Path::empty(), self, &mut visit);
    }

    /// Rebuilds the tree bottom-up: children are transformed before their container, and
    /// `f` sees each container after its children were replaced.
    pub fn transform<F, E>(self, mut f: F) -> Result<Value, E>
    where
        F: FnMut(&Path, Value) -> Result<Value, E>,
        E: From<ValueError>,
    {
        transform_node(&Path::empty(), self, &mut f, Order::BottomUp)
    }

    /// Rebuilds the tree top-down: `f` sees each node before its children, and descent
    /// continues into whatever `f` returned.
    pub fn transform_top_down<F, E>(self, mut f: F) -> Result<Value, E>
    where
        F: FnMut(&Path, Value) -> Result<Value, E>,
        E: From<ValueError>,
    {
        transform_node(&Path::empty(), self, &mut f, Order::TopDown)
    }
}

#[derive(Clone, Copy)]
enum Order {
    BottomUp,
    TopDown,
}

fn walk_node<F>(path: &Path, value: &Value, visit: &mut F)
where
    F: FnMut(&Path, &Value) -> bool,
{
    if !visit(path, value) {
        return;
    }
    match value.repr() {
        ValueRepr::List(items) => {
            for (idx, item) in items.iter().enumerate() {
                walk_node(&path.at_list_index(idx as i64), item, visit);
            }
        }
        ValueRepr::Set(items) => {
            for item in items {
                walk_node(&path.at_set_value(item.clone()), item, visit);
            }
        }
        ValueRepr::Map(entries) => {
            for (key, item) in entries {
                walk_node(&path.at_map_key(key.as_str()), item, visit);
            }
        }
        ValueRepr::Object(fields) => {
            for (name, item) in fields {
                walk_node(&path.at_name(name.as_str()), item, visit);
            }
        }
        _ => {}
    }
}

fn transform_node<F, E>(path: &Path, value: Value, f: &mut F, order: Order) -> Result<Value, E>
where
    F: FnMut(&Path, Value) -> Result<Value, E>,
    E: From<ValueError>,
{
    let value = match order {
        Order::TopDown => f(path, value)?,
        Order::BottomUp => value,
    };
    let (ty, repr) = value.into_parts();
    let repr = match repr {
        ValueRepr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.into_iter().enumerate() {
                out.push(transform_node(&path.at_list_index(idx as i64), item, f, order)?);
            }
            ValueRepr::List(out)
        }
        ValueRepr::Set(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let item_path = path.at_set_value(item.clone());
                out.push(transform_node(&item_path, item, f, order)?);
            }
            ValueRepr::Set(out)
        }
        ValueRepr::Map(entries) => {
            let mut out = std::collections::BTreeMap::new();
            for (key, item) in entries {
                let item = transform_node(&path.at_map_key(key.as_str()), item, f, order)?;
                out.insert(key, item);
            }
            ValueRepr::Map(out)
        }
        ValueRepr::Object(fields) => {
            let mut out = std::collections::BTreeMap::new();
            for (name, item) in fields {
                let item = transform_node(&path.at_name(name.as_str()), item, f, order)?;
                out.insert(name, item);
            }
            ValueRepr::Object(out)
        }
        other => other,
    };
    let rebuilt = Value::from_parts(ty, repr)?;
    match order {
        Order::BottomUp => f(path, rebuilt),
        Order::TopDown => Ok(rebuilt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn sample() -> Value {
        Value::object_from([
            ("name", Value::string("a")),
            (
                "tags",
                Value::set(
                    ValueType::String,
                    vec![Value::string("x"), Value::string("y")],
                )
                .unwrap(),
            ),
        ])
    }

    #[test]
    fn walk_visits_in_pre_order() {
        let mut seen = Vec::new();
        sample().walk(|path, _| {
            seen.push(path.to_string());
            true
        });
        assert_eq!(
            seen,
            vec![
                "",
                "name",
                "tags",
                r#"tags[Value("x")]"#,
                r#"tags[Value("y")]"#
            ]
        );
    }

    #[test]
    fn walk_can_skip_children() {
        let mut seen = Vec::new();
        sample().walk(|path, _| {
            seen.push(path.to_string());
            path.is_empty()
        });
        assert_eq!(seen, vec!["", "name", "tags"]);
    }

    #[test]
    fn transform_replaces_addressed_leaf() {
        let target = Path::root("name");
        let out = sample()
            .transform(|path, value| -> Result<Value, ValueError> {
                if path == &target {
                    Ok(Value::string("b"))
                } else {
                    Ok(value)
                }
            })
            .unwrap();
        assert_eq!(out.value_at_path(&target).unwrap(), &Value::string("b"));
    }

    #[test]
    fn transform_collapses_set_elements_made_equal() {
        let out = sample()
            .transform(|path, value| -> Result<Value, ValueError> {
                if path.len() == 2 {
                    Ok(Value::string("same"))
                } else {
                    Ok(value)
                }
            })
            .unwrap();
        let tags = out.value_at_path(&Path::root("tags")).unwrap();
        assert_eq!(tags.elements().unwrap().len(), 1);
    }

    #[test]
    fn transform_rejects_type_changes() {
        let err = sample()
            .transform(|path, value| -> Result<Value, ValueError> {
                if path == &Path::root("name") {
                    Ok(Value::bool(true))
                } else {
                    Ok(value)
                }
            })
            .unwrap_err();
        assert!(matches!(err, ValueError::TypeMismatch { .. }));
    }

    #[test]
    fn top_down_descends_into_replacement() {
        let mut visited = Vec::new();
        let replacement = Value::object_from([("inner", Value::string("z"))]);
        let value = Value::object_from([("outer", Value::null(replacement.ty().clone()))]);
        let out = value
            .transform_top_down(|path, value| -> Result<Value, ValueError> {
                visited.push(path.to_string());
                if path == &Path::root("outer") {
                    Ok(replacement.clone())
                } else {
                    Ok(value)
                }
            })
            .unwrap();
        assert_eq!(visited, vec!["", "outer", "outer.inner"]);
        assert_eq!(
            out.value_at_path(&Path::root("outer").at_name("inner")).unwrap(),
            &Value::string("z")
        );
    }
}
