use std::sync::Arc;

use super::{child, child_type, parent_schema, parent_value, parent_value_with};
use crate::{
    Attribute, Config, Diagnostics, Expression, MapType, NestedAttributes, Path, Schema, SetType,
    StringType, Value, ValueType, path_matches,
};

#[test]
fn parent_step_resolves_to_sibling() {
    let expression = Expression::root("test_parent")
        .at_list_index(1)
        .at_name("test_child1")
        .at_parent()
        .at_name("test_child2");
    let (paths, diags) = path_matches(&parent_schema(), &parent_value(), &expression);
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(
        paths,
        vec![Path::root("test_parent").at_list_index(1).at_name("test_child2")]
    );
}

#[test]
fn out_of_range_index_matches_nothing() {
    let expression = Expression::root("test_parent").at_list_index(4);
    let (paths, diags) = path_matches(&parent_schema(), &parent_value(), &expression);
    assert!(paths.is_empty());
    assert_eq!(diags.len(), 1);
    let diag = diags.iter().next().unwrap();
    assert_eq!(diag.summary, "Invalid Path Expression for Schema Data");
    assert!(diag.detail.contains("test_parent[4]"), "{}", diag.detail);
}

#[test]
fn list_wildcard_expands_every_index_in_order() {
    let list = Value::list(
        child_type(),
        vec![child("a", "b"), child("c", "d"), child("e", "f")],
    )
    .unwrap();
    let expression = Expression::root("test_parent").at_any_list_index().at_name("test_child1");
    let (paths, diags) = path_matches(&parent_schema(), &parent_value_with(list), &expression);
    assert!(diags.is_empty());
    let rendered: Vec<String> = paths.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "test_parent[0].test_child1",
            "test_parent[1].test_child1",
            "test_parent[2].test_child1",
        ]
    );
}

#[test]
fn null_container_matches_itself() {
    let value = parent_value_with(Value::null(ValueType::list(child_type())));
    for expression in [
        Expression::root("test_parent").at_any_list_index(),
        Expression::root("test_parent").at_list_index(0).at_name("test_child1"),
    ] {
        let (paths, diags) = path_matches(&parent_schema(), &value, &expression);
        assert!(diags.is_empty(), "{expression}: {diags:?}");
        assert_eq!(paths, vec![Path::root("test_parent")]);
    }
}

#[test]
fn unknown_container_matches_itself() {
    let value = parent_value_with(Value::unknown(ValueType::list(child_type())));
    let expression = Expression::root("test_parent").at_any_list_index().at_name("test_child2");
    let (paths, diags) = path_matches(&parent_schema(), &value, &expression);
    assert!(diags.is_empty());
    assert_eq!(paths, vec![Path::root("test_parent")]);
}

#[test]
fn null_tree_matches_root() {
    let schema = parent_schema();
    let null = Value::null(schema.value_type());
    let (paths, diags) = path_matches(&schema, &null, &Expression::root("test_parent"));
    assert!(diags.is_empty());
    assert_eq!(paths, vec![Path::empty()]);
}

#[test]
fn parent_steps_past_root_are_schema_errors() {
    for expression in [
        Expression::root("test").at_parent(),
        Expression::root("test").at_parent().at_parent(),
        Expression::root("test").at_parent().at_parent().at_name("test_parent"),
    ] {
        let (paths, diags) = path_matches(&parent_schema(), &parent_value(), &expression);
        assert!(paths.is_empty());
        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Invalid Path Expression for Schema");
        assert!(diag.detail.ends_with(&format!("Path Expression: {expression}")));
    }
}

#[test]
fn wildcard_kind_must_fit_nesting_mode() {
    let expression = Expression::root("test_parent").at_any_map_key();
    let (paths, diags) = path_matches(&parent_schema(), &parent_value(), &expression);
    assert!(paths.is_empty());
    assert_eq!(diags.iter().next().unwrap().summary, "Invalid Path Expression for Schema");
}

#[test]
fn map_and_set_wildcards_expand_data() {
    let schema = Arc::new(
        Schema::new()
            .attribute("labels", Attribute::of_type(MapType::of(StringType)).optional())
            .attribute("ids", Attribute::of_type(SetType::of(StringType)).optional())
            .attribute(
                "rules",
                Attribute::nested(NestedAttributes::map([(
                    "port",
                    Attribute::of_type(StringType).required(),
                )]))
                .optional(),
            ),
    );
    let rule_ty = ValueType::object([("port", ValueType::String)]);
    let value = Value::object(
        schema.value_type(),
        [
            (
                "labels",
                Value::map(
                    ValueType::String,
                    [("b", Value::string("2")), ("a", Value::string("1"))],
                )
                .unwrap(),
            ),
            (
                "ids",
                Value::set(ValueType::String, vec![Value::string("x"), Value::string("y")])
                    .unwrap(),
            ),
            (
                "rules",
                Value::map(
                    rule_ty,
                    [("web", Value::object_from([("port", Value::string("80"))]))],
                )
                .unwrap(),
            ),
        ],
    )
    .unwrap();

    let config = Config::new(schema, value);
    let mut diags = Diagnostics::new();

    let labels = config.path_matches(&Expression::root("labels").at_any_map_key(), &mut diags);
    assert_eq!(
        labels,
        vec![Path::root("labels").at_map_key("a"), Path::root("labels").at_map_key("b")]
    );

    let ids = config.path_matches(&Expression::root("ids").at_any_set_value(), &mut diags);
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&Path::root("ids").at_set_value(Value::string("y"))));

    let ports = config.path_matches(
        &Expression::root("rules").at_any_map_key().at_name("port"),
        &mut diags,
    );
    assert_eq!(ports, vec![Path::root("rules").at_map_key("web").at_name("port")]);
    assert!(diags.is_empty());
}

#[test]
fn parent_steps_resolve_before_expansion() {
    let expression = Expression::root("test_parent")
        .at_any_list_index()
        .at_name("test_child1")
        .at_parent()
        .at_parent();
    let (paths, diags) = path_matches(&parent_schema(), &parent_value(), &expression);
    assert!(diags.is_empty());
    assert_eq!(paths, vec![Path::root("test_parent")]);
}
