use serde_json::json;

use super::assert_json_schema;
use crate::{
    Attribute, Block, DescriptionKind, ListType, NestedAttributes, NumberType, ProtocolNesting,
    ProtocolSchemaError, Schema, StringType,
};

fn server_schema() -> Schema {
    Schema::new()
        .version(2)
        .description("A server.")
        .attribute("zone", Attribute::of_type(StringType).optional().computed())
        .attribute(
            "name",
            Attribute::of_type(StringType)
                .required()
                .description("plain")
                .markdown_description("*markdown*"),
        )
        .attribute(
            "disks",
            Attribute::nested(
                NestedAttributes::list([("size", Attribute::of_type(NumberType).required())])
                    .min_items(1)
                    .max_items(4),
            )
            .optional(),
        )
        .attribute(
            "tags",
            Attribute::of_type(ListType::of(StringType))
                .optional()
                .sensitive()
                .deprecated("use labels"),
        )
        .block(
            "rule",
            Block::set()
                .attribute("port", Attribute::of_type(NumberType).required())
                .max_items(8),
        )
}

#[test]
fn projection_sorts_members_and_picks_descriptions() {
    let protocol = server_schema().to_protocol().unwrap();
    assert_eq!(protocol.version, 2);

    let names: Vec<&str> = protocol
        .block
        .attributes
        .iter()
        .map(|attr| attr.name.as_str())
        .collect();
    assert_eq!(names, vec!["disks", "name", "tags", "zone"]);

    let name = &protocol.block.attributes[1];
    assert_eq!(name.description, "*markdown*");
    assert_eq!(name.description_kind, DescriptionKind::Markdown);

    let disks = protocol.block.attributes[0].nested_type.as_ref().unwrap();
    assert_eq!(disks.nesting, ProtocolNesting::List);
    assert_eq!((disks.min_items, disks.max_items), (1, 4));

    assert!(protocol.block.attributes[2].deprecated);
    assert_eq!(protocol.block.block_types[0].nesting, ProtocolNesting::Set);
}

#[test]
fn projection_serializes_to_protocol_document() {
    let protocol = server_schema().to_protocol().unwrap();
    let json = serde_json::to_value(&protocol).unwrap();
    assert_json_schema(&json);
    assert_eq!(
        json["block"]["attributes"][2],
        json!({
            "name": "tags",
            "type": ["list", "string"],
            "description_kind": "plain",
            "required": false,
            "optional": true,
            "computed": false,
            "sensitive": true,
            "deprecated": true,
        })
    );
    assert_eq!(
        json["block"]["block_types"][0],
        json!({
            "type_name": "rule",
            "nesting": "set",
            "block": {
                "attributes": [{
                    "name": "port",
                    "type": "number",
                    "description_kind": "plain",
                    "required": true,
                    "optional": false,
                    "computed": false,
                    "sensitive": false,
                }],
                "block_types": [],
                "description_kind": "plain",
            },
            "max_items": 8,
        })
    );
}

#[test]
fn projection_rejects_broken_definitions() {
    assert_eq!(Schema::new().to_protocol().unwrap_err(), ProtocolSchemaError::Empty);

    let schema = Schema::new().attribute("bare", Attribute::default().optional());
    assert_eq!(
        schema.to_protocol().unwrap_err().to_string(),
        "bare: must have Attributes or Type set"
    );

    let schema = Schema::new().attribute("lazy", Attribute::of_type(StringType));
    assert_eq!(
        schema.to_protocol().unwrap_err(),
        ProtocolSchemaError::MissingBehavior {
            path: "lazy".into()
        }
    );
}
