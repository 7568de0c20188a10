//! Projection of a [`Schema`] into the boundary-protocol schema representation.

use indexmap::IndexMap;
use pfw_value::{Path, ValueType};
use serde::Serialize;
use thiserror::Error;

use crate::model::{Attribute, Block, BlockNestingMode, NestedAttributes, NestingMode, Schema};

/// JSON Schema every serialized [`ProtocolSchema`] conforms to.
pub const PROTOCOL_JSON_SCHEMA: &str = include_str!("../schemas/protocol-schema.schema.json");

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolSchema {
    pub version: i64,
    pub block: ProtocolBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolBlock {
    pub attributes: Vec<ProtocolAttribute>,
    pub block_types: Vec<ProtocolNestedBlock>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub description_kind: DescriptionKind,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolAttribute {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<ValueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested_type: Option<ProtocolObject>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub description_kind: DescriptionKind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolObject {
    pub nesting: ProtocolNesting,
    pub attributes: Vec<ProtocolAttribute>,
    #[serde(skip_serializing_if = "is_zero")]
    pub min_items: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_items: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolNestedBlock {
    pub type_name: String,
    pub nesting: ProtocolNesting,
    pub block: ProtocolBlock,
    #[serde(skip_serializing_if = "is_zero")]
    pub min_items: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_items: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolNesting {
    Single,
    List,
    Set,
    Map,
}

impl From<NestingMode> for ProtocolNesting {
    fn from(mode: NestingMode) -> Self {
        match mode {
            NestingMode::Single => ProtocolNesting::Single,
            NestingMode::List => ProtocolNesting::List,
            NestingMode::Set => ProtocolNesting::Set,
            NestingMode::Map => ProtocolNesting::Map,
        }
    }
}

impl From<BlockNestingMode> for ProtocolNesting {
    fn from(mode: BlockNestingMode) -> Self {
        mode.as_nesting_mode().into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionKind {
    Plain,
    Markdown,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolSchemaError {
    #[error("schema must have at least one attribute or block")]
    Empty,
    #[error("{path}: must have Attributes or Type set")]
    MissingType { path: String },
    #[error("{path}: cannot have both Attributes and Type set")]
    ConflictingType { path: String },
    #[error("{path}: must have Required, Optional, or Computed set")]
    MissingBehavior { path: String },
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Markdown wins over plain text when both are present.
fn description(plain: &str, markdown: &str) -> (String, DescriptionKind) {
    if markdown.is_empty() {
        (plain.to_string(), DescriptionKind::Plain)
    } else {
        (markdown.to_string(), DescriptionKind::Markdown)
    }
}

impl Schema {
    pub fn to_protocol(&self) -> Result<ProtocolSchema, ProtocolSchemaError> {
        if self.attributes.is_empty() && self.blocks.is_empty() {
            return Err(ProtocolSchemaError::Empty);
        }
        let (description, description_kind) =
            description(&self.description, &self.markdown_description);
        Ok(ProtocolSchema {
            version: self.version,
            block: ProtocolBlock {
                attributes: protocol_attributes(&Path::empty(), &self.attributes)?,
                block_types: protocol_blocks(&Path::empty(), &self.blocks)?,
                description,
                description_kind,
                deprecated: !self.deprecation_message.is_empty(),
            },
        })
    }
}

fn sorted<T>(items: &IndexMap<String, T>) -> Vec<(&String, &T)> {
    let mut items: Vec<_> = items.iter().collect();
    items.sort_by(|(a, _), (b, _)| a.cmp(b));
    items
}

fn protocol_attributes(
    parent: &Path,
    attributes: &IndexMap<String, Attribute>,
) -> Result<Vec<ProtocolAttribute>, ProtocolSchemaError> {
    sorted(attributes)
        .into_iter()
        .map(|(name, attribute)| {
            protocol_attribute(&parent.at_name(name.as_str()), name, attribute)
        })
        .collect()
}

fn protocol_attribute(
    path: &Path,
    name: &str,
    attribute: &Attribute,
) -> Result<ProtocolAttribute, ProtocolSchemaError> {
    let nested = attribute.defines_attributes();
    let (ty, nested_type) = match (&attribute.ty, nested) {
        (None, None) => {
            return Err(ProtocolSchemaError::MissingType {
                path: path.to_string(),
            });
        }
        (Some(_), Some(_)) => {
            return Err(ProtocolSchemaError::ConflictingType {
                path: path.to_string(),
            });
        }
        (Some(ty), None) => (Some(ty.value_type()), None),
        (None, Some(nested)) => (None, Some(protocol_object(path, nested)?)),
    };
    if !attribute.required && !attribute.optional && !attribute.computed {
        return Err(ProtocolSchemaError::MissingBehavior {
            path: path.to_string(),
        });
    }
    let (description, description_kind) =
        description(&attribute.description, &attribute.markdown_description);
    Ok(ProtocolAttribute {
        name: name.to_string(),
        ty,
        nested_type,
        description,
        description_kind,
        required: attribute.required,
        optional: attribute.optional,
        computed: attribute.computed,
        sensitive: attribute.sensitive,
        deprecated: !attribute.deprecation_message.is_empty(),
    })
}

fn protocol_object(
    path: &Path,
    nested: &NestedAttributes,
) -> Result<ProtocolObject, ProtocolSchemaError> {
    let counted = matches!(
        nested.nesting_mode,
        NestingMode::List | NestingMode::Set | NestingMode::Map
    );
    Ok(ProtocolObject {
        nesting: nested.nesting_mode.into(),
        attributes: protocol_attributes(path, &nested.attributes)?,
        min_items: if counted { nested.min_items } else { 0 },
        max_items: if counted { nested.max_items } else { 0 },
    })
}

fn protocol_blocks(
    parent: &Path,
    blocks: &IndexMap<String, Block>,
) -> Result<Vec<ProtocolNestedBlock>, ProtocolSchemaError> {
    sorted(blocks)
        .into_iter()
        .map(|(name, block)| -> Result<ProtocolNestedBlock, ProtocolSchemaError> {
            let path = parent.at_name(name.as_str());
            let (description, description_kind) =
                description(&block.description, &block.markdown_description);
            Ok(ProtocolNestedBlock {
                type_name: name.clone(),
                nesting: block.nesting_mode.into(),
                block: ProtocolBlock {
                    attributes: protocol_attributes(&path, &block.attributes)?,
                    block_types: protocol_blocks(&path, &block.blocks)?,
                    description,
                    description_kind,
                    deprecated: !block.deprecation_message.is_empty(),
                },
                min_items: block.min_items,
                max_items: block.max_items,
            })
        })
        .collect()
}
