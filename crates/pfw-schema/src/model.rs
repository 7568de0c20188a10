use std::sync::Arc;

use indexmap::IndexMap;
use pfw_value::{
    Expression, ExpressionStep, Path, PathStep, Value, ValueError, ValueRepr, ValueType,
};
use thiserror::Error;

use crate::attr_type::{AttrType, ListType, MapType, ObjectType, SetType};
use crate::hooks::{AttributePlanModifier, AttributeValidator};

/// Leaf-or-branch schema node. Its name lives in the parent map.
///
/// Exactly one of `ty` and `attributes` should be set and at least one of `required`,
/// `optional` and `computed`. Construction does not enforce this; see
/// [`crate::validate_definition`].
#[derive(Debug, Clone, Default)]
pub struct Attribute {
    pub ty: Option<Arc<dyn AttrType>>,
    pub attributes: Option<NestedAttributes>,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Presentation hint only.
    pub sensitive: bool,
    pub description: String,
    pub markdown_description: String,
    /// Non-empty marks the attribute deprecated.
    pub deprecation_message: String,
    pub validators: Vec<Arc<dyn AttributeValidator>>,
    pub plan_modifiers: Vec<Arc<dyn AttributePlanModifier>>,
}

impl Attribute {
    pub fn of_type(ty: impl AttrType + 'static) -> Self {
        Self {
            ty: Some(Arc::new(ty)),
            ..Self::default()
        }
    }

    pub fn nested(attributes: NestedAttributes) -> Self {
        Self {
            attributes: Some(attributes),
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn markdown_description(mut self, text: impl Into<String>) -> Self {
        self.markdown_description = text.into();
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecation_message = message.into();
        self
    }

    pub fn validator(mut self, validator: impl AttributeValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: impl AttributePlanModifier + 'static) -> Self {
        self.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Nested group, counting an empty one as unset.
    pub fn defines_attributes(&self) -> Option<&NestedAttributes> {
        self.attributes
            .as_ref()
            .filter(|nested| !nested.attributes.is_empty())
    }

    /// Leaf type verbatim, or the projection of the nested group. An attribute with neither
    /// projects to an empty object.
    pub fn attr_type(&self) -> Arc<dyn AttrType> {
        if let Some(nested) = self.defines_attributes() {
            return nested.attr_type();
        }
        match &self.ty {
            Some(ty) => ty.clone(),
            None => Arc::new(ObjectType::default()),
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.attr_type().value_type()
    }
}

/// How a nested attribute group repeats inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    Single,
    List,
    Set,
    Map,
}

impl NestingMode {
    /// Wraps the object type of one instance into the container shape of this mode.
    pub(crate) fn wrap(self, object: ObjectType) -> Arc<dyn AttrType> {
        match self {
            NestingMode::Single => Arc::new(object),
            NestingMode::List => Arc::new(ListType::of(object)),
            NestingMode::Set => Arc::new(SetType::of(object)),
            NestingMode::Map => Arc::new(MapType::of(object)),
        }
    }

    /// Whether `step` descends from the container into one instance. Single nesting has no
    /// instance step; names apply directly.
    pub(crate) fn accepts_element_step(self, step: &PathStep) -> bool {
        matches!(
            (self, step),
            (NestingMode::List, PathStep::ElementKeyInt(_))
                | (NestingMode::Set, PathStep::ElementKeyValue(_))
                | (NestingMode::Map, PathStep::ElementKeyString(_))
        )
    }

    /// Concrete child paths of every known instance in `value`, paired with the instance.
    /// Single nesting yields the container itself.
    pub(crate) fn instances<'v>(self, path: &Path, value: &'v Value) -> Vec<(Path, &'v Value)> {
        if value.is_null() || value.is_unknown() {
            return Vec::new();
        }
        match self {
            NestingMode::Single => vec![(path.clone(), value)],
            NestingMode::List => value
                .elements()
                .unwrap_or_default()
                .iter()
                .enumerate()
                .map(|(idx, item)| (path.at_list_index(idx as i64), item))
                .collect(),
            NestingMode::Set => value
                .elements()
                .unwrap_or_default()
                .iter()
                .map(|item| (path.at_set_value(item.clone()), item))
                .collect(),
            NestingMode::Map => value
                .entries()
                .map(|entries| {
                    entries
                        .iter()
                        .map(|(key, item)| (path.at_map_key(key.as_str()), item))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Rebuilds `value` with every instance replaced by `f`, addressing instances the same
    /// way as [`NestingMode::instances`]. Null and unknown containers pass through.
    pub(crate) fn map_instances<F>(
        self,
        path: &Path,
        value: Value,
        mut f: F,
    ) -> Result<Value, ValueError>
    where
        F: FnMut(&Path, Value) -> Value,
    {
        if value.is_null() || value.is_unknown() {
            return Ok(value);
        }
        if self == NestingMode::Single {
            return Ok(f(path, value));
        }
        let (ty, repr) = value.into_parts();
        let repr = match repr {
            ValueRepr::List(items) => ValueRepr::List(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| f(&path.at_list_index(idx as i64), item))
                    .collect(),
            ),
            ValueRepr::Set(items) => ValueRepr::Set(
                items
                    .into_iter()
                    .map(|item| {
                        let item_path = path.at_set_value(item.clone());
                        f(&item_path, item)
                    })
                    .collect(),
            ),
            ValueRepr::Map(entries) => ValueRepr::Map(
                entries
                    .into_iter()
                    .map(|(key, item)| {
                        let item = f(&path.at_map_key(key.as_str()), item);
                        (key, item)
                    })
                    .collect(),
            ),
            other => other,
        };
        Value::from_parts(ty, repr)
    }
}

/// Named child attributes repeated according to a [`NestingMode`].
#[derive(Debug, Clone)]
pub struct NestedAttributes {
    pub nesting_mode: NestingMode,
    pub attributes: IndexMap<String, Attribute>,
    /// Surfaced to the host only; List, Set and Map nesting.
    pub min_items: u64,
    pub max_items: u64,
}

impl NestedAttributes {
    pub fn new(
        nesting_mode: NestingMode,
        attributes: impl IntoIterator<Item = (impl Into<String>, Attribute)>,
    ) -> Self {
        Self {
            nesting_mode,
            attributes: named(attributes),
            min_items: 0,
            max_items: 0,
        }
    }

    pub fn single(attributes: impl IntoIterator<Item = (impl Into<String>, Attribute)>) -> Self {
        Self::new(NestingMode::Single, attributes)
    }

    pub fn list(attributes: impl IntoIterator<Item = (impl Into<String>, Attribute)>) -> Self {
        Self::new(NestingMode::List, attributes)
    }

    pub fn set(attributes: impl IntoIterator<Item = (impl Into<String>, Attribute)>) -> Self {
        Self::new(NestingMode::Set, attributes)
    }

    pub fn map(attributes: impl IntoIterator<Item = (impl Into<String>, Attribute)>) -> Self {
        Self::new(NestingMode::Map, attributes)
    }

    pub fn min_items(mut self, min: u64) -> Self {
        self.min_items = min;
        self
    }

    pub fn max_items(mut self, max: u64) -> Self {
        self.max_items = max;
        self
    }

    /// Object type of a single instance.
    pub fn object_type(&self) -> ObjectType {
        ObjectType::new(
            self.attributes
                .iter()
                .map(|(name, attr)| (name.as_str(), attr.attr_type())),
        )
    }

    pub fn attr_type(&self) -> Arc<dyn AttrType> {
        self.nesting_mode.wrap(self.object_type())
    }
}

/// Legacy block nesting; blocks only repeat as lists or sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockNestingMode {
    List,
    Set,
}

impl BlockNestingMode {
    pub(crate) fn as_nesting_mode(self) -> NestingMode {
        match self {
            BlockNestingMode::List => NestingMode::List,
            BlockNestingMode::Set => NestingMode::Set,
        }
    }
}

/// Block-syntax sibling of [`Attribute`], looked up through its own namespace.
#[derive(Debug, Clone)]
pub struct Block {
    pub attributes: IndexMap<String, Attribute>,
    pub blocks: IndexMap<String, Block>,
    pub nesting_mode: BlockNestingMode,
    pub min_items: u64,
    pub max_items: u64,
    pub description: String,
    pub markdown_description: String,
    pub deprecation_message: String,
    pub validators: Vec<Arc<dyn AttributeValidator>>,
    pub plan_modifiers: Vec<Arc<dyn AttributePlanModifier>>,
}

impl Block {
    pub fn new(nesting_mode: BlockNestingMode) -> Self {
        Self {
            attributes: IndexMap::new(),
            blocks: IndexMap::new(),
            nesting_mode,
            min_items: 0,
            max_items: 0,
            description: String::new(),
            markdown_description: String::new(),
            deprecation_message: String::new(),
            validators: Vec::new(),
            plan_modifiers: Vec::new(),
        }
    }

    pub fn list() -> Self {
        Self::new(BlockNestingMode::List)
    }

    pub fn set() -> Self {
        Self::new(BlockNestingMode::Set)
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn block(mut self, name: impl Into<String>, block: Block) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    pub fn min_items(mut self, min: u64) -> Self {
        self.min_items = min;
        self
    }

    pub fn max_items(mut self, max: u64) -> Self {
        self.max_items = max;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecation_message = message.into();
        self
    }

    pub fn validator(mut self, validator: impl AttributeValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: impl AttributePlanModifier + 'static) -> Self {
        self.plan_modifiers.push(Arc::new(modifier));
        self
    }

    pub fn object_type(&self) -> ObjectType {
        members_type(&self.attributes, &self.blocks)
    }

    pub fn attr_type(&self) -> Arc<dyn AttrType> {
        self.nesting_mode.as_nesting_mode().wrap(self.object_type())
    }
}

/// Root of a resource, data source or provider schema. Built once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub attributes: IndexMap<String, Attribute>,
    pub blocks: IndexMap<String, Block>,
    /// Consumed by state upgrades.
    pub version: i64,
    pub description: String,
    pub markdown_description: String,
    pub deprecation_message: String,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn block(mut self, name: impl Into<String>, block: Block) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn markdown_description(mut self, text: impl Into<String>) -> Self {
        self.markdown_description = text.into();
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecation_message = message.into();
        self
    }

    pub fn object_type(&self) -> ObjectType {
        members_type(&self.attributes, &self.blocks)
    }

    pub fn attr_type(&self) -> Arc<dyn AttrType> {
        Arc::new(self.object_type())
    }

    pub fn value_type(&self) -> ValueType {
        self.object_type().value_type()
    }

    pub(crate) fn root_node(&self) -> SchemaNode<'_> {
        SchemaNode::Object {
            attributes: &self.attributes,
            blocks: Some(&self.blocks),
        }
    }

    /// Walks `path` through the schema alone.
    pub fn node_at_path(&self, path: &Path) -> Result<SchemaNode<'_>, SchemaPathError> {
        let mut node = self.root_node();
        for (idx, step) in path.steps().iter().enumerate() {
            node = match node.apply_step(step) {
                Some(next) => next,
                None => {
                    let at = Path::from_steps(path.steps()[..idx].to_vec()).to_string();
                    return Err(match (&node, step) {
                        (SchemaNode::Object { .. }, PathStep::AttributeName(name)) => {
                            SchemaPathError::NoSuchAttribute {
                                name: name.clone(),
                                path: at,
                            }
                        }
                        _ => SchemaPathError::InvalidStep {
                            step: step.to_string(),
                            target: node.kind(),
                            path: at,
                        },
                    });
                }
            };
        }
        Ok(node)
    }

    /// Attribute definition at an exact path.
    pub fn attribute_at_path(&self, path: &Path) -> Result<&Attribute, SchemaPathError> {
        match self.node_at_path(path)? {
            SchemaNode::Attribute(attribute) => Ok(attribute),
            SchemaNode::Block(_) => Err(SchemaPathError::IsBlock),
            SchemaNode::Type(_) => Err(SchemaPathError::InsideAtomicAttribute),
            SchemaNode::Object { .. } => Err(SchemaPathError::NotAnAttribute {
                path: path.to_string(),
            }),
        }
    }

    /// Block definition at an exact path.
    pub fn block_at_path(&self, path: &Path) -> Result<&Block, SchemaPathError> {
        match self.node_at_path(path)? {
            SchemaNode::Block(block) => Ok(block),
            SchemaNode::Type(_) => Err(SchemaPathError::InsideAtomicAttribute),
            _ => Err(SchemaPathError::NotABlock {
                path: path.to_string(),
            }),
        }
    }

    /// Type of whatever `path` addresses, including locations inside atomic attributes.
    pub fn attr_type_at_path(&self, path: &Path) -> Result<Arc<dyn AttrType>, SchemaPathError> {
        Ok(self.node_at_path(path)?.attr_type())
    }

    /// Whether the expression can address anything under this schema, ignoring data.
    pub fn valid_path_expression(&self, expression: &Expression) -> bool {
        let Some(resolved) = expression.resolve().filter(|resolved| !resolved.is_empty()) else {
            return false;
        };
        let mut node = self.root_node();
        for step in resolved.steps() {
            match node.apply_expression_step(step) {
                Some(next) => node = next,
                None => return false,
            }
        }
        true
    }
}

fn members_type(
    attributes: &IndexMap<String, Attribute>,
    blocks: &IndexMap<String, Block>,
) -> ObjectType {
    ObjectType::new(
        attributes
            .iter()
            .map(|(name, attr)| (name.as_str(), attr.attr_type()))
            .chain(
                blocks
                    .iter()
                    .map(|(name, block)| (name.as_str(), block.attr_type())),
            ),
    )
}

pub(crate) fn named<T>(
    items: impl IntoIterator<Item = (impl Into<String>, T)>,
) -> IndexMap<String, T> {
    items
        .into_iter()
        .map(|(name, item)| (name.into(), item))
        .collect()
}

/// Position reached while stepping a path through a schema.
#[derive(Debug, Clone)]
pub enum SchemaNode<'a> {
    /// Attribute/block namespace: the schema root, one nested-attribute instance, or one
    /// block instance.
    Object {
        attributes: &'a IndexMap<String, Attribute>,
        blocks: Option<&'a IndexMap<String, Block>>,
    },
    Attribute(&'a Attribute),
    Block(&'a Block),
    /// Inside an atomic attribute, where only the type is known.
    Type(Arc<dyn AttrType>),
}

impl<'a> SchemaNode<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaNode::Object { .. } => "object",
            SchemaNode::Attribute(_) => "attribute",
            SchemaNode::Block(_) => "block",
            SchemaNode::Type(_) => "type",
        }
    }

    /// Applies one step; `None` when the step kind does not fit this node.
    pub fn apply_step(&self, step: &PathStep) -> Option<SchemaNode<'a>> {
        match self {
            SchemaNode::Object { attributes, blocks } => {
                let PathStep::AttributeName(name) = step else {
                    return None;
                };
                if let Some(attribute) = attributes.get(name) {
                    return Some(SchemaNode::Attribute(attribute));
                }
                blocks
                    .and_then(|blocks| blocks.get(name))
                    .map(SchemaNode::Block)
            }
            SchemaNode::Attribute(attribute) => match attribute.defines_attributes() {
                Some(nested) => {
                    let instance = SchemaNode::Object {
                        attributes: &nested.attributes,
                        blocks: None,
                    };
                    match nested.nesting_mode {
                        NestingMode::Single => instance.apply_step(step),
                        mode if mode.accepts_element_step(step) => Some(instance),
                        _ => None,
                    }
                }
                None => attribute
                    .ty
                    .as_ref()
                    .and_then(|ty| ty.element_type(step))
                    .map(SchemaNode::Type),
            },
            SchemaNode::Block(block) => block
                .nesting_mode
                .as_nesting_mode()
                .accepts_element_step(step)
                .then_some(SchemaNode::Object {
                    attributes: &block.attributes,
                    blocks: Some(&block.blocks),
                }),
            SchemaNode::Type(ty) => ty.element_type(step).map(SchemaNode::Type),
        }
    }

    /// Applies one resolved expression step; wildcards step like any key of their kind.
    pub fn apply_expression_step(&self, step: &ExpressionStep) -> Option<SchemaNode<'a>> {
        let representative = match step {
            ExpressionStep::ElementKeyIntAny => PathStep::ElementKeyInt(0),
            ExpressionStep::ElementKeyStringAny => PathStep::ElementKeyString(String::new()),
            ExpressionStep::ElementKeyValueAny => {
                PathStep::ElementKeyValue(Value::null(ValueType::Bool))
            }
            ExpressionStep::Parent => return None,
            exact => exact.exact()?,
        };
        self.apply_step(&representative)
    }

    pub fn attr_type(&self) -> Arc<dyn AttrType> {
        match self {
            SchemaNode::Object { attributes, blocks } => {
                let empty = IndexMap::new();
                Arc::new(members_type(attributes, blocks.unwrap_or(&empty)))
            }
            SchemaNode::Attribute(attribute) => attribute.attr_type(),
            SchemaNode::Block(block) => block.attr_type(),
            SchemaNode::Type(ty) => ty.clone(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaPathError {
    #[error(
        "path leads to element or attribute of an attribute that has no schema associated with it"
    )]
    InsideAtomicAttribute,
    #[error("path leads to a block, not an attribute")]
    IsBlock,
    #[error("path {path} leads to an object instance, not an attribute")]
    NotAnAttribute { path: String },
    #[error("path {path} does not lead to a block")]
    NotABlock { path: String },
    #[error("no attribute or block named '{name}' at '{path}'")]
    NoSuchAttribute { name: String, path: String },
    #[error("cannot apply step {step} to {target} at '{path}'")]
    InvalidStep {
        step: String,
        target: &'static str,
        path: String,
    },
}
