//! Schema model for provider resources plus the request-time machinery built on it: path
//! matching, configuration validation, plan modification, value reconciliation and
//! schema-aware accessors for configuration, plan and state.

mod attr_type;
mod data;
mod diag;
mod hooks;
mod matching;
mod model;
mod normalize;
pub mod plan_modify;
pub mod planmodifiers;
mod protocol;
pub mod validate;

pub use attr_type::{
    AttrType, BoolType, ListType, MapType, NumberType, ObjectType, SetType, StringType,
};
pub use data::{Config, Data, DataDescription, Plan, State};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use hooks::{
    AttributePlanModifier, AttributeValidator, ModifyAttributePlanRequest,
    ModifyAttributePlanResponse, ValidateAttributeRequest, ValidateAttributeResponse,
};
pub use matching::path_matches;
pub use model::*;
pub use normalize::undo_normalization_differences;
pub use plan_modify::{
    ModifySchemaPlanRequest, ModifySchemaPlanResponse, PlanValueError,
    mark_computed_nils_as_unknown, modify_schema_plan, normalize_requires_replace,
};
pub use protocol::{
    DescriptionKind, PROTOCOL_JSON_SCHEMA, ProtocolAttribute, ProtocolBlock, ProtocolNestedBlock,
    ProtocolNesting, ProtocolObject, ProtocolSchema, ProtocolSchemaError,
};
pub use validate::{validate_config, validate_definition};

pub use pfw_value::{Expression, ExpressionStep, Path, PathStep, Value, ValueType};

#[cfg(test)]
mod tests;
