//! Definition checks on schemas and request-time validation of configuration.

use std::sync::Arc;

use indexmap::IndexMap;
use log::warn;
use pfw_value::{Path, Value};

use crate::data::Config;
use crate::diag::Diagnostics;
use crate::hooks::{AttributeValidator, ValidateAttributeRequest, ValidateAttributeResponse};
use crate::model::{Attribute, Block, Schema};

const INVALID_DEFINITION: &str = "Invalid Attribute Definition";
const PROVIDER_PROBLEM: &str =
    "This is always a problem with the provider and should be reported to the provider developer.";

/// Checks one attribute's own definition. Stops at the first problem.
pub fn validate_attribute_definition(path: &Path, attribute: &Attribute) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let nested = attribute.defines_attributes().is_some();
    let problem = match (nested, attribute.ty.is_some()) {
        (false, false) => Some("Attribute must have Attributes or Type set."),
        (true, true) => Some("Attribute cannot have both Attributes and Type set."),
        _ if !attribute.required && !attribute.optional && !attribute.computed => {
            Some("Attribute must have Required, Optional, or Computed set.")
        }
        _ if attribute.required && attribute.optional => {
            Some("Attribute cannot be both Required and Optional.")
        }
        _ if attribute.required && attribute.computed => {
            Some("Attribute cannot be both Required and Computed.")
        }
        _ => None,
    };
    if let Some(problem) = problem {
        diags.add_attribute_error(
            path,
            INVALID_DEFINITION,
            format!("{problem} {PROVIDER_PROBLEM}"),
        );
    }
    diags
}

/// Checks every attribute definition in the schema. Each attribute is checked on its own;
/// a broken attribute does not hide problems in its siblings.
///
/// Nested definitions are reported at name-only paths, e.g. `disks.size`.
pub fn validate_definition(schema: &Schema) -> Diagnostics {
    let mut diags = Diagnostics::new();
    definitions_in(&Path::empty(), &schema.attributes, &schema.blocks, &mut diags);
    diags
}

fn definitions_in(
    parent: &Path,
    attributes: &IndexMap<String, Attribute>,
    blocks: &IndexMap<String, Block>,
    diags: &mut Diagnostics,
) {
    for (name, attribute) in attributes {
        let path = parent.at_name(name.as_str());
        if blocks.contains_key(name) {
            diags.add_attribute_error(
                &path,
                INVALID_DEFINITION,
                format!("Attribute and block names must not collide. {PROVIDER_PROBLEM}"),
            );
        }
        let own = validate_attribute_definition(&path, attribute);
        let failed = own.has_error();
        diags.append(own);
        if failed {
            continue;
        }
        if let Some(nested) = attribute.defines_attributes() {
            definitions_in(&path, &nested.attributes, &IndexMap::new(), diags);
        }
    }
    for (name, block) in blocks {
        definitions_in(&parent.at_name(name.as_str()), &block.attributes, &block.blocks, diags);
    }
}

/// Validates the practitioner configuration against the schema and its validators.
pub fn validate_config(config: &Config) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let schema = config.schema();
    if !schema.deprecation_message.is_empty() {
        diags.add_warning("Deprecated", schema.deprecation_message.clone());
    }
    for (name, attribute) in &schema.attributes {
        validate_attribute(config, &Path::root(name.as_str()), attribute, &mut diags);
    }
    for (name, block) in &schema.blocks {
        validate_block(config, &Path::root(name.as_str()), block, &mut diags);
    }
    diags
}

/// Definition check, validators in order, nested attributes, then the deprecation warning.
pub fn validate_attribute(
    config: &Config,
    path: &Path,
    attribute: &Attribute,
    diags: &mut Diagnostics,
) {
    let definition = validate_attribute_definition(path, attribute);
    if definition.has_error() {
        warn!("attribute '{path}' has an invalid definition");
        diags.append(definition);
        return;
    }

    let Some(config_value) = config.attribute_value(path, diags) else {
        return;
    };

    run_validators(config, path, &config_value, &attribute.validators, diags);

    if let Some(nested) = attribute.defines_attributes() {
        for (instance, _) in nested.nesting_mode.instances(path, &config_value) {
            for (name, child) in &nested.attributes {
                validate_attribute(config, &instance.at_name(name.as_str()), child, diags);
            }
        }
    }

    if !attribute.deprecation_message.is_empty() && !config_value.is_null() {
        diags.add_attribute_warning(
            path,
            "Attribute Deprecated",
            attribute.deprecation_message.clone(),
        );
    }
}

pub fn validate_block(config: &Config, path: &Path, block: &Block, diags: &mut Diagnostics) {
    let Some(config_value) = config.attribute_value(path, diags) else {
        return;
    };

    run_validators(config, path, &config_value, &block.validators, diags);

    let mode = block.nesting_mode.as_nesting_mode();
    for (instance, _) in mode.instances(path, &config_value) {
        for (name, attribute) in &block.attributes {
            validate_attribute(config, &instance.at_name(name.as_str()), attribute, diags);
        }
        for (name, nested) in &block.blocks {
            validate_block(config, &instance.at_name(name.as_str()), nested, diags);
        }
    }

    if !block.deprecation_message.is_empty() && !config_value.is_null() {
        diags.add_attribute_warning(path, "Block Deprecated", block.deprecation_message.clone());
    }
}

fn run_validators(
    config: &Config,
    path: &Path,
    config_value: &Value,
    validators: &[Arc<dyn AttributeValidator>],
    diags: &mut Diagnostics,
) {
    for validator in validators {
        let request = ValidateAttributeRequest {
            path,
            path_expression: path.expression(),
            config_value,
            config,
        };
        let mut response = ValidateAttributeResponse::default();
        validator.validate(&request, &mut response);
        diags.append(response.diagnostics.with_default_path(path));
    }
}
