//! Runs attribute plan modifiers over a proposed plan and post-processes the result.

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};
use pfw_value::{Path, Value, ValueError, ValueRepr};
use thiserror::Error;

use crate::attr_type::AttrType;
use crate::data::{Config, Plan, State};
use crate::diag::{Diagnostics, provider_bug};
use crate::hooks::{AttributePlanModifier, ModifyAttributePlanRequest, ModifyAttributePlanResponse};
use crate::model::{Attribute, Block, NestingMode, Schema, SchemaPathError};

#[derive(Debug, Clone)]
pub struct ModifySchemaPlanRequest {
    pub config: Config,
    pub state: State,
    pub plan: Plan,
}

#[derive(Debug, Clone)]
pub struct ModifySchemaPlanResponse {
    pub plan: Plan,
    /// Attribute paths whose change forces replacement, in discovery order.
    pub requires_replace: Vec<Path>,
    pub diagnostics: Diagnostics,
}

/// Applies every attribute's and block's plan modifiers, parents before their nested
/// attributes. Modifiers see the plan as proposed; the modified values are written back once
/// the walk finishes. A null plan (destroy) is returned untouched.
pub fn modify_schema_plan(request: ModifySchemaPlanRequest) -> ModifySchemaPlanResponse {
    let ModifySchemaPlanRequest {
        config,
        state,
        mut plan,
    } = request;
    if plan.raw().is_null() {
        return ModifySchemaPlanResponse {
            plan,
            requires_replace: Vec::new(),
            diagnostics: Diagnostics::new(),
        };
    }

    let schema = plan.schema().clone();
    let mut run = PlanRun {
        config: &config,
        state: &state,
        plan: &plan,
        requires_replace: Vec::new(),
        diagnostics: Diagnostics::new(),
    };
    let modified = run.members(
        &Path::empty(),
        NestingMode::Single,
        &schema.attributes,
        Some(&schema.blocks),
        plan.raw().clone(),
    );
    let PlanRun {
        requires_replace,
        mut diagnostics,
        ..
    } = run;

    if let Some(modified) = modified {
        diagnostics.append(plan.set_attribute_value(&Path::empty(), modified));
    }
    ModifySchemaPlanResponse {
        plan,
        requires_replace,
        diagnostics,
    }
}

struct PlanRun<'r> {
    config: &'r Config,
    state: &'r State,
    plan: &'r Plan,
    requires_replace: Vec<Path>,
    diagnostics: Diagnostics,
}

impl PlanRun<'_> {
    /// Modified value for the attribute at `path`; `None` leaves it as proposed.
    fn attribute(&mut self, path: &Path, attribute: &Attribute, proposed: Value) -> Option<Value> {
        let value = self.node(path, attribute.attr_type(), &attribute.plan_modifiers, proposed)?;
        match attribute.defines_attributes() {
            Some(nested) => {
                self.members(path, nested.nesting_mode, &nested.attributes, None, value)
            }
            None => Some(value),
        }
    }

    fn block(&mut self, path: &Path, block: &Block, proposed: Value) -> Option<Value> {
        let value = self.node(path, block.attr_type(), &block.plan_modifiers, proposed)?;
        self.members(
            path,
            block.nesting_mode.as_nesting_mode(),
            &block.attributes,
            Some(&block.blocks),
            value,
        )
    }

    /// Runs the modifiers registered at `path` in order, threading the plan value through.
    fn node(
        &mut self,
        path: &Path,
        ty: Arc<dyn AttrType>,
        modifiers: &[Arc<dyn AttributePlanModifier>],
        proposed: Value,
    ) -> Option<Value> {
        if modifiers.is_empty() {
            return Some(proposed);
        }

        let mut fetch = Diagnostics::new();
        let config_value = self.config.attribute_value(path, &mut fetch);
        let state_value = self.state.attribute_value(path, &mut fetch);
        let failed = fetch.has_error();
        self.diagnostics.append(fetch);
        if failed {
            return None;
        }
        let (config_value, state_value) = (config_value?, state_value?);
        let mut plan_value = match ty.value_from_raw(&proposed) {
            Ok(value) => value,
            Err(err) => {
                self.diagnostics.add_attribute_error(
                    path,
                    "Plan Read Error",
                    provider_bug(
                        "convert an attribute value from the provider to the framework type",
                        err,
                    ),
                );
                return None;
            }
        };

        let mut requires_replace = false;
        for modifier in modifiers {
            let request = ModifyAttributePlanRequest {
                path,
                path_expression: path.expression(),
                config_value: &config_value,
                state_value: &state_value,
                plan_value: &plan_value,
                config: self.config,
                state: self.state,
                plan: self.plan,
            };
            let mut response = ModifyAttributePlanResponse::new(plan_value.clone());
            modifier.modify_plan(&request, &mut response);

            requires_replace |= response.requires_replace;
            let failed = response.diagnostics.has_error();
            self.diagnostics.append(response.diagnostics.with_default_path(path));
            if failed {
                debug!("plan modifier '{}' failed at '{path}'", modifier.description());
                return None;
            }
            plan_value = response.plan_value;
        }

        if requires_replace {
            self.requires_replace.push(path.clone());
        }

        match ty.value_to_raw(&plan_value) {
            Ok(raw) => Some(raw),
            Err(err) => {
                self.diagnostics.add_attribute_error(
                    path,
                    "Plan Write Error",
                    provider_bug("convert a modified plan value", err),
                );
                None
            }
        }
    }

    /// Rebuilds every instance below `path` from its modified children.
    fn members(
        &mut self,
        path: &Path,
        mode: NestingMode,
        attributes: &IndexMap<String, Attribute>,
        blocks: Option<&IndexMap<String, Block>>,
        container: Value,
    ) -> Option<Value> {
        let rebuilt = mode.map_instances(path, container, |instance_path, instance| {
            self.instance(instance_path, attributes, blocks, instance)
        });
        match rebuilt {
            Ok(value) => Some(value),
            Err(err) => {
                self.diagnostics.add_attribute_error(
                    path,
                    "Plan Write Error",
                    provider_bug("rebuild a modified plan value", err),
                );
                None
            }
        }
    }

    fn instance(
        &mut self,
        path: &Path,
        attributes: &IndexMap<String, Attribute>,
        blocks: Option<&IndexMap<String, Block>>,
        instance: Value,
    ) -> Value {
        let Some(mut fields) = instance.entries().cloned() else {
            return instance;
        };
        for (name, attribute) in attributes {
            let Some(proposed) = fields.get(name).cloned() else {
                continue;
            };
            let child_path = path.at_name(name.as_str());
            if let Some(modified) = self.attribute(&child_path, attribute, proposed) {
                fields.insert(name.clone(), modified);
            }
        }
        for (name, block) in blocks.into_iter().flatten() {
            let Some(proposed) = fields.get(name).cloned() else {
                continue;
            };
            if let Some(modified) = self.block(&path.at_name(name.as_str()), block, proposed) {
                fields.insert(name.clone(), modified);
            }
        }
        match Value::from_parts(instance.ty().clone(), ValueRepr::Object(fields)) {
            Ok(rebuilt) => rebuilt,
            Err(err) => {
                warn!("keeping proposed plan value at '{path}': {err}");
                self.diagnostics.add_attribute_error(
                    path,
                    "Plan Write Error",
                    provider_bug("rebuild a modified plan value", err),
                );
                instance
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PlanValueError {
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Schema(#[from] SchemaPathError),
}

/// Marks every computed attribute that is null in both plan and configuration as unknown,
/// so the provider can fill it in during apply.
pub fn mark_computed_nils_as_unknown(
    schema: &Schema,
    config: &Value,
    plan: Value,
) -> Result<Value, PlanValueError> {
    plan.transform(|path, value| -> Result<Value, PlanValueError> {
        if path.is_empty() || !value.is_null() {
            return Ok(value);
        }
        if let Ok(configured) = config.value_at_path(path) {
            if !configured.is_null() {
                return Ok(value);
            }
        }
        let attribute = match schema.attribute_at_path(path) {
            Ok(attribute) => attribute,
            Err(
                SchemaPathError::InsideAtomicAttribute
                | SchemaPathError::IsBlock
                | SchemaPathError::NotAnAttribute { .. },
            ) => return Ok(value),
            Err(err) => return Err(err.into()),
        };
        if !attribute.computed {
            return Ok(value);
        }
        debug!("marking computed attribute '{path}' unknown");
        Ok(Value::unknown(value.ty().clone()))
    })
}

/// Sorts replacement paths by their rendered form and drops duplicates.
pub fn normalize_requires_replace(mut paths: Vec<Path>) -> Vec<Path> {
    paths.sort_by_cached_key(|path| path.to_string());
    paths.dedup();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_replace_paths_sort_and_dedupe() {
        let paths = vec![
            Path::root("b"),
            Path::root("a").at_list_index(1),
            Path::root("b"),
            Path::root("a").at_list_index(0),
        ];
        let rendered: Vec<String> = normalize_requires_replace(paths)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["a[0]", "a[1]", "b"]);
    }
}
