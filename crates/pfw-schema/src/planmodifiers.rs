//! Built-in attribute plan modifiers.

use std::fmt;
use std::sync::Arc;

use crate::diag::Diagnostics;
use crate::hooks::{AttributePlanModifier, ModifyAttributePlanRequest, ModifyAttributePlanResponse};

/// Shared early-outs of the replacement modifiers: resource creation, destruction,
/// computed attributes left unconfigured, and unchanged values never force replacement.
fn replacement_possible(request: &ModifyAttributePlanRequest<'_>) -> bool {
    if request.state.raw().is_null() || request.plan.raw().is_null() {
        return false;
    }
    if request.config_value.is_null() {
        let computed = request
            .config
            .schema()
            .attribute_at_path(request.path)
            .map(|attribute| attribute.computed)
            .unwrap_or(false);
        if computed {
            return false;
        }
    }
    request.plan_value != request.state_value
}

/// Destroys and recreates the resource whenever the attribute's value changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiresReplace;

impl AttributePlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "If the value of this attribute changes, the resource will be destroyed and recreated."
            .into()
    }

    fn modify_plan(
        &self,
        request: &ModifyAttributePlanRequest<'_>,
        response: &mut ModifyAttributePlanResponse,
    ) {
        if replacement_possible(request) {
            response.requires_replace = true;
        }
    }
}

pub type RequiresReplaceFn =
    dyn Fn(&ModifyAttributePlanRequest<'_>) -> (bool, Diagnostics) + Send + Sync;

/// Like [`RequiresReplace`], but a caller-supplied predicate has the last word.
#[derive(Clone)]
pub struct RequiresReplaceIf {
    predicate: Arc<RequiresReplaceFn>,
    description: String,
    markdown_description: String,
}

impl RequiresReplaceIf {
    pub fn new<F>(
        predicate: F,
        description: impl Into<String>,
        markdown_description: impl Into<String>,
    ) -> Self
    where
        F: Fn(&ModifyAttributePlanRequest<'_>) -> (bool, Diagnostics) + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            description: description.into(),
            markdown_description: markdown_description.into(),
        }
    }
}

impl fmt::Debug for RequiresReplaceIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequiresReplaceIf")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl AttributePlanModifier for RequiresReplaceIf {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn markdown_description(&self) -> String {
        self.markdown_description.clone()
    }

    fn modify_plan(
        &self,
        request: &ModifyAttributePlanRequest<'_>,
        response: &mut ModifyAttributePlanResponse,
    ) {
        if !replacement_possible(request) {
            return;
        }
        let (replace, diags) = (self.predicate)(request);
        response.diagnostics.append(diags);
        if replace {
            response.requires_replace = true;
        }
    }
}

/// Keeps the prior state value for an attribute the plan would otherwise mark unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseStateForUnknown;

impl AttributePlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".into()
    }

    fn modify_plan(
        &self,
        request: &ModifyAttributePlanRequest<'_>,
        response: &mut ModifyAttributePlanResponse,
    ) {
        if request.state_value.is_null() || !request.plan_value.is_unknown() {
            return;
        }
        if request.config_value.is_unknown() {
            return;
        }
        response.plan_value = request.state_value.clone();
    }
}
