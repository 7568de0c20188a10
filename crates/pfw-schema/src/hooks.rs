//! Extension points attached to attributes and blocks.
//!
//! Hooks run sequentially in registration order. Plan modifiers see the plan value left by
//! the previous modifier.

use std::fmt;

use pfw_value::{Expression, Path, Value};

use crate::data::{Config, Plan, State};
use crate::diag::Diagnostics;

pub struct ValidateAttributeRequest<'a> {
    pub path: &'a Path,
    /// Exact expression for `path`; merge relative expressions onto it.
    pub path_expression: Expression,
    pub config_value: &'a Value,
    pub config: &'a Config,
}

#[derive(Debug, Default)]
pub struct ValidateAttributeResponse {
    pub diagnostics: Diagnostics,
}

pub trait AttributeValidator: fmt::Debug + Send + Sync {
    fn description(&self) -> String;

    fn markdown_description(&self) -> String {
        self.description()
    }

    fn validate(
        &self,
        request: &ValidateAttributeRequest<'_>,
        response: &mut ValidateAttributeResponse,
    );
}

pub struct ModifyAttributePlanRequest<'a> {
    pub path: &'a Path,
    pub path_expression: Expression,
    pub config_value: &'a Value,
    pub state_value: &'a Value,
    /// Output of the previous modifier, or the proposed plan for the first one.
    pub plan_value: &'a Value,
    pub config: &'a Config,
    pub state: &'a State,
    pub plan: &'a Plan,
}

#[derive(Debug)]
pub struct ModifyAttributePlanResponse {
    pub plan_value: Value,
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

impl ModifyAttributePlanResponse {
    pub fn new(plan_value: Value) -> Self {
        Self {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

pub trait AttributePlanModifier: fmt::Debug + Send + Sync {
    fn description(&self) -> String;

    fn markdown_description(&self) -> String {
        self.description()
    }

    fn modify_plan(
        &self,
        request: &ModifyAttributePlanRequest<'_>,
        response: &mut ModifyAttributePlanResponse,
    );
}
