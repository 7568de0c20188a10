//! Self-describing value model plus attribute paths and path expressions.
//!
//! Values are typed trees that may be null or unknown at any level. Paths address a single
//! location inside such a tree; expressions describe a pattern of locations that is resolved
//! against concrete data by the schema layer.

mod expression;
mod json;
mod path;
mod value;
mod walk;

pub use expression::{Expression, ExpressionStep};
pub use path::{Path, PathStep, StepError};
pub use value::{Value, ValueError, ValueRepr, ValueType};
