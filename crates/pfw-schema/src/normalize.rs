//! Reconciliation of provider-normalized values with their prior form.

use log::debug;
use pfw_value::{Value, ValueError};

use crate::model::Schema;

/// Rewrites `new` so that every leaf attribute whose type considers the old and new values
/// equal keeps the old value. Everything else, including structure only present in `new`,
/// comes from `new`.
pub fn undo_normalization_differences(
    schema: &Schema,
    old: &Value,
    new: Value,
) -> Result<Value, ValueError> {
    if old.is_null() || old.is_unknown() {
        return Ok(new);
    }

    new.transform_top_down(|path, value| -> Result<Value, ValueError> {
        if path.is_empty() {
            return Ok(value);
        }
        let Ok(attribute) = schema.attribute_at_path(path) else {
            return Ok(value);
        };
        if attribute.defines_attributes().is_some() {
            return Ok(value);
        }
        let Some(ty) = attribute.ty.as_ref() else {
            return Ok(value);
        };
        let Ok(old_value) = old.value_at_path(path) else {
            debug!("no prior value at '{path}', keeping new value");
            return Ok(value);
        };
        if old_value.ty() != value.ty() {
            return Ok(value);
        }
        let (Ok(old_typed), Ok(new_typed)) =
            (ty.value_from_raw(old_value), ty.value_from_raw(&value))
        else {
            debug!("values at '{path}' do not decode, keeping new value");
            return Ok(value);
        };
        if ty.equal(&old_typed, &new_typed) {
            Ok(old_value.clone())
        } else {
            Ok(value)
        }
    })
}
