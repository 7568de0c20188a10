//! Schema-aware read and write access to configuration, plan and state trees.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use log::debug;
use pfw_value::{Expression, Path, PathStep, Value, ValueError, ValueRepr, ValueType};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::diag::{Diagnostic, Diagnostics, provider_bug};
use crate::matching;
use crate::model::Schema;

/// Which request tree a [`Data`] holds; only used to word diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDescription {
    Configuration,
    Plan,
    State,
}

impl DataDescription {
    pub fn title(self) -> &'static str {
        match self {
            DataDescription::Configuration => "Configuration",
            DataDescription::Plan => "Plan",
            DataDescription::State => "State",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            DataDescription::Configuration => "configuration",
            DataDescription::Plan => "plan",
            DataDescription::State => "state",
        }
    }

    fn read_summary(self) -> String {
        format!("{} Read Error", self.title())
    }

    fn write_summary(self) -> String {
        format!("{} Write Error", self.title())
    }
}

/// A raw value tree paired with the schema describing it.
#[derive(Debug, Clone)]
pub struct Data {
    description: DataDescription,
    schema: Arc<Schema>,
    raw: Value,
}

impl Data {
    pub(crate) fn new(description: DataDescription, schema: Arc<Schema>, raw: Value) -> Self {
        Self {
            description,
            schema,
            raw,
        }
    }

    pub fn description(&self) -> DataDescription {
        self.description
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Decodes the whole tree into `T`. Null decodes as JSON `null`.
    pub fn get<T: DeserializeOwned>(&self, diags: &mut Diagnostics) -> Option<T> {
        match decode(&self.raw) {
            Ok(value) => Some(value),
            Err(err) => {
                diags.add_error(
                    self.description.read_summary(),
                    provider_bug(&format!("read the {}", self.description.noun()), err),
                );
                None
            }
        }
    }

    /// Decodes the attribute at `path` into `T`.
    pub fn get_attribute<T: DeserializeOwned>(
        &self,
        path: &Path,
        diags: &mut Diagnostics,
    ) -> Option<T> {
        let value = self.attribute_value(path, diags)?;
        match decode(&value) {
            Ok(value) => Some(value),
            Err(err) => {
                diags.add_attribute_error(
                    path,
                    self.description.read_summary(),
                    provider_bug("convert an attribute value into the requested type", err),
                );
                None
            }
        }
    }

    /// Typed value at `path`.
    ///
    /// Paths that cannot be walked in the current tree, including every path of a null
    /// tree, yield a null value of the attribute type. `None` means diagnostics were
    /// recorded.
    pub fn attribute_value(&self, path: &Path, diags: &mut Diagnostics) -> Option<Value> {
        let ty = match self.schema.attr_type_at_path(path) {
            Ok(ty) => ty,
            Err(err) => {
                diags.add_attribute_error(
                    path,
                    self.description.read_summary(),
                    provider_bug("retrieve type information at a given path", err),
                );
                return None;
            }
        };

        // TODO: yield unknown instead of null when the first unwalkable ancestor is unknown.
        let raw = match self.raw.value_at_path(path) {
            Ok(raw) => raw.clone(),
            Err(err) => {
                debug!("{} has no value at {path}: {err}", self.description.noun());
                Value::null(ty.value_type())
            }
        };

        let type_diags = ty.validate(&raw, path).with_default_path(path);
        let failed = type_diags.has_error();
        diags.append(type_diags);
        if failed {
            return None;
        }

        match ty.value_from_raw(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                diags.add_attribute_error(
                    path,
                    self.description.read_summary(),
                    provider_bug(
                        "convert an attribute value from the provider to the framework type",
                        err,
                    ),
                );
                None
            }
        }
    }

    /// Concrete paths in this tree matching `expression`.
    pub fn path_matches(&self, expression: &Expression, diags: &mut Diagnostics) -> Vec<Path> {
        let (paths, match_diags) = matching::path_matches(&self.schema, &self.raw, expression);
        diags.append(match_diags);
        paths
    }

    /// True when every step of `path` can be walked in the current tree.
    pub fn path_exists(&self, path: &Path) -> bool {
        self.raw.value_at_path(path).is_ok()
    }

    /// Replaces the whole tree with `value` encoded against the schema root type.
    pub fn set<T: Serialize + ?Sized>(&mut self, value: &T) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(err) => {
                diags.add_error(
                    self.description.write_summary(),
                    provider_bug(&format!("write the {}", self.description.noun()), err),
                );
                return diags;
            }
        };
        if json.is_null() {
            diags.add_error(
                self.description.write_summary(),
                provider_bug(
                    &format!("write the {}", self.description.noun()),
                    format!("cannot set null as the entire {}", self.description.noun()),
                ),
            );
            return diags;
        }
        match Value::from_json(&self.schema.value_type(), &json) {
            Ok(raw) => self.raw = raw,
            Err(err) => diags.add_error(
                self.description.write_summary(),
                provider_bug(&format!("write the {}", self.description.noun()), err),
            ),
        }
        diags
    }

    /// Encodes `value` against the attribute type at `path` and writes it, creating missing
    /// ancestors.
    pub fn set_attribute<T: Serialize + ?Sized>(&mut self, path: &Path, value: &T) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let ty = match self.schema.attr_type_at_path(path) {
            Ok(ty) => ty,
            Err(err) => {
                diags.add_attribute_error(
                    path,
                    self.description.write_summary(),
                    provider_bug("retrieve type information at a given path", err),
                );
                return diags;
            }
        };
        let encoded = serde_json::to_value(value)
            .map_err(|err| err.to_string())
            .and_then(|json| {
                Value::from_json(&ty.value_type(), &json).map_err(|err| err.to_string())
            })
            .and_then(|typed| ty.value_to_raw(&typed).map_err(|err| err.to_string()));
        let raw = match encoded {
            Ok(raw) => raw,
            Err(err) => {
                diags.add_attribute_error(
                    path,
                    self.description.write_summary(),
                    provider_bug("convert the value into the attribute type", err),
                );
                return diags;
            }
        };

        let type_diags = ty.validate(&raw, path).with_default_path(path);
        let failed = type_diags.has_error();
        diags.append(type_diags);
        if failed {
            return diags;
        }
        diags.append(self.set_attribute_value(path, raw));
        diags
    }

    /// Writes an already-encoded value at `path`, creating missing ancestors.
    pub fn set_attribute_value(&mut self, path: &Path, raw: Value) -> Diagnostics {
        let mut diags = Diagnostics::new();
        self.set_value_at_path(path, raw, &mut diags);
        diags
    }

    fn set_value_at_path(&mut self, path: &Path, value: Value, diags: &mut Diagnostics) {
        let (Some(parent_path), Some(step)) = (path.parent(), path.last_step()) else {
            self.raw = value;
            return;
        };

        if self.path_exists(path) {
            match replace_at_path(self.raw.clone(), path, value) {
                Ok(updated) => self.raw = updated,
                Err(err) => diags.add_attribute_error(
                    path,
                    self.description.write_summary(),
                    provider_bug("write a value at a given path", err),
                ),
            }
            return;
        }

        let parent_ty = match self.schema.attr_type_at_path(&parent_path) {
            Ok(ty) => ty,
            Err(err) => {
                diags.add_attribute_error(
                    path,
                    self.description.write_summary(),
                    provider_bug("retrieve type information at a given path", err),
                );
                return;
            }
        };

        let existing = self.raw.value_at_path(&parent_path).ok().cloned();
        let parent = match existing {
            Some(parent) if !parent.is_null() && !parent.is_unknown() => Ok(parent),
            other => {
                let unknown = other.as_ref().is_some_and(Value::is_unknown);
                create_parent_value(&parent_ty.value_type(), unknown)
            }
        }
        .and_then(|parent| upsert_child_value(parent, step, value));
        let parent = match parent {
            Ok(parent) => parent,
            Err(err) => {
                diags.push(value_conversion_error(&parent_path, err));
                return;
            }
        };

        let type_diags = parent_ty.validate(&parent, &parent_path).with_default_path(&parent_path);
        let failed = type_diags.has_error();
        diags.append(type_diags);
        if failed {
            return;
        }

        self.set_value_at_path(&parent_path, parent, diags);
    }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, String> {
    let json = value.to_json().map_err(|err| err.to_string())?;
    serde_json::from_value(json).map_err(|err| err.to_string())
}

fn replace_at_path(tree: Value, target: &Path, value: Value) -> Result<Value, ValueError> {
    let mut replacement = Some(value);
    tree.transform(|path, current| -> Result<Value, ValueError> {
        if path == target {
            if let Some(value) = replacement.take() {
                return Ok(value);
            }
        }
        Ok(current)
    })
}

fn value_conversion_error(path: &Path, err: String) -> Diagnostic {
    Diagnostic::error("Value Conversion Error", provider_bug("create a value", err))
        .with_path(path.clone())
}

/// Empty container, or an object of null attributes, for a parent that does not exist yet.
/// An unknown object parent yields unknown attributes instead.
pub(crate) fn create_parent_value(ty: &ValueType, unknown: bool) -> Result<Value, String> {
    let repr = match ty {
        ValueType::List(_) => ValueRepr::List(Vec::new()),
        ValueType::Set(_) => ValueRepr::Set(Vec::new()),
        ValueType::Map(_) => ValueRepr::Map(BTreeMap::new()),
        ValueType::Object(attrs) => ValueRepr::Object(
            attrs
                .iter()
                .map(|(name, attr_ty)| {
                    let field = if unknown {
                        Value::unknown(attr_ty.clone())
                    } else {
                        Value::null(attr_ty.clone())
                    };
                    (name.clone(), field)
                })
                .collect(),
        ),
        other => return Err(format!("Unknown parent type {other} to create value")),
    };
    Value::from_parts(ty.clone(), repr).map_err(|err| err.to_string())
}

/// Inserts `child` into `parent` at `step`. Lists only grow by one element at a time.
pub(crate) fn upsert_child_value(
    parent: Value,
    step: &PathStep,
    child: Value,
) -> Result<Value, String> {
    let kind = parent.kind();
    let (ty, repr) = parent.into_parts();
    let repr = match (repr, step) {
        (ValueRepr::List(mut items), PathStep::ElementKeyInt(index)) => {
            let len = items.len();
            match usize::try_from(*index) {
                Ok(idx) if idx < len => items[idx] = child,
                Ok(idx) if idx == len => items.push(child),
                _ => {
                    return Err(format!(
                        "Cannot add list element {} as list currently has {len} length. To \
                         prevent ambiguity, only the next element can be added to a list. Add \
                         empty elements into the list prior to this call, if appropriate.",
                        i128::from(*index) + 1
                    ));
                }
            }
            ValueRepr::List(items)
        }
        (ValueRepr::Set(mut items), PathStep::ElementKeyValue(_)) => {
            items.push(child);
            ValueRepr::Set(items)
        }
        (ValueRepr::Map(mut entries), PathStep::ElementKeyString(key)) => {
            entries.insert(key.clone(), child);
            ValueRepr::Map(entries)
        }
        (ValueRepr::Object(mut fields), PathStep::AttributeName(name)) => {
            fields.insert(name.clone(), child);
            ValueRepr::Object(fields)
        }
        (_, step) => return Err(format!("Cannot add child {step} to parent {kind} value")),
    };
    Value::from_parts(ty, repr).map_err(|err| err.to_string())
}

macro_rules! data_view {
    (mut $(#[$meta:meta])* $name:ident => $description:expr) => {
        data_view!($(#[$meta])* $name => $description);

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Data {
                &mut self.0
            }
        }
    };
    ($(#[$meta:meta])* $name:ident => $description:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(Data);

        impl $name {
            pub fn new(schema: Arc<Schema>, raw: Value) -> Self {
                Self(Data::new($description, schema, raw))
            }

            /// A null tree of the schema root type.
            pub fn null(schema: Arc<Schema>) -> Self {
                let ty = schema.value_type();
                Self::new(schema, Value::null(ty))
            }

            pub fn into_data(self) -> Data {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Data;

            fn deref(&self) -> &Data {
                &self.0
            }
        }
    };
}

data_view!(
    /// Practitioner configuration. Read-only.
    Config => DataDescription::Configuration
);
data_view!(mut
    /// Proposed new state of a resource.
    Plan => DataDescription::Plan
);
data_view!(mut
    /// Prior or new state of a resource.
    State => DataDescription::State
);

impl State {
    /// Nulls the whole tree, signalling the resource no longer exists.
    pub fn remove_resource(&mut self) {
        self.0.raw = Value::null(self.0.raw.ty().clone());
    }
}
