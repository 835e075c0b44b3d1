// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Explicit field-descriptor serialization for persisted Agent state and
//! settings, replacing the original's dict-of-type-strings introspection
//! with a fixed descriptor list consumed by one shared serializer.

use serde_json::Value;

/// How a single persisted field should be read from / written to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Duration,
    DateTime,
    Object,
}

/// Declares one persisted field: its JSON key, its kind, and accessors
/// bound to a concrete Agent/plugin instance at the call site. The core
/// never introspects struct fields by name — every persisted field is
/// named here once, by the plugin that owns it.
pub struct FieldDescriptor<T> {
    pub key: &'static str,
    pub kind: FieldKind,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T, &Value),
}

/// The ordered set of fields a plugin persists as Agent runtime state
/// (last_execution, random_skew, and the like).
pub struct StateDocument {
    pub fields: Vec<&'static str>,
}

/// The ordered set of fields a plugin declares as settings (its
/// configuration surface, distinct from runtime state).
pub struct SettingsDocument {
    pub fields: Vec<&'static str>,
}

/// Serializes a value to a JSON object using a descriptor list, the one
/// shared path every persisted document goes through.
pub fn to_document<T>(value: &T, descriptors: &[FieldDescriptor<T>]) -> Value {
    let mut map = serde_json::Map::with_capacity(descriptors.len());
    for descriptor in descriptors {
        map.insert(descriptor.key.to_string(), (descriptor.get)(value));
    }
    Value::Object(map)
}

/// Applies a previously serialized document back onto `value`, skipping
/// keys the document does not contain (a plugin upgrade may add fields).
pub fn from_document<T>(value: &mut T, doc: &Value, descriptors: &[FieldDescriptor<T>]) {
    let Some(map) = doc.as_object() else { return };
    for descriptor in descriptors {
        if let Some(field_value) = map.get(descriptor.key) {
            (descriptor.set)(value, field_value);
        }
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
