//! Items and folders as returned by the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Value;
use crate::fields::FieldPath;

/// Identity of an item in the store.
///
/// The change key changes with every modification; the id does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changekey: Option<String>,
}

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            changekey: None,
        }
    }

    pub fn with_changekey(id: impl Into<String>, changekey: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            changekey: Some(changekey.into()),
        }
    }
}

/// A raw entity returned by a search.
///
/// Only the fields that were requested (or all fields, for a full-shape
/// search) are present in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(flatten)]
    pub id: ItemId,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Item {
    /// Creates an item without any field values.
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter for a field value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a top-level field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match name {
            "item_id" | "changekey" => None,
            _ => self.fields.get(name),
        }
    }

    /// Resolves a field path (`field`, `field__label`, `field__label__subfield`)
    /// against this item. `item_id` and `changekey` resolve to the identity.
    pub fn value_at(&self, path: &FieldPath) -> Option<Value> {
        match path.field.as_str() {
            "item_id" => return Some(Value::Text(self.id.id.clone())),
            "changekey" => return self.id.changekey.clone().map(Value::Text),
            _ => {}
        }
        let value = self.fields.get(&path.field)?;
        let Some(label) = path.label.as_deref() else {
            return Some(value.clone());
        };
        let entry = match value {
            Value::List(entries) => entries.iter().find_map(|e| match e {
                Value::Labeled { label: l, value } if l == label => Some(value.as_ref()),
                _ => None,
            }),
            Value::Labeled { label: l, value } if l == label => Some(value.as_ref()),
            _ => None,
        }?;
        match path.subfield.as_deref() {
            None => Some(entry.clone()),
            Some(sub) => match entry {
                Value::Record(fields) => fields.get(sub).cloned(),
                _ => None,
            },
        }
    }

    /// Removes every field not in `keep`. Identity is always kept.
    pub fn retain_fields(&mut self, keep: &[&str]) {
        self.fields.retain(|name, _| keep.contains(&name.as_str()));
    }
}

/// Handle of a folder to search in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderId {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changekey: Option<String>,
}

impl FolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            changekey: None,
        }
    }

    /// A well-known folder such as `inbox` or `calendar`.
    pub fn distinguished(name: impl Into<String>) -> Self {
        Self::new(name)
    }
}

/// How deep a search descends into the folder hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalDepth {
    /// Only the given folders.
    #[default]
    Shallow,
    /// The given folders and all sub-folders.
    Deep,
    /// Items in the dumpster of the given folders.
    SoftDeleted,
    /// Associated (hidden) items.
    Associated,
}

impl TraversalDepth {
    /// The wire name of the traversal mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalDepth::Shallow => "Shallow",
            TraversalDepth::Deep => "Deep",
            TraversalDepth::SoftDeleted => "SoftDeleted",
            TraversalDepth::Associated => "Associated",
        }
    }
}

/// The base set of properties a search returns for each item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityShape {
    /// Only identity, plus any explicitly projected fields.
    IdOnly,
    /// The store's default property set.
    Default,
    /// Every property.
    AllProperties,
}
