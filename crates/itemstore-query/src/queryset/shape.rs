//! Result rows and how items are turned into them.

use itemstore_api_rs::fields::FieldPath;
use itemstore_api_rs::models::{Item, Value};

/// The form each result element takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultShape {
    /// Whole items.
    #[default]
    Entities,
    /// Field name to value pairs, from `values()`.
    ValuesDict,
    /// Bare values in field order, from `values_list()`.
    ValuesTuple,
    /// A single bare value, from `values_list(.., flat = true)`.
    Flat,
}

/// One element of a query result.
///
/// Fields an item does not carry come back as [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Item(Item),
    Values(Vec<(String, Value)>),
    Tuple(Vec<Value>),
    Flat(Value),
}

impl Row {
    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Row::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_item(self) -> Option<Item> {
        match self {
            Row::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Looks up a value by field path in a `values()` row.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Row::Values(pairs) => pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The bare values of a `values_list()` row.
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Row::Tuple(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Row::Flat(value) => Some(value),
            _ => None,
        }
    }
}

/// Turns fetched items into rows of one shape.
#[derive(Debug, Clone, Default)]
pub(crate) struct Shaper {
    pub shape: ResultShape,
    /// Paths read out of each item for value shapes.
    pub fields: Vec<FieldPath>,
    /// Fields fetched only for sorting, removed from entity rows.
    pub strip: Vec<String>,
}

impl Shaper {
    pub fn apply(&self, mut item: Item) -> Row {
        let value = |path: &FieldPath| item.value_at(path).unwrap_or(Value::Null);
        match self.shape {
            ResultShape::Entities => {
                if !self.strip.is_empty() {
                    item.fields.retain(|name, _| !self.strip.contains(name));
                }
                Row::Item(item)
            }
            ResultShape::ValuesDict => Row::Values(
                self.fields
                    .iter()
                    .map(|path| (path.to_string(), value(path)))
                    .collect(),
            ),
            ResultShape::ValuesTuple => Row::Tuple(self.fields.iter().map(value).collect()),
            ResultShape::Flat => Row::Flat(self.fields.first().map_or(Value::Null, value)),
        }
    }
}
