//! Search result datasets.
//!
//! A [`Dataset`] is the attribute bag produced for one matched study, series or
//! instance. It serializes to the DICOM JSON model (PS3.18 F.2).

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use super::tag::{Tag, Vr};

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataElement {
    vr: Vr,
    values: Vec<String>,
}

impl DataElement {
    /// Creates an element.
    pub fn new(vr: Vr, values: Vec<String>) -> Self {
        Self { vr, values }
    }

    /// Returns the value representation.
    pub fn vr(&self) -> Vr {
        self.vr
    }

    /// Returns all values.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Returns the first value, if any.
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("vr".to_string(), Value::String(self.vr.to_string()));
        if !self.values.is_empty() {
            let values = self.values.iter().map(|v| json_value(self.vr, v)).collect();
            obj.insert("Value".to_string(), Value::Array(values));
        }
        Value::Object(obj)
    }
}

fn json_value(vr: Vr, value: &str) -> Value {
    match vr {
        Vr::PN => json!({ "Alphabetic": value }),
        Vr::IS | Vr::UL | Vr::US => value
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string())),
        Vr::DS => value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string())),
        _ => Value::String(value.to_string()),
    }
}

/// A level-appropriate bag of attributes for a matched entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    elements: BTreeMap<Tag, DataElement>,
}

impl Dataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an element, replacing any previous value.
    pub fn insert(&mut self, tag: Tag, vr: Vr, values: Vec<String>) {
        self.elements.insert(tag, DataElement::new(vr, values));
    }

    /// Sets a single-valued element using the dictionary VR (LO if unknown).
    pub fn put(&mut self, tag: Tag, value: impl Into<String>) {
        let vr = tag.vr().unwrap_or(Vr::LO);
        self.insert(tag, vr, vec![value.into()]);
    }

    /// Builder form of [`Dataset::put`].
    pub fn with(mut self, tag: Tag, value: impl Into<String>) -> Self {
        self.put(tag, value);
        self
    }

    /// Returns the element for a tag.
    pub fn get(&self, tag: Tag) -> Option<&DataElement> {
        self.elements.get(&tag)
    }

    /// Returns the first value of a tag.
    pub fn string(&self, tag: Tag) -> Option<&str> {
        self.get(tag).and_then(DataElement::first)
    }

    /// Returns all values of a tag (empty if absent).
    pub fn values(&self, tag: Tag) -> &[String] {
        self.get(tag).map(DataElement::values).unwrap_or(&[])
    }

    /// Returns true if the tag is present.
    pub fn contains(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the dataset has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates elements in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &DataElement)> {
        self.elements.iter()
    }

    /// Renders the dataset in the DICOM JSON model.
    pub fn to_dicom_json(&self) -> Value {
        let map: Map<String, Value> = self
            .elements
            .iter()
            .map(|(tag, element)| (tag.to_hex(), element.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_dicom_json().serialize(serializer)
    }
}
