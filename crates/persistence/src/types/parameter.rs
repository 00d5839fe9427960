//! Attribute values supplied when storing an instance.

use serde::{Deserialize, Serialize};

use super::dataset::Dataset;
use super::tag::{Tag, Vr};

/// One attribute of an instance being stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataParameter {
    /// The attribute.
    pub tag: Tag,
    /// Its value representation.
    pub vr: Vr,
    /// Its values; multi-valued attributes keep their order.
    pub values: Vec<String>,
}

impl DataParameter {
    /// Creates a parameter using the dictionary VR (LO if unknown).
    pub fn new(tag: Tag, values: Vec<String>) -> Self {
        Self {
            tag,
            vr: tag.vr().unwrap_or(Vr::LO),
            values,
        }
    }

    /// Creates a single-valued parameter.
    pub fn single(tag: Tag, value: impl Into<String>) -> Self {
        Self::new(tag, vec![value.into()])
    }

    /// Returns the first value, if any.
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Converts every element of a dataset into a parameter.
    pub fn from_dataset(dataset: &Dataset) -> Vec<DataParameter> {
        dataset
            .iter()
            .map(|(tag, element)| DataParameter {
                tag: *tag,
                vr: element.vr(),
                values: element.values().to_vec(),
            })
            .collect()
    }
}

/// Returns the first value supplied for `tag`.
pub fn find_parameter(parameters: &[DataParameter], tag: Tag) -> Option<&str> {
    parameters
        .iter()
        .find(|p| p.tag == tag)
        .and_then(DataParameter::first)
}
