//! Auxiliary per-instance metadata.
//!
//! Metadata travels alongside the primary instance row: where the object's bytes
//! live, which transfer syntaxes are available, and any extra attributes the
//! storage pipeline wants to keep. It is stored as JSON and returned unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored rendition of an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaLocation {
    /// Media type of the rendition, e.g. `application/dicom`.
    pub media_type: String,
    /// Transfer syntax of the rendition, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_syntax_uid: Option<String>,
    /// Storage location (path, URL or object key).
    pub location: String,
}

/// Metadata associated with a stored instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMetadata {
    /// SOP Class UID of the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sop_class_uid: Option<String>,

    /// Transfer syntax the object was received in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_syntax_uid: Option<String>,

    /// Stored renditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaLocation>,

    /// Any additional properties.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl InstanceMetadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the SOP Class UID.
    pub fn with_sop_class_uid(mut self, uid: impl Into<String>) -> Self {
        self.sop_class_uid = Some(uid.into());
        self
    }

    /// Sets the transfer syntax.
    pub fn with_transfer_syntax_uid(mut self, uid: impl Into<String>) -> Self {
        self.transfer_syntax_uid = Some(uid.into());
        self
    }

    /// Adds a stored rendition.
    pub fn with_media(
        mut self,
        media_type: impl Into<String>,
        transfer_syntax_uid: Option<String>,
        location: impl Into<String>,
    ) -> Self {
        self.media.push(MediaLocation {
            media_type: media_type.into(),
            transfer_syntax_uid,
            location: location.into(),
        });
        self
    }

    /// Adds an additional property.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.additional.insert(key.into(), value);
        self
    }

    /// Serializes to the stored JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses the stored JSON form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
