// src/models/media.rs

use serde::{Deserialize, Serialize};

/// Opaque reference to a captured photo. The core never interprets the bytes;
/// the presentation layer resolves it against the device media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub String);

impl MediaRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MediaRef {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
