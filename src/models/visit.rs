// src/models/visit.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::media::MediaRef;

/// Hard cap on photos attached to a single visit.
pub const MAX_VISIT_PHOTOS: u64 = 9;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: Uuid,
    pub customer_id: Uuid,

    /// When the visit was recorded. Set at creation and immutable afterwards,
    /// including through edits.
    pub visit_time: DateTime<Utc>,
    /// The calendar day the visit is reported against (user-facing; defaults
    /// to the creation day). Plan matching uses this date.
    pub visit_date: NaiveDate,

    pub notes: VisitNotes,
    pub photos: Vec<MediaRef>,
    pub custom_fields: Vec<CustomField>,

    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Free-text outcome fields captured on the visit form. All optional; the
/// field set mirrors the paper workflow it replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisitNotes {
    pub listing: Option<String>,
    pub development_method: Option<String>,
    pub order: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    #[serde(rename = "case")]
    pub case_notes: Option<String>,
    pub inventory: Option<String>,
    pub shipping: Option<String>,
    pub foundation: Option<String>,
    pub replenishment: Option<String>,
    pub training: Option<String>,
    pub wechat: Option<String>,
    pub tools: Option<String>,
    pub feedback: Option<String>,
}

/// Closed set of custom-field value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub label: String,
    /// Machine name, unique within a visit.
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    pub customer_id: Uuid,

    /// Reported calendar day; the store fills in the creation day when absent.
    pub visit_date: Option<NaiveDate>,

    #[serde(default)]
    pub notes: VisitNotes,

    #[serde(default)]
    #[validate(length(max = 9, message = "at_most_nine_photos"))]
    pub photos: Vec<MediaRef>,

    #[serde(default)]
    #[validate(custom(function = "unique_field_names"))]
    pub custom_fields: Vec<CustomField>,
}

fn unique_field_names(fields: &[CustomField]) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(ValidationError::new("duplicate_field_name"));
        }
    }
    Ok(())
}
