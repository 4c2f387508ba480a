// src/models/checkin.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::media::MediaRef;

/// Location- and photo-evidenced proof of presence. Written once after a
/// successful location fix; never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkin {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Set when the check-in belongs to a specific visit record; cascades
    /// with it.
    pub visit_id: Option<Uuid>,

    pub checkin_time: DateTime<Utc>,

    pub latitude: f64,
    pub longitude: f64,
    /// Reverse-geocoded address at the time of the fix, when available.
    pub address: Option<String>,

    pub photos: Vec<MediaRef>,
    pub remark: Option<String>,

    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCheckin {
    pub customer_id: Uuid,
    pub visit_id: Option<Uuid>,

    pub address: Option<String>,

    #[validate(length(min = 1, max = 9, message = "one_to_nine_photos"))]
    pub photos: Vec<MediaRef>,

    pub remark: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkin_without_photos_fails_validation() {
        let draft = NewCheckin {
            customer_id: Uuid::new_v4(),
            visit_id: None,
            address: None,
            photos: vec![],
            remark: None,
        };
        assert!(draft.validate().is_err());
    }
}
